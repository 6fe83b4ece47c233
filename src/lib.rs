//! Organ Match - donor and hospital request matching service
//!
//! Hospitals file organ requests, donors publish availability and medical
//! attributes, and every new request is scored against all active donors.
//! Donors scoring at least 40 of 100 points become proposed matches and
//! receive a notification.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_match_score, propose_matches, MATCH_THRESHOLD};
pub use error::AppError;
pub use models::{Actor, BloodType, Donor, Organ, OrganRequest, UrgencyLevel};
pub use services::{generate_matches, GenerationOutcome, MatchStore, MemoryStore, PostgresClient};
