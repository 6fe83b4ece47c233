// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use filters::{matches_donor_filter, DonorFilter};
pub use matcher::{notification_message, propose_matches, ProposalSet};
pub use scoring::{calculate_match_score, MATCH_THRESHOLD, MAX_SCORE};
