// Service exports
pub mod accounts;
pub mod auth;
pub mod lifecycle;
pub mod memory;
pub mod postgres;
pub mod store;

pub use auth::{hash_password, verify_password, AuthError, Claims, TokenKeys};
pub use lifecycle::{
    generate_matches, CreatedRequest, DeletedRequest, GenerationOutcome, MatchBoard,
};
pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::{MatchStore, StoreError};
