use async_trait::async_trait;
use thiserror::Error;
use crate::core::DonorFilter;
use crate::models::{
    Donor, DonorListing, DonorProfile, Hospital, MatchListing, MatchProposal, NewOrganRequest,
    NewUser, Notification, OrganRequest, PersistedMatch, User,
};

/// Errors that can occur when interacting with the match store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// True when the failure means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::SqlxError(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

/// Persistence seam for accounts, donors, requests, matches and notifications
///
/// Every multi-row write documented as atomic must commit as one unit.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert a user; hospital accounts get their hospital row in the same unit.
    /// Duplicate email yields `StoreError::Conflict`.
    async fn create_account(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    /// Delete a user and everything hanging off it. Returns false if absent.
    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError>;

    async fn find_donor_by_user(&self, user_id: i64) -> Result<Option<Donor>, StoreError>;

    /// Create or replace the donor record owned by `user_id`
    async fn upsert_donor(&self, user_id: i64, profile: DonorProfile) -> Result<Donor, StoreError>;

    /// Mark the donor `Inactive` and its user's unread notifications `Read`.
    /// Returns how many notifications were cleared.
    async fn deactivate_donor(&self, user_id: i64) -> Result<u64, StoreError>;

    /// Active donors joined with their users, narrowed by the filter
    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<DonorListing>, StoreError>;

    async fn find_hospital_by_admin(&self, user_id: i64) -> Result<Option<Hospital>, StoreError>;

    /// Insert a request with status `Pending`
    async fn insert_request(&self, request: NewOrganRequest) -> Result<OrganRequest, StoreError>;

    async fn find_request(&self, request_id: i64) -> Result<Option<OrganRequest>, StoreError>;

    /// The request, only if its hospital is administered by `admin_user_id`
    async fn find_owned_request(
        &self,
        request_id: i64,
        admin_user_id: i64,
    ) -> Result<Option<OrganRequest>, StoreError>;

    /// Delete a request's matches and then the request, atomically.
    /// Returns the number of matches removed.
    async fn delete_request(&self, request_id: i64) -> Result<u64, StoreError>;

    /// Insert a match plus its donor notification for every proposal, atomically.
    /// Pairs already matched for this request are skipped along with their
    /// notification. A proposal naming a donor that no longer exists fails
    /// the whole batch with `StoreError::NotFound` and nothing is written.
    async fn persist_proposals(
        &self,
        request_id: i64,
        proposals: &[MatchProposal],
    ) -> Result<Vec<PersistedMatch>, StoreError>;

    /// Every match, highest score first
    async fn list_all_matches(&self) -> Result<Vec<MatchListing>, StoreError>;

    /// Matches on the donor record owned by `user_id`, highest score first
    async fn list_matches_for_donor_user(&self, user_id: i64)
        -> Result<Vec<MatchListing>, StoreError>;

    /// Notifications addressed to the user, newest first
    async fn notifications_for(&self, user_id: i64) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self, user_id: i64) -> Result<i64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(StoreError::Unavailable("down".to_string()).is_unavailable());
        assert!(StoreError::SqlxError(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(!StoreError::Conflict("dup".to_string()).is_unavailable());
        assert!(!StoreError::SqlxError(sqlx::Error::RowNotFound).is_unavailable());
    }
}
