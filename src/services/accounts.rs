use tracing::{info, instrument};
use validator::Validate;
use crate::core::DonorFilter;
use crate::error::AppError;
use crate::models::domain::non_blank;
use crate::models::{
    Actor, Donor, DonorListing, DonorProfile, DonorProfileRequest, LoginRequest, NewUser,
    Notification, RegisterRequest, Role, User,
};
use crate::services::auth::{hash_password, verify_password, TokenKeys};
use crate::services::store::{MatchStore, StoreError};

/// Reject callers whose role does not own the operation
pub fn require_role(actor: &Actor, role: Role) -> Result<(), AppError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("{} accounts only", role)))
    }
}

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_in: u64,
    pub actor: Actor,
    /// Every notification addressed to the user, read or unread
    pub notifications: Vec<Notification>,
}

#[instrument(skip(store, form), fields(email = %form.email))]
pub async fn register<S>(store: &S, form: RegisterRequest) -> Result<User, AppError>
where
    S: MatchStore + ?Sized,
{
    let role = form.role.parse::<Role>().ok();
    let (Some(role), false, false, false) = (
        role,
        form.name.trim().is_empty(),
        form.email.trim().is_empty(),
        form.password.is_empty(),
    ) else {
        return Err(AppError::Validation("Please fill all required fields.".to_string()));
    };

    form.validate()
        .map_err(|_| AppError::Validation("Invalid email.".to_string()))?;

    let email = form.email.trim().to_lowercase();
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash =
        hash_password(&form.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let user = store
        .create_account(NewUser {
            name: form.name.trim().to_string(),
            email,
            phone: non_blank(form.phone),
            password_hash,
            role,
            consent_given: form.consent,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::DuplicateEmail,
            other => AppError::Store(other),
        })?;

    info!(user_id = user.id, role = %user.role, "user registered");
    Ok(user)
}

#[instrument(skip(store, keys, form), fields(email = %form.email))]
pub async fn login<S>(store: &S, keys: &TokenKeys, form: LoginRequest) -> Result<LoginOutcome, AppError>
where
    S: MatchStore + ?Sized,
{
    form.validate()
        .map_err(|_| AppError::Validation("Email and password are required.".to_string()))?;

    let email = form.email.trim().to_lowercase();
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let actor = Actor::new(user.id, user.role);
    let token = keys.issue(actor).map_err(|e| AppError::Internal(e.to_string()))?;
    let notifications = store.notifications_for(user.id).await?;

    info!(user_id = user.id, notifications = notifications.len(), "user logged in");
    Ok(LoginOutcome {
        token,
        expires_in: keys.ttl_secs(),
        actor,
        notifications,
    })
}

/// Create or update the caller's donor record
pub async fn save_donor_profile<S>(
    store: &S,
    actor: &Actor,
    form: DonorProfileRequest,
) -> Result<Donor, AppError>
where
    S: MatchStore + ?Sized,
{
    require_role(actor, Role::Donor)?;

    let Some(blood_type) = form.blood_type.filter(|_| !form.organs.is_empty()) else {
        return Err(AppError::Validation(
            "Blood type and at least one organ are required.".to_string(),
        ));
    };

    let profile = DonorProfile {
        blood_type,
        organs: form.organs.into_iter().collect(),
        hla_profile: non_blank(form.hla_profile),
        availability_status: form.availability_status.unwrap_or_default(),
        location: non_blank(form.location),
    };

    let donor = store.upsert_donor(actor.user_id, profile).await?;
    info!(user_id = actor.user_id, donor_id = donor.id, "donor profile saved");
    Ok(donor)
}

/// Set the caller's donor record `Inactive` and clear unread notifications
///
/// Returns how many notifications were marked read.
pub async fn deactivate_donor<S>(store: &S, actor: &Actor) -> Result<u64, AppError>
where
    S: MatchStore + ?Sized,
{
    require_role(actor, Role::Donor)?;

    if store.find_donor_by_user(actor.user_id).await?.is_none() {
        return Err(AppError::DonorProfileMissing);
    }

    let cleared = store.deactivate_donor(actor.user_id).await?;
    info!(user_id = actor.user_id, cleared, "donor deactivated");
    Ok(cleared)
}

pub async fn delete_donor_account<S>(store: &S, actor: &Actor) -> Result<(), AppError>
where
    S: MatchStore + ?Sized,
{
    require_role(actor, Role::Donor)?;

    if !store.delete_user(actor.user_id).await? {
        return Err(AppError::Unauthenticated);
    }

    info!(user_id = actor.user_id, "donor account deleted");
    Ok(())
}

/// Active donors visible to any signed-in user
pub async fn search_donors<S>(
    store: &S,
    actor: &Actor,
    filter: DonorFilter,
) -> Result<Vec<DonorListing>, AppError>
where
    S: MatchStore + ?Sized,
{
    let donors = store.search_donors(&filter).await?;
    tracing::debug!(
        user_id = actor.user_id,
        organ = ?filter.organ,
        location = ?filter.location,
        results = donors.len(),
        "donor search"
    );
    Ok(donors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_role() {
        let donor = Actor::new(1, Role::Donor);
        assert!(require_role(&donor, Role::Donor).is_ok());
        assert!(matches!(
            require_role(&donor, Role::Hospital),
            Err(AppError::Forbidden(_))
        ));
    }
}
