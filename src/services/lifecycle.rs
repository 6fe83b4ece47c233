use serde::Serialize;
use tracing::{error, info, instrument};
use crate::core::{propose_matches, DonorFilter};
use crate::error::AppError;
use crate::models::domain::non_blank;
use crate::models::{
    Actor, CreateOrganRequest, Donor, MatchListing, NewOrganRequest, Notification, OrganRequest,
    Role,
};
use crate::services::accounts::require_role;
use crate::services::store::{MatchStore, StoreError};

/// What a match generation run did
///
/// Store failures never escape generation; they are logged and reported
/// here so callers can tell "nothing qualified" from "nothing was written".
/// An unreachable store is `StoreUnavailable`; any other store rejection
/// (a donor removed mid-run, an undecodable row) is `Failed`. Either way
/// nothing from the run was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    RequestNotFound,
    Generated {
        considered: usize,
        matches_created: usize,
        notifications_created: usize,
    },
    StoreUnavailable,
    Failed,
}

impl GenerationOutcome {
    pub fn matches_created(&self) -> usize {
        match self {
            GenerationOutcome::Generated { matches_created, .. } => *matches_created,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedRequest {
    pub request: OrganRequest,
    pub generation: GenerationOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedRequest {
    pub request_id: i64,
    pub matches_removed: u64,
}

/// Match listing plus the caller's notification inbox
#[derive(Debug, Clone, Serialize)]
pub struct MatchBoard {
    pub matches: Vec<MatchListing>,
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// Score every active donor against a request and persist qualifying matches
///
/// Matches and their notifications are written as one unit. A donor
/// already matched to this request is not matched again, so repeated
/// runs never duplicate a match or notification.
#[instrument(skip(store))]
pub async fn generate_matches<S>(
    store: &S,
    request_id: i64,
    location_hint: Option<&str>,
) -> GenerationOutcome
where
    S: MatchStore + ?Sized,
{
    match try_generate(store, request_id, location_hint).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_unavailable() => {
            error!("Match generation for request {} could not reach the store: {}", request_id, e);
            GenerationOutcome::StoreUnavailable
        }
        Err(e) => {
            error!("Match generation for request {} failed: {}", request_id, e);
            GenerationOutcome::Failed
        }
    }
}

async fn try_generate<S>(
    store: &S,
    request_id: i64,
    location_hint: Option<&str>,
) -> Result<GenerationOutcome, StoreError>
where
    S: MatchStore + ?Sized,
{
    let Some(request) = store.find_request(request_id).await? else {
        info!("Request {} not found, skipping match generation", request_id);
        return Ok(GenerationOutcome::RequestNotFound);
    };

    let donors: Vec<Donor> = store
        .search_donors(&DonorFilter::default())
        .await?
        .into_iter()
        .map(|listing| listing.donor)
        .collect();

    let result = propose_matches(&request, &donors, location_hint);
    let persisted = store.persist_proposals(request.id, &result.proposals).await?;

    let outcome = GenerationOutcome::Generated {
        considered: result.total_candidates,
        matches_created: persisted.len(),
        notifications_created: persisted.len(),
    };

    info!(
        "Generated {} matches for request {} (from {} active donors, {} qualified)",
        persisted.len(),
        request.id,
        result.total_candidates,
        result.proposals.len()
    );

    Ok(outcome)
}

/// File a new organ request for the caller's hospital and run matching
#[instrument(skip(store, form), fields(user_id = actor.user_id))]
pub async fn create_request<S>(
    store: &S,
    actor: &Actor,
    form: CreateOrganRequest,
) -> Result<CreatedRequest, AppError>
where
    S: MatchStore + ?Sized,
{
    require_role(actor, Role::Hospital)?;

    let patient_name = form.patient_name.trim().to_string();
    let (false, Some(required_organ), Some(blood_type), Some(urgency_level)) = (
        patient_name.is_empty(),
        form.required_organ,
        form.blood_type,
        form.urgency_level,
    ) else {
        return Err(AppError::Validation("Please fill all required fields.".to_string()));
    };

    let hospital = store
        .find_hospital_by_admin(actor.user_id)
        .await?
        .ok_or_else(|| AppError::Validation("Hospital record not found.".to_string()))?;

    let request = store
        .insert_request(NewOrganRequest {
            hospital_id: hospital.id,
            patient_name,
            required_organ,
            blood_type,
            hla_profile: non_blank(form.hla_profile),
            urgency_level,
        })
        .await?;

    info!(request_id = request.id, hospital_id = hospital.id, "organ request filed");

    // Matched verbatim against donor locations, so only an empty hint is dropped
    let location_hint = form.location.filter(|hint| !hint.is_empty());
    let generation = generate_matches(store, request.id, location_hint.as_deref()).await;

    Ok(CreatedRequest { request, generation })
}

/// Delete one of the caller's requests together with its matches
#[instrument(skip(store), fields(user_id = actor.user_id))]
pub async fn delete_request<S>(
    store: &S,
    actor: &Actor,
    request_id: i64,
) -> Result<DeletedRequest, AppError>
where
    S: MatchStore + ?Sized,
{
    require_role(actor, Role::Hospital)?;

    if store.find_owned_request(request_id, actor.user_id).await?.is_none() {
        return Err(AppError::RequestNotFound(request_id));
    }

    let matches_removed = store.delete_request(request_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::RequestNotFound(request_id),
        other => AppError::Store(other),
    })?;

    info!(request_id, matches_removed, "organ request deleted");
    Ok(DeletedRequest {
        request_id,
        matches_removed,
    })
}

/// Matches visible to the caller, highest score first
///
/// Hospitals see every match; donors see only matches on their own record.
pub async fn list_matches<S>(store: &S, actor: &Actor) -> Result<Vec<MatchListing>, AppError>
where
    S: MatchStore + ?Sized,
{
    let matches = match actor.role {
        Role::Hospital => store.list_all_matches().await?,
        Role::Donor => store.list_matches_for_donor_user(actor.user_id).await?,
    };
    Ok(matches)
}

pub async fn match_board<S>(store: &S, actor: &Actor) -> Result<MatchBoard, AppError>
where
    S: MatchStore + ?Sized,
{
    let matches = list_matches(store, actor).await?;
    let notifications = store.notifications_for(actor.user_id).await?;
    let unread_count = store.unread_count(actor.user_id).await?;

    Ok(MatchBoard {
        matches,
        notifications,
        unread_count,
    })
}
