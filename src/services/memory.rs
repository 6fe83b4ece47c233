use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use crate::core::{matches_donor_filter, DonorFilter};
use crate::models::{
    Donor, DonorListing, DonorProfile, Hospital, Match, MatchListing, MatchProposal, MatchStatus,
    NewOrganRequest, NewUser, Notification, NotificationKind, NotificationStatus, OrganRequest,
    PersistedMatch, RequestStatus, Role, User,
};
use crate::services::store::{MatchStore, StoreError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    donors: BTreeMap<i64, Donor>,
    hospitals: BTreeMap<i64, Hospital>,
    requests: BTreeMap<i64, OrganRequest>,
    matches: BTreeMap<i64, Match>,
    notifications: BTreeMap<i64, Notification>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn listing(&self, record: &Match, include_donor_name: bool) -> Option<MatchListing> {
        let request = self.requests.get(&record.request_id)?;
        let donor = self.donors.get(&record.donor_id)?;
        let user = self.users.get(&donor.user_id)?;
        Some(MatchListing {
            record: record.clone(),
            patient_name: request.patient_name.clone(),
            required_organ: request.required_organ,
            donor_blood_type: donor.blood_type,
            donor_name: include_donor_name.then(|| user.name.clone()),
        })
    }

    /// Drop a donor and the matches hanging off it
    fn remove_donor(&mut self, donor_id: i64) {
        self.donors.remove(&donor_id);
        let orphaned: Vec<i64> = self
            .matches
            .values()
            .filter(|m| m.donor_id == donor_id)
            .map(|m| m.id)
            .collect();
        self.remove_matches(&orphaned);
    }

    fn remove_matches(&mut self, match_ids: &[i64]) {
        for id in match_ids {
            self.matches.remove(id);
        }
        for notification in self.notifications.values_mut() {
            if notification.match_id.is_some_and(|id| match_ids.contains(&id)) {
                notification.match_id = None;
            }
        }
    }
}

/// In-process match store with the same semantics as the Postgres schema
///
/// Every operation holds one lock for its whole duration, which makes
/// each multi-row write atomic. `set_unavailable(true)` makes every call
/// fail as if the database could not be reached.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Number of stored matches for a request
    pub async fn match_count(&self, request_id: i64) -> usize {
        let tables = self.tables.lock().await;
        tables.matches.values().filter(|m| m.request_id == request_id).count()
    }

    pub async fn notification_count(&self) -> usize {
        self.tables.lock().await.notifications.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_account(&self, user: NewUser) -> Result<User, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }

        let id = tables.allocate_id();
        let created = User {
            id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            consent_given: user.consent_given,
            created_at: Utc::now(),
        };

        if created.role == Role::Hospital {
            let hospital_id = tables.allocate_id();
            tables.hospitals.insert(
                hospital_id,
                Hospital {
                    id: hospital_id,
                    name: format!("{} Hospital", created.name),
                    address: String::new(),
                    contact_email: created.email.clone(),
                    contact_phone: created.phone.clone(),
                    admin_user_id: id,
                },
            );
        }

        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let donor_ids: Vec<i64> = tables
            .donors
            .values()
            .filter(|d| d.user_id == user_id)
            .map(|d| d.id)
            .collect();
        for donor_id in donor_ids {
            tables.remove_donor(donor_id);
        }

        let hospital_ids: Vec<i64> = tables
            .hospitals
            .values()
            .filter(|h| h.admin_user_id == user_id)
            .map(|h| h.id)
            .collect();
        for hospital_id in hospital_ids {
            tables.hospitals.remove(&hospital_id);
            let request_ids: Vec<i64> = tables
                .requests
                .values()
                .filter(|r| r.hospital_id == hospital_id)
                .map(|r| r.id)
                .collect();
            for request_id in request_ids {
                tables.requests.remove(&request_id);
                let match_ids: Vec<i64> = tables
                    .matches
                    .values()
                    .filter(|m| m.request_id == request_id)
                    .map(|m| m.id)
                    .collect();
                tables.remove_matches(&match_ids);
            }
        }

        tables.notifications.retain(|_, n| n.user_id != user_id);
        Ok(true)
    }

    async fn find_donor_by_user(&self, user_id: i64) -> Result<Option<Donor>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.donors.values().find(|d| d.user_id == user_id).cloned())
    }

    async fn upsert_donor(&self, user_id: i64, profile: DonorProfile) -> Result<Donor, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        let existing = tables
            .donors
            .values()
            .find(|d| d.user_id == user_id)
            .map(|d| d.id);
        let id = match existing {
            Some(id) => id,
            None => tables.allocate_id(),
        };

        let donor = Donor {
            id,
            user_id,
            blood_type: profile.blood_type,
            organs: profile.organs,
            hla_profile: profile.hla_profile,
            availability_status: profile.availability_status,
            location: profile.location,
        };
        tables.donors.insert(id, donor.clone());
        Ok(donor)
    }

    async fn deactivate_donor(&self, user_id: i64) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        for donor in tables.donors.values_mut().filter(|d| d.user_id == user_id) {
            donor.availability_status = crate::models::AvailabilityStatus::Inactive;
        }

        let mut cleared = 0;
        for notification in tables
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && n.status == NotificationStatus::Unread)
        {
            notification.status = NotificationStatus::Read;
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<DonorListing>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        Ok(tables
            .donors
            .values()
            .filter(|donor| matches_donor_filter(donor, filter))
            .filter_map(|donor| {
                let user = tables.users.get(&donor.user_id)?;
                Some(DonorListing {
                    donor: donor.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    phone: user.phone.clone(),
                })
            })
            .collect())
    }

    async fn find_hospital_by_admin(&self, user_id: i64) -> Result<Option<Hospital>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .hospitals
            .values()
            .find(|h| h.admin_user_id == user_id)
            .cloned())
    }

    async fn insert_request(&self, request: NewOrganRequest) -> Result<OrganRequest, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if !tables.hospitals.contains_key(&request.hospital_id) {
            return Err(StoreError::NotFound(format!("hospital {}", request.hospital_id)));
        }

        let id = tables.allocate_id();
        let created = OrganRequest {
            id,
            hospital_id: request.hospital_id,
            patient_name: request.patient_name,
            required_organ: request.required_organ,
            blood_type: request.blood_type,
            hla_profile: request.hla_profile,
            urgency_level: request.urgency_level,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        tables.requests.insert(id, created.clone());
        Ok(created)
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<OrganRequest>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.requests.get(&request_id).cloned())
    }

    async fn find_owned_request(
        &self,
        request_id: i64,
        admin_user_id: i64,
    ) -> Result<Option<OrganRequest>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        Ok(tables
            .requests
            .get(&request_id)
            .filter(|r| {
                tables
                    .hospitals
                    .get(&r.hospital_id)
                    .is_some_and(|h| h.admin_user_id == admin_user_id)
            })
            .cloned())
    }

    async fn delete_request(&self, request_id: i64) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if !tables.requests.contains_key(&request_id) {
            return Err(StoreError::NotFound(format!("request {}", request_id)));
        }

        let match_ids: Vec<i64> = tables
            .matches
            .values()
            .filter(|m| m.request_id == request_id)
            .map(|m| m.id)
            .collect();
        tables.remove_matches(&match_ids);
        tables.requests.remove(&request_id);

        Ok(match_ids.len() as u64)
    }

    async fn persist_proposals(
        &self,
        request_id: i64,
        proposals: &[MatchProposal],
    ) -> Result<Vec<PersistedMatch>, StoreError> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().await;

        if !tables.requests.contains_key(&request_id) {
            return Err(StoreError::NotFound(format!("request {}", request_id)));
        }

        // The whole batch is rejected before any write, as the foreign key does in Postgres
        if let Some(missing) = proposals
            .iter()
            .find(|p| !tables.donors.contains_key(&p.donor_id))
        {
            return Err(StoreError::NotFound(format!("donor {}", missing.donor_id)));
        }

        let mut persisted = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let already_matched = tables
                .matches
                .values()
                .any(|m| m.request_id == request_id && m.donor_id == proposal.donor_id);
            if already_matched {
                continue;
            }

            let now = Utc::now();
            let match_id = tables.allocate_id();
            let record = Match {
                id: match_id,
                request_id,
                donor_id: proposal.donor_id,
                score: proposal.score,
                status: MatchStatus::Proposed,
                created_at: now,
            };
            let notification_id = tables.allocate_id();
            let notification = Notification {
                id: notification_id,
                user_id: proposal.donor_user_id,
                match_id: Some(match_id),
                kind: NotificationKind::MatchFound,
                message: proposal.message.clone(),
                status: NotificationStatus::Unread,
                sent_at: now,
            };

            tables.matches.insert(match_id, record.clone());
            tables.notifications.insert(notification_id, notification.clone());
            persisted.push(PersistedMatch { record, notification });
        }

        Ok(persisted)
    }

    async fn list_all_matches(&self) -> Result<Vec<MatchListing>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        let mut listings: Vec<MatchListing> = tables
            .matches
            .values()
            .filter_map(|m| tables.listing(m, true))
            .collect();
        sort_by_score(&mut listings);
        Ok(listings)
    }

    async fn list_matches_for_donor_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MatchListing>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        let mut listings: Vec<MatchListing> = tables
            .matches
            .values()
            .filter(|m| {
                tables
                    .donors
                    .get(&m.donor_id)
                    .is_some_and(|d| d.user_id == user_id)
            })
            .filter_map(|m| tables.listing(m, false))
            .collect();
        sort_by_score(&mut listings);
        Ok(listings)
    }

    async fn notifications_for(&self, user_id: i64) -> Result<Vec<Notification>, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        // Ids grow monotonically, so reverse id order is newest first
        Ok(tables
            .notifications
            .values()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64, StoreError> {
        self.ensure_available()?;
        let tables = self.tables.lock().await;

        Ok(tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && n.status == NotificationStatus::Unread)
            .count() as i64)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}

/// Highest score first; ties keep insertion order
fn sort_by_score(listings: &mut [MatchListing]) {
    listings.sort_by(|a, b| {
        b.record
            .score
            .partial_cmp(&a.record.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityStatus, BloodType, Organ, UrgencyLevel};

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            role,
            consent_given: true,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_account(new_user("a@b.org", Role::Donor)).await.unwrap();

        let err = store
            .create_account(new_user("a@b.org", Role::Hospital))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_hospital_account_creates_hospital() {
        let store = MemoryStore::new();
        let user = store
            .create_account(new_user("admin@mercy.org", Role::Hospital))
            .await
            .unwrap();

        let hospital = store.find_hospital_by_admin(user.id).await.unwrap().unwrap();
        assert_eq!(hospital.name, "Test Hospital");
        assert_eq!(hospital.contact_email, "admin@mercy.org");
        assert_eq!(hospital.address, "");
    }

    #[tokio::test]
    async fn test_repeat_proposals_are_skipped() {
        let store = MemoryStore::new();
        let hospital_user = store
            .create_account(new_user("h@x.org", Role::Hospital))
            .await
            .unwrap();
        let donor_user = store.create_account(new_user("d@x.org", Role::Donor)).await.unwrap();
        let hospital = store.find_hospital_by_admin(hospital_user.id).await.unwrap().unwrap();
        let donor = store
            .upsert_donor(
                donor_user.id,
                DonorProfile {
                    blood_type: BloodType::APositive,
                    organs: [Organ::Kidney].into_iter().collect(),
                    hla_profile: None,
                    availability_status: AvailabilityStatus::Active,
                    location: None,
                },
            )
            .await
            .unwrap();
        let request = store
            .insert_request(NewOrganRequest {
                hospital_id: hospital.id,
                patient_name: "P".to_string(),
                required_organ: Organ::Kidney,
                blood_type: BloodType::APositive,
                hla_profile: None,
                urgency_level: UrgencyLevel::Low,
            })
            .await
            .unwrap();

        let proposal = MatchProposal {
            donor_id: donor.id,
            donor_user_id: donor_user.id,
            score: 80.0,
            message: "m".to_string(),
        };

        let first = store.persist_proposals(request.id, &[proposal.clone()]).await.unwrap();
        let second = store.persist_proposals(request.id, &[proposal]).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(store.match_count(request.id).await, 1);
        assert_eq!(store.notification_count().await, 1);
    }

    #[tokio::test]
    async fn test_vanished_donor_rejects_whole_batch() {
        let store = MemoryStore::new();
        let hospital_user = store
            .create_account(new_user("h@x.org", Role::Hospital))
            .await
            .unwrap();
        let donor_user = store.create_account(new_user("d@x.org", Role::Donor)).await.unwrap();
        let hospital = store.find_hospital_by_admin(hospital_user.id).await.unwrap().unwrap();
        let donor = store
            .upsert_donor(
                donor_user.id,
                DonorProfile {
                    blood_type: BloodType::OPositive,
                    organs: [Organ::Liver].into_iter().collect(),
                    hla_profile: None,
                    availability_status: AvailabilityStatus::Active,
                    location: None,
                },
            )
            .await
            .unwrap();
        let request = store
            .insert_request(NewOrganRequest {
                hospital_id: hospital.id,
                patient_name: "P".to_string(),
                required_organ: Organ::Liver,
                blood_type: BloodType::OPositive,
                hla_profile: None,
                urgency_level: UrgencyLevel::High,
            })
            .await
            .unwrap();

        let proposals = [
            MatchProposal {
                donor_id: donor.id,
                donor_user_id: donor_user.id,
                score: 90.0,
                message: "m".to_string(),
            },
            MatchProposal {
                donor_id: 9_999,
                donor_user_id: 9_999,
                score: 90.0,
                message: "m".to_string(),
            },
        ];

        let err = store.persist_proposals(request.id, &proposals).await.unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_unavailable());
        assert_eq!(store.match_count(request.id).await, 0);
        assert_eq!(store.notification_count().await, 0);
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let err = store.find_user(1).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!store.health_check().await.unwrap());
    }
}
