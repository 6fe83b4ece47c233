use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;
use crate::core::DonorFilter;
use crate::models::{
    Donor, DonorListing, DonorProfile, Hospital, Match, MatchListing, MatchProposal,
    NewOrganRequest, NewUser, Notification, NotificationKind, Organ, OrganRequest,
    PersistedMatch, Role, User,
};
use crate::services::store::{MatchStore, StoreError};

const USER_COLUMNS: &str =
    "user_id, name, email, phone, password_hash, role, consent_given, created_at";
const DONOR_COLUMNS: &str =
    "d.donor_id, d.user_id, d.blood_type, d.organs, d.hla_profile, d.availability_status, d.location";
const REQUEST_COLUMNS: &str = "request_id, hospital_id, patient_name, required_organ, blood_type, \
     hla_profile, urgency_level, status, created_at";
const NOTIFICATION_COLUMNS: &str = "notif_id, user_id, match_id, kind, message, status, sent_at";

/// PostgreSQL-backed match store
///
/// Schema lives in `migrations/` and is applied on connect. Foreign keys
/// cascade so deleting a user or request never leaves orphaned matches.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn list_matches(&self, donor_user_id: Option<i64>) -> Result<Vec<MatchListing>, StoreError> {
        // Donor viewers never see other donors' names
        let query = match donor_user_id {
            None => r#"
                SELECT m.match_id, m.request_id, m.donor_id, m.score, m.status, m.created_at,
                       r.patient_name, r.required_organ, d.blood_type AS donor_blood_type,
                       u.name AS donor_name
                FROM matches m
                JOIN requests r ON m.request_id = r.request_id
                JOIN donors d ON m.donor_id = d.donor_id
                JOIN users u ON d.user_id = u.user_id
                ORDER BY m.score DESC, m.match_id
            "#,
            Some(_) => r#"
                SELECT m.match_id, m.request_id, m.donor_id, m.score, m.status, m.created_at,
                       r.patient_name, r.required_organ, d.blood_type AS donor_blood_type,
                       NULL::TEXT AS donor_name
                FROM matches m
                JOIN donors d ON m.donor_id = d.donor_id
                JOIN users u ON d.user_id = u.user_id
                JOIN requests r ON m.request_id = r.request_id
                WHERE u.user_id = $1
                ORDER BY m.score DESC, m.match_id
            "#,
        };

        let mut q = sqlx::query(query);
        if let Some(user_id) = donor_user_id {
            q = q.bind(user_id);
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<MatchListing, StoreError> {
                Ok(MatchListing {
                    record: match_from_row(row)?,
                    patient_name: row.try_get("patient_name")?,
                    required_organ: row.try_get("required_organ")?,
                    donor_blood_type: row.try_get("donor_blood_type")?,
                    donor_name: row.try_get("donor_name")?,
                })
            })
            .collect()
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get("role")?,
        consent_given: row.try_get("consent_given")?,
        created_at: row.try_get("created_at")?,
    })
}

fn donor_from_row(row: &PgRow) -> Result<Donor, sqlx::Error> {
    let organs: Vec<Organ> = row.try_get("organs")?;
    Ok(Donor {
        id: row.try_get("donor_id")?,
        user_id: row.try_get("user_id")?,
        blood_type: row.try_get("blood_type")?,
        organs: organs.into_iter().collect::<BTreeSet<_>>(),
        hla_profile: row.try_get("hla_profile")?,
        availability_status: row.try_get("availability_status")?,
        location: row.try_get("location")?,
    })
}

fn hospital_from_row(row: &PgRow) -> Result<Hospital, sqlx::Error> {
    Ok(Hospital {
        id: row.try_get("hospital_id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        admin_user_id: row.try_get("admin_user_id")?,
    })
}

fn request_from_row(row: &PgRow) -> Result<OrganRequest, sqlx::Error> {
    Ok(OrganRequest {
        id: row.try_get("request_id")?,
        hospital_id: row.try_get("hospital_id")?,
        patient_name: row.try_get("patient_name")?,
        required_organ: row.try_get("required_organ")?,
        blood_type: row.try_get("blood_type")?,
        hla_profile: row.try_get("hla_profile")?,
        urgency_level: row.try_get("urgency_level")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, sqlx::Error> {
    Ok(Match {
        id: row.try_get("match_id")?,
        request_id: row.try_get("request_id")?,
        donor_id: row.try_get("donor_id")?,
        score: row.try_get("score")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, sqlx::Error> {
    Ok(Notification {
        id: row.try_get("notif_id")?,
        user_id: row.try_get("user_id")?,
        match_id: row.try_get("match_id")?,
        kind: row.try_get("kind")?,
        message: row.try_get("message")?,
        status: row.try_get("status")?,
        sent_at: row.try_get("sent_at")?,
    })
}

fn is_email_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|c| c == "users_email_key")
}

/// A donor or request removed since the proposals were scored
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[async_trait]
impl MatchStore for PostgresClient {
    async fn create_account(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO users (name, email, phone, password_hash, role, consent_given) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.consent_given)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_email_conflict(&e) {
                    StoreError::Conflict(format!("email already registered: {}", user.email))
                } else {
                    StoreError::from(e)
                }
            })?;
        let created = user_from_row(&row)?;

        if created.role == Role::Hospital {
            sqlx::query(
                r#"
                INSERT INTO hospitals (name, address, contact_email, contact_phone, admin_user_id)
                VALUES ($1, '', $2, $3, $4)
                "#,
            )
            .bind(format!("{} Hospital", created.name))
            .bind(&created.email)
            .bind(&created.phone)
            .bind(created.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(user_id = created.id, role = %created.role, "account created");
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&query).bind(email).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let row = sqlx::query(&query).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_donor_by_user(&self, user_id: i64) -> Result<Option<Donor>, StoreError> {
        let query = format!("SELECT {} FROM donors d WHERE d.user_id = $1", DONOR_COLUMNS);
        let row = sqlx::query(&query).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(donor_from_row).transpose()?)
    }

    async fn upsert_donor(&self, user_id: i64, profile: DonorProfile) -> Result<Donor, StoreError> {
        let query = r#"
            INSERT INTO donors AS d (user_id, blood_type, organs, hla_profile, availability_status, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id)
            DO UPDATE SET
                blood_type = EXCLUDED.blood_type,
                organs = EXCLUDED.organs,
                hla_profile = EXCLUDED.hla_profile,
                availability_status = EXCLUDED.availability_status,
                location = EXCLUDED.location
            RETURNING d.donor_id, d.user_id, d.blood_type, d.organs, d.hla_profile,
                      d.availability_status, d.location
        "#;

        let organs: Vec<Organ> = profile.organs.iter().copied().collect();
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(profile.blood_type)
            .bind(organs)
            .bind(&profile.hla_profile)
            .bind(profile.availability_status)
            .bind(&profile.location)
            .fetch_one(&self.pool)
            .await?;

        Ok(donor_from_row(&row)?)
    }

    async fn deactivate_donor(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE donors SET availability_status = 'Inactive' WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let cleared = sqlx::query(
            "UPDATE notifications SET status = 'Read' WHERE user_id = $1 AND status = 'Unread'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cleared.rows_affected())
    }

    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<DonorListing>, StoreError> {
        let query = format!(
            r#"
            SELECT {}, u.name, u.email, u.phone
            FROM donors d
            JOIN users u ON d.user_id = u.user_id
            WHERE d.availability_status = 'Active'
              AND ($1::organ IS NULL OR $1 = ANY(d.organs))
              AND ($2::TEXT IS NULL OR strpos(lower(coalesce(d.location, '')), lower($2)) > 0)
            ORDER BY d.donor_id
            "#,
            DONOR_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(filter.organ)
            .bind(&filter.location)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<DonorListing, StoreError> {
                Ok(DonorListing {
                    donor: donor_from_row(row)?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    phone: row.try_get("phone")?,
                })
            })
            .collect()
    }

    async fn find_hospital_by_admin(&self, user_id: i64) -> Result<Option<Hospital>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT hospital_id, name, address, contact_email, contact_phone, admin_user_id
            FROM hospitals
            WHERE admin_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(hospital_from_row).transpose()?)
    }

    async fn insert_request(&self, request: NewOrganRequest) -> Result<OrganRequest, StoreError> {
        let query = format!(
            "INSERT INTO requests (hospital_id, patient_name, required_organ, blood_type, \
             hla_profile, urgency_level, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'Pending') RETURNING {}",
            REQUEST_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(request.hospital_id)
            .bind(&request.patient_name)
            .bind(request.required_organ)
            .bind(request.blood_type)
            .bind(&request.hla_profile)
            .bind(request.urgency_level)
            .fetch_one(&self.pool)
            .await?;

        Ok(request_from_row(&row)?)
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<OrganRequest>, StoreError> {
        let query = format!("SELECT {} FROM requests WHERE request_id = $1", REQUEST_COLUMNS);
        let row = sqlx::query(&query).bind(request_id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(request_from_row).transpose()?)
    }

    async fn find_owned_request(
        &self,
        request_id: i64,
        admin_user_id: i64,
    ) -> Result<Option<OrganRequest>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT r.request_id, r.hospital_id, r.patient_name, r.required_organ, r.blood_type,
                   r.hla_profile, r.urgency_level, r.status, r.created_at
            FROM requests r
            JOIN hospitals h ON r.hospital_id = h.hospital_id
            WHERE r.request_id = $1 AND h.admin_user_id = $2
            "#,
        )
        .bind(request_id)
        .bind(admin_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(request_from_row).transpose()?)
    }

    async fn delete_request(&self, request_id: i64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let matches = sqlx::query("DELETE FROM matches WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        let request = sqlx::query("DELETE FROM requests WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        if request.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("request {}", request_id)));
        }

        tx.commit().await?;

        Ok(matches.rows_affected())
    }

    async fn persist_proposals(
        &self,
        request_id: i64,
        proposals: &[MatchProposal],
    ) -> Result<Vec<PersistedMatch>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut persisted = Vec::with_capacity(proposals.len());

        let notification_query = format!(
            "INSERT INTO notifications (user_id, match_id, kind, message) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        for proposal in proposals {
            let row = sqlx::query(
                r#"
                INSERT INTO matches (request_id, donor_id, score, status)
                VALUES ($1, $2, $3, 'Proposed')
                ON CONFLICT (request_id, donor_id) DO NOTHING
                RETURNING match_id, request_id, donor_id, score, status, created_at
                "#,
            )
            .bind(request_id)
            .bind(proposal.donor_id)
            .bind(proposal.score)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::NotFound(format!("donor {} for request {}", proposal.donor_id, request_id))
                } else {
                    StoreError::from(e)
                }
            })?;

            // Already proposed by an earlier run
            let Some(row) = row else {
                continue;
            };
            let record = match_from_row(&row)?;

            let row = sqlx::query(&notification_query)
                .bind(proposal.donor_user_id)
                .bind(record.id)
                .bind(NotificationKind::MatchFound)
                .bind(&proposal.message)
                .fetch_one(&mut *tx)
                .await?;

            persisted.push(PersistedMatch {
                record,
                notification: notification_from_row(&row)?,
            });
        }

        tx.commit().await?;

        Ok(persisted)
    }

    async fn list_all_matches(&self) -> Result<Vec<MatchListing>, StoreError> {
        self.list_matches(None).await
    }

    async fn list_matches_for_donor_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MatchListing>, StoreError> {
        self.list_matches(Some(user_id)).await
    }

    async fn notifications_for(&self, user_id: i64) -> Result<Vec<Notification>, StoreError> {
        let query = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY sent_at DESC, notif_id DESC",
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(notification_from_row).collect::<Result<_, _>>()?)
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unread_count FROM notifications WHERE user_id = $1 AND status = 'Unread'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("unread_count")?)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
