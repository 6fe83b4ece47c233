use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Account role chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Hospital,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Hospital => "hospital",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(Role::Donor),
            "hospital" => Ok(Role::Hospital),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// ABO/Rh blood group
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "blood_type")]
pub enum BloodType {
    #[serde(rename = "A+")]
    #[sqlx(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    #[sqlx(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    #[sqlx(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    #[sqlx(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    #[sqlx(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    #[sqlx(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    #[sqlx(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    #[sqlx(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }

    /// Group O donors earn the fallback bonus when the groups differ
    pub fn is_universal_donor(&self) -> bool {
        matches!(self, BloodType::OPositive | BloodType::ONegative)
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|bt| bt.as_str() == wanted)
            .ok_or_else(|| format!("unknown blood type: {}", s))
    }
}

/// Organs a donor can offer and a hospital can request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "organ", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Organ {
    Kidney,
    Liver,
    Heart,
    Lung,
    Pancreas,
    Intestine,
    Cornea,
}

impl Organ {
    pub const ALL: [Organ; 7] = [
        Organ::Kidney,
        Organ::Liver,
        Organ::Heart,
        Organ::Lung,
        Organ::Pancreas,
        Organ::Intestine,
        Organ::Cornea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Organ::Kidney => "kidney",
            Organ::Liver => "liver",
            Organ::Heart => "heart",
            Organ::Lung => "lung",
            Organ::Pancreas => "pancreas",
            Organ::Intestine => "intestine",
            Organ::Cornea => "cornea",
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Organ {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Organ::ALL
            .into_iter()
            .find(|organ| organ.as_str() == wanted)
            .ok_or_else(|| format!("unknown organ: {}", s))
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "availability_status")]
pub enum AvailabilityStatus {
    #[default]
    Active,
    Inactive,
}

/// Ordinal severity of a request; declaration order is the ordering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "urgency_level")]
pub enum UrgencyLevel {
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status")]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status")]
pub enum MatchStatus {
    Proposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind")]
pub enum NotificationKind {
    MatchFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status")]
pub enum NotificationStatus {
    Unread,
    Read,
}

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub consent_given: bool,
    pub created_at: DateTime<Utc>,
}

/// Donor extension of a `donor` user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    pub id: i64,
    pub user_id: i64,
    pub blood_type: BloodType,
    pub organs: BTreeSet<Organ>,
    pub hla_profile: Option<String>,
    pub availability_status: AvailabilityStatus,
    pub location: Option<String>,
}

impl Donor {
    pub fn is_active(&self) -> bool {
        self.availability_status == AvailabilityStatus::Active
    }
}

/// Hospital extension of a `hospital` user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub admin_user_id: i64,
}

/// Organ request filed by a hospital
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganRequest {
    pub id: i64,
    pub hospital_id: i64,
    pub patient_name: String,
    pub required_organ: Organ,
    pub blood_type: BloodType,
    pub hla_profile: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Proposed pairing between a request and a donor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub request_id: i64,
    pub donor_id: i64,
    pub score: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub match_id: Option<i64>,
    pub kind: NotificationKind,
    pub message: String,
    pub status: NotificationStatus,
    pub sent_at: DateTime<Utc>,
}

/// Authenticated caller passed explicitly into every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Active donor joined with its owning user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorListing {
    #[serde(flatten)]
    pub donor: Donor,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Match joined with request and donor details for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListing {
    #[serde(flatten)]
    pub record: Match,
    pub patient_name: String,
    pub required_organ: Organ,
    pub donor_blood_type: BloodType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
}

/// Scored donor that cleared the threshold, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct MatchProposal {
    pub donor_id: i64,
    pub donor_user_id: i64,
    pub score: f64,
    pub message: String,
}

/// Match and notification written for one proposal
#[derive(Debug, Clone)]
pub struct PersistedMatch {
    pub record: Match,
    pub notification: Notification,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub consent_given: bool,
}

/// Donor-editable attributes
#[derive(Debug, Clone)]
pub struct DonorProfile {
    pub blood_type: BloodType,
    pub organs: BTreeSet<Organ>,
    pub hla_profile: Option<String>,
    pub availability_status: AvailabilityStatus,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrganRequest {
    pub hospital_id: i64,
    pub patient_name: String,
    pub required_organ: Organ,
    pub blood_type: BloodType,
    pub hla_profile: Option<String>,
    pub urgency_level: UrgencyLevel,
}

/// Treat blank optional text as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
