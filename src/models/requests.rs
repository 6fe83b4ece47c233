use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::core::DonorFilter;
use crate::models::domain::{non_blank, AvailabilityStatus, BloodType, Organ, UrgencyLevel};

/// Account registration form
///
/// Text fields default to empty so a missing field surfaces as a
/// validation message rather than a JSON decoding error.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email."))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub consent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

/// Donor profile create-or-update form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonorProfileRequest {
    pub blood_type: Option<BloodType>,
    #[serde(default)]
    pub organs: Vec<Organ>,
    #[serde(default)]
    pub hla_profile: Option<String>,
    #[serde(default)]
    pub availability_status: Option<AvailabilityStatus>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Organ request form filed by a hospital
///
/// `location` is not stored on the request; it is the hint handed to
/// match generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrganRequest {
    #[serde(default)]
    pub patient_name: String,
    pub required_organ: Option<Organ>,
    pub blood_type: Option<BloodType>,
    #[serde(default)]
    pub hla_profile: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Query string for the donor directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonorSearchQuery {
    pub organ: Option<Organ>,
    pub location: Option<String>,
}

impl From<DonorSearchQuery> for DonorFilter {
    fn from(query: DonorSearchQuery) -> Self {
        DonorFilter {
            organ: query.organ,
            location: non_blank(query.location),
        }
    }
}
