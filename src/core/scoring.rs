use crate::models::{Donor, OrganRequest, UrgencyLevel};

/// Contribution when request and donor blood groups are identical
pub const BLOOD_EXACT_POINTS: f64 = 50.0;
/// Contribution for a group O donor when the groups differ
pub const BLOOD_UNIVERSAL_POINTS: f64 = 30.0;
pub const ORGAN_POINTS: f64 = 30.0;
pub const HLA_POINTS: f64 = 15.0;
pub const LOCATION_POINTS: f64 = 10.0;
pub const CRITICAL_URGENCY_POINTS: f64 = 20.0;
pub const HIGH_URGENCY_POINTS: f64 = 10.0;

/// Scores are capped here
pub const MAX_SCORE: f64 = 100.0;

/// Minimum score for a proposal to be persisted as a match
pub const MATCH_THRESHOLD: f64 = 40.0;

/// Calculate the compatibility score (0-100) of a donor for a request
///
/// Scoring formula (additive, capped at 100):
/// score = (
///     blood_score +        # 50 exact group, else 30 for an O donor
///     organ_score +        # 30 if the donor offers the required organ
///     hla_score +          # 15 if both HLA profiles are present and equal
///     location_score +     # 10 if the hint is a substring of the donor location
///     urgency_score        # 20 Critical, 10 High
/// )
pub fn calculate_match_score(
    request: &OrganRequest,
    donor: &Donor,
    location_hint: Option<&str>,
) -> f64 {
    let total = blood_score(request, donor)
        + organ_score(request, donor)
        + hla_score(request, donor)
        + location_score(donor, location_hint)
        + urgency_score(request.urgency_level);

    total.min(MAX_SCORE)
}

#[inline]
fn blood_score(request: &OrganRequest, donor: &Donor) -> f64 {
    if request.blood_type == donor.blood_type {
        BLOOD_EXACT_POINTS
    } else if donor.blood_type.is_universal_donor() {
        BLOOD_UNIVERSAL_POINTS
    } else {
        0.0
    }
}

#[inline]
fn organ_score(request: &OrganRequest, donor: &Donor) -> f64 {
    if donor.organs.contains(&request.required_organ) {
        ORGAN_POINTS
    } else {
        0.0
    }
}

#[inline]
fn hla_score(request: &OrganRequest, donor: &Donor) -> f64 {
    match (request.hla_profile.as_deref(), donor.hla_profile.as_deref()) {
        (Some(wanted), Some(offered)) if !wanted.is_empty() && wanted == offered => HLA_POINTS,
        _ => 0.0,
    }
}

#[inline]
fn location_score(donor: &Donor, location_hint: Option<&str>) -> f64 {
    let (Some(hint), Some(location)) = (location_hint, donor.location.as_deref()) else {
        return 0.0;
    };
    if !hint.is_empty() && location.to_lowercase().contains(&hint.to_lowercase()) {
        LOCATION_POINTS
    } else {
        0.0
    }
}

#[inline]
fn urgency_score(urgency: UrgencyLevel) -> f64 {
    match urgency {
        UrgencyLevel::Critical => CRITICAL_URGENCY_POINTS,
        UrgencyLevel::High => HIGH_URGENCY_POINTS,
        UrgencyLevel::Low => 0.0,
    }
}
