use serde::{Deserialize, Serialize};
use crate::models::{Donor, Organ};

/// Donor directory filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorFilter {
    pub organ: Option<Organ>,
    pub location: Option<String>,
}

/// Check if a donor belongs in the directory for the given filter
///
/// Only active donors are listed. Organ and location constraints apply
/// only when present; location is a case-insensitive substring test.
#[inline]
pub fn matches_donor_filter(donor: &Donor, filter: &DonorFilter) -> bool {
    if !donor.is_active() {
        return false;
    }

    if let Some(organ) = filter.organ {
        if !donor.organs.contains(&organ) {
            return false;
        }
    }

    match filter.location.as_deref() {
        Some(wanted) if !wanted.trim().is_empty() => donor
            .location
            .as_deref()
            .is_some_and(|location| location.to_lowercase().contains(&wanted.to_lowercase())),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityStatus, BloodType};

    fn create_test_donor(organs: &[Organ], location: Option<&str>) -> Donor {
        Donor {
            id: 1,
            user_id: 1,
            blood_type: BloodType::OPositive,
            organs: organs.iter().copied().collect(),
            hla_profile: None,
            availability_status: AvailabilityStatus::Active,
            location: location.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_filter_lists_active_donor() {
        let donor = create_test_donor(&[Organ::Kidney], None);
        assert!(matches_donor_filter(&donor, &DonorFilter::default()));
    }

    #[test]
    fn test_inactive_donor_filtered() {
        let mut donor = create_test_donor(&[Organ::Kidney], None);
        donor.availability_status = AvailabilityStatus::Inactive;
        assert!(!matches_donor_filter(&donor, &DonorFilter::default()));
    }

    #[test]
    fn test_organ_filter() {
        let donor = create_test_donor(&[Organ::Kidney, Organ::Liver], None);
        let wants_liver = DonorFilter { organ: Some(Organ::Liver), location: None };
        let wants_heart = DonorFilter { organ: Some(Organ::Heart), location: None };

        assert!(matches_donor_filter(&donor, &wants_liver));
        assert!(!matches_donor_filter(&donor, &wants_heart));
    }

    #[test]
    fn test_location_filter() {
        let donor = create_test_donor(&[Organ::Kidney], Some("Cambridge, MA"));
        let near = DonorFilter { organ: None, location: Some("cambridge".to_string()) };
        let far = DonorFilter { organ: None, location: Some("Denver".to_string()) };

        assert!(matches_donor_filter(&donor, &near));
        assert!(!matches_donor_filter(&donor, &far));

        let nowhere = create_test_donor(&[Organ::Kidney], None);
        assert!(!matches_donor_filter(&nowhere, &near));
    }
}
