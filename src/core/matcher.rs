use crate::core::scoring::{calculate_match_score, MATCH_THRESHOLD};
use crate::models::{Donor, MatchProposal, OrganRequest};

/// Result of scoring one request against a donor pool
#[derive(Debug)]
pub struct ProposalSet {
    pub proposals: Vec<MatchProposal>,
    pub total_candidates: usize,
}

/// Score every donor for a request and keep those at or above the threshold
///
/// This is the pure half of match generation: it never touches storage.
/// Inactive donors are skipped even if the caller passed them in. Output
/// follows input order.
pub fn propose_matches(
    request: &OrganRequest,
    donors: &[Donor],
    location_hint: Option<&str>,
) -> ProposalSet {
    let proposals = donors
        .iter()
        .filter(|donor| donor.is_active())
        .filter_map(|donor| {
            let score = calculate_match_score(request, donor, location_hint);
            tracing::trace!(request_id = request.id, donor_id = donor.id, score, "scored donor");

            if score >= MATCH_THRESHOLD {
                Some(MatchProposal {
                    donor_id: donor.id,
                    donor_user_id: donor.user_id,
                    score,
                    message: notification_message(request.id, score),
                })
            } else {
                None
            }
        })
        .collect();

    ProposalSet {
        proposals,
        total_candidates: donors.len(),
    }
}

/// Message delivered to a donor when a proposal is stored
pub fn notification_message(request_id: i64, score: f64) -> String {
    format!(
        "Potential match for organ request {} with score {:.1}",
        request_id, score
    )
}
