// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Actor, AvailabilityStatus, BloodType, Donor, DonorListing, DonorProfile, Hospital, Match,
    MatchListing, MatchProposal, MatchStatus, NewOrganRequest, NewUser, Notification,
    NotificationKind, NotificationStatus, Organ, OrganRequest, PersistedMatch, RequestStatus,
    Role, UrgencyLevel, User,
};
pub use requests::{
    CreateOrganRequest, DonorProfileRequest, DonorSearchQuery, LoginRequest, RegisterRequest,
};
pub use responses::{
    DeactivateResponse, ErrorResponse, HealthResponse, LoginResponse, RegisterResponse,
};
