//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod group;
pub mod profile;
pub mod transport;
pub mod trip;

// Re-export commonly used models
pub use group::{CreateGroupRequest, Group, GroupMember, GroupMemberView, GroupSummary};
pub use profile::{Profile, UpdateProfileRequest};
pub use transport::{
    AssignmentWithProfile, Car, CarAssignment, CarView, CarWithOwner, GroupTransportView,
    OccupantView, RegisterCarRequest, TransportMemberRow, TransportMemberView, TransportProfile,
    UpdateTransportPreferenceRequest,
};
pub use trip::{
    AddTripMemberRequest, CreateTripRequest, Trip, TripMember, TripMemberView, UpdateTripRequest,
};
