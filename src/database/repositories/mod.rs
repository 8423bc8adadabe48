//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod group;
pub mod profile;
pub mod transport;
pub mod trip;

// Re-export repositories
pub use group::GroupRepository;
pub use profile::ProfileRepository;
pub use transport::TransportRepository;
pub use trip::TripRepository;
