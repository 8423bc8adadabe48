//! Service layer
//!
//! This module contains the business logic services for SkiAmi:
//! profiles, trips, groups, the carpool allocator, and the Redis cache.

pub mod cache;
pub mod group;
pub mod profile;
pub mod transport;
pub mod trip;

pub use cache::CacheService;
pub use group::GroupService;
pub use profile::ProfileService;
pub use transport::TransportService;
pub use trip::TripService;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and wiring all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub profile_service: ProfileService,
    pub trip_service: TripService,
    pub group_service: GroupService,
    pub transport_service: TransportService,
    pub cache_service: CacheService,
    database: DatabaseService,
}

impl ServiceFactory {
    /// Create a new service factory with all services wired up
    pub fn new(database: DatabaseService, settings: &Settings) -> Result<Self> {
        let cache_service = CacheService::new(settings)?;
        Ok(Self::with_cache(database, cache_service))
    }

    /// Wire services against an explicit cache; lets tests run without Redis
    pub fn with_cache(database: DatabaseService, cache_service: CacheService) -> Self {
        let profile_service = ProfileService::new(database.profiles.clone());
        let trip_service = TripService::new(database.trips.clone(), database.profiles.clone());
        let group_service = GroupService::new(
            database.groups.clone(),
            database.trips.clone(),
            database.transport.clone(),
            cache_service.clone(),
        );
        let transport_service = TransportService::new(
            database.transport.clone(),
            database.groups.clone(),
            cache_service.clone(),
        );

        Self {
            profile_service,
            trip_service,
            group_service,
            transport_service,
            cache_service,
            database,
        }
    }

    /// Check the health of the backing stores
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = self.database.health_check().await.is_ok();
        let cache_healthy = self.cache_service.health_check().await.unwrap_or(false);

        ServiceHealthStatus {
            database_healthy,
            cache_enabled: self.cache_service.is_enabled(),
            cache_healthy,
        }
    }
}

/// Health status of the backing stores
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub cache_enabled: bool,
    pub cache_healthy: bool,
}

impl ServiceHealthStatus {
    /// Check if all required services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy && (!self.cache_enabled || self.cache_healthy)
    }

    /// Get a list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database is unreachable".to_string());
        }
        if self.cache_enabled && !self.cache_healthy {
            issues.push("Redis cache is unreachable".to_string());
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_all_healthy() {
        let status = ServiceHealthStatus {
            database_healthy: true,
            cache_enabled: true,
            cache_healthy: true,
        };
        assert!(status.is_healthy());
        assert!(status.get_issues().is_empty());
    }

    #[test]
    fn test_health_status_ignores_disabled_cache() {
        let status = ServiceHealthStatus {
            database_healthy: true,
            cache_enabled: false,
            cache_healthy: false,
        };
        assert!(status.is_healthy());
        assert!(status.get_issues().is_empty());
    }

    #[test]
    fn test_health_status_reports_issues() {
        let status = ServiceHealthStatus {
            database_healthy: false,
            cache_enabled: true,
            cache_healthy: false,
        };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues().len(), 2);
    }
}
