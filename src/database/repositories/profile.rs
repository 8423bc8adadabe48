//! Profile repository implementation

use crate::models::profile::{Profile, UpdateProfileRequest};
use crate::utils::errors::SkiAmiError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a profile keyed by the identity provider subject. Fields left
    /// out of the request keep their stored value.
    pub async fn upsert(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, SkiAmiError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, username, full_name, phone, address, bio, avatar_url, social_links, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{}'::jsonb), $9, $9)
            ON CONFLICT (id) DO UPDATE
            SET username = COALESCE(EXCLUDED.username, profiles.username),
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                phone = COALESCE(EXCLUDED.phone, profiles.phone),
                address = COALESCE(EXCLUDED.address, profiles.address),
                bio = COALESCE(EXCLUDED.bio, profiles.bio),
                avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                social_links = COALESCE($8, profiles.social_links),
                updated_at = $9
            RETURNING id, username, full_name, phone, address, bio, avatar_url, social_links, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(request.username)
        .bind(request.full_name)
        .bind(request.phone)
        .bind(request.address)
        .bind(request.bio)
        .bind(request.avatar_url)
        .bind(request.social_links)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Find profile by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, SkiAmiError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, username, full_name, phone, address, bio, avatar_url, social_links, created_at, updated_at FROM profiles WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Find profile by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, SkiAmiError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, username, full_name, phone, address, bio, avatar_url, social_links, created_at, updated_at FROM profiles WHERE username = $1"
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Check whether a profile row exists
    pub async fn exists(&self, id: Uuid) -> Result<bool, SkiAmiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }
}
