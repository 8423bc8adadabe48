//! Trip repository implementation

use crate::models::trip::{CreateTripRequest, Trip, TripMember, TripMemberView, UpdateTripRequest};
use crate::utils::errors::SkiAmiError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new trip. The creator becomes an admin member in the same
    /// transaction, so a trip can never exist without an admin.
    pub async fn create(
        &self,
        created_by: Uuid,
        request: CreateTripRequest,
    ) -> Result<Trip, SkiAmiError> {
        let mut tx = self.pool.begin().await?;

        let trip = sqlx::query_as::<_, Trip>(
            r#"
            INSERT INTO trips (name, location, start_date, end_date, image_url, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, name, location, start_date, end_date, image_url, created_by, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.location)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.image_url)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO trip_members (trip_id, profile_id, role, joined_at) VALUES ($1, $2, 'admin', $3)"
        )
        .bind(trip.id)
        .bind(created_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(trip)
    }

    /// Find trip by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>, SkiAmiError> {
        let trip = sqlx::query_as::<_, Trip>(
            "SELECT id, name, location, start_date, end_date, image_url, created_by, created_at, updated_at FROM trips WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(trip)
    }

    /// List trips the profile is a member of, newest first
    pub async fn list_for_member(
        &self,
        profile_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trip>, SkiAmiError> {
        let trips = sqlx::query_as::<_, Trip>(
            r#"
            SELECT t.id, t.name, t.location, t.start_date, t.end_date, t.image_url, t.created_by, t.created_at, t.updated_at
            FROM trips t
            INNER JOIN trip_members tm ON tm.trip_id = t.id
            WHERE tm.profile_id = $1
            ORDER BY t.start_date DESC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(profile_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    /// Update trip
    pub async fn update(&self, id: Uuid, request: UpdateTripRequest) -> Result<Trip, SkiAmiError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET name = COALESCE($2, name),
                location = COALESCE($3, location),
                start_date = COALESCE($4, start_date),
                end_date = COALESCE($5, end_date),
                image_url = COALESCE($6, image_url),
                updated_at = $7
            WHERE id = $1
            RETURNING id, name, location, start_date, end_date, image_url, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request.name)
        .bind(request.location)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.image_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(trip)
    }

    /// Add a member to the trip. Returns `None` when the profile is already
    /// a member.
    pub async fn add_member(
        &self,
        trip_id: Uuid,
        profile_id: Uuid,
        role: &str,
    ) -> Result<Option<TripMember>, SkiAmiError> {
        let member = sqlx::query_as::<_, TripMember>(
            r#"
            INSERT INTO trip_members (trip_id, profile_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (trip_id, profile_id) DO NOTHING
            RETURNING trip_id, profile_id, role, joined_at
            "#,
        )
        .bind(trip_id)
        .bind(profile_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Get trip members with profile display data
    pub async fn get_members(&self, trip_id: Uuid) -> Result<Vec<TripMemberView>, SkiAmiError> {
        let members = sqlx::query_as::<_, TripMemberView>(
            r#"
            SELECT tm.profile_id, tm.role, tm.joined_at, p.username, p.full_name, p.avatar_url
            FROM trip_members tm
            INNER JOIN profiles p ON p.id = tm.profile_id
            WHERE tm.trip_id = $1
            ORDER BY tm.joined_at ASC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Check if profile is member of trip
    pub async fn is_member(&self, trip_id: Uuid, profile_id: Uuid) -> Result<bool, SkiAmiError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trip_members WHERE trip_id = $1 AND profile_id = $2",
        )
        .bind(trip_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Check if profile is an admin of trip
    pub async fn is_admin(&self, trip_id: Uuid, profile_id: Uuid) -> Result<bool, SkiAmiError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trip_members WHERE trip_id = $1 AND profile_id = $2 AND role = 'admin'",
        )
        .bind(trip_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }
}
