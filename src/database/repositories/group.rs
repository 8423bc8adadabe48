//! Group repository implementation

use crate::models::group::{CreateGroupRequest, Group, GroupMember, GroupMemberView, GroupSummary};
use crate::utils::errors::SkiAmiError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new group inside a trip. The creator becomes the group
    /// leader in the same transaction.
    pub async fn create(
        &self,
        trip_id: Uuid,
        created_by: Uuid,
        request: CreateGroupRequest,
    ) -> Result<Group, SkiAmiError> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (trip_id, name, description, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, trip_id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(trip_id)
        .bind(request.name)
        .bind(request.description)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, profile_id, role, joined_at) VALUES ($1, $2, 'leader', $3)"
        )
        .bind(group.id)
        .bind(created_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(group)
    }

    /// Find group by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, SkiAmiError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, trip_id, name, description, created_by, created_at, updated_at FROM groups WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    /// List groups of a trip with member counts
    pub async fn list_by_trip(&self, trip_id: Uuid) -> Result<Vec<GroupSummary>, SkiAmiError> {
        let groups = sqlx::query_as::<_, GroupSummary>(
            r#"
            SELECT g.id, g.trip_id, g.name, g.description, g.created_by, g.created_at, g.updated_at,
                   COUNT(gm.profile_id) AS member_count
            FROM groups g
            LEFT JOIN group_members gm ON gm.group_id = g.id
            WHERE g.trip_id = $1
            GROUP BY g.id
            ORDER BY g.created_at ASC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    /// Add a member to the group. Returns `None` when the profile is
    /// already a member.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        profile_id: Uuid,
        role: &str,
    ) -> Result<Option<GroupMember>, SkiAmiError> {
        let member = sqlx::query_as::<_, GroupMember>(
            r#"
            INSERT INTO group_members (group_id, profile_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, profile_id) DO NOTHING
            RETURNING group_id, profile_id, role, joined_at
            "#,
        )
        .bind(group_id)
        .bind(profile_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Remove member from group. Returns whether a membership row was
    /// actually deleted.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        profile_id: Uuid,
    ) -> Result<bool, SkiAmiError> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND profile_id = $2")
            .bind(group_id)
            .bind(profile_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get group members with profile display data
    pub async fn get_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberView>, SkiAmiError> {
        let members = sqlx::query_as::<_, GroupMemberView>(
            r#"
            SELECT gm.profile_id, gm.role, gm.joined_at, p.username, p.full_name, p.avatar_url
            FROM group_members gm
            INNER JOIN profiles p ON p.id = gm.profile_id
            WHERE gm.group_id = $1
            ORDER BY gm.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Check if profile is member of group
    pub async fn is_member(&self, group_id: Uuid, profile_id: Uuid) -> Result<bool, SkiAmiError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND profile_id = $2",
        )
        .bind(group_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Check if profile is the leader of group
    pub async fn is_leader(&self, group_id: Uuid, profile_id: Uuid) -> Result<bool, SkiAmiError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND profile_id = $2 AND role = 'leader'",
        )
        .bind(group_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }
}
