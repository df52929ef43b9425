//! PostgreSQL adapter for ProfileRepository

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    foundation::{DomainError, Email, ProfileId, Timestamp, UserId},
    profile::{NewProfile, Profile},
};
use crate::ports::{InsertOutcome, ProfileRepository};

const SELECT_COLUMNS: &str =
    "id, user_id::text AS user_id, email, full_name, is_admin, created_at, updated_at";

/// PostgreSQL implementation of ProfileRepository
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a database row to a domain profile
    fn row_to_profile(row: &PgRow) -> Result<Profile, DomainError> {
        let id: Uuid = row.try_get("id").map_err(db_error)?;
        let user_id: String = row.try_get("user_id").map_err(db_error)?;
        let created_at: chrono::DateTime<chrono::Utc> = row.try_get("created_at").map_err(db_error)?;
        let updated_at: chrono::DateTime<chrono::Utc> = row.try_get("updated_at").map_err(db_error)?;

        Ok(Profile {
            id: ProfileId::from_uuid(id),
            user_id: UserId::new(user_id)
                .map_err(|e| DomainError::database(format!("Invalid user ID: {}", e)))?,
            email: row.try_get("email").map_err(db_error)?,
            full_name: row.try_get("full_name").map_err(db_error)?,
            is_admin: row.try_get("is_admin").map_err(db_error)?,
            created_at: Timestamp::from_datetime(created_at),
            updated_at: Timestamp::from_datetime(updated_at),
        })
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Database error: {}", e))
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let sql = format!("SELECT {} FROM profiles WHERE user_id = $1::uuid", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn insert_if_absent(&self, profile: &NewProfile) -> Result<InsertOutcome, DomainError> {
        let sql = format!(
            "INSERT INTO profiles (user_id, email, full_name) VALUES ($1::uuid, $2, $3) \
             ON CONFLICT (user_id) DO NOTHING RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(profile.user_id.as_str())
            .bind(&profile.email)
            .bind(&profile.full_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => Ok(InsertOutcome::Created(Self::row_to_profile(&row)?)),
            None => Ok(InsertOutcome::AlreadyExists),
        }
    }

    async fn admin_flag_by_email(&self, email: &Email) -> Result<Option<bool>, DomainError> {
        let flag: Option<bool> = sqlx::query_scalar(
            "SELECT is_admin FROM profiles WHERE lower(email) = lower($1) ORDER BY created_at ASC LIMIT 1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(flag)
    }

    async fn has_any_admin(&self) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE is_admin)")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}
