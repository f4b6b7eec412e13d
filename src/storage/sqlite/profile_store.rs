//! SQLite ProfileStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::model::{NewProfile, Profile};
use crate::storage::helpers::{self, format_timestamp, parse_enum, parse_timestamp, parse_uuid};
use crate::storage::schema::Profiles;
use crate::storage::{ProfileStore, Result, StorageError};

/// SQLite implementation of ProfileStore.
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    /// Create a new SQLite profile store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: parse_uuid(row.try_get("id")?)?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        role: parse_enum(row.try_get("role")?)?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn create(&self, profile: NewProfile) -> Result<Profile> {
        profile.validate()?;
        let created = Profile {
            id: profile.id,
            full_name: profile.full_name,
            phone: profile.phone,
            role: profile.role,
            created_at: helpers::now(),
        };

        let query = Query::insert()
            .into_table(Profiles::Table)
            .columns([
                Profiles::Id,
                Profiles::FullName,
                Profiles::Phone,
                Profiles::Role,
                Profiles::CreatedAt,
            ])
            .values_panic([
                created.id.to_string().into(),
                created.full_name.clone().into(),
                created.phone.clone().into(),
                created.role.as_str().into(),
                format_timestamp(&created.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await.map_err(|e| {
            match StorageError::from(e) {
                StorageError::Duplicate(_) => {
                    StorageError::Duplicate(format!("profile {} already exists", created.id))
                }
                other => other,
            }
        })?;
        Ok(created)
    }

    async fn get(&self, profile_id: Uuid) -> Result<Option<Profile>> {
        let query = Query::select()
            .columns([
                Profiles::Id,
                Profiles::FullName,
                Profiles::Phone,
                Profiles::Role,
                Profiles::CreatedAt,
            ])
            .from(Profiles::Table)
            .and_where(Expr::col(Profiles::Id).eq(profile_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(profile_from_row).transpose()
    }
}
