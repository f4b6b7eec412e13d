//! SQLite VolunteerStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::model::{NewVolunteerRegistration, VolunteerRegistration};
use crate::storage::helpers::{self, format_timestamp, parse_timestamp, parse_uuid};
use crate::storage::schema::Volunteers;
use crate::storage::{Result, StorageError, VolunteerStore};

use super::camp_store::{free_seat_in, occupy_seat_in};
use super::{begin_immediate, finish, insertion_order};

/// SQLite implementation of VolunteerStore.
pub struct SqliteVolunteerStore {
    pool: SqlitePool,
}

impl SqliteVolunteerStore {
    /// Create a new SQLite volunteer store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, column: Volunteers, id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        let query = Query::select()
            .columns(registration_columns())
            .from(Volunteers::Table)
            .and_where(Expr::col(column).eq(id.to_string()))
            .order_by(Volunteers::CreatedAt, Order::Asc)
            .order_by_expr(insertion_order(), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(registration_from_row).collect()
    }
}

fn registration_columns() -> [Volunteers; 5] {
    [
        Volunteers::Id,
        Volunteers::UserId,
        Volunteers::CampId,
        Volunteers::VolunteerType,
        Volunteers::CreatedAt,
    ]
}

fn registration_from_row(row: &SqliteRow) -> Result<VolunteerRegistration> {
    Ok(VolunteerRegistration {
        id: parse_uuid(row.try_get("id")?)?,
        user_id: parse_uuid(row.try_get("user_id")?)?,
        camp_id: parse_uuid(row.try_get("camp_id")?)?,
        volunteer_type: row.try_get("volunteer_type")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

async fn fetch_registration(
    conn: &mut SqliteConnection,
    registration_id: Uuid,
) -> Result<Option<VolunteerRegistration>> {
    let query = Query::select()
        .columns(registration_columns())
        .from(Volunteers::Table)
        .and_where(Expr::col(Volunteers::Id).eq(registration_id.to_string()))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(registration_from_row).transpose()
}

async fn register_in(
    conn: &mut SqliteConnection,
    registration: NewVolunteerRegistration,
) -> Result<VolunteerRegistration> {
    let existing = Query::select()
        .column(Volunteers::Id)
        .from(Volunteers::Table)
        .and_where(Expr::col(Volunteers::UserId).eq(registration.user_id.to_string()))
        .and_where(Expr::col(Volunteers::CampId).eq(registration.camp_id.to_string()))
        .and_where(Expr::col(Volunteers::VolunteerType).eq(registration.volunteer_type.clone()))
        .to_string(SqliteQueryBuilder);
    if sqlx::query(&existing)
        .fetch_optional(&mut *conn)
        .await?
        .is_some()
    {
        return Err(StorageError::Duplicate(format!(
            "user {} already registered at camp {} as {}",
            registration.user_id, registration.camp_id, registration.volunteer_type
        )));
    }

    occupy_seat_in(conn, registration.camp_id).await?;

    let created = VolunteerRegistration {
        id: Uuid::new_v4(),
        user_id: registration.user_id,
        camp_id: registration.camp_id,
        volunteer_type: registration.volunteer_type,
        created_at: helpers::now(),
    };
    let query = Query::insert()
        .into_table(Volunteers::Table)
        .columns(registration_columns())
        .values_panic([
            created.id.to_string().into(),
            created.user_id.to_string().into(),
            created.camp_id.to_string().into(),
            created.volunteer_type.clone().into(),
            format_timestamp(&created.created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);
    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(created)
}

async fn withdraw_in(
    conn: &mut SqliteConnection,
    registration_id: Uuid,
) -> Result<VolunteerRegistration> {
    let registration = fetch_registration(conn, registration_id)
        .await?
        .ok_or_else(|| StorageError::not_found("volunteer registration", registration_id))?;

    let query = Query::delete()
        .from_table(Volunteers::Table)
        .and_where(Expr::col(Volunteers::Id).eq(registration_id.to_string()))
        .to_string(SqliteQueryBuilder);
    sqlx::query(&query).execute(&mut *conn).await?;

    free_seat_in(conn, registration.camp_id).await?;
    Ok(registration)
}

#[async_trait]
impl VolunteerStore for SqliteVolunteerStore {
    async fn register(
        &self,
        registration: NewVolunteerRegistration,
    ) -> Result<VolunteerRegistration> {
        registration.validate()?;
        let mut tx = begin_immediate(&self.pool).await?;
        let result = register_in(&mut tx, registration).await;
        let created = finish(tx, result).await?;
        info!(
            registration_id = %created.id,
            camp_id = %created.camp_id,
            "volunteer registered"
        );
        Ok(created)
    }

    async fn get(&self, registration_id: Uuid) -> Result<Option<VolunteerRegistration>> {
        let mut conn = self.pool.acquire().await?;
        fetch_registration(&mut conn, registration_id).await
    }

    async fn withdraw(&self, registration_id: Uuid) -> Result<VolunteerRegistration> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = withdraw_in(&mut tx, registration_id).await;
        let removed = finish(tx, result).await?;
        info!(%registration_id, camp_id = %removed.camp_id, "volunteer withdrawn");
        Ok(removed)
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        self.list_where(Volunteers::CampId, camp_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        self.list_where(Volunteers::UserId, user_id).await
    }
}
