//! SQLite CampStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::model::{Camp, CampStatus, NewCamp};
use crate::storage::helpers::{
    self, format_timestamp, parse_enum, parse_timestamp, parse_uuid,
};
use crate::storage::schema::Camps;
use crate::storage::{CampStore, Result, StorageError};

use super::{begin_immediate, finish, insertion_order};

/// SQLite implementation of CampStore.
pub struct SqliteCampStore {
    pool: SqlitePool,
}

impl SqliteCampStore {
    /// Create a new SQLite camp store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn camp_columns() -> [Camps; 13] {
    [
        Camps::Id,
        Camps::AdminId,
        Camps::Name,
        Camps::Location,
        Camps::Latitude,
        Camps::Longitude,
        Camps::TotalCapacity,
        Camps::OccupiedSeats,
        Camps::ContactPhone,
        Camps::ContactEmail,
        Camps::Status,
        Camps::CreatedAt,
        Camps::UpdatedAt,
    ]
}

fn camp_from_row(row: &SqliteRow) -> Result<Camp> {
    Ok(Camp {
        id: parse_uuid(row.try_get("id")?)?,
        admin_id: parse_uuid(row.try_get("admin_id")?)?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        total_capacity: row.try_get("total_capacity")?,
        occupied_seats: row.try_get("occupied_seats")?,
        contact_phone: row.try_get("contact_phone")?,
        contact_email: row.try_get("contact_email")?,
        status: parse_enum(row.try_get("status")?)?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
    })
}

/// Load a camp on an open connection.
pub(crate) async fn fetch_camp(conn: &mut SqliteConnection, camp_id: Uuid) -> Result<Option<Camp>> {
    let query = Query::select()
        .columns(camp_columns())
        .from(Camps::Table)
        .and_where(Expr::col(Camps::Id).eq(camp_id.to_string()))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(camp_from_row).transpose()
}

/// Write occupancy and status, conditioned on the occupancy that was read.
async fn write_occupancy(conn: &mut SqliteConnection, before: &Camp, after: &Camp) -> Result<()> {
    let query = Query::update()
        .table(Camps::Table)
        .value(Camps::OccupiedSeats, after.occupied_seats)
        .value(Camps::Status, after.status.as_str())
        .value(Camps::UpdatedAt, format_timestamp(&after.updated_at))
        .and_where(Expr::col(Camps::Id).eq(before.id.to_string()))
        .and_where(Expr::col(Camps::OccupiedSeats).eq(before.occupied_seats))
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::Contention(format!(
            "camp {} changed while updating seats",
            before.id
        )));
    }
    Ok(())
}

/// Occupy one seat on an open write transaction.
pub(crate) async fn occupy_seat_in(conn: &mut SqliteConnection, camp_id: Uuid) -> Result<Camp> {
    let camp = fetch_camp(conn, camp_id)
        .await?
        .ok_or_else(|| StorageError::not_found("camp", camp_id))?;
    let updated = helpers::occupy_seat(&camp, helpers::now())?;
    write_occupancy(conn, &camp, &updated).await?;
    debug!(%camp_id, occupied = updated.occupied_seats, "seat reserved");
    Ok(updated)
}

/// Free one seat on an open write transaction.
pub(crate) async fn free_seat_in(conn: &mut SqliteConnection, camp_id: Uuid) -> Result<Camp> {
    let camp = fetch_camp(conn, camp_id)
        .await?
        .ok_or_else(|| StorageError::not_found("camp", camp_id))?;
    let updated = helpers::free_seat(&camp, helpers::now())?;
    write_occupancy(conn, &camp, &updated).await?;
    debug!(%camp_id, occupied = updated.occupied_seats, "seat released");
    Ok(updated)
}

#[async_trait]
impl CampStore for SqliteCampStore {
    async fn create(&self, camp: NewCamp) -> Result<Camp> {
        camp.validate()?;
        let now = helpers::now();
        let created = Camp {
            id: Uuid::new_v4(),
            admin_id: camp.admin_id,
            name: camp.name,
            location: camp.location,
            latitude: camp.latitude,
            longitude: camp.longitude,
            total_capacity: camp.total_capacity,
            occupied_seats: 0,
            contact_phone: camp.contact_phone,
            contact_email: camp.contact_email,
            status: if camp.total_capacity == 0 {
                CampStatus::Full
            } else {
                CampStatus::Active
            },
            created_at: now,
            updated_at: now,
        };

        let query = Query::insert()
            .into_table(Camps::Table)
            .columns(camp_columns())
            .values_panic([
                created.id.to_string().into(),
                created.admin_id.to_string().into(),
                created.name.clone().into(),
                created.location.clone().into(),
                created.latitude.into(),
                created.longitude.into(),
                created.total_capacity.into(),
                created.occupied_seats.into(),
                created.contact_phone.clone().into(),
                created.contact_email.clone().into(),
                created.status.as_str().into(),
                format_timestamp(&created.created_at).into(),
                format_timestamp(&created.updated_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(created)
    }

    async fn get(&self, camp_id: Uuid) -> Result<Option<Camp>> {
        let mut conn = self.pool.acquire().await?;
        fetch_camp(&mut conn, camp_id).await
    }

    async fn list(&self) -> Result<Vec<Camp>> {
        let query = Query::select()
            .columns(camp_columns())
            .from(Camps::Table)
            .order_by(Camps::Name, Order::Asc)
            .order_by(Camps::CreatedAt, Order::Asc)
            .order_by_expr(insertion_order(), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(camp_from_row).collect()
    }

    async fn list_by_admin(&self, admin_id: Uuid) -> Result<Vec<Camp>> {
        let query = Query::select()
            .columns(camp_columns())
            .from(Camps::Table)
            .and_where(Expr::col(Camps::AdminId).eq(admin_id.to_string()))
            .order_by(Camps::CreatedAt, Order::Asc)
            .order_by_expr(insertion_order(), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(camp_from_row).collect()
    }

    async fn update_status(&self, camp_id: Uuid, status: CampStatus) -> Result<Camp> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result: Result<Camp> = async {
            let camp = fetch_camp(&mut tx, camp_id)
                .await?
                .ok_or_else(|| StorageError::not_found("camp", camp_id))?;
            let updated = helpers::set_camp_status(&camp, status, helpers::now())?;

            let query = Query::update()
                .table(Camps::Table)
                .value(Camps::Status, updated.status.as_str())
                .value(Camps::UpdatedAt, format_timestamp(&updated.updated_at))
                .and_where(Expr::col(Camps::Id).eq(camp_id.to_string()))
                .to_string(SqliteQueryBuilder);
            sqlx::query(&query).execute(&mut *tx).await?;
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }

    async fn delete(&self, camp_id: Uuid) -> Result<()> {
        let query = Query::delete()
            .from_table(Camps::Table)
            .and_where(Expr::col(Camps::Id).eq(camp_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("camp", camp_id));
        }
        Ok(())
    }

    async fn reserve_seat(&self, camp_id: Uuid) -> Result<Camp> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = occupy_seat_in(&mut tx, camp_id).await;
        finish(tx, result).await
    }

    async fn release_seat(&self, camp_id: Uuid) -> Result<Camp> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = free_seat_in(&mut tx, camp_id).await;
        finish(tx, result).await
    }
}
