//! SQLite NeedStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::model::{sort_by_urgency, Need, NeedStatus, NewNeed};
use crate::storage::helpers::{self, format_timestamp, parse_enum, parse_timestamp, parse_uuid};
use crate::storage::schema::Needs;
use crate::storage::{NeedStore, Result, StorageError};

use super::camp_store::fetch_camp;
use super::{begin_immediate, finish, insertion_order};

/// SQLite implementation of NeedStore.
pub struct SqliteNeedStore {
    pool: SqlitePool,
}

impl SqliteNeedStore {
    /// Create a new SQLite need store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn need_columns() -> [Needs; 9] {
    [
        Needs::Id,
        Needs::CampId,
        Needs::ItemName,
        Needs::QuantityNeeded,
        Needs::QuantityFulfilled,
        Needs::Urgency,
        Needs::Status,
        Needs::CreatedAt,
        Needs::UpdatedAt,
    ]
}

fn need_from_row(row: &SqliteRow) -> Result<Need> {
    let need = Need {
        id: parse_uuid(row.try_get("id")?)?,
        camp_id: parse_uuid(row.try_get("camp_id")?)?,
        item_name: row.try_get("item_name")?,
        quantity_needed: row.try_get("quantity_needed")?,
        quantity_fulfilled: row.try_get("quantity_fulfilled")?,
        urgency: parse_enum(row.try_get("urgency")?)?,
        status: parse_enum(row.try_get("status")?)?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
    };
    if need.status != NeedStatus::derive(need.quantity_fulfilled, need.quantity_needed) {
        return Err(StorageError::Corrupt(format!(
            "need {} status {} does not match {}/{}",
            need.id, need.status, need.quantity_fulfilled, need.quantity_needed
        )));
    }
    Ok(need)
}

/// Load a need on an open connection.
pub(crate) async fn fetch_need(conn: &mut SqliteConnection, need_id: Uuid) -> Result<Option<Need>> {
    let query = Query::select()
        .columns(need_columns())
        .from(Needs::Table)
        .and_where(Expr::col(Needs::Id).eq(need_id.to_string()))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(need_from_row).transpose()
}

/// Increment `quantity_fulfilled` and recompute `status` on an open write
/// transaction.
///
/// The update is conditioned on the fulfilled quantity that was read, so a
/// writer that slipped in between surfaces as `Contention` instead of being
/// overwritten.
pub(crate) async fn apply_fulfillment_in(
    conn: &mut SqliteConnection,
    need_id: Uuid,
    delta: i64,
) -> Result<Need> {
    let need = fetch_need(conn, need_id)
        .await?
        .ok_or_else(|| StorageError::not_found("need", need_id))?;
    let updated = helpers::fulfill(&need, delta, helpers::now())?;

    let query = Query::update()
        .table(Needs::Table)
        .value(Needs::QuantityFulfilled, updated.quantity_fulfilled)
        .value(Needs::Status, updated.status.as_str())
        .value(Needs::UpdatedAt, format_timestamp(&updated.updated_at))
        .and_where(Expr::col(Needs::Id).eq(need_id.to_string()))
        .and_where(Expr::col(Needs::QuantityFulfilled).eq(need.quantity_fulfilled))
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::Contention(format!(
            "need {} changed while applying fulfillment",
            need_id
        )));
    }
    Ok(updated)
}

#[async_trait]
impl NeedStore for SqliteNeedStore {
    async fn create(&self, need: NewNeed) -> Result<Need> {
        need.validate()?;

        let mut conn = self.pool.acquire().await?;
        if fetch_camp(&mut conn, need.camp_id).await?.is_none() {
            return Err(StorageError::not_found("camp", need.camp_id));
        }

        let now = helpers::now();
        let created = Need {
            id: Uuid::new_v4(),
            camp_id: need.camp_id,
            item_name: need.item_name,
            quantity_needed: need.quantity_needed,
            quantity_fulfilled: 0,
            urgency: need.urgency,
            status: NeedStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let query = Query::insert()
            .into_table(Needs::Table)
            .columns(need_columns())
            .values_panic([
                created.id.to_string().into(),
                created.camp_id.to_string().into(),
                created.item_name.clone().into(),
                created.quantity_needed.into(),
                created.quantity_fulfilled.into(),
                created.urgency.as_str().into(),
                created.status.as_str().into(),
                format_timestamp(&created.created_at).into(),
                format_timestamp(&created.updated_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(created)
    }

    async fn get(&self, need_id: Uuid) -> Result<Option<Need>> {
        let mut conn = self.pool.acquire().await?;
        fetch_need(&mut conn, need_id).await
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Need>> {
        let query = Query::select()
            .columns(need_columns())
            .from(Needs::Table)
            .and_where(Expr::col(Needs::CampId).eq(camp_id.to_string()))
            .order_by(Needs::CreatedAt, Order::Asc)
            .order_by_expr(insertion_order(), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut needs = rows.iter().map(need_from_row).collect::<Result<Vec<_>>>()?;
        sort_by_urgency(&mut needs);
        Ok(needs)
    }

    async fn apply_fulfillment(&self, need_id: Uuid, delta: i64) -> Result<Need> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = apply_fulfillment_in(&mut tx, need_id, delta).await;
        finish(tx, result).await
    }
}
