//! SQLite AssistanceLedger implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::model::{Assistance, DeliveryStatus, NewAssistance};
use crate::storage::helpers::{self, format_timestamp, parse_enum, parse_timestamp, parse_uuid};
use crate::storage::schema::AssistanceEntries;
use crate::storage::{AssistanceLedger, Result, StorageError};

use super::{begin_immediate, finish, insertion_order};

/// SQLite implementation of AssistanceLedger.
pub struct SqliteAssistanceLedger {
    pool: SqlitePool,
}

impl SqliteAssistanceLedger {
    /// Create a new SQLite assistance ledger.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, column: AssistanceEntries, id: Uuid) -> Result<Vec<Assistance>> {
        let query = Query::select()
            .columns(entry_columns())
            .from(AssistanceEntries::Table)
            .and_where(Expr::col(column).eq(id.to_string()))
            .order_by(AssistanceEntries::CreatedAt, Order::Desc)
            .order_by_expr(insertion_order(), Order::Desc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_columns() -> [AssistanceEntries; 9] {
    [
        AssistanceEntries::Id,
        AssistanceEntries::NgoId,
        AssistanceEntries::CampId,
        AssistanceEntries::NeedId,
        AssistanceEntries::ItemsProvided,
        AssistanceEntries::Quantity,
        AssistanceEntries::DeliveryStatus,
        AssistanceEntries::Notes,
        AssistanceEntries::CreatedAt,
    ]
}

fn entry_from_row(row: &SqliteRow) -> Result<Assistance> {
    let need_id: Option<&str> = row.try_get("need_id")?;
    Ok(Assistance {
        id: parse_uuid(row.try_get("id")?)?,
        ngo_id: parse_uuid(row.try_get("ngo_id")?)?,
        camp_id: parse_uuid(row.try_get("camp_id")?)?,
        need_id: need_id.map(parse_uuid).transpose()?,
        items_provided: row.try_get("items_provided")?,
        quantity: row.try_get("quantity")?,
        delivery_status: parse_enum(row.try_get("delivery_status")?)?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

/// Load a ledger entry on an open connection.
pub(crate) async fn fetch_entry(
    conn: &mut SqliteConnection,
    entry_id: Uuid,
) -> Result<Option<Assistance>> {
    let query = Query::select()
        .columns(entry_columns())
        .from(AssistanceEntries::Table)
        .and_where(Expr::col(AssistanceEntries::Id).eq(entry_id.to_string()))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(entry_from_row).transpose()
}

/// Append a ledger entry on an open connection.
pub(crate) async fn insert_entry_in(
    conn: &mut SqliteConnection,
    entry: NewAssistance,
) -> Result<Assistance> {
    entry.validate()?;
    let created = Assistance {
        id: Uuid::new_v4(),
        ngo_id: entry.ngo_id,
        camp_id: entry.camp_id,
        need_id: entry.need_id,
        items_provided: entry.items_provided,
        quantity: entry.quantity,
        delivery_status: DeliveryStatus::Pledged,
        notes: entry.notes,
        created_at: helpers::now(),
    };

    let query = Query::insert()
        .into_table(AssistanceEntries::Table)
        .columns(entry_columns())
        .values_panic([
            created.id.to_string().into(),
            created.ngo_id.to_string().into(),
            created.camp_id.to_string().into(),
            created.need_id.map(|id| id.to_string()).into(),
            created.items_provided.clone().into(),
            created.quantity.into(),
            created.delivery_status.as_str().into(),
            created.notes.clone().into(),
            format_timestamp(&created.created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(created)
}

#[async_trait]
impl AssistanceLedger for SqliteAssistanceLedger {
    async fn record(&self, entry: NewAssistance) -> Result<Assistance> {
        let mut conn = self.pool.acquire().await?;
        insert_entry_in(&mut conn, entry).await
    }

    async fn get(&self, entry_id: Uuid) -> Result<Option<Assistance>> {
        let mut conn = self.pool.acquire().await?;
        fetch_entry(&mut conn, entry_id).await
    }

    async fn list_by_need(&self, need_id: Uuid) -> Result<Vec<Assistance>> {
        self.list_where(AssistanceEntries::NeedId, need_id).await
    }

    async fn list_by_ngo(&self, ngo_id: Uuid) -> Result<Vec<Assistance>> {
        self.list_where(AssistanceEntries::NgoId, ngo_id).await
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Assistance>> {
        self.list_where(AssistanceEntries::CampId, camp_id).await
    }

    async fn advance_delivery_status(
        &self,
        entry_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<Assistance> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result: Result<Assistance> = async {
            let entry = fetch_entry(&mut tx, entry_id)
                .await?
                .ok_or_else(|| StorageError::not_found("assistance", entry_id))?;
            let updated = helpers::advance_delivery(&entry, next)?;

            // Compare-and-swap on the status that was validated.
            let query = Query::update()
                .table(AssistanceEntries::Table)
                .value(AssistanceEntries::DeliveryStatus, next.as_str())
                .and_where(Expr::col(AssistanceEntries::Id).eq(entry_id.to_string()))
                .and_where(
                    Expr::col(AssistanceEntries::DeliveryStatus)
                        .eq(entry.delivery_status.as_str()),
                )
                .to_string(SqliteQueryBuilder);

            let result = sqlx::query(&query).execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                return Err(StorageError::Contention(format!(
                    "assistance {} changed while advancing delivery",
                    entry_id
                )));
            }
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }
}
