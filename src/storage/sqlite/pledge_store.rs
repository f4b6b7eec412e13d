//! SQLite PledgeStore implementation.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::model::{NewAssistance, Pledge, PledgeReceipt};
use crate::storage::{PledgeStore, Result};

use super::assistance_ledger::insert_entry_in;
use super::need_store::apply_fulfillment_in;
use super::{begin_immediate, finish};

/// SQLite implementation of PledgeStore.
///
/// Shares the pool with the need store and the ledger; a pledge touches both
/// tables inside one immediate transaction.
pub struct SqlitePledgeStore {
    pool: SqlitePool,
}

impl SqlitePledgeStore {
    /// Create a new SQLite pledge store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn commit_in(conn: &mut SqliteConnection, pledge: Pledge) -> Result<PledgeReceipt> {
        let need = apply_fulfillment_in(conn, pledge.need_id, pledge.quantity).await?;
        let assistance = insert_entry_in(
            conn,
            NewAssistance {
                ngo_id: pledge.ngo_id,
                camp_id: need.camp_id,
                need_id: Some(need.id),
                items_provided: need.item_name.clone(),
                quantity: pledge.quantity,
                notes: pledge.notes,
            },
        )
        .await?;
        Ok(PledgeReceipt { need, assistance })
    }
}

#[async_trait]
impl PledgeStore for SqlitePledgeStore {
    async fn commit_pledge(&self, pledge: Pledge) -> Result<PledgeReceipt> {
        let need_id = pledge.need_id;
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::commit_in(&mut tx, pledge).await;
        let receipt = finish(tx, result).await?;
        debug!(
            %need_id,
            fulfilled = receipt.need.quantity_fulfilled,
            needed = receipt.need.quantity_needed,
            "pledge committed"
        );
        Ok(receipt)
    }
}
