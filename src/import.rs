//! Roster import: one transaction per roster, one participant per row,
//! each with a freshly issued unique access key.

use crate::db::{self, Pool, StoreError};
use crate::keygen::KeyGenerator;
use crate::model::{ImportOutcome, RecipientRow};
use rand::Rng;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid roster: {0}")]
    Validation(String),
    #[error("roster contains no recipient rows")]
    EmptyInput,
    #[error("roster parse error: {0}")]
    Roster(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Import a recipient roster as one new batch.
///
/// All-or-nothing: the batch row and every participant row are staged in a
/// single transaction and committed once at the end. Any row-level failure
/// rolls the whole import back; partial batches are never visible. A
/// zero-row roster is rejected rather than producing an empty batch.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn import_batch<R: Rng>(
    pool: &Pool,
    rows: &[RecipientRow],
    keygen: &mut KeyGenerator<R>,
) -> Result<ImportOutcome, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::EmptyInput);
    }

    // Snapshot of every issued key. Keys staged in this transaction are
    // added as we go, so intra-batch collisions cannot happen.
    let mut taken = db::all_access_keys(pool).await?;

    let mut tx = pool.begin().await.map_err(StoreError::from)?;
    let batch = db::create_batch_tx(&mut tx).await?;

    for (idx, row) in rows.iter().enumerate() {
        let name = row.name.trim();
        if name.is_empty() {
            // Dropping the transaction rolls the whole import back.
            return Err(ImportError::Validation(format!(
                "row {}: name is required",
                idx + 1
            )));
        }
        let contact = row.contact_address.trim();
        if contact.is_empty() {
            return Err(ImportError::Validation(format!(
                "row {}: contact_address is required",
                idx + 1
            )));
        }

        let key = keygen.next_unused(&taken);
        let key = match db::insert_participant_tx(&mut tx, &batch.id, name, contact, &key).await {
            Ok(_) => key,
            Err(StoreError::Integrity(reason)) => {
                // A concurrent import can commit the same key after our
                // snapshot was taken; retry this row once with a fresh key.
                warn!(row = idx + 1, reason = %reason, "access key collided; regenerating");
                taken.insert(key);
                let retry = keygen.next_unused(&taken);
                db::insert_participant_tx(&mut tx, &batch.id, name, contact, &retry).await?;
                retry
            }
            Err(err) => return Err(err.into()),
        };
        taken.insert(key);
    }

    tx.commit().await.map_err(StoreError::from)?;
    info!(batch_id = %batch.id, imported = rows.len(), "imported recipient roster");
    Ok(ImportOutcome {
        batch_id: batch.id,
        imported: rows.len(),
    })
}
