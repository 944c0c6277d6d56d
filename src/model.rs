use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A group of participants created together by one roster import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// One recipient with a globally unique access key.
///
/// Participants are created in bulk during import and never updated;
/// `access_key` is assigned once and is unique across all batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub batch_id: String,
    pub name: String,
    pub contact_address: String,
    pub access_key: String,
    pub created_at: DateTime<Utc>,
}

/// One row of a recipient roster, before any key has been issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRow {
    pub name: String,
    pub contact_address: String,
}

/// Result of a successful roster import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub batch_id: String,
    pub imported: usize,
}

/// Per-batch delivery accounting returned by the dispatcher.
///
/// `failed_addresses` lists recipients whose individual delivery failed;
/// they are reported, not retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub batch_id: String,
    pub sent_count: usize,
    pub failed_addresses: Vec<String>,
}
