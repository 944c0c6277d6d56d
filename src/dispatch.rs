//! Per-batch delivery: render one message per participant and send it
//! through an open transport session, accounting failures individually.

use crate::config;
use crate::db::{self, Pool, StoreError};
use crate::mailer::{MailTransport, TransportError};
use crate::model::DeliveryReport;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("could not establish transport session: {0}")]
    Session(#[source] TransportError),
    #[error("transport session failed to close: {0}")]
    Close(#[source] TransportError),
    #[error(transparent)]
    Store(StoreError),
}

/// Message subject and body with `{name}`, `{key}` and `{link}`
/// placeholders. `{link}` expands to the base link joined with the
/// participant's access key.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
    pub base_link: String,
}

impl MessageTemplate {
    pub fn from_config(message: &config::Message) -> Self {
        Self {
            subject: message.subject.clone(),
            body: message.body.clone(),
            base_link: message.base_link.clone(),
        }
    }

    fn access_link(&self, key: &str) -> String {
        format!("{}/{}", self.base_link.trim_end_matches('/'), key)
    }

    pub fn render(&self, name: &str, key: &str) -> (String, String) {
        let link = self.access_link(key);
        (
            fill(&self.subject, name, key, &link),
            fill(&self.body, name, key, &link),
        )
    }
}

fn fill(template: &str, name: &str, key: &str, link: &str) -> String {
    template
        .replace("{name}", name)
        .replace("{key}", key)
        .replace("{link}", link)
}

/// Send every participant in the batch their access message.
///
/// One transport session per call, owned for the call's full duration.
/// Session establishment failure is fatal; per-recipient delivery failures
/// are accumulated into the report and never retried here. The session is
/// closed exactly once on every path that opened it.
#[instrument(skip_all, fields(batch_id = %batch_id))]
pub async fn dispatch_batch(
    pool: &Pool,
    batch_id: &str,
    template: &MessageTemplate,
    transport: &dyn MailTransport,
) -> Result<DeliveryReport, DispatchError> {
    let participants = db::list_participants(pool, batch_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(msg) => DispatchError::NotFound(msg),
            other => DispatchError::Store(other),
        })?;
    if participants.is_empty() {
        return Err(DispatchError::NotFound(format!(
            "batch {} has no participants",
            batch_id
        )));
    }

    let mut session = transport
        .open_session()
        .await
        .map_err(DispatchError::Session)?;

    let mut report = DeliveryReport {
        batch_id: batch_id.to_string(),
        sent_count: 0,
        failed_addresses: Vec::new(),
    };
    for participant in &participants {
        let (subject, body) = template.render(&participant.name, &participant.access_key);
        match session
            .send(&participant.contact_address, &subject, &body)
            .await
        {
            Ok(()) => {
                report.sent_count += 1;
                info!(address = %participant.contact_address, "delivered access message");
            }
            Err(err) => {
                warn!(?err, address = %participant.contact_address, "delivery failed; continuing");
                report.failed_addresses.push(participant.contact_address.clone());
            }
        }
    }

    session.close().await.map_err(DispatchError::Close)?;
    Ok(report)
}
