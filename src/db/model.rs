//! Insert payloads accepted by repositories.
//!
//! Keep these structs focused on what a write needs. Query results are
//! mapped into the domain entities in `crate::model`.

/// One participant row staged for insertion. The access key must already
/// have been issued by the key generator.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub name: String,
    pub contact_address: String,
    pub access_key: String,
}

impl NewParticipant {
    pub fn new(
        name: impl Into<String>,
        contact_address: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            contact_address: contact_address.into(),
            access_key: access_key.into(),
        }
    }
}
