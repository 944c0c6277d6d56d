//! CSV recipient roster parsing.
//!
//! The roster schema is fixed: a header row with `name` and
//! `contact_address` columns, in any order, extra columns ignored.

use crate::import::ImportError;
use crate::model::RecipientRow;
use std::io::Read;

pub const NAME_COLUMN: &str = "name";
pub const CONTACT_COLUMN: &str = "contact_address";

/// Read recipient rows from CSV data.
///
/// Fails with `ImportError::Validation` if a required column is absent
/// from the header. Row contents are not validated here; the importer
/// rejects empty fields so that a bad row rolls back the whole import.
pub fn read_recipients<R: Read>(reader: R) -> Result<Vec<RecipientRow>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |wanted: &str| -> Result<usize, ImportError> {
        headers
            .iter()
            .position(|h| h.trim() == wanted)
            .ok_or_else(|| {
                ImportError::Validation(format!("required column '{}' is missing", wanted))
            })
    };
    let name_idx = column(NAME_COLUMN)?;
    let contact_idx = column(CONTACT_COLUMN)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(RecipientRow {
            name: record.get(name_idx).unwrap_or("").trim().to_string(),
            contact_address: record.get(contact_idx).unwrap_or("").trim().to_string(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_rows_with_columns_in_any_order() {
        let csv = "contact_address,name\nalice@example.com,Alice\nbob@example.com,Bob\n";
        let rows = read_recipients(Cursor::new(csv)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].contact_address, "alice@example.com");
        assert_eq!(rows[1].name, "Bob");
    }

    #[test]
    fn ignores_extra_columns() {
        let csv = "name,team,contact_address\nAlice,Platform,alice@example.com\n";
        let rows = read_recipients(Cursor::new(csv)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contact_address, "alice@example.com");
    }

    #[test]
    fn missing_name_column_is_validation_error() {
        let csv = "full_name,contact_address\nAlice,alice@example.com\n";
        let err = read_recipients(Cursor::new(csv)).unwrap_err();
        match err {
            ImportError::Validation(msg) => assert!(msg.contains(NAME_COLUMN)),
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn missing_contact_column_is_validation_error() {
        let csv = "name,email\nAlice,alice@example.com\n";
        let err = read_recipients(Cursor::new(csv)).unwrap_err();
        match err {
            ImportError::Validation(msg) => assert!(msg.contains(CONTACT_COLUMN)),
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn empty_roster_parses_to_no_rows() {
        let csv = "name,contact_address\n";
        let rows = read_recipients(Cursor::new(csv)).unwrap();
        assert!(rows.is_empty());
    }
}
