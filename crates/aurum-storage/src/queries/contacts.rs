// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact audience queries.
//!
//! Contacts are owned by the CRUD layer; the pipeline only filters them
//! into a point-in-time audience for a campaign run.

use aurum_core::AurumError;
use aurum_core::types::Segment;
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Contact, column_enum};

const CONTACT_COLUMNS: &str = "id, jeweller_id, phone_number, name, customer_id, segment,
     preferred_language, opted_out, is_deleted";

fn map_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        jeweller_id: row.get(1)?,
        phone_number: row.get(2)?,
        name: row.get(3)?,
        customer_id: row.get(4)?,
        segment: column_enum(5, row.get(5)?)?,
        preferred_language: column_enum(6, row.get(6)?)?,
        opted_out: row.get(7)?,
        is_deleted: row.get(8)?,
    })
}

/// Insert a contact. Used by tests and the CRUD layer seeding path.
pub async fn insert_contact(db: &Database, contact: &Contact) -> Result<(), AurumError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, jeweller_id, phone_number, name, customer_id,
                     segment, preferred_language, opted_out, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    contact.id,
                    contact.jeweller_id,
                    contact.phone_number,
                    contact.name,
                    contact.customer_id,
                    contact.segment.to_string(),
                    contact.preferred_language.to_string(),
                    contact.opted_out,
                    contact.is_deleted,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The resolved audience for a campaign: eligible contact rows plus the
/// total matching count including opted-out contacts.
#[derive(Debug)]
pub struct AudienceRows {
    pub contacts: Vec<Contact>,
    pub total: i64,
}

/// Resolve the audience for a jeweller and optional sub-segment.
///
/// `total` counts non-deleted contacts matching the segment filter;
/// `contacts` additionally excludes opted-out contacts (the eligible set).
pub async fn audience_for(
    db: &Database,
    jeweller_id: &str,
    segment: Option<Segment>,
) -> Result<AudienceRows, AurumError> {
    let jeweller_id = jeweller_id.to_string();
    let segment = segment.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            // Segment filter is expressed once: NULL means "any segment".
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM contacts
                 WHERE jeweller_id = ?1 AND is_deleted = 0
                   AND (?2 IS NULL OR segment = ?2)",
                params![jeweller_id, segment],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE jeweller_id = ?1 AND is_deleted = 0 AND opted_out = 0
                   AND (?2 IS NULL OR segment = ?2)
                 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![jeweller_id, segment], map_contact)?;
            let mut contacts = Vec::new();
            for row in rows {
                contacts.push(row?);
            }

            Ok(AudienceRows { contacts, total })
        })
        .await
        .map_err(map_tr_err)
}
