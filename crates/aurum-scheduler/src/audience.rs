// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-in-time audience resolution.
//!
//! The snapshot counts are frozen onto the run at creation; the underlying
//! contact list may change afterwards without altering run statistics.

use aurum_core::AurumError;
use aurum_storage::Database;
use aurum_storage::models::{Campaign, Contact};
use aurum_storage::queries::contacts;

/// The frozen audience for one campaign run.
#[derive(Debug)]
pub struct AudienceSnapshot {
    /// Eligible contacts: tenant-scoped, not deleted, segment-matching,
    /// not opted out.
    pub contacts: Vec<Contact>,
    /// Matching contacts including opted-out ones.
    pub total: i64,
    pub eligible: i64,
}

/// Resolve the campaign's audience at this instant.
pub async fn snapshot(db: &Database, campaign: &Campaign) -> Result<AudienceSnapshot, AurumError> {
    let rows = contacts::audience_for(db, &campaign.jeweller_id, campaign.sub_segment).await?;
    let eligible = rows.contacts.len() as i64;
    Ok(AudienceSnapshot {
        contacts: rows.contacts,
        total: rows.total,
        eligible,
    })
}
