// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign row operations.
//!
//! The pipeline reads campaigns and writes exactly one transition: ACTIVE ->
//! COMPLETED on expiry. Everything else belongs to the CRUD layer.

use aurum_core::AurumError;
use aurum_core::types::CampaignStatus;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Campaign, column_enum};

const CAMPAIGN_COLUMNS: &str = "id, jeweller_id, name, description, campaign_type, sub_segment,
     recurrence, start_at, end_date, timezone, status, template_name, language, variable_mapping";

fn map_campaign(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        jeweller_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        campaign_type: column_enum(4, row.get(4)?)?,
        sub_segment: row
            .get::<_, Option<String>>(5)?
            .map(|s| column_enum(5, s))
            .transpose()?,
        recurrence: column_enum(6, row.get(6)?)?,
        start_at: row.get(7)?,
        end_date: row.get(8)?,
        timezone: row.get(9)?,
        status: column_enum(10, row.get(10)?)?,
        template_name: row.get(11)?,
        language: column_enum(12, row.get(12)?)?,
        variable_mapping: row.get(13)?,
    })
}

/// Insert a campaign. Used by tests and the CRUD layer seeding path.
pub async fn insert_campaign(db: &Database, campaign: &Campaign) -> Result<(), AurumError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (id, jeweller_id, name, description, campaign_type,
                     sub_segment, recurrence, start_at, end_date, timezone, status,
                     template_name, language, variable_mapping)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    campaign.id,
                    campaign.jeweller_id,
                    campaign.name,
                    campaign.description,
                    campaign.campaign_type.to_string(),
                    campaign.sub_segment.map(|s| s.to_string()),
                    campaign.recurrence.to_string(),
                    campaign.start_at,
                    campaign.end_date,
                    campaign.timezone,
                    campaign.status.to_string(),
                    campaign.template_name,
                    campaign.language.to_string(),
                    campaign.variable_mapping,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one campaign by id.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_campaign)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List ACTIVE campaigns whose start has passed: the evaluation candidates
/// for one scheduler tick.
pub async fn list_active_started(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<Campaign>, AurumError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE status = 'ACTIVE' AND start_at <= ?1
                 ORDER BY start_at ASC"
            ))?;
            let rows = stmt.query_map(params![now], map_campaign)?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(map_tr_err)
}

/// Update a campaign's lifecycle status.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
) -> Result<(), AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
