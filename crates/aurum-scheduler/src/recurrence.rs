// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure recurrence evaluation.
//!
//! Maps (campaign, now) to a third-valued outcome: due with a canonical
//! period boundary, not due, or expired. All period math runs in the
//! campaign's own timezone; the boundary (not the trigger time) is the
//! dedup key, so a delayed tick can never mint a second run for a period.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use aurum_core::types::Recurrence;
use aurum_storage::models::Campaign;

/// Evaluation outcome for one campaign at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A run for this period should exist; create one keyed by `period_start`.
    Due { period_start: DateTime<Utc> },
    NotDue,
    /// The end date has passed: the campaign completes and is never due again.
    Expired,
}

/// Evaluate whether a campaign is due at `now`.
///
/// Run-existence deduplication is the coordinator's job; this function is a
/// pure mapping so boundary behavior is testable with fixed instants.
pub fn evaluate(campaign: &Campaign, now: DateTime<Utc>) -> Outcome {
    let tz = campaign_tz(campaign);
    let local_now = now.with_timezone(&tz);

    // Expiry wins over everything, including a start still in the future.
    if let Some(end_date) = campaign.end_date
        && local_now.date_naive() > end_date
    {
        return Outcome::Expired;
    }

    if now < campaign.start_at {
        return Outcome::NotDue;
    }

    let period_start = match campaign.recurrence {
        Recurrence::Once => campaign.start_at,
        Recurrence::Daily => local_midnight(tz, local_now.date_naive()),
        Recurrence::Weekly => {
            let days_from_monday =
                i64::from(local_now.weekday().num_days_from_monday());
            let monday = local_now.date_naive() - Duration::days(days_from_monday);
            local_midnight(tz, monday)
        }
        Recurrence::Monthly => {
            let first = local_now
                .date_naive()
                .with_day(1)
                .unwrap_or_else(|| local_now.date_naive());
            local_midnight(tz, first)
        }
    };

    Outcome::Due { period_start }
}

fn campaign_tz(campaign: &Campaign) -> Tz {
    campaign.timezone.parse().unwrap_or_else(|_| {
        warn!(
            campaign = campaign.id.as_str(),
            timezone = campaign.timezone.as_str(),
            "invalid campaign timezone, falling back to UTC"
        );
        Tz::UTC
    })
}

/// Local midnight of `date` in `tz`, as a UTC instant.
fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(tz) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // Fall-back transition: two midnights; the earlier one starts the period.
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Spring-forward gap swallowed midnight; the period starts when the
        // clock resumes.
        LocalResult::None => match (midnight + Duration::hours(1)).and_local_timezone(tz) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&midnight),
        },
    }
}
