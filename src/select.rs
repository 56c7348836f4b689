use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::dataset::CaseTable;
use crate::dates::{column_label, previous_day};

/// How far back to walk when the feed has not published recent columns.
/// One step covers the normal "today not yet published" case; the rest
/// tolerates multi-day publishing gaps.
pub const MAX_LOOKBACK_DAYS: u32 = 7;

/// The most recent date at or before `today` that has a column in the
/// table. Walks back one calendar day at a time, bounded.
pub fn latest_column(today: NaiveDate, table: &CaseTable) -> Result<NaiveDate> {
    let mut day = today;
    for step in 0..=MAX_LOOKBACK_DAYS {
        let label = column_label(day);
        if table.has_column(&label) {
            if step > 0 {
                warn!(
                    "no column for {} yet, using {}",
                    column_label(today),
                    label
                );
            }
            return Ok(day);
        }
        day = previous_day(day);
    }
    bail!(
        "no date column within {} days of {}",
        MAX_LOOKBACK_DAYS,
        column_label(today)
    )
}

/// The values the two map views are built from: the newest usable
/// column and its comparison baseline, row-aligned with the table.
#[derive(Debug, Clone)]
pub struct Selection {
    pub date_used: String,
    pub fips: Vec<String>,
    pub newest: Vec<u32>,
    pub prior: Vec<u32>,
}

impl Selection {
    pub fn compute(table: &CaseTable, today: NaiveDate) -> Result<Selection> {
        let used = latest_column(today, table)?;
        let date_used = column_label(used);
        let newest = table
            .column(&date_used)
            .with_context(|| format!("no column for {}", date_used))?;

        let prior_day = previous_day(used);
        let prior_label = column_label(prior_day);
        let prior_values = table
            .column(&prior_label)
            .with_context(|| format!("no column for {} (prior day)", prior_label))?;

        // The feed occasionally republishes a stale column byte-for-byte
        // (seen with Michigan); comparing against it would show zero
        // change statewide, so skip one further day back.
        let prior = if prior_values == newest {
            let two_back = column_label(previous_day(prior_day));
            info!(
                "column {} duplicates {}, comparing against {}",
                date_used, prior_label, two_back
            );
            table
                .column(&two_back)
                .with_context(|| format!("no column for {} (two days back)", two_back))?
        } else {
            prior_values
        };

        Ok(Selection {
            date_used,
            fips: table.rows.iter().map(|r| r.fips.clone()).collect(),
            newest,
            prior,
        })
    }
}
