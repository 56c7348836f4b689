use std::io::Read;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::dates;

/// One county of the time series: normalized FIPS identifier plus the
/// case counts aligned with [`CaseTable::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct CountyRow {
    pub fips: String,
    pub county: String,
    pub state: String,
    pub counts: Vec<u32>,
}

/// The Hopkins county-level time series: date-column labels in file
/// order, one row per county. Rows missing an identifier or with
/// unparseable counts are dropped at parse time.
#[derive(Debug, Clone)]
pub struct CaseTable {
    pub columns: Vec<String>,
    pub rows: Vec<CountyRow>,
}

impl CaseTable {
    pub fn from_csv<R: Read>(reader: R) -> Result<CaseTable> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers().context("reading time series header")?.clone();

        let find = |name: &str| headers.iter().position(|h| h == name);
        let fips_idx = find("FIPS").context("time series has no FIPS column")?;
        let state_idx =
            find("Province_State").context("time series has no Province_State column")?;
        let county_idx = find("Admin2");

        // Date columns are recognized by their header, not by position.
        let date_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| dates::parse_column_label(h).is_some())
            .map(|(i, h)| (i, h.to_string()))
            .collect();
        if date_cols.is_empty() {
            bail!("time series has no date columns");
        }

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in rdr.records() {
            let record = record.context("reading time series row")?;
            let fips = match normalize_fips(record.get(fips_idx).unwrap_or_default()) {
                Some(f) => f,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let counts: Option<Vec<u32>> = date_cols
                .iter()
                .map(|(i, _)| parse_count(record.get(*i).unwrap_or_default()))
                .collect();
            let counts = match counts {
                Some(c) => c,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            rows.push(CountyRow {
                fips,
                county: county_idx
                    .and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string(),
                state: record.get(state_idx).unwrap_or_default().to_string(),
                counts,
            });
        }
        if dropped > 0 {
            debug!("dropped {} rows with missing FIPS or counts", dropped);
        }
        info!(
            "parsed time series: {} counties, {} dates",
            rows.len(),
            date_cols.len()
        );

        Ok(CaseTable {
            columns: date_cols.into_iter().map(|(_, h)| h).collect(),
            rows,
        })
    }

    /// Rows for one state, file order preserved.
    pub fn filter_state(&self, state: &str) -> CaseTable {
        CaseTable {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.state == state)
                .cloned()
                .collect(),
        }
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.columns.iter().any(|c| c == label)
    }

    /// Values of one date column, aligned with `rows`.
    pub fn column(&self, label: &str) -> Option<Vec<u32>> {
        let idx = self.columns.iter().position(|c| c == label)?;
        Some(self.rows.iter().map(|r| r.counts[idx]).collect())
    }
}

/// FIPS fields in the feed arrive as floats ("1001.0"); normalize to
/// the conventional zero-padded five-digit form. Empty fields mean the
/// row has no identifier.
fn normalize_fips(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    let v = field.parse::<f64>().ok()?;
    Some(format!("{:05}", v as u32))
}

fn parse_count(field: &str) -> Option<u32> {
    let field = field.trim();
    field
        .parse::<u32>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().map(|v| v.round() as u32))
}
