use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Importer for the bundled state-name to postal-code reference table
/// (`data/state_codes.csv`).
#[derive(Debug, Deserialize, Clone)]
pub struct StateCode {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Postal")]
    pub postal: String,
}

fn csvrecs<T, R>(reader: R) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    R: std::io::Read,
{
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .context("parsing reference table")
}

/// Two-letter postal code for a full state name. Unknown names are a
/// lookup error naming the state, not a panic.
pub fn postal_code(path: &Path, state: &str) -> Result<String> {
    let infile = std::fs::File::open(path)
        .with_context(|| format!("opening state code table {}", path.display()))?;
    let recs: Vec<StateCode> = csvrecs(infile)?;
    recs.iter()
        .find(|r| r.state == state)
        .map(|r| r.postal.clone())
        .with_context(|| format!("unknown state name: {}", state))
}
