use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use structopt::StructOpt;
use tracing_subscriber::{fmt, EnvFilter};

mod dataset;
mod dates;
mod fetch;
mod postal;
mod render;
mod select;

use dataset::CaseTable;
use fetch::{DataSource, FileSource, HttpSource};
use select::Selection;

/// Maps county-level confirmed COVID-19 cases for one U.S. state from
/// the [Hopkins CSSE time series](https://github.com/CSSEGISandData/COVID-19).
#[derive(Debug, StructOpt)]
#[structopt(
    name = "covidmap",
    about = "County-level COVID-19 case maps from the Hopkins CSSE feed"
)]
struct Opt {
    /// Full state name (skips the interactive prompt)
    #[structopt(short, long)]
    state: Option<String>,
    /// Analyze for specified date (%Y-%m-%d format)
    #[structopt(long)]
    date: Option<String>,
    /// Read the time series from a local CSV instead of fetching it
    #[structopt(long, parse(from_os_str))]
    input: Option<PathBuf>,
    /// State name to postal code reference table
    #[structopt(long, parse(from_os_str), default_value = "data/state_codes.csv")]
    state_codes: PathBuf,
    /// Directory the rendered maps are written to
    #[structopt(short, long, parse(from_os_str), default_value = ".")]
    outdir: PathBuf,
    /// Render the totals view without asking
    #[structopt(long)]
    totals: bool,
}

#[derive(Debug)]
struct Prepared {
    table: CaseTable,
    selection: Selection,
    postal: String,
}

/// Fetch, filter, and select. Everything up to rendering, with the
/// data source and clock injected so it runs against fixtures.
fn prepare(
    source: &dyn DataSource,
    state_codes: &Path,
    state: &str,
    today: NaiveDate,
) -> Result<Prepared> {
    let body = source.fetch()?;
    let table = CaseTable::from_csv(body.as_bytes())?.filter_state(state);
    if table.rows.is_empty() {
        bail!("no counties found for state: {}", state);
    }
    let postal = postal::postal_code(state_codes, state)?;
    let selection = Selection::compute(&table, today)?;
    Ok(Prepared {
        table,
        selection,
        postal,
    })
}

/// Title-case the user's input the way the feed spells state names.
/// "of" stays lowercase for the District of Columbia.
fn normalize_state(input: &str) -> String {
    let titled = input
        .trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .join(" ");
    if titled == "District Of Columbia" {
        "District of Columbia".to_string()
    } else {
        titled
    }
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_logging();

    let today = match &opt.date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("bad --date {} (want %Y-%m-%d)", s))?,
        None => chrono::Local::now().date_naive(),
    };
    let state = normalize_state(&match opt.state {
        Some(ref s) => s.clone(),
        None => prompt("Full state name: ")?,
    });
    let source: Box<dyn DataSource> = match &opt.input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(fetch::CONFIRMED_US_URL)),
    };

    let prepared = prepare(&*source, &opt.state_codes, &state, today)?;
    render::render_day_change(
        &prepared.table,
        &prepared.selection,
        &state,
        &prepared.postal,
        &opt.outdir,
    )?;
    println!("Latest data from {}", prepared.selection.date_used);
    println!("Day change of confirmed cases shown.");

    let show_totals = opt.totals || prompt("Show totals? (y/n): ")?.eq_ignore_ascii_case("y");
    if show_totals {
        render::render_totals(
            &prepared.table,
            &prepared.selection,
            &state,
            &prepared.postal,
            &opt.outdir,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    struct StaticSource(&'static str);

    impl DataSource for StaticSource {
        fn fetch(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    const FEED: &str = "\
UID,FIPS,Admin2,Province_State,Country_Region,3/9/21,3/10/21,3/11/21
84001001,1001.0,Autauga,Alabama,US,95,100,110
84001003,1003.0,Baldwin,Alabama,US,190,200,220
84026001,26001.0,Alcona,Michigan,US,45,50,50
";

    fn codes_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "State,Postal\nAlabama,AL\nMichigan,MI\n").unwrap();
        f
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    #[test]
    fn normalizes_state_names() {
        assert_eq!(normalize_state("  alabama "), "Alabama");
        assert_eq!(normalize_state("nEW yORK"), "New York");
        assert_eq!(
            normalize_state("district of columbia"),
            "District of Columbia"
        );
    }

    #[test]
    fn prepare_selects_newest_and_prior() {
        let codes = codes_file();
        let p = prepare(&StaticSource(FEED), codes.path(), "Alabama", march(11)).unwrap();
        assert_eq!(p.postal, "AL");
        assert_eq!(p.selection.date_used, "3/11/21");
        assert_eq!(p.selection.newest, vec![110, 220]);
        assert_eq!(p.selection.prior, vec![100, 200]);
        assert_eq!(p.table.rows.len(), 2);
    }

    #[test]
    fn prepare_skips_duplicated_column_for_prior() {
        // Michigan's 3/11 column republishes 3/10, so the baseline must
        // come from 3/9.
        let codes = codes_file();
        let p = prepare(&StaticSource(FEED), codes.path(), "Michigan", march(11)).unwrap();
        assert_eq!(p.selection.date_used, "3/11/21");
        assert_eq!(p.selection.newest, vec![50]);
        assert_eq!(p.selection.prior, vec![45]);
    }

    #[test]
    fn prepare_rejects_unknown_state() {
        let codes = codes_file();
        let err = prepare(&StaticSource(FEED), codes.path(), "Albama", march(11)).unwrap_err();
        assert!(err.to_string().contains("Albama"));
    }

    #[test]
    fn prepare_falls_back_when_today_missing() {
        let codes = codes_file();
        let p = prepare(&StaticSource(FEED), codes.path(), "Alabama", march(13)).unwrap();
        assert_eq!(p.selection.date_used, "3/11/21");
    }
}
