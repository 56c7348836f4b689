use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub const CONFIRMED_US_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv";

/// Where the raw time series CSV comes from. Injectable so the selector
/// logic can be driven from fixtures in tests and from local files via
/// `--input`.
pub trait DataSource {
    fn fetch(&self) -> Result<String>;
}

pub struct HttpSource {
    url: String,
    timeout: Duration,
    retries: usize,
    retry_delay: Duration,
}

impl HttpSource {
    pub fn new(url: &str) -> Self {
        HttpSource {
            url: url.to_string(),
            timeout: Duration::from_secs(60),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl DataSource for HttpSource {
    fn fetch(&self) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent("covidmap/0.1")
            .build()?;
        info!("fetching {}", self.url);
        let body = with_retry(
            || client.get(&self.url).send()?.error_for_status()?.text(),
            self.retries,
            self.retry_delay,
        )
        .with_context(|| format!("fetching {}", self.url))?;
        debug!("fetched {} bytes", body.len());
        Ok(body)
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn fetch(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

/// Runs the operation once plus up to `retries` more times, sleeping
/// `delay` between attempts.
fn with_retry<T, F>(mut operation: F, retries: usize, delay: Duration) -> Result<T>
where
    F: FnMut() -> reqwest::Result<T>,
{
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err.into());
                }
                debug!("attempt {}/{} failed: {}, retrying", attempt, retries, err);
                attempt += 1;
                std::thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_reads_contents() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "FIPS,Province_State,3/11/21\n1001.0,Alabama,10\n").unwrap();
        let src = FileSource::new(f.path());
        assert!(src.fetch().unwrap().starts_with("FIPS,"));
    }

    #[test]
    fn file_source_missing_path_is_an_error() {
        let src = FileSource::new("/nonexistent/feed.csv");
        assert!(src.fetch().is_err());
    }
}
