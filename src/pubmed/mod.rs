//! PubMed downloads through NCBI E-utilities
//!
//! A download searches PubMed for every record created within a date range
//! (esearch), then fetches the records in batches (efetch, XML) and keeps
//! the ones with a PMID, an article, a title and a non-empty abstract.
//!
//! # Credentials
//!
//! - `NCBI_EMAIL`: contact address sent with every request
//! - `NCBI_API_KEY`: raises the rate limit from 3 to 10 requests/second

mod xml;

pub use xml::{parse_article_set, FetchedBatch, SkipCounts};

use crate::config::{DownloadConfig, UserConfig};
use crate::models::Abstract;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while talking to E-utilities
#[derive(Error, Debug)]
pub enum PubmedError {
    #[error("E-utilities request failed: {0}")]
    Request(String),

    #[error("E-utilities error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse E-utilities response: {0}")]
    Parse(String),

    #[error("Invalid date range '{0}': expected START:END, e.g. 2017/06/01:2017/06/30")]
    InvalidRange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PubmedResult<T> = Result<T, PubmedError>;

/// esearch can only page through this many ids for a single query
const SEARCH_WINDOW: usize = 10_000;
const MAX_ATTEMPTS: u32 = 3;
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Inclusive creation-date range, dates formatted as PubMed expects
/// (`2017/06/01`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl From<(String, String)> for DateRange {
    fn from((start, end): (String, String)) -> Self {
        Self { start, end }
    }
}

impl From<DateRange> for (String, String) {
    fn from(range: DateRange) -> Self {
        (range.start, range.end)
    }
}

impl std::str::FromStr for DateRange {
    type Err = PubmedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => Ok(Self {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
            }),
            _ => Err(PubmedError::InvalidRange(s.to_string())),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl DateRange {
    /// esearch term selecting records created within the range
    pub fn query(&self) -> String {
        format!(
            "(\"{}\"[Date - Create] : \"{}\"[Date - Create])",
            self.start, self.end
        )
    }

    /// `2017/06/01` .. `2017/06/30` → `2017-06-01_to_2017-06-30.json`
    pub fn file_name(&self) -> String {
        format!("{}_to_{}.json", self.start, self.end).replace('/', "-")
    }
}

/// Read a JSON list of `[start, end]` pairs
pub fn load_date_ranges(path: &Path) -> anyhow::Result<Vec<DateRange>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read date ranges {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Expected a JSON list of [start, end] pairs in {}", path.display()))
}

/// Result of downloading one date range
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub range: DateRange,
    /// Ids returned by the search
    pub found: usize,
    pub papers: Vec<Abstract>,
    pub skipped: SkipCounts,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    esearchresult: SearchResult,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    error: Option<String>,
}

/// Parse an esearch JSON body into (total count, ids on this page)
pub fn parse_search_response(body: &str) -> PubmedResult<(usize, Vec<String>)> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|e| PubmedError::Parse(e.to_string()))?;
    let result = envelope.esearchresult;
    if let Some(message) = result.error {
        return Err(PubmedError::Api {
            status: 200,
            message,
        });
    }
    let count = match result.count {
        Some(c) => c
            .parse()
            .map_err(|_| PubmedError::Parse(format!("invalid count '{}'", c)))?,
        None => result.idlist.len(),
    };
    Ok((count, result.idlist))
}

/// Blocking E-utilities client
pub struct PubmedClient {
    agent: ureq::Agent,
    base_url: String,
    batch_size: usize,
    email: Option<String>,
    api_key: Option<String>,
    delay: Duration,
}

fn env_credential(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(300)))
        .build()
        .new_agent()
}

impl PubmedClient {
    /// Credential priority: `NCBI_EMAIL`/`NCBI_API_KEY`, then `[download]`
    /// in cardshark.toml, then the user config file
    pub fn new(config: &DownloadConfig, user: &UserConfig) -> Self {
        Self::with_env(
            config,
            user,
            env_credential("NCBI_EMAIL"),
            env_credential("NCBI_API_KEY"),
        )
    }

    fn with_env(
        config: &DownloadConfig,
        user: &UserConfig,
        env_email: Option<String>,
        env_api_key: Option<String>,
    ) -> Self {
        let email = env_email
            .or_else(|| config.email.clone())
            .or_else(|| user.email().map(String::from));
        let api_key = env_api_key
            .or_else(|| config.api_key.clone())
            .or_else(|| user.api_key().map(String::from));
        let delay = if api_key.is_some() {
            Duration::from_millis(110)
        } else {
            Duration::from_millis(350)
        };
        if email.is_none() {
            warn!("No NCBI contact e-mail configured; set NCBI_EMAIL or [download] email");
        }

        Self {
            agent: make_agent(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size.max(1),
            email,
            api_key,
            delay,
        }
    }

    fn common_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("tool".to_string(), "cardshark".to_string()),
        ];
        if let Some(email) = &self.email {
            params.push(("email".into(), email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key".into(), key.clone()));
        }
        params
    }

    /// Send a request, retrying on rate limiting and server errors
    fn execute<F>(&self, what: &str, send: F) -> PubmedResult<String>
    where
        F: Fn() -> Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            std::thread::sleep(self.delay);

            let response = send().map_err(|e| PubmedError::Request(e.to_string()))?;
            let status = response.status().as_u16();
            let mut body = response.into_body();

            if (status == 429 || status >= 500) && attempt < MAX_ATTEMPTS {
                let backoff = Duration::from_secs(2u64.pow(attempt));
                warn!("{} returned {}, retrying in {:?}", what, status, backoff);
                std::thread::sleep(backoff);
                continue;
            }
            if status >= 400 {
                let message = body.read_to_string().unwrap_or_default();
                return Err(PubmedError::Api { status, message });
            }

            return body
                .with_config()
                .limit(MAX_BODY_BYTES)
                .read_to_string()
                .map_err(|e| PubmedError::Request(e.to_string()));
        }
    }

    /// All PMIDs created within `range`
    pub fn search(&self, range: &DateRange) -> PubmedResult<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let term = range.query();
        info!("PubMed query: {}", term);

        let mut ids: Vec<String> = Vec::new();
        loop {
            let retstart = ids.len().to_string();
            let body = self.execute("esearch", || {
                let mut request = self.agent.get(&url);
                for (k, v) in self.common_params() {
                    request = request.query(k, v);
                }
                request
                    .query("term", &term)
                    .query("retmode", "json")
                    .query("retstart", &retstart)
                    .query("retmax", SEARCH_WINDOW.to_string())
                    .call()
            })?;

            let (count, page) = parse_search_response(&body)?;
            let page_len = page.len();
            ids.extend(page);
            debug!("esearch page: {} ids ({} / {})", page_len, ids.len(), count);

            if page_len == 0 || ids.len() >= count {
                break;
            }
            if ids.len() >= SEARCH_WINDOW {
                warn!(
                    "{} matches {} records; esearch returns at most {}. Narrow the date range.",
                    range,
                    count,
                    SEARCH_WINDOW
                );
                break;
            }
        }
        Ok(ids)
    }

    /// Fetch and convert one batch of PMIDs
    pub fn fetch(&self, ids: &[String]) -> PubmedResult<FetchedBatch> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let mut params = self.common_params();
        params.push(("retmode".into(), "xml".into()));
        params.push(("id".into(), ids.join(",")));

        let body = self.execute("efetch", || self.agent.post(&url).send_form(params.clone()))?;
        parse_article_set(&body)
    }

    /// Search `range` and fetch every hit. `on_batch` receives (fetched so
    /// far, total).
    pub fn download_range<F>(&self, range: &DateRange, mut on_batch: F) -> PubmedResult<DownloadReport>
    where
        F: FnMut(usize, usize),
    {
        let ids = self.search(range)?;
        let total = ids.len();
        info!("Number of publications being pulled: {}", total);

        let mut papers = Vec::with_capacity(total);
        let mut skipped = SkipCounts::default();
        for (n, chunk) in ids.chunks(self.batch_size).enumerate() {
            let start = n * self.batch_size;
            debug!(
                "Downloading records {} - {} / {}",
                start + 1,
                start + chunk.len(),
                total
            );
            let batch = self.fetch(chunk)?;
            papers.extend(batch.papers);
            skipped.merge(batch.skipped);
            on_batch(start + chunk.len(), total);
        }

        info!(
            "Pulled {} papers ({} empty abstracts, {} missing PMIDs, {} other errors)",
            papers.len(),
            skipped.missing_abstract.len(),
            skipped.missing_pmid,
            skipped.other_error.len()
        );

        Ok(DownloadReport {
            range: range.clone(),
            found: total,
            papers,
            skipped,
        })
    }
}
