use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{EtlError, Result};
use crate::models::{MeasurementPage, PageMeta, RawMeasurement, Watermark};
use crate::utils::constants::API_KEY_HEADER;

/// Anything that can hand the pipeline raw measurements newer than a
/// watermark.
pub trait MeasurementSource {
    fn fetch(&self, watermark: &Watermark) -> Result<Vec<RawMeasurement>>;
}

/// What to do after a page has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Next,
    Done,
    /// More results exist but the page budget is spent.
    Truncated,
}

/// Blocking client for the measurements endpoint.
pub struct ApiExtractor {
    client: Client,
    url: String,
    api_key: String,
    city: String,
    parameter: String,
    page_size: u32,
    max_pages: u32,
    timeout_secs: u64,
}

impl ApiExtractor {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtlError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.measurements_url(),
            api_key: config.api_key.clone(),
            city: config.city.clone(),
            parameter: config.parameter.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Query string for one page, sorted ascending by time and bounded below
    /// by the watermark when there is one.
    pub fn build_query(&self, watermark: &Watermark, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("city", self.city.clone()),
            ("parameter", self.parameter.clone()),
            ("limit", self.page_size.to_string()),
            ("page", page.to_string()),
            ("sort", "asc".to_string()),
            ("order_by", "datetime".to_string()),
        ];
        // Inclusive lower bound
        if let Some(date_from) = watermark.as_api_filter() {
            query.push(("date_from", date_from));
        }
        query
    }

    /// Decode a response body into a page.
    pub fn parse_page(body: &str) -> Result<MeasurementPage> {
        serde_json::from_str(body)
            .map_err(|e| EtlError::Extraction(format!("Undecodable response body: {}", e)))
    }

    /// Decide whether another page should be requested.
    ///
    /// * 'page' - the page just read (1-based)
    /// * 'received' - records on that page
    /// * 'total' - records received so far, this page included
    pub fn next_page(
        &self,
        page: u32,
        received: usize,
        total: u64,
        meta: Option<&PageMeta>,
    ) -> PageDecision {
        // Short page: nothing left
        if received < self.page_size as usize {
            return PageDecision::Done;
        }
        // meta.found may be a string like ">1000", which says nothing
        if let Some(found) = meta.and_then(PageMeta::found_count) {
            if total >= found {
                return PageDecision::Done;
            }
        }
        // Budget spent
        if page >= self.max_pages {
            return PageDecision::Truncated;
        }
        PageDecision::Next
    }

    fn fetch_page(&self, watermark: &Watermark, page: u32) -> Result<MeasurementPage> {
        let query = self.build_query(watermark, page);
        debug!(url = %self.url, page, "requesting measurements page");

        // Send request
        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query)
            .send()
            .map_err(|e| self.classify(e))?;

        // Check status before reading the body as a page
        let status = response.status();
        if !status.is_success() {
            // the body is only context for the error
            let body = response.text().unwrap_or_default();
            return Err(EtlError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let body = response.text().map_err(|e| self.classify(e))?;
        Self::parse_page(&body)
    }

    fn classify(&self, error: reqwest::Error) -> EtlError {
        if error.is_timeout() {
            EtlError::Extraction(format!(
                "Request timed out after {}s: {}",
                self.timeout_secs, error
            ))
        } else {
            EtlError::Http(error)
        }
    }
}

impl MeasurementSource for ApiExtractor {
    fn fetch(&self, watermark: &Watermark) -> Result<Vec<RawMeasurement>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            // Any failed page aborts the whole extraction
            let batch = self.fetch_page(watermark, page)?;
            let received = batch.results.len();
            records.extend(batch.results);
            debug!(page, received, "page received");

            match self.next_page(page, received, records.len() as u64, batch.meta.as_ref()) {
                PageDecision::Next => page += 1,
                PageDecision::Done => break,
                PageDecision::Truncated => {
                    warn!(
                        pages = page,
                        records = records.len(),
                        "page limit reached, remaining records will be picked up next run"
                    );
                    break;
                }
            }
        }

        if records.is_empty() {
            info!("no new data found");
        } else {
            info!(records = records.len(), pages = page, "extracted new records from API");
        }

        Ok(records)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
