//! J-Quants API v2 client (blocking HTTP).

use crate::domain::app_config::AppConfig;
use crate::domain::error::{FetchError, StockStudyError};
use crate::domain::quote::{RawDailyBar, RawFinancialStatement, RawListedInfo};
use crate::domain::retry::RetryPolicy;
use crate::ports::quote_port::QuotePort;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DAILY_ENDPOINT: &str = "/equities/bars/daily";
pub const MASTER_ENDPOINT: &str = "/equities/master";
pub const FINANCIALS_ENDPOINT: &str = "/fins/summary";

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    pagination_key: Option<String>,
}

pub struct JQuantsClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl JQuantsClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, StockStudyError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stockstudy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport {
                endpoint: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StockStudyError> {
        Self::new(&config.base_url, &config.api_key, config.timeout, config.retry)
    }

    /// Every page of `endpoint`, following `pagination_key` until absent.
    fn get_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let mut rows = Vec::new();
        let mut pagination_key: Option<String> = None;
        loop {
            let page: Page<T> = self.retry.run(
                |attempt| self.get_page(endpoint, params, pagination_key.as_deref(), attempt),
                std::thread::sleep,
            )?;
            rows.extend(page.data);
            match page.pagination_key.filter(|k| !k.is_empty()) {
                Some(next) => pagination_key = Some(next),
                None => break,
            }
        }
        Ok(rows)
    }

    fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        pagination_key: Option<&str>,
        attempt: u32,
    ) -> Result<Page<T>, FetchError> {
        let mut query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .copied()
            .collect();
        if let Some(key) = pagination_key {
            query.push(("pagination_key", key));
        }
        debug!(endpoint, attempt, ?query, "requesting upstream page");

        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .header("x-api-key", &self.api_key)
            .query(&query)
            .send()
            .map_err(|e| FetchError::Transport {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| FetchError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        parse_page(endpoint, status, &body)
    }
}

fn parse_page<T: DeserializeOwned>(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<Page<T>, FetchError> {
    if status == 429 {
        return Err(FetchError::RateLimited {
            endpoint: endpoint.to_string(),
        });
    }
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            endpoint: endpoint.to_string(),
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        });
    }
    serde_json::from_str(body).map_err(|e| FetchError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

impl QuotePort for JQuantsClient {
    fn daily_quotes(
        &self,
        code: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawDailyBar>, FetchError> {
        self.get_all(DAILY_ENDPOINT, &[("code", code), ("from", from), ("to", to)])
    }

    fn stock_master(&self, code: &str) -> Result<Vec<RawListedInfo>, FetchError> {
        self.get_all(MASTER_ENDPOINT, &[("code", code)])
    }

    fn financials(&self, code: &str) -> Result<Vec<RawFinancialStatement>, FetchError> {
        self.get_all(FINANCIALS_ENDPOINT, &[("code", code)])
    }
}
