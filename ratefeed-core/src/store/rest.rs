//! REST table-insert store (PostgREST-compatible endpoints).
//!
//! `POST {base}/rest/v1/{table}` with a JSON array body. The service key is sent
//! both as `apikey` and as a bearer token.

use super::{validate_table_name, RateRecord, RateStore, StoreError};
use std::time::Duration;

pub struct RestStore {
    client: reqwest::blocking::Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    pub fn insert_url(&self, table: &str) -> Result<String, StoreError> {
        validate_table_name(table)?;
        Ok(format!("{}/rest/v1/{table}", self.base_url))
    }
}

impl RateStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    fn insert(&self, table: &str, rows: &[RateRecord]) -> Result<(), StoreError> {
        let url = self.insert_url(table)?;

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
