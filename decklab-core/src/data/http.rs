//! Blocking HTTP transport shared by the network providers.

use serde::de::DeserializeOwned;
use std::time::Duration;

use super::provider::DataError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

/// Resolved transport settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub user_agent: String,
    /// Delay inserted between consecutive calls to the same provider.
    pub pacing: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pacing: Duration::from_millis(500),
        }
    }
}

impl HttpOptions {
    /// Sleep for the configured pacing delay.
    pub fn pace(&self) {
        if !self.pacing.is_zero() {
            std::thread::sleep(self.pacing);
        }
    }
}

/// Thin wrapper over `reqwest::blocking::Client` that maps failures onto
/// [`DataError`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(options: &HttpOptions) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn send(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<reqwest::blocking::Response, DataError> {
        let mut req = self.client.get(url).query(query);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req
            .send()
            .map_err(|e| DataError::Network(format!("{url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataError> {
        self.send(url, query, &[])?
            .json()
            .map_err(|e| DataError::Decode(format!("{url}: {e}")))
    }

    pub fn get_text(&self, url: &str) -> Result<String, DataError> {
        self.send(url, &[], &[])?
            .text()
            .map_err(|e| DataError::Decode(format!("{url}: {e}")))
    }

    pub fn get_bytes(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, DataError> {
        self.send(url, &[], headers)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| DataError::Decode(format!("{url}: {e}")))
    }
}

/// Text rendering of a JSON scalar as stored in raw tables.
///
/// Null, missing and the provider's `"-"` placeholder all become the empty
/// (missing) cell.
pub fn json_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) if s == "-" => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_cells() {
        assert_eq!(json_cell(None), "");
        assert_eq!(json_cell(Some(&json!(null))), "");
        assert_eq!(json_cell(Some(&json!("-"))), "");
        assert_eq!(json_cell(Some(&json!("平安银行"))), "平安银行");
        assert_eq!(json_cell(Some(&json!(12.5))), "12.5");
        assert_eq!(json_cell(Some(&json!(3))), "3");
    }
}
