//! Generic provider for JSON endpoints that return an array of records.
//!
//! Each named endpoint declares where the record array lives in the response
//! body and which fields become columns, in order. Resources are addressed
//! as `"{endpoint}"` or `"{endpoint}/{key}"`; the key replaces a `{key}`
//! placeholder in the endpoint URL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::http::{json_cell, HttpClient, HttpOptions};
use super::provider::{DataError, TableProvider};
use crate::table::Table;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonEndpoint {
    pub url: String,
    /// Dot-separated path to the record array; empty means the body itself.
    #[serde(default)]
    pub records_path: String,
    pub fields: Vec<String>,
    /// Header labels; defaults to the field names.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl JsonEndpoint {
    fn header(&self) -> Vec<String> {
        if self.columns.len() == self.fields.len() {
            self.columns.clone()
        } else {
            self.fields.clone()
        }
    }

    fn url_for(&self, key: Option<&str>) -> String {
        match key {
            Some(k) => self.url.replace("{key}", k),
            None => self.url.clone(),
        }
    }
}

pub struct JsonTableProvider {
    name: String,
    client: HttpClient,
    endpoints: BTreeMap<String, JsonEndpoint>,
}

impl JsonTableProvider {
    pub fn new(
        name: impl Into<String>,
        options: &HttpOptions,
        endpoints: BTreeMap<String, JsonEndpoint>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            name: name.into(),
            client: HttpClient::new(options)?,
            endpoints,
        })
    }
}

impl TableProvider for JsonTableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_table(&self, resource: &str) -> Result<Table, DataError> {
        let (endpoint_name, key) = match resource.split_once('/') {
            Some((name, key)) => (name, Some(key)),
            None => (resource, None),
        };
        let endpoint = self
            .endpoints
            .get(endpoint_name)
            .filter(|e| !e.url.is_empty())
            .ok_or_else(|| DataError::Unconfigured {
                source_id: self.name.clone(),
                setting: endpoint_name.to_string(),
            })?;
        let body: serde_json::Value = self.client.get_json(&endpoint.url_for(key), &[])?;
        records_to_table(&body, endpoint)
    }
}

/// Project the record array of a response body onto the endpoint's fields.
pub fn records_to_table(
    body: &serde_json::Value,
    endpoint: &JsonEndpoint,
) -> Result<Table, DataError> {
    let mut node = body;
    for segment in endpoint.records_path.split('.').filter(|s| !s.is_empty()) {
        node = node.get(segment).ok_or_else(|| {
            DataError::Decode(format!(
                "path '{}' not found in response",
                endpoint.records_path
            ))
        })?;
    }
    let records = node.as_array().ok_or_else(|| {
        DataError::Decode(format!(
            "'{}' is not an array of records",
            endpoint.records_path
        ))
    })?;

    let mut table = Table::new(endpoint.header());
    for record in records {
        let row = endpoint
            .fields
            .iter()
            .map(|f| json_cell(record.get(f)))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}
