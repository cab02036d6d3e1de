use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::data::BuildingRecord;

const DEFAULT_API: &str = "https://qxkzcwmfplhuybtd.supabase.co/functions/v1/buildings";
const DEFAULT_REST: &str = "https://qxkzcwmfplhuybtd.supabase.co/rest/v1/buildings";

/// Endpoints and key for the buildings backend.
pub struct FetchConfig {
    pub api_url: String,
    pub rest_url: String,
    pub api_key: String,
}

impl FetchConfig {
    /// Hosted defaults, overridable via the environment.
    pub fn from_env() -> Self {
        Self {
            api_url: env_or("CAMPUS_ATLAS_API", DEFAULT_API),
            rest_url: env_or("CAMPUS_ATLAS_REST", DEFAULT_REST),
            api_key: std::env::var("CAMPUS_ATLAS_KEY").unwrap_or_default(),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(String),
}

/// Result of the one-shot building fetch. `Fallback` still carries a full
/// record set, it only notes that the direct table query served it.
pub enum FetchOutcome {
    Primary(Vec<BuildingRecord>),
    Fallback(Vec<BuildingRecord>),
    Failed(String),
}

/// RPC response wrapper: `{"data": [...]}` on success, `{"error": "..."}`
/// when the function rejected the call.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_records(self) -> Result<Vec<BuildingRecord>, FetchError> {
        if let Some(message) = self.error {
            return Err(FetchError::Server(message));
        }
        match self.data {
            Some(rows) => Ok(decode_rows(rows)),
            None => Err(FetchError::Server("response carried no data".to_string())),
        }
    }
}

/// Decodes rows one by one so a single malformed row cannot take down the
/// whole load.
fn decode_rows(rows: Vec<serde_json::Value>) -> Vec<BuildingRecord> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("skipping malformed building row: {err}");
                None
            }
        })
        .collect()
}

/// Loads all building rows: authenticated RPC first, direct table query when
/// that errors, `Failed` when both do.
pub fn load_buildings(config: &FetchConfig) -> FetchOutcome {
    let client = Client::new();
    match load_secure(&client, config) {
        Ok(records) => FetchOutcome::Primary(records),
        Err(primary) => {
            warn!("secure load failed ({primary}), trying table query");
            match load_direct(&client, config) {
                Ok(records) => FetchOutcome::Fallback(records),
                Err(fallback) => FetchOutcome::Failed(format!("{primary}; {fallback}")),
            }
        }
    }
}

fn load_secure(client: &Client, config: &FetchConfig) -> Result<Vec<BuildingRecord>, FetchError> {
    let response = client
        .post(&config.api_url)
        .bearer_auth(&config.api_key)
        .json(&serde_json::json!({ "action": "load_buildings" }))
        .send()?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }
    let envelope: Envelope = serde_json::from_str(&response.text()?)?;
    envelope.into_records()
}

fn load_direct(client: &Client, config: &FetchConfig) -> Result<Vec<BuildingRecord>, FetchError> {
    let response = client
        .get(&config.rest_url)
        .query(&[("select", "*")])
        .header("apikey", &config.api_key)
        .bearer_auth(&config.api_key)
        .send()?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }
    let rows: Vec<serde_json::Value> = serde_json::from_str(&response.text()?)?;
    Ok(decode_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_and_bare_array_decode_to_the_same_records() {
        let body = r#"{"data": [{"name": "Hall", "coords": [[1,1],[1,2],[2,2]], "color": "blue"}]}"#;
        let envelope: Envelope = serde_json::from_str(body).unwrap();
        let primary = envelope.into_records().unwrap();

        let table = r#"[{"name": "Hall", "coords": "[[1,1],[1,2],[2,2]]", "color": "blue"}]"#;
        let fallback = decode_rows(serde_json::from_str(table).unwrap());

        assert_eq!(primary.len(), fallback.len());
        assert_eq!(primary[0].name, fallback[0].name);
        assert_eq!(primary[0].tag(), fallback[0].tag());
        assert_eq!(primary[0].outline(), fallback[0].outline());
    }

    #[test]
    fn error_envelope_is_a_server_error() {
        let envelope: Envelope = serde_json::from_str(r#"{"error": "permission denied"}"#).unwrap();
        assert!(matches!(
            envelope.into_records(),
            Err(FetchError::Server(message)) if message == "permission denied"
        ));
    }

    #[test]
    fn empty_envelope_is_rejected() {
        let envelope: Envelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.into_records().is_err());
    }

    #[test]
    fn unknown_row_fields_are_tolerated() {
        let body = r#"[{"id": 7, "created_at": "2024-01-01", "name": "Hall",
                        "coords": [[1,1],[1,2],[2,2]], "color": "green"}]"#;
        let rows = decode_rows(serde_json::from_str(body).unwrap());
        assert_eq!(rows[0].tag(), "green");
    }

    #[test]
    fn one_malformed_row_does_not_take_down_the_load() {
        let body = r#"[
            {"coords": [[1,1],[1,2],[2,2]]},
            {"name": "Hall", "coords": [[1,1],[1,2],[2,2]], "color": "blue"}
        ]"#;
        let rows = decode_rows(serde_json::from_str(body).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Hall");
    }
}
