//! Request files accepted by the subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use marshaller_core::{Configurable, Protocol, Service};
use marshaller_mapping::{MarshallingInput, WireMap};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct MarshalRequest {
    pub protocol: Protocol,
    pub service: Service,
    pub value: Value,
    pub characteristic_id: String,
    #[serde(default)]
    pub path_allow_list: Vec<String>,
    #[serde(default)]
    pub configurables: Vec<Configurable>,
}

#[derive(Debug, Deserialize)]
pub struct UnmarshalRequest {
    pub protocol: Protocol,
    pub service: Service,
    /// Wire messages by segment name.
    pub message: WireMap,
    pub characteristic_id: String,
    #[serde(default)]
    pub path_allow_list: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarshalV2Request {
    pub protocol: Protocol,
    pub service: Service,
    pub inputs: Vec<MarshallingInput>,
}

#[derive(Debug, Deserialize)]
pub struct UnmarshalV2Request {
    pub protocol: Protocol,
    pub service: Service,
    #[serde(default)]
    pub characteristic_id: Option<String>,
    pub path: String,
    pub message: WireMap,
}

#[derive(Debug, Deserialize)]
pub struct ConfigurablesRequest {
    pub characteristic_id: String,
    pub services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
pub struct PathOptionsRequest {
    pub device_type_ids: Vec<String>,
    pub function_id: String,
    #[serde(default)]
    pub aspect_id: Option<String>,
    #[serde(default)]
    pub characteristic_filter: Vec<String>,
    #[serde(default = "default_true")]
    pub with_envelope: bool,
}

fn default_true() -> bool {
    true
}

/// Read and parse a JSON request file.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid request {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_path_options_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"device_type_ids": ["thermometer"], "function_id": "f"}}"#).unwrap();

        let request: PathOptionsRequest = read(file.path()).unwrap();
        assert_eq!(request.device_type_ids, vec!["thermometer".to_string()]);
        assert!(request.with_envelope);
        assert!(request.aspect_id.is_none());
        assert!(request.characteristic_filter.is_empty());
    }

    #[test]
    fn test_read_reports_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{").unwrap();
        let err = read::<ConfigurablesRequest>(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid request"));
    }

    #[test]
    fn test_read_unmarshal_v2_request() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "protocol": {{"id": "p", "protocol_segments": [{{"id": "s", "name": "body"}}]}},
                "service": {{"id": "svc", "outputs": []}},
                "path": "value.level",
                "message": {{"body": "{{\"level\": 21}}"}}
            }}"#
        )
        .unwrap();
        let request: UnmarshalV2Request = read(file.path()).unwrap();
        assert_eq!(request.path, "value.level");
        assert_eq!(request.message["body"], r#"{"level": 21}"#);
        assert_eq!(request.protocol.segment_name("s").unwrap(), "body");
    }
}
