use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Settings for an [`crate::RpcClient`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint the requests are posted to
    pub url: String,
    /// PEM file holding this side's key, normally the server's public key
    pub key_path: PathBuf,
    /// Request timeout in seconds, none by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// The timeout as a `Duration`
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Settings for an [`crate::RpcServer`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// PEM file holding this side's key, normally the private key
    pub key_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"url": "http://localhost:3000/rpc", "key_path": "keys/public.pem"}"#,
        )
        .unwrap();
        assert_eq!(config.url, "http://localhost:3000/rpc");
        assert_eq!(config.key_path, PathBuf::from("keys/public.pem"));
        assert_eq!(config.timeout(), None);

        let config: ClientConfig = serde_json::from_str(
            r#"{"url": "http://localhost/", "key_path": "k.pem", "timeout_secs": 5}"#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn server_config_requires_key_path() {
        assert!(serde_json::from_str::<ServerConfig>("{}").is_err());
    }
}
