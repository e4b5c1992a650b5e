use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// SIP account the softphone registers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SipConfig {
    pub server: String,
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1".to_string(),
            proxy: "127.0.0.1".to_string(),
            username: String::new(),
            domain: "127.0.0.1".to_string(),
            login: String::new(),
            password: String::new(),
        }
    }
}

impl SipConfig {
    /// Proxy to route through, falling back to the registrar itself.
    pub fn effective_proxy(&self) -> &str {
        if self.proxy.trim().is_empty() {
            &self.server
        } else {
            &self.proxy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_proxy_falls_back_to_server() {
        let config = SipConfig {
            server: "sip.example.net".to_string(),
            proxy: String::new(),
            ..Default::default()
        };
        assert_eq!(config.effective_proxy(), "sip.example.net");
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: SipConfig = serde_json::from_str(r#"{"server":"10.0.0.5","login":"desk"}"#).unwrap();
        assert_eq!(config.server, "10.0.0.5");
        assert_eq!(config.login, "desk");
        assert!(config.password.is_empty());
    }
}
