use std::env;

use crate::{env_flag, env_parse};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub observability_enabled: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            metrics_port: env_parse("METRICS_PORT", 9090),
            observability_enabled: env_flag("OBSERVABILITY_ENABLED", true),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.host, self.metrics_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            metrics_port: 9100,
            observability_enabled: true,
        };
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.metrics_address(), "127.0.0.1:9100");
    }
}
