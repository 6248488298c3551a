//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;

    const SAMPLE: &str = r#"
[listener]
bind_address = "127.0.0.1:9000"

[transport]
dial_timeout_secs = 3

[[rules]]
name = "project-get"
hooks = ["audit"]

[rules.frontend]
path = "/projects/{id}"
methods = ["GET"]

[rules.backend]
url = "http://projects-svc:8080"

[[rules]]
name = "grpc-call"

[rules.frontend]
path = "/pkg.Service/{method}"

[rules.backend]
url = "http://backend:9000"
protocol = "grpc"
"#;

    #[test]
    fn parses_rules_and_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.transport.dial_timeout_secs, 3);
        assert_eq!(config.transport.keep_alive_secs, 60);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].hooks, vec!["audit".to_string()]);
        assert_eq!(config.rules[0].backend.protocol, Protocol::Http);
        assert_eq!(config.rules[1].backend.protocol, Protocol::Grpc);
        assert!(config.rules[1].frontend.methods.is_empty());
    }

    #[test]
    fn rejects_invalid_rules() {
        let broken = SAMPLE.replace("/projects/{id}", "projects/{id");
        match parse_config(&broken) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(parse_config("[[rules]"), Err(ConfigError::Parse(_))));
    }
}
