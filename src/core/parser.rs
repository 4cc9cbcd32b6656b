//! YAML parsing and validation.
//!
//! Parses ferry.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Endpoint references in datasets must exist
//! - Destination endpoints must be local (remote writes are unsupported)
//! - Include patterns must compile as globs

use super::types::*;
use crate::source;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a ferry.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<FerryConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a ferry.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<FerryConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &FerryConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Version check
    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    // Name check
    if config.name.is_empty() {
        errors.push(ValidationError {
            message: "name must not be empty".to_string(),
        });
    }

    // Endpoint sanity
    for (id, endpoint) in &config.endpoints {
        if endpoint.root.is_empty() {
            errors.push(ValidationError {
                message: format!("endpoint '{}' has an empty root", id),
            });
        }
        if endpoint.scheme == Scheme::Sftp && source::is_local_addr(&endpoint.addr) {
            errors.push(ValidationError {
                message: format!(
                    "endpoint '{}' is sftp but addr '{}' is this machine",
                    id, endpoint.addr
                ),
            });
        }
    }

    // Validate each dataset
    for (id, dataset) in &config.datasets {
        if !config.endpoints.contains_key(&dataset.from) {
            errors.push(ValidationError {
                message: format!("dataset '{}' references unknown endpoint '{}'", id, dataset.from),
            });
        }

        match config.endpoints.get(&dataset.to) {
            None => errors.push(ValidationError {
                message: format!("dataset '{}' references unknown endpoint '{}'", id, dataset.to),
            }),
            Some(to) if to.scheme != Scheme::Local => errors.push(ValidationError {
                message: format!(
                    "dataset '{}' destination '{}' must be a local endpoint",
                    id, dataset.to
                ),
            }),
            Some(_) => {}
        }

        if dataset.from == dataset.to {
            errors.push(ValidationError {
                message: format!("dataset '{}' copies endpoint '{}' onto itself", id, dataset.from),
            });
        }

        if dataset.include.is_empty() {
            errors.push(ValidationError {
                message: format!("dataset '{}' has an empty include list", id),
            });
        }
        for pattern in &dataset.include {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError {
                    message: format!("dataset '{}' include '{}' is not a valid glob: {}", id, pattern, e),
                });
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  nas:
    scheme: sftp
    addr: 192.168.1.40
    root: /srv/share
  vault:
    root: /mnt/vault
datasets:
  photos:
    from: nas
    to: vault
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.name, "backup");
        let errors = validate_config(&config);
        assert!(
            errors.is_empty(),
            "unexpected errors: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_bad_version() {
        let yaml = r#"
version: "2.0"
name: backup
endpoints: {}
datasets: {}
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("version")));
    }

    #[test]
    fn test_unknown_endpoint() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  vault:
    root: /mnt/vault
datasets:
  photos:
    from: ghost
    to: vault
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("unknown endpoint 'ghost'")));
    }

    #[test]
    fn test_remote_destination_rejected() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  nas:
    scheme: sftp
    addr: 192.168.1.40
    root: /srv/share
  vault:
    root: /mnt/vault
datasets:
  push:
    from: vault
    to: nas
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("must be a local endpoint")));
    }

    #[test]
    fn test_self_copy_rejected() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  vault:
    root: /mnt/vault
datasets:
  loop:
    from: vault
    to: vault
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("onto itself")));
    }

    #[test]
    fn test_sftp_to_local_addr_rejected() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  here:
    scheme: sftp
    addr: 127.0.0.1
    root: /srv/share
  vault:
    root: /mnt/vault
datasets:
  d:
    from: here
    to: vault
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("is this machine")));
    }

    #[test]
    fn test_bad_include_glob() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  a:
    root: /a
  b:
    root: /b
datasets:
  d:
    from: a
    to: b
    include: ["[invalid"]
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("not a valid glob")));
    }

    #[test]
    fn test_empty_include_rejected() {
        let yaml = r#"
version: "1.0"
name: backup
endpoints:
  a:
    root: /a
  b:
    root: /b
datasets:
  d:
    from: a
    to: b
    include: []
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("empty include list")));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.yaml");
        std::fs::write(
            &path,
            r#"
version: "1.0"
name: file-test
endpoints: {}
datasets: {}
"#,
        )
        .unwrap();
        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.name, "file-test");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_config("not: [valid: yaml: {{");
        assert!(result.is_err());
    }
}
