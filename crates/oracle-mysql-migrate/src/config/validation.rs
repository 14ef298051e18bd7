//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate a loaded configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.oracle.host.is_empty() {
        return Err(MigrateError::Config("oracle.host cannot be empty".into()));
    }
    if config.oracle.service_name.is_empty() {
        return Err(MigrateError::Config(
            "oracle.service_name cannot be empty".into(),
        ));
    }
    if config.oracle.schema.is_empty() {
        return Err(MigrateError::Config("oracle.schema cannot be empty".into()));
    }
    if config.mysql.host.is_empty() {
        return Err(MigrateError::Config("mysql.host cannot be empty".into()));
    }
    if config.mysql.schema.is_empty() {
        return Err(MigrateError::Config("mysql.schema cannot be empty".into()));
    }
    if config.mysql.meta_schema.is_empty() {
        return Err(MigrateError::Config(
            "mysql.meta_schema cannot be empty".into(),
        ));
    }
    if config.migration.threads == 0 {
        return Err(MigrateError::Config(
            "migration.threads must be at least 1".into(),
        ));
    }
    if config.migration.chunk_size == 0 {
        return Err(MigrateError::Config(
            "migration.chunk_size must be at least 1".into(),
        ));
    }
    if config.migration.insert_batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.insert_batch_size must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::*;

    fn valid_config() -> Config {
        Config::from_yaml(
            r#"
oracle:
  host: localhost
  service_name: orcl
  user: system
  password: oracle
  schema: marvin
mysql:
  host: localhost
  user: root
  password: mysql
  schema: marvin
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let cfg = valid_config();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut cfg = valid_config();
        cfg.migration.threads = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        let mut cfg = valid_config();
        cfg.mysql.schema.clear();
        assert!(cfg.validate().is_err());
    }
}
