use crate::config::Config;
use crate::error::{EntityError, Result, ValidationError};

/// Highest accepted nested entity depth
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_extraction(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EntityError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_extraction(config: &Config, errors: &mut Vec<ValidationError>) {
        let depth = config.extraction.max_depth;
        if !(1..=MAX_DEPTH_LIMIT).contains(&depth) {
            errors.push(ValidationError::new(
                "extraction.max_depth",
                format!(
                    "Max depth must be between 1 and {}, got {}",
                    MAX_DEPTH_LIMIT, depth
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_zero_depth() {
        let mut config = Config::default();
        config.extraction.max_depth = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.meta.schema_version = "2.0.0".to_string();
        config.extraction.max_depth = MAX_DEPTH_LIMIT + 1;

        match ConfigValidator::validate(&config) {
            Err(EntityError::ConfigValidation { errors }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].path, "_meta.schema_version");
                assert_eq!(errors[1].path, "extraction.max_depth");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
