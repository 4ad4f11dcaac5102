use std::env;

use tablekit_core::batch::BatchConfig;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Table holding every object type (default: "tablekit")
    pub table_name: String,
    /// Custom endpoint URL, for local DynamoDB
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Resubmissions of unprocessed batch items (default: 5)
    pub batch_max_retries: usize,
    /// Batch chunks in flight at once (default: 10)
    pub batch_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TABLEKIT_TABLE_NAME` - Table name (default: "tablekit")
    /// - `AWS_ENDPOINT_URL` - Custom endpoint URL (default: none)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `TABLEKIT_BATCH_MAX_RETRIES` - Batch retry ceiling (default: 5)
    /// - `TABLEKIT_BATCH_CONCURRENCY` - Concurrent batch chunks (default: 10)
    pub fn from_env() -> Self {
        let batch = BatchConfig::default();
        Self {
            table_name: env::var("TABLEKIT_TABLE_NAME").unwrap_or_else(|_| "tablekit".to_string()),
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            batch_max_retries: env::var("TABLEKIT_BATCH_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(batch.max_retries),
            batch_concurrency: env::var("TABLEKIT_BATCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(batch.concurrency),
        }
    }

    /// Batch settings with the configured retry ceiling and concurrency.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_retries: self.batch_max_retries,
            concurrency: self.batch_concurrency,
            ..BatchConfig::default()
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({url})"),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            table_name: "app".to_string(),
            endpoint_url: None,
            region: "eu-west-1".to_string(),
            batch_max_retries: 2,
            batch_concurrency: 4,
        }
    }

    #[test]
    fn test_batch_config_overrides_retries_and_concurrency() {
        let batch = config().batch_config();
        assert_eq!(batch.max_retries, 2);
        assert_eq!(batch.concurrency, 4);
        assert_eq!(batch.max_write_items, 25);
        assert_eq!(batch.max_get_items, 100);
    }

    #[test]
    fn test_target_display() {
        let mut config = config();
        assert_eq!(config.target_display(), "AWS DynamoDB (region: eu-west-1)");

        config.endpoint_url = Some("http://localhost:8000".to_string());
        assert_eq!(config.target_display(), "Local DynamoDB (http://localhost:8000)");
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        env::remove_var("TABLEKIT_TABLE_NAME");
        env::remove_var("AWS_ENDPOINT_URL");
        env::remove_var("AWS_REGION");
        env::remove_var("TABLEKIT_BATCH_MAX_RETRIES");
        env::remove_var("TABLEKIT_BATCH_CONCURRENCY");

        let config = Config::from_env();

        assert_eq!(config.table_name, "tablekit");
        assert_eq!(config.endpoint_url, None);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.batch_max_retries, 5);
        assert_eq!(config.batch_concurrency, 10);
    }
}
