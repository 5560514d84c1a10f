use crate::errors::AppError;
use domain::{StatusTransitionPolicy, DEFAULT_LOW_STOCK_THRESHOLD};
use std::env;
use std::str::FromStr;

/// データストアの実装
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb,
}

/// 明細書き込み（フェーズ2）失敗時の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineItemFailurePolicy {
    /// 注文ヘッダーを残したまま失敗を報告する
    #[default]
    LeaveHeader,
    /// 注文ヘッダーを削除してから失敗を報告する
    Compensate,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub environment: String,
    pub aws_region: String,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub image_public_base_url: String,
    pub low_stock_threshold: u32,
    pub line_item_failure_policy: LineItemFailurePolicy,
    pub status_transition_policy: StatusTransitionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            dynamodb_table: "store-admin-dev".to_string(),
            dynamodb_endpoint: None,
            environment: "dev".to_string(),
            aws_region: "sa-east-1".to_string(),
            retry_max_attempts: 3,
            retry_initial_delay_ms: 100,
            image_public_base_url: "http://localhost:9000/product-images".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            line_item_failure_policy: LineItemFailurePolicy::LeaveHeader,
            status_transition_policy: StatusTransitionPolicy::Unrestricted,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = match get("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("dynamodb") => StoreBackend::DynamoDb,
            Some(other) => return Err(invalid("STORE_BACKEND", other)),
        };

        let line_item_failure_policy = match get("ORDER_LINE_ITEM_FAILURE").as_deref().map(str::trim)
        {
            None | Some("leave_header") => LineItemFailurePolicy::LeaveHeader,
            Some("compensate") => LineItemFailurePolicy::Compensate,
            Some(other) => return Err(invalid("ORDER_LINE_ITEM_FAILURE", other)),
        };

        let status_transition_policy = match get("ORDER_STATUS_TRANSITIONS") {
            None => defaults.status_transition_policy,
            Some(value) => StatusTransitionPolicy::from_string(&value)
                .ok_or_else(|| invalid("ORDER_STATUS_TRANSITIONS", &value))?,
        };

        Ok(Config {
            store_backend,
            dynamodb_table: get("DYNAMODB_TABLE").unwrap_or(defaults.dynamodb_table),
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            aws_region: get("AWS_REGION").unwrap_or(defaults.aws_region),
            retry_max_attempts: parse_or(&get, "RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts)?,
            retry_initial_delay_ms: parse_or(
                &get,
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            )?,
            image_public_base_url: get("IMAGE_PUBLIC_BASE_URL")
                .unwrap_or(defaults.image_public_base_url),
            low_stock_threshold: parse_or(&get, "LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?,
            line_item_failure_policy,
            status_transition_policy,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "prod"
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
    }
}

fn invalid(key: &str, value: &str) -> AppError {
    AppError::Configuration(format!("{key} has an invalid value: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.dynamodb_table, "store-admin-dev");
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(
            config.line_item_failure_policy,
            LineItemFailurePolicy::LeaveHeader
        );
        assert_eq!(
            config.status_transition_policy,
            StatusTransitionPolicy::Unrestricted
        );
        assert!(config.dynamodb_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("STORE_BACKEND", "dynamodb"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("LOW_STOCK_THRESHOLD", "3"),
            ("ORDER_LINE_ITEM_FAILURE", "compensate"),
            ("ORDER_STATUS_TRANSITIONS", "forward_only"),
            ("ENVIRONMENT", "prod"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::DynamoDb);
        assert_eq!(
            config.dynamodb_endpoint.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.low_stock_threshold, 3);
        assert_eq!(
            config.line_item_failure_policy,
            LineItemFailurePolicy::Compensate
        );
        assert_eq!(
            config.status_transition_policy,
            StatusTransitionPolicy::ForwardOnly
        );
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        assert!(matches!(
            config_from(&[("STORE_BACKEND", "postgres")]),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            config_from(&[("RETRY_MAX_ATTEMPTS", "many")]),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            config_from(&[("ORDER_STATUS_TRANSITIONS", "strict")]),
            Err(AppError::Configuration(_))
        ));
    }
}
