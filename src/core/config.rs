use crate::core::MonitorError;
use crate::network::retry::RetryPolicy;
use crate::storage::history::MAX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub transport: TransportConfig,
    pub history: HistoryConfig,
    pub producer: ProducerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub endpoint: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub display_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub level: String,
}

impl Configuration {
    pub fn from_env() -> Result<Self, MonitorError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// キーから値を引く関数を受け取って設定を組み立てる。未設定のキーは既定値になる。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let attempts: u32 = parse_or(&lookup, "CONNECT_ATTEMPTS", defaults.transport.retry.attempts)?;
        if attempts == 0 {
            return Err(MonitorError::Config("CONNECT_ATTEMPTSは1以上である必要があります".to_string()));
        }
        let timeout_ms: u64 = parse_or(&lookup, "CONNECT_TIMEOUT_MS", 5000)?;
        let delay_ms: u64 = parse_or(&lookup, "CONNECT_RETRY_DELAY_MS", 1000)?;

        let capacity: usize = parse_or(&lookup, "HISTORY_CAPACITY", defaults.history.capacity)?;
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(MonitorError::Config(format!(
                "HISTORY_CAPACITYは1以上{}以下である必要があります",
                MAX_CAPACITY
            )));
        }
        let display_limit: usize = parse_or(&lookup, "DISPLAY_LIMIT", defaults.history.display_limit)?;
        // 履歴より多くは表示できない
        if display_limit > capacity {
            return Err(MonitorError::Config(format!(
                "DISPLAY_LIMITはHISTORY_CAPACITY ({})以下である必要があります",
                capacity
            )));
        }

        let args = match lookup("PRODUCER_ARGS") {
            Some(raw) => raw.split_whitespace().map(str::to_string).collect(),
            None => defaults.producer.args,
        };

        Ok(Configuration {
            transport: TransportConfig {
                endpoint: lookup("MONITOR_ENDPOINT").unwrap_or(defaults.transport.endpoint),
                retry: RetryPolicy {
                    attempts,
                    attempt_timeout: Duration::from_millis(timeout_ms),
                    delay: Duration::from_millis(delay_ms),
                },
            },
            history: HistoryConfig {
                capacity,
                display_limit,
            },
            producer: ProducerConfig {
                program: lookup("PRODUCER_PROGRAM").unwrap_or(defaults.producer.program),
                args,
            },
            logging: LoggingConfig {
                file: lookup("LOG_FILE").filter(|f| !f.is_empty()),
                level: lookup("LOG_LEVEL").unwrap_or(defaults.logging.level),
            },
        })
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            transport: TransportConfig {
                endpoint: "ws://localhost:8765".to_string(),
                retry: RetryPolicy::default(),
            },
            history: HistoryConfig {
                capacity: 1000,
                display_limit: 100,
            },
            producer: ProducerConfig {
                program: "sudo".to_string(),
                args: vec!["python3".to_string(), "src/backend/sniffer_bridge.py".to_string()],
            },
            logging: LoggingConfig {
                file: None,
                level: "info".to_string(),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, MonitorError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MonitorError::Config(format!("{}の値が無効です ({}): {}", key, raw, e))),
        None => Ok(default),
    }
}
