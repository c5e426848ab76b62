/// Configuration management
///
/// Reads the same variables the docker-compose setup exports. Each group
/// falls back to local development defaults when it is not fully set.
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;
use crate::kafka::{KafkaConfig, OffsetReset};
use crate::poller::{ErrorPolicy, PollerConfig};
use crate::sink::SinkConfig;

const DEFAULT_TOPIC: &str = "MSSQLSERVER.dbo.persons";
const DEFAULT_BROKERS: &str = "localhost:9093";
const DEFAULT_GROUP_ID: &str = "3";
const DEFAULT_API_HOST: &str = "host.docker.internal:5000";
const DEFAULT_API_PATH: &str = "/Werbemittel/api/Importer";
const DEFAULT_ENTITY_FIELD: &str = "UnterkunftTermin";

#[derive(Debug, Clone)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub sink: SinkConfig,
    pub poller: PollerConfig,
}

/// Raw environment, every variable optional
#[derive(Debug, Default, Deserialize)]
struct EnvVars {
    topic: Option<String>,
    bootstrap_broker_server: Option<String>,
    bootstrap_broker_port: Option<String>,
    group_id: Option<String>,
    auto_offset_reset: Option<String>,
    poll_timeout_secs: Option<u64>,
    api_endpoint_server: Option<String>,
    api_endpoint_port: Option<String>,
    api_endpoint_path: Option<String>,
    entity_field: Option<String>,
    sink_timeout_secs: Option<u64>,
    on_decode_error: Option<String>,
    on_sink_error: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env_vars(envy::from_env::<EnvVars>()?)
    }

    /// Build from explicit key/value pairs (variable names as in the environment)
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::from_env_vars(envy::from_iter::<_, EnvVars>(vars)?)
    }

    fn from_env_vars(env: EnvVars) -> Result<Self, ConfigError> {
        let topics: Vec<String> = env
            .topic
            .as_deref()
            .unwrap_or(DEFAULT_TOPIC)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if topics.is_empty() {
            return Err(ConfigError::Invalid(
                "TOPIC must name at least one topic".to_string(),
            ));
        }

        let brokers = match (&env.bootstrap_broker_server, &env.bootstrap_broker_port) {
            (Some(server), Some(port)) => format!("{}:{}", server, port),
            (None, None) => DEFAULT_BROKERS.to_string(),
            _ => {
                warn!(
                    "Only one of BOOTSTRAP_BROKER_SERVER/BOOTSTRAP_BROKER_PORT is set, falling back to {}",
                    DEFAULT_BROKERS
                );
                DEFAULT_BROKERS.to_string()
            }
        };

        let offset_reset = env
            .auto_offset_reset
            .as_deref()
            .unwrap_or("smallest")
            .parse::<OffsetReset>()?;

        let api_host = match (&env.api_endpoint_server, &env.api_endpoint_port) {
            (Some(server), Some(port)) => format!("{}:{}", server, port),
            (None, None) => DEFAULT_API_HOST.to_string(),
            _ => {
                warn!(
                    "Only one of API_ENDPOINT_SERVER/API_ENDPOINT_PORT is set, falling back to {}",
                    DEFAULT_API_HOST
                );
                DEFAULT_API_HOST.to_string()
            }
        };
        let api_path = env.api_endpoint_path.as_deref().unwrap_or(DEFAULT_API_PATH);
        let endpoint = Url::parse(&format!("http://{}{}", api_host, api_path)).map_err(|e| {
            ConfigError::Invalid(format!("Invalid API endpoint '{}{}': {}", api_host, api_path, e))
        })?;

        let poll_timeout = match env.poll_timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "POLL_TIMEOUT_SECS must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => PollerConfig::default().poll_timeout,
        };

        let on_decode_error = match env.on_decode_error.as_deref() {
            Some(policy) => policy.parse::<ErrorPolicy>()?,
            None => ErrorPolicy::Halt,
        };
        let on_sink_error = match env.on_sink_error.as_deref() {
            Some(policy) => policy.parse::<ErrorPolicy>()?,
            None => ErrorPolicy::Halt,
        };

        Ok(Config {
            kafka: KafkaConfig {
                brokers,
                group_id: env
                    .group_id
                    .unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
                topics,
                offset_reset,
            },
            sink: SinkConfig {
                endpoint,
                entity_field: env
                    .entity_field
                    .unwrap_or_else(|| DEFAULT_ENTITY_FIELD.to_string()),
                timeout: env.sink_timeout_secs.map(Duration::from_secs),
            },
            poller: PollerConfig {
                poll_timeout,
                on_decode_error,
                on_sink_error,
            },
        })
    }

    pub fn log_config(&self) {
        info!(
            brokers = %self.kafka.brokers,
            group_id = %self.kafka.group_id,
            topics = ?self.kafka.topics,
            offset_reset = self.kafka.offset_reset.as_str(),
            endpoint = %self.sink.endpoint,
            entity_field = %self.sink.entity_field,
            poll_timeout_secs = self.poller.poll_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}
