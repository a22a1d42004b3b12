use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Default, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub redis: RedisConfig,

    #[command(flatten)]
    pub queue: QueueConfig,

    #[command(flatten)]
    pub reassembly: ReassemblyConfig,

    #[command(flatten)]
    pub carrier: CarrierConfig,

    #[command(flatten)]
    pub correlation: CorrelationConfig,

    #[command(flatten)]
    pub receipt: ReceiptConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host the management server listens on
    #[arg(long, env = "SUBMITTER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for health probes
    #[arg(long, env = "SUBMITTER_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Grace period for in-flight dispatches during shutdown
    #[arg(long, env = "SUBMITTER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Timeout for the Redis readiness probe
    #[arg(long, env = "SUBMITTER_HEALTH_REDIS_TIMEOUT_MS", default_value_t = 1000)]
    pub health_redis_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            mgmt_port: 9090,
            shutdown_timeout_secs: 10,
            health_redis_timeout_ms: 1000,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct RedisConfig {
    /// Redis connection URL
    #[arg(long = "redis-url", env = "SUBMITTER_REDIS_URL", default_value = "redis://localhost:6379/1")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: "redis://localhost:6379/1".to_string() }
    }
}

#[derive(Clone, Debug, Args)]
pub struct QueueConfig {
    /// List holding submissions coming from the SMPP side
    #[arg(long, env = "SUBMITTER_INBOUND_QUEUE", default_value = "smpp_to_http")]
    pub inbound_queue: String,

    /// List receiving synthesized delivery receipts for the SMPP side
    #[arg(long, env = "SUBMITTER_DLR_QUEUE", default_value = "http_to_smpp_dlr")]
    pub dlr_queue: String,

    /// Optional list collecting payloads that could not be decoded
    #[arg(long, env = "SUBMITTER_DEAD_LETTER_QUEUE")]
    pub dead_letter_queue: Option<String>,

    /// How long the consumer idles when the inbound list is empty
    #[arg(long, env = "SUBMITTER_POLL_INTERVAL_MS", default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Maximum number of payloads drained per poll; unprocessed ones are pushed back on shutdown
    #[arg(long, env = "SUBMITTER_POLL_BATCH_SIZE", default_value_t = 10)]
    pub poll_batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            inbound_queue: "smpp_to_http".to_string(),
            dlr_queue: "http_to_smpp_dlr".to_string(),
            dead_letter_queue: None,
            poll_interval_ms: 250,
            poll_batch_size: 10,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ReassemblyConfig {
    /// Time-to-live of an incomplete multipart group
    #[arg(long = "reassembly-ttl-secs", env = "SUBMITTER_REASSEMBLY_TTL_SECS", default_value_t = 300)]
    pub ttl_secs: u64,

    /// How often the reaper sweeps expired groups
    #[arg(long = "reassembly-reap-interval-secs", env = "SUBMITTER_REASSEMBLY_REAP_INTERVAL_SECS", default_value_t = 30)]
    pub reap_interval_secs: u64,

    /// Upper bound on concurrently buffered groups; the oldest is evicted beyond it
    #[arg(long = "reassembly-max-pending", env = "SUBMITTER_REASSEMBLY_MAX_PENDING", default_value_t = 10_000)]
    pub max_pending_groups: usize,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self { ttl_secs: 300, reap_interval_secs: 30, max_pending_groups: 10_000 }
    }
}

#[derive(Clone, Debug, Args)]
pub struct CarrierConfig {
    /// Base URL of the carrier API
    #[arg(long = "carrier-base-url", env = "SUBMITTER_CARRIER_BASE_URL", default_value = "https://api.orange.com")]
    pub base_url: String,

    /// OAuth client id
    #[arg(long = "carrier-client-id", env = "SUBMITTER_CARRIER_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long = "carrier-client-secret", env = "SUBMITTER_CARRIER_CLIENT_SECRET", default_value = "")]
    pub client_secret: String,

    /// Account number messages are sent from (digits only, no leading '+')
    #[arg(long = "carrier-sender-address", env = "SUBMITTER_CARRIER_SENDER_ADDRESS", default_value = "")]
    pub sender_address: String,

    /// Callback the carrier notifies with delivery receipts; subscription is skipped when unset
    #[arg(long = "carrier-notify-url", env = "SUBMITTER_CARRIER_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// Per-request timeout against the carrier
    #[arg(long = "carrier-request-timeout-secs", env = "SUBMITTER_CARRIER_REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Tokens are refreshed this many seconds before the carrier says they expire
    #[arg(long = "carrier-token-refresh-margin-secs", env = "SUBMITTER_CARRIER_TOKEN_REFRESH_MARGIN_SECS", default_value_t = 60)]
    pub token_refresh_margin_secs: u64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.orange.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            sender_address: String::new(),
            notify_url: None,
            request_timeout_secs: 15,
            token_refresh_margin_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct CorrelationConfig {
    /// Namespace prepended to provider message ids
    #[arg(long = "correlation-key-prefix", env = "SUBMITTER_CORRELATION_KEY_PREFIX", default_value = "Orange")]
    pub key_prefix: String,

    /// Expiry for correlation records; records never expire when unset
    #[arg(long = "correlation-ttl-secs", env = "SUBMITTER_CORRELATION_TTL_SECS")]
    pub record_ttl_secs: Option<u64>,

    /// Write attempts after the first before giving up
    #[arg(long = "correlation-max-retries", env = "SUBMITTER_CORRELATION_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: usize,

    #[arg(long = "correlation-min-backoff-ms", env = "SUBMITTER_CORRELATION_MIN_BACKOFF_MS", default_value_t = 50)]
    pub min_backoff_ms: u64,

    #[arg(long = "correlation-max-backoff-ms", env = "SUBMITTER_CORRELATION_MAX_BACKOFF_MS", default_value_t = 1000)]
    pub max_backoff_ms: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { key_prefix: "Orange".to_string(), record_ttl_secs: None, max_retries: 3, min_backoff_ms: 50, max_backoff_ms: 1000 }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ReceiptConfig {
    /// Error code written into receipts for failed submissions
    #[arg(long = "dlr-error-code", env = "SUBMITTER_DLR_ERROR_CODE", default_value = "201")]
    pub error_code: String,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self { error_code: "201".to_string() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; export is disabled when unset
    #[arg(long, env = "SUBMITTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "SUBMITTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_declared_arguments() {
        let parsed = Config::parse_from(["sms-submitter"]);
        let defaults = Config::default();

        assert_eq!(parsed.queue.inbound_queue, defaults.queue.inbound_queue);
        assert_eq!(parsed.queue.dlr_queue, defaults.queue.dlr_queue);
        assert_eq!(parsed.reassembly.ttl_secs, defaults.reassembly.ttl_secs);
        assert_eq!(parsed.correlation.key_prefix, defaults.correlation.key_prefix);
        assert_eq!(parsed.receipt.error_code, defaults.receipt.error_code);
        assert_eq!(parsed.carrier.base_url, defaults.carrier.base_url);
        assert_eq!(parsed.server.mgmt_port, defaults.server.mgmt_port);
        assert_eq!(parsed.telemetry.log_format, LogFormat::Text);
    }

    #[test]
    fn test_flags_override_defaults() {
        let parsed = Config::parse_from([
            "sms-submitter",
            "--inbound-queue",
            "custom_in",
            "--correlation-ttl-secs",
            "3600",
            "--log-format",
            "json",
        ]);

        assert_eq!(parsed.queue.inbound_queue, "custom_in");
        assert_eq!(parsed.correlation.record_ttl_secs, Some(3600));
        assert_eq!(parsed.telemetry.log_format, LogFormat::Json);
    }
}
