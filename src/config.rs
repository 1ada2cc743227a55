//! Process configuration: flags with environment fallbacks, read once at startup.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::retry::RetryPolicy;
use crate::seed::DEFAULT_SEED_URL;

#[derive(Debug, Clone, Args)]
pub struct BackendConfig {
    /// Elasticsearch host.
    #[arg(long, env = "ELASTICSEARCH_HOST", default_value = "elasticsearch")]
    pub es_host: String,

    /// Elasticsearch HTTP port.
    #[arg(long, env = "ELASTICSEARCH_PORT", default_value_t = 9200)]
    pub es_port: u16,

    /// Per-request timeout for calls to Elasticsearch.
    #[arg(long, env = "ELASTICSEARCH_TIMEOUT_SECS", default_value_t = 10)]
    pub engine_timeout_secs: u64,

    /// How many times to ping Elasticsearch before giving up.
    #[arg(long, env = "ELASTICSEARCH_CONNECT_ATTEMPTS", default_value_t = 30)]
    pub connect_attempts: u32,

    /// Seconds between connection attempts.
    #[arg(long, env = "ELASTICSEARCH_CONNECT_INTERVAL_SECS", default_value_t = 5)]
    pub connect_interval_secs: u64,

    /// Page scraped for seed documents when the index is empty.
    #[arg(long, env = "SEED_URL", default_value = DEFAULT_SEED_URL)]
    pub seed_url: Url,

    /// Address to listen on.
    #[arg(long, env = "BACKEND_BIND", default_value = "0.0.0.0:9567")]
    pub bind: SocketAddr,
}

impl BackendConfig {
    pub fn engine_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}/", self.es_host, self.es_port))
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_secs(self.connect_interval_secs),
        )
    }
}

#[derive(Debug, Clone, Args)]
pub struct FrontendConfig {
    /// Backend service host.
    #[arg(long, env = "BACKEND_SERVICE_HOST", default_value = "backend")]
    pub backend_host: String,

    /// Backend service port.
    #[arg(long, env = "BACKEND_SERVICE_PORT", default_value_t = 9567)]
    pub backend_port: u16,

    /// Per-request timeout for calls to the backend.
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 10)]
    pub backend_timeout_secs: u64,

    /// Address to listen on.
    #[arg(long, env = "FRONTEND_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,
}

impl FrontendConfig {
    pub fn backend_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}/", self.backend_host, self.backend_port))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}
