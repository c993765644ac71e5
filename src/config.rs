//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults are provided for convenience during development.
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{AppError, AppResult};

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_model: String,
    pub backend_device: String,
    pub backend_timeout: Duration,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        let timeout_raw = env::var("BACKEND_TIMEOUT_SECS").unwrap_or_else(|_| "600".to_string());
        let timeout_secs: u64 = timeout_raw.parse().map_err(|_| {
            AppError::Config(format!("BACKEND_TIMEOUT_SECS must be an integer, got '{}'", timeout_raw))
        })?;
        Ok(Config {
            backend_url: env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8082".to_string()),
            backend_model: env::var("BACKEND_MODEL").unwrap_or_else(|_| "stable-diffusion-2-1-base".to_string()),
            backend_device: env::var("BACKEND_DEVICE").unwrap_or_else(|_| "cuda".to_string()),
            backend_timeout: Duration::from_secs(timeout_secs),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string()),
        })
    }

    /// Resolve the listen address, falling back to loopback and the default
    /// port when either value does not parse.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip: IpAddr = self.api_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", self.api_host);
            IpAddr::from([127, 0, 0, 1])
        });
        let port: u16 = self.api_port.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid API_PORT '{}', falling back to {}", self.api_port, DEFAULT_PORT);
            DEFAULT_PORT
        });
        SocketAddr::new(ip, port)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            backend_url = %self.backend_url,
            backend_model = %self.backend_model,
            backend_device = %self.backend_device,
            backend_timeout_secs = self.backend_timeout.as_secs(),
            api_host = %self.api_host,
            api_port = %self.api_port,
            "Loaded configuration"
        );
    }
}
