/// Configuration management for the web server
///
/// Settings come from `GRANITE_*` environment variables (a `.env` file is
/// read first when present) and are collected into a typed [`Config`].
///
/// # Environment Variables
///
/// - `GRANITE_GATEWAY_URL`: Base URL of the hosted backend (required)
/// - `GRANITE_GATEWAY_KEY`: Public API key for the hosted backend (required)
/// - `GRANITE_HOST`: Host to bind to (default: 0.0.0.0)
/// - `GRANITE_PORT`: Port to bind to (default: 8080)
/// - `GRANITE_CORS_ORIGINS`: Comma separated origins, `*` for any (default: *)
/// - `GRANITE_PUBLIC_URL`: Origin used in OAuth and password-reset redirects
///   (default: http://localhost:8080)
/// - `GRANITE_PRODUCTION`: Marks cookies `Secure` (default: false)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use granite_web::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "GRANITE";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Hosted backend configuration
    pub gateway: GatewayConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Public origin of this server, without trailing slash
    pub public_url: String,

    /// Production mode (secure cookies)
    pub production: bool,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `https://project.example.co`
    pub url: String,

    /// Public (anonymous) API key
    ///
    /// Row-level policies still apply; this is not a service key.
    pub key: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a required variable is
    /// missing or a value cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(source: config::Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read environment")?;

        let optional = |key: &str| {
            settings
                .get_string(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| {
                anyhow::anyhow!(
                    "{}_{} environment variable is required",
                    ENV_PREFIX,
                    key.to_uppercase()
                )
            })
        };

        let port = match optional("port") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("{}_PORT must be a port number", ENV_PREFIX))?,
            None => 8080,
        };

        let production = match optional("production") {
            Some(flag) => matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            None => false,
        };

        let cors_origins = optional("cors_origins")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            server: ServerConfig {
                host: optional("host").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                cors_origins,
                public_url: optional("public_url")
                    .unwrap_or_else(|| "http://localhost:8080".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                production,
            },
            gateway: GatewayConfig {
                url: required("gateway_url")?,
                key: required("gateway_key")?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
