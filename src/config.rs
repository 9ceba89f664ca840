use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://vicidial.example.com/vicidial/non_agent_api.php";
pub const DEFAULT_API_USER: &str = "api_user";
pub const DEFAULT_API_PASS: &str = "api_password";
pub const DEFAULT_AGENT_GROUP: &str = "AGENTDIRECT";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set!")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Dialer API settings.
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub api_user: String,
    pub api_pass: String,
    /// In-group the call is sent to
    pub agent_group: String,
    pub timeout: Duration,
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("api_user", &self.api_user)
            .field("api_pass", &"***")
            .field("agent_group", &self.agent_group)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_user: DEFAULT_API_USER.to_string(),
            api_pass: DEFAULT_API_PASS.to_string(),
            agent_group: DEFAULT_AGENT_GROUP.to_string(),
            timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub database_url: String,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let timeout_secs = match lookup("GATEWAY_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "GATEWAY_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_GATEWAY_TIMEOUT_SECS,
        };
        let listen_addr = or_default("LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                value: listen_addr.clone(),
            })?;

        Ok(Self {
            gateway: GatewayConfig {
                api_url: or_default("VICIDIAL_API_URL", DEFAULT_API_URL),
                api_user: or_default("VICIDIAL_API_USER", DEFAULT_API_USER),
                api_pass: or_default("VICIDIAL_API_PASS", DEFAULT_API_PASS),
                agent_group: or_default("VICIDIAL_AGENT_GROUP", DEFAULT_AGENT_GROUP),
                timeout: Duration::from_secs(timeout_secs),
            },
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            listen_addr,
        })
    }
}
