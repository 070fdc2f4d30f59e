use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the agent daemon listens on.
    pub port: u16,
    /// Bind address.
    pub bind_addr: String,
    /// Base URLs of the environments whose actions the agent exposes.
    pub env_urls: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let env_urls = std::env::var("AGENTD_ENV_URLS")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        Ok(Self {
            port: env_parse("AGENTD_PORT", 8001)?,
            bind_addr: std::env::var("AGENTD_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            env_urls,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}
