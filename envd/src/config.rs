use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the environment daemon listens on.
    pub port: u16,
    /// Bind address.
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env_parse("ENVD_PORT", 8000)?,
            bind_addr: std::env::var("ENVD_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
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
