use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub control_channel_id: u64,

    // Lavalink
    pub lavalink_host: String,
    pub lavalink_port: u16,
    pub lavalink_password: String,
    pub lavalink_ssl: bool,

    // Reproducción
    pub default_volume: i64,

    // Paths
    pub data_dir: PathBuf,

    // Keepalive HTTP
    pub health_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            control_channel_id: std::env::var("CONTROL_CHANNEL_ID")?.parse()?,

            // Lavalink
            lavalink_host: std::env::var("LAVALINK_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            lavalink_port: std::env::var("LAVALINK_PORT")
                .unwrap_or_else(|_| "2333".to_string())
                .parse()?,
            lavalink_password: std::env::var("LAVALINK_PASSWORD")
                .unwrap_or_else(|_| "youshallnotpass".to_string()),
            lavalink_ssl: std::env::var("LAVALINK_SSL")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            // Reproducción
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            // Keepalive HTTP
            health_port: std::env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// Catches common mistakes before the bot touches Discord or the
    /// Lavalink node, so a bad deployment fails fast at startup.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.control_channel_id == 0 {
            anyhow::bail!("CONTROL_CHANNEL_ID must be a valid channel id");
        }

        if !(1..=200).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 1 and 200, got: {}",
                self.default_volume
            );
        }

        if self.lavalink_host.trim().is_empty() {
            anyhow::bail!("LAVALINK_HOST must not be empty");
        }

        if self.lavalink_port == 0 {
            anyhow::bail!("LAVALINK_PORT must be a valid port");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes sensitive values (token, node password).
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Canal de control: {}\n  \
            Lavalink: {}:{} (ssl={})\n  \
            Volumen por defecto: {}%\n  \
            Datos: {}\n  \
            Keepalive: puerto {}",
            self.control_channel_id,
            self.lavalink_host,
            self.lavalink_port,
            self.lavalink_ssl,
            self.default_volume,
            self.data_dir.display(),
            self.health_port
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin defaults - deben proporcionarse)
            discord_token: String::new(),
            control_channel_id: 0,

            // Lavalink
            lavalink_host: "localhost".to_string(),
            lavalink_port: 2333,
            lavalink_password: "youshallnotpass".to_string(),
            lavalink_ssl: false,

            // Reproducción
            default_volume: 50,

            // Paths
            data_dir: "./data".into(),

            // Keepalive HTTP
            health_port: 10000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            discord_token: "token".to_string(),
            control_channel_id: 1410843136594411520,
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_accepts_sane_defaults() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_volume() {
        let mut config = valid_config();
        config.default_volume = 0;
        assert!(config.validate().is_err());

        config.default_volume = 201;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_does_not_leak_secrets() {
        let mut config = valid_config();
        config.discord_token = "super-secret-token".to_string();
        config.lavalink_password = "node-password".to_string();

        let summary = config.summary();
        assert!(!summary.contains("super-secret-token"));
        assert!(!summary.contains("node-password"));
    }
}
