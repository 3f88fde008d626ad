use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Tunables for the reservation flow.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// How long an unpaid reservation is held before the sweeper may
    /// delete it.
    pub reservation_ttl_seconds: u64,
    /// How often the background sweeper runs.
    pub sweep_interval_seconds: u64,
}

impl BookingRules {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reservation_ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TESSERA__SERVER__PORT=9000` overrides `server.port`
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserializes() {
        let raw = r#"
            [server]
            port = 8000

            [database]
            url = "postgres://localhost/tessera"

            [booking]
            reservation_ttl_seconds = 600
            sweep_interval_seconds = 60
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.booking.ttl(), chrono::Duration::seconds(600));
        assert_eq!(
            config.booking.sweep_interval(),
            std::time::Duration::from_secs(60)
        );
    }
}
