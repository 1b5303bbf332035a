use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. The in-memory backend is used when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Optional JSON seed file for the in-memory backend
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for the Postgres connection pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_for_empty_environment() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.seed_path, None);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_reads_overrides() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "postgres://localhost/filmorate".to_string()),
            ("PORT".to_string(), "8080".to_string()),
            ("HOST".to_string(), "0.0.0.0".to_string()),
        ];
        let config = Config::from_vars(vars).unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/filmorate")
        );
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_rejects_invalid_port() {
        let vars = vec![("PORT".to_string(), "not-a-port".to_string())];
        assert!(Config::from_vars(vars).is_err());
    }
}
