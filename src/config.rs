use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "A blogging platform backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign access tokens
    #[arg(long, env = "QUILL_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: Option<String>,

    /// Secret used to sign refresh tokens
    #[arg(long, env = "QUILL_REFRESH_TOKEN_SECRET", hide_env_values = true)]
    pub refresh_token_secret: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
}

/// Token lifetimes, signing secrets and session limits.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub max_logged_devices: u32,
    pub cookie_name: String,
    pub cookie_max_age_secs: u64,
    pub secure_cookie: bool,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PaginationConfig {
    pub comments_per_page: i64,
    pub posts_per_page: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 8,
            connection_timeout_secs: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 86_400,
            max_logged_devices: 3,
            cookie_name: "jwt".to_string(),
            cookie_max_age_secs: 86_400,
            secure_cookie: true,
            bcrypt_cost: 10,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            comments_per_page: 5,
            posts_per_page: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref secret) = cli.access_token_secret {
            config.auth.access_token_secret = secret.clone();
        }
        if let Some(ref secret) = cli.refresh_token_secret {
            config.auth.refresh_token_secret = secret.clone();
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("quill.db"));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".quill"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Rejects configurations the server cannot safely run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.access_token_secret.is_empty() {
            anyhow::bail!("auth.access_token_secret must be set");
        }
        if self.auth.refresh_token_secret.is_empty() {
            anyhow::bail!("auth.refresh_token_secret must be set");
        }
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            anyhow::bail!("access and refresh token secrets must differ");
        }
        if self.auth.max_logged_devices == 0 {
            anyhow::bail!("auth.max_logged_devices must be at least 1");
        }
        if self.pagination.comments_per_page < 1 || self.pagination.posts_per_page < 1 {
            anyhow::bail!("pagination sizes must be positive");
        }
        Ok(())
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }
}
