use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dialoguer::{Confirm, Input, Password, Select};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Default location of the credential/session database
const DEFAULT_DB_FILE: &str = "~/.local/share/notion-timesheet/data.sqlite3";

/// Longest session lifetime accepted from configuration (one year)
pub const MAX_SESSION_TTL: u64 = 365 * 24 * 60 * 60;

/// Notion Timesheet - time-tracking dashboard backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Integration type: a single internal workspace or public OAuth tenants
    #[arg(long = "integration", env = "INTEGRATION_TYPE", value_enum, default_value = "internal")]
    pub integration: OperatingMode,

    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "3001")]
    pub port: u16,

    /// Internal integration token, validated at startup
    #[arg(short = 'k', long, env = "NOTION_API_KEY")]
    pub api_key: Option<String>,

    /// Notion-Version header sent with every request
    #[arg(long, env = "NOTION_API_VERSION", default_value = "2022-06-28")]
    pub api_version: String,

    /// Base URL of the Notion API
    #[arg(long, env = "NOTION_API_BASE_URL", default_value = "https://api.notion.com")]
    pub api_base_url: String,

    /// Public integration OAuth client id
    #[arg(long, env = "NOTION_OAUTH_CLIENT_ID")]
    pub oauth_client_id: Option<String>,

    /// Public integration OAuth client secret
    #[arg(long, env = "NOTION_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub oauth_client_secret: Option<String>,

    /// Redirect URI registered for the OAuth handshake
    #[arg(long, env = "NOTION_OAUTH_REDIRECT_URI")]
    pub oauth_redirect_uri: Option<String>,

    /// Projects database id (internal integration)
    #[arg(long, env = "NOTION_PROJECTS_DB")]
    pub projects_db: Option<String>,

    /// People database id (internal integration)
    #[arg(long, env = "NOTION_PEOPLE_DB")]
    pub people_db: Option<String>,

    /// Time reports database id (internal integration)
    #[arg(long, env = "NOTION_TIMEREPORTS_DB")]
    pub timereports_db: Option<String>,

    /// Path to the SQLite database holding tenant credentials and sessions
    #[arg(short = 'd', long, env = "DB_FILE", default_value = DEFAULT_DB_FILE)]
    pub db_file: String,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL", default_value = "86400")]
    pub session_ttl: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// How tenant credentials are resolved for the lifetime of the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// One workspace, one token from the environment
    Internal,
    /// Many workspaces connected through OAuth, tokens in the store
    Public,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Internal => "internal",
            OperatingMode::Public => "public",
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,
    pub mode: OperatingMode,

    // Notion API
    pub notion_api_key: String,
    pub notion_api_version: String,
    pub notion_base_url: String,

    // OAuth (public integration)
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub oauth_redirect_uri: Option<String>,

    // Database bindings for the internal workspace
    pub projects_db: Option<String>,
    pub people_db: Option<String>,
    pub timereports_db: Option<String>,

    // Storage
    pub db_file: PathBuf,
    pub session_ttl: u64,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Self::from_args(args)
    }

    /// Build the configuration from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            server_host: args.host,
            server_port: args.port,
            mode: args.integration,

            notion_api_key: args
                .api_key
                .filter(|k| !k.trim().is_empty())
                .context("NOTION_API_KEY is required (use -k or set NOTION_API_KEY env var)")?,
            notion_api_version: args.api_version,
            notion_base_url: args.api_base_url.trim_end_matches('/').to_string(),

            oauth_client_id: non_empty(args.oauth_client_id),
            oauth_client_secret: non_empty(args.oauth_client_secret),
            oauth_redirect_uri: non_empty(args.oauth_redirect_uri),

            projects_db: non_empty(args.projects_db),
            people_db: non_empty(args.people_db),
            timereports_db: non_empty(args.timereports_db),

            db_file: expand_tilde(&args.db_file),
            session_ttl: args.session_ttl,

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Session lifetime, clamped to [`MAX_SESSION_TTL`]
    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl.min(MAX_SESSION_TTL) as i64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.notion_api_key.trim().is_empty() {
            anyhow::bail!("NOTION_API_KEY must not be empty");
        }

        if self.mode == OperatingMode::Public {
            if self.oauth_client_id.is_none() {
                anyhow::bail!("NOTION_OAUTH_CLIENT_ID is required for the public integration");
            }
            if self.oauth_client_secret.is_none() {
                anyhow::bail!("NOTION_OAUTH_CLIENT_SECRET is required for the public integration");
            }
        }

        if self.session_ttl == 0 {
            anyhow::bail!("SESSION_TTL must be greater than zero");
        }
        if self.session_ttl > MAX_SESSION_TTL {
            anyhow::bail!(
                "SESSION_TTL must be at most {} seconds, got {}",
                MAX_SESSION_TTL,
                self.session_ttl
            );
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}


// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and no token in the environment)
pub fn needs_interactive_setup() -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();
    let has_api_key = std::env::var("NOTION_API_KEY").is_ok();

    !env_file_exists && !has_api_key
}

/// Run interactive setup to collect required configuration
pub fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("Notion Timesheet - first time setup");
    println!();
    println!("No configuration found. Let's connect the server to Notion.");
    println!();

    let notion_api_key: String = Password::new()
        .with_prompt("Internal integration token (NOTION_API_KEY)")
        .interact()
        .context("Failed to read NOTION_API_KEY")?;

    if notion_api_key.trim().is_empty() {
        anyhow::bail!("NOTION_API_KEY cannot be empty");
    }

    println!();
    let modes = vec!["internal", "public"];
    let mode_idx = Select::new()
        .with_prompt("Integration type")
        .items(&modes)
        .default(0)
        .interact()
        .context("Failed to read integration type")?;
    let integration_type = modes[mode_idx].to_string();

    let (oauth_client_id, oauth_client_secret) = if integration_type == "public" {
        let id: String = Input::new()
            .with_prompt("OAuth client id (NOTION_OAUTH_CLIENT_ID)")
            .interact_text()
            .context("Failed to read NOTION_OAUTH_CLIENT_ID")?;
        let secret: String = Password::new()
            .with_prompt("OAuth client secret (NOTION_OAUTH_CLIENT_SECRET)")
            .interact()
            .context("Failed to read NOTION_OAUTH_CLIENT_SECRET")?;
        (Some(id), Some(secret))
    } else {
        (None, None)
    };

    println!();
    let server_port: String = Input::new()
        .with_prompt("Server port")
        .default("3001".to_string())
        .interact_text()
        .context("Failed to read server port")?;

    let config = InteractiveConfig {
        notion_api_key,
        integration_type,
        oauth_client_id,
        oauth_client_secret,
        server_port,
    };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!();
        println!("Configuration saved to .env file");
    }

    println!();
    Ok(config)
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub notion_api_key: String,
    pub integration_type: String,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub server_port: String,
}

impl InteractiveConfig {
    /// Export the collected values so `Config::load` picks them up
    pub fn apply_to_env(&self) {
        std::env::set_var("NOTION_API_KEY", &self.notion_api_key);
        std::env::set_var("INTEGRATION_TYPE", &self.integration_type);
        std::env::set_var("SERVER_PORT", &self.server_port);
        if let Some(id) = &self.oauth_client_id {
            std::env::set_var("NOTION_OAUTH_CLIENT_ID", id);
        }
        if let Some(secret) = &self.oauth_client_secret {
            std::env::set_var("NOTION_OAUTH_CLIENT_SECRET", secret);
        }
    }
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let mut env_content = format!(
        r#"# Notion Timesheet Configuration
# Generated by interactive setup

# Internal integration token (required, validated at startup)
NOTION_API_KEY={}
NOTION_API_VERSION=2022-06-28

# internal or public
INTEGRATION_TYPE={}

# Server settings
SERVER_HOST=0.0.0.0
SERVER_PORT={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.notion_api_key, config.integration_type, config.server_port,
    );

    if let (Some(id), Some(secret)) = (&config.oauth_client_id, &config.oauth_client_secret) {
        env_content.push_str(&format!(
            "\n# Public integration OAuth client\nNOTION_OAUTH_CLIENT_ID={}\nNOTION_OAUTH_CLIENT_SECRET={}\n",
            id, secret
        ));
    }

    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_content.as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
