use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf};

/// Records returned per listing page.
pub const PAGE_SIZE: i64 = 10;

/// Largest accepted upload, inclusive.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Extensions (lower-case, with leading dot) accepted by the validator.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// URL prefix under which stored blobs are published.
pub const PUBLIC_PREFIX: &str = "/images";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and handed to each component by value.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub database_url: String,
    /// Optional plain-text log file, written alongside stdout.
    pub log_file: Option<PathBuf>,
    pub limits: UploadLimits,
}

/// Fixed upload and listing limits.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub page_size: i64,
    pub public_prefix: String,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            page_size: PAGE_SIZE,
            public_prefix: PUBLIC_PREFIX.to_string(),
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image upload and hosting service")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_HOSTING_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_HOSTING_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where image files are stored (overrides IMAGE_HOSTING_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Database URL (overrides IMAGE_HOSTING_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Also append logs to this file, e.g. ./logs/app.log (overrides IMAGE_HOSTING_LOG_FILE)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Apply the schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        let env_host = env::var("IMAGE_HOSTING_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGE_HOSTING_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGE_HOSTING_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8000,
            Err(err) => return Err(err).context("reading IMAGE_HOSTING_PORT"),
        };
        let env_upload_dir = env::var("IMAGE_HOSTING_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./images"));
        let env_db = env::var("IMAGE_HOSTING_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/images.db".into());
        let env_log_file = env::var_os("IMAGE_HOSTING_LOG_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            database_url: args.database_url.unwrap_or(env_db),
            log_file: args.log_file.or(env_log_file),
            limits: UploadLimits::default(),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
