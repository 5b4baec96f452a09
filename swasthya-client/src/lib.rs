use std::path::PathBuf;

use swasthya_shared::api::{self, rest::RestError};
use swasthya_shared::jwt::{self, JwtClaims};
use tracing::info;

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod login;

pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keyring error: {0}")]
    Keyring(String),
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn keyring_entry(server_url: &str) -> Result<keyring::Entry, AppError> {
    let service = "swasthya-client";
    keyring::Entry::new(service, &crate::config::normalize_server_url(server_url))
        .map_err(|e| AppError::Keyring(e.to_string()))
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();

    match cli.command {
        Some(Command::Login { server, username }) => login::login(server, username, cli.config).await,
        Some(Command::Dashboard { filter }) => show_dashboard(cli.config, filter.as_deref()).await,
        None => show_dashboard(cli.config, None).await,
        Some(Command::Add {
            child_name,
            age,
            gender,
            weight,
            status,
            kendra,
            school,
            symptoms,
        }) => {
            let session = Session::open(cli.config)?;
            let req = api::NewRecordReq {
                child_name: Some(child_name),
                age: Some(age),
                gender: Some(gender),
                weight: Some(weight),
                health_status: Some(status),
                anganwadi_kendra: Some(kendra),
                school_name: Some(school),
                symptoms,
            };
            let created = api::rest::create_record(&session.cfg.server_url, &session.token, &req)
                .await
                .map_err(rest_err)?;
            println!("Created record {} for {}", created.id, created.child_name);
            // Refresh from the server rather than patching the local view
            session.render_dashboard(None).await
        }
        Some(Command::SetStatus { id, status }) => {
            let session = Session::open(cli.config)?;
            let updated =
                api::rest::update_status(&session.cfg.server_url, &session.token, id, &status)
                    .await
                    .map_err(rest_err)?;
            println!(
                "Record {} is now {}",
                updated.id, updated.health_status
            );
            session.render_dashboard(None).await
        }
    }
}

async fn show_dashboard(cfg_path: Option<PathBuf>, filter: Option<&str>) -> Result<(), AppError> {
    Session::open(cfg_path)?.render_dashboard(filter).await
}

struct Session {
    cfg: ClientConfig,
    token: String,
    claims: JwtClaims,
}

impl Session {
    fn open(cfg_path: Option<PathBuf>) -> Result<Self, AppError> {
        let (cfg_path, cfg) = ClientConfig::find_and_load(cfg_path)?;
        info!(path=?cfg_path, "loaded config");
        let entry = keyring_entry(&cfg.server_url)?;
        let token = entry.get_password().map_err(|e| {
            AppError::Keyring(format!("{e}; run `swasthya-client login` first"))
        })?;
        let claims = jwt::decode_unverified(&token)
            .map_err(|e| AppError::Http(format!("invalid token: {e}")))?;
        Ok(Self { cfg, token, claims })
    }

    /// Fetch the caller's records and print stats plus the table,
    /// newest first, optionally narrowed by a case-insensitive filter.
    async fn render_dashboard(&self, filter: Option<&str>) -> Result<(), AppError> {
        let mut records =
            api::rest::list_records(&self.cfg.server_url, &self.token, &self.claims.sub)
                .await
                .map_err(rest_err)?;
        // Stats always cover the full set; the filter only narrows the table.
        let stats = dashboard::compute_stats(&records, chrono::Local::now().date_naive());
        if let Some(needle) = filter.map(str::trim).filter(|s| !s.is_empty()) {
            records.retain(|r| dashboard::matches_filter(r, needle));
        }
        dashboard::sort_newest_first(&mut records);
        dashboard::render(&records, &stats);
        Ok(())
    }
}

fn rest_err(e: RestError) -> AppError {
    match e {
        RestError::Status { status: 401, .. } => AppError::Http(
            "unauthorized; token may have expired, run `swasthya-client login` again".into(),
        ),
        other => AppError::Http(other.to_string()),
    }
}
