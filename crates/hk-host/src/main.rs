//! Housekeeper dashboard host — entry point.
//!
//! Runs one discovery-and-mount cycle against the backend, optionally
//! presses some controls, and prints the resulting dashboard.
//!
//! # Usage
//!
//! ```text
//! housekeeper [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --base-url <URL>       Backend base address
//!   --source <KIND>        remote | bundled | dylib
//!   --applet-dir <DIR>     Directory of native applet libraries
//!   --format <FORMAT>      text | html [default: text]
//!   --press <NAME:CONTROL[=VALUE]>  Activate a control after mounting (repeatable)
//! ```
//!
//! Flags override the config file.  `RUST_LOG` overrides the config's
//! `log_level`.
//!
//! # Exit status
//!
//! Non-zero only when the configuration cannot be read or discovery fails.
//! Individual applets that fail to load are logged and left out.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use hk_core::{ApiClient, Transport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hk_host::application::host::Host;
use hk_host::application::load_applets::CandidatePolicy;
use hk_host::infrastructure::applet_source::{build_source, BundledSource, SourceKind};
use hk_host::infrastructure::network::ReqwestTransport;
use hk_host::infrastructure::storage::config::{self, ConfigError, HostConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Housekeeper dashboard host.
#[derive(Debug, Parser)]
#[command(
    name = "housekeeper",
    about = "Discovers, loads, and mounts dashboard applets",
    version
)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, env = "HOUSEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Base address of the backend (e.g. `http://localhost:8000/`).
    #[arg(long, env = "HOUSEKEEPER_BASE_URL")]
    base_url: Option<String>,

    /// Where applet code is loaded from.
    #[arg(long, env = "HOUSEKEEPER_SOURCE")]
    source: Option<SourceKind>,

    /// Directory searched for native applet libraries.
    #[arg(long, env = "HOUSEKEEPER_APPLET_DIR")]
    applet_dir: Option<PathBuf>,

    /// How the dashboard is printed.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Control to activate after mounting, as `NAME:CONTROL[=VALUE]`.
    #[arg(long = "press", value_name = "NAME:CONTROL[=VALUE]")]
    presses: Vec<Press>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Html,
}

/// One `--press` action.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Press {
    applet: String,
    control: String,
    value: Option<String>,
}

impl FromStr for Press {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (applet, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected NAME:CONTROL[=VALUE], got '{s}'"))?;
        let (control, value) = match rest.split_once('=') {
            Some((control, value)) => (control, Some(value.to_string())),
            None => (rest, None),
        };
        if applet.is_empty() || control.is_empty() {
            return Err(format!("applet and control must be non-empty in '{s}'"));
        }
        Ok(Self {
            applet: applet.to_string(),
            control: control.to_string(),
            value,
        })
    }
}

impl Cli {
    /// Reads the config file and applies flag overrides.
    fn host_config(&self) -> anyhow::Result<HostConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("could not read config {}", path.display()))?,
            None => match config::load_config() {
                Ok(cfg) => cfg,
                Err(ConfigError::NoPlatformConfigDir) => HostConfig::default(),
                Err(e) => return Err(e).context("could not read config"),
            },
        };

        if let Some(base_url) = &self.base_url {
            cfg.host.base_url = base_url.clone();
        }
        if let Some(kind) = self.source {
            cfg.source.kind = kind;
        }
        if let Some(dir) = &self.applet_dir {
            cfg.source.applet_dir = dir.clone();
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.host_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.host.log_level)),
        )
        .init();

    info!(
        base_url = %cfg.host.base_url,
        source = ?cfg.source.kind,
        "housekeeper starting"
    );

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(cfg.request_timeout()));
    let api = ApiClient::new(&cfg.host.base_url, Arc::clone(&transport));
    let source = build_source(&cfg.source_settings(), &api);
    let host = Host::new(&cfg.host.base_url, cfg.loader_config(), transport, source);

    if cfg.loader.candidate_policy == CandidatePolicy::PreRegisteredOnly {
        BundledSource::new().preregister(&host.registrar());
    }

    let report = host.start().await.context("applet discovery failed")?;
    for failure in &report.failed {
        warn!(applet = %failure.name, "applet left out: {}", failure.error);
    }

    for press in &cli.presses {
        if let Err(e) = host
            .activate(&press.applet, &press.control, press.value.clone())
            .await
        {
            warn!(applet = %press.applet, control = %press.control, "control failed: {e}");
        }
    }

    match cli.format {
        Format::Text => print!("{}", host.render_text()),
        Format::Html => println!("{}", host.render_html()),
    }
    Ok(())
}
