//! LoadAppletsUseCase: one discovery-and-mount cycle.
//!
//! # Cycle phases (for beginners)
//!
//! ```text
//! Idle ──► Discovering ──► Filtering ──► Loading ──► Done
//!               │
//!               └──► Failed   (discovery error: nothing is loaded)
//! ```
//!
//! - `Discovering`: read the manifest from the discovery endpoint (`_/`).
//! - `Filtering`: keep manifest keys without a `/`; optionally keep only
//!   names that are already registered.
//! - `Loading`: every candidate gets its own Tokio task and runs its own
//!   pipeline, independently of all other candidates.
//!
//! # Per-candidate pipeline
//!
//! ```text
//! LoadRequested ──► CodeLoaded ──► Registered ──► Mounted
//!       │                │              │
//!       └─ Load /        └─ Missing     └─ Instantiate
//!          LoadTimeout      Registration
//! ```
//!
//! `CodeLoaded` (the source finished) and `Registered` (a factory exists for
//! the name) are separate steps: the loader waits for the registration
//! itself, bounded by a timeout, instead of assuming that finished loading
//! implies registered.
//!
//! Under [`CandidatePolicy::PreRegisteredOnly`] every candidate already has a
//! factory, so a failed or timed-out load is logged and the candidate is
//! mounted with the factory it was registered with.
//!
//! Mounted cards are appended to the container as each pipeline finishes,
//! so container order is completion order.  A failure, a timeout, or even a
//! panic inside one pipeline is recorded in the [`CycleReport`] and never
//! affects any other candidate.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hk_core::{
    ApiClient, ApiError, AppletError, AppletName, Card, CardId, Container, Manifest, ManifestError,
    Registry, Wrapper,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::infrastructure::applet_source::{AppletSource, SourceError};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Which discovered names become candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// Every manifest key without a `/`.
    #[default]
    All,
    /// Only keys already present in the registry when the cycle starts.
    PreRegisteredOnly,
}

/// Settings for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Path of the discovery endpoint, relative to the base address.
    pub discovery_path: String,
    /// Upper bound for a source to finish loading one applet.
    pub load_timeout: Duration,
    /// Upper bound for a factory to appear after its code has loaded.
    pub registration_timeout: Duration,
    pub candidate_policy: CandidatePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            discovery_path: "_/".to_string(),
            load_timeout: Duration::from_secs(10),
            registration_timeout: Duration::from_secs(5),
            candidate_policy: CandidatePolicy::All,
        }
    }
}

// ── Phases, events, errors ────────────────────────────────────────────────────

/// Phase of the cycle, as logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Discovering,
    Filtering,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Filtering => "filtering",
            Self::Loading => "loading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Observable progress of a cycle, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Filtering finished; these names will be loaded.
    Discovered { candidates: Vec<AppletName> },
    LoadRequested { name: AppletName },
    /// The source finished loading the applet's code.
    CodeLoaded { name: AppletName },
    /// A factory is registered under the name.
    Registered { name: AppletName },
    Mounted { name: AppletName, card_id: CardId },
    Failed { name: AppletName, error: String },
}

/// Why one candidate was not mounted.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("loading failed: {0}")]
    Load(#[source] SourceError),
    #[error("loading did not finish within {0:?}")]
    LoadTimeout(Duration),
    #[error("code loaded but never registered")]
    MissingRegistration,
    #[error("instantiation failed: {0}")]
    Instantiate(#[source] AppletError),
    #[error("candidate task panicked: {0}")]
    Panicked(String),
}

/// A candidate that failed, with the reason.
#[derive(Debug)]
pub struct CandidateFailure {
    pub name: AppletName,
    pub error: CandidateError,
}

/// A candidate that was mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedApplet {
    pub name: AppletName,
    pub card_id: CardId,
}

/// Error that aborts a whole cycle before any candidate is loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] ApiError),
    #[error("invalid discovery manifest: {0}")]
    Manifest(#[from] ManifestError),
}

/// Outcome of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Names that were loaded, in manifest order.
    pub candidates: Vec<AppletName>,
    /// Names excluded by [`CandidatePolicy::PreRegisteredOnly`].
    pub skipped: Vec<AppletName>,
    /// Mounted applets, in completion order.
    pub mounted: Vec<MountedApplet>,
    /// Failed candidates, in completion order.
    pub failed: Vec<CandidateFailure>,
}

impl CycleReport {
    /// Mounted names, sorted.
    pub fn mounted_names(&self) -> Vec<AppletName> {
        let mut names: Vec<AppletName> = self.mounted.iter().map(|m| m.name.clone()).collect();
        names.sort();
        names
    }

    pub fn failure(&self, name: &str) -> Option<&CandidateError> {
        self.failed
            .iter()
            .find(|f| f.name.as_str() == name)
            .map(|f| &f.error)
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Runs discovery-and-mount cycles against one registry and one container.
pub struct Loader {
    config: LoaderConfig,
    api: ApiClient,
    registry: Arc<Registry>,
    source: Arc<dyn AppletSource>,
    container: Arc<Mutex<Container>>,
    events: Option<mpsc::UnboundedSender<LoaderEvent>>,
}

impl Loader {
    pub fn new(
        config: LoaderConfig,
        api: ApiClient,
        registry: Arc<Registry>,
        source: Arc<dyn AppletSource>,
        container: Arc<Mutex<Container>>,
    ) -> Self {
        Self {
            config,
            api,
            registry,
            source,
            container,
            events: None,
        }
    }

    /// Returns a receiver for the events of every following cycle.
    ///
    /// Subscribing again replaces the previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LoaderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Reads the manifest and returns the names without a path separator.
    ///
    /// # Errors
    ///
    /// [`LoadError::Discovery`] when the endpoint cannot be read,
    /// [`LoadError::Manifest`] when it is not a JSON object.
    pub async fn discover(&self) -> Result<Vec<AppletName>, LoadError> {
        let doc = self.api.fetch_document(&self.config.discovery_path).await?;
        let manifest = Manifest::from_value(doc)?;
        let candidates = manifest.candidates();
        debug!(
            keys = manifest.len(),
            candidates = candidates.len(),
            "manifest read"
        );
        Ok(candidates)
    }

    /// Runs one cycle, appending to whatever the container already holds.
    ///
    /// # Errors
    ///
    /// Only discovery errors; per-candidate failures are in the report.
    pub async fn load_applets(&self) -> Result<CycleReport, LoadError> {
        self.cycle(false).await
    }

    /// Runs one cycle that replaces the container's contents.
    ///
    /// The container is cleared only after discovery succeeds, so a failed
    /// discovery leaves the current dashboard in place.
    ///
    /// # Errors
    ///
    /// Only discovery errors; per-candidate failures are in the report.
    pub async fn reload_applets(&self) -> Result<CycleReport, LoadError> {
        self.cycle(true).await
    }

    async fn cycle(&self, replace: bool) -> Result<CycleReport, LoadError> {
        log_phase(CyclePhase::Idle, CyclePhase::Discovering);
        let discovered = match self.discover().await {
            Ok(names) => names,
            Err(e) => {
                log_phase(CyclePhase::Discovering, CyclePhase::Failed);
                error!("applet discovery failed: {e}");
                return Err(e);
            }
        };

        log_phase(CyclePhase::Discovering, CyclePhase::Filtering);
        let (candidates, skipped) = self.filter(discovered);
        self.emit(LoaderEvent::Discovered {
            candidates: candidates.clone(),
        });

        if replace {
            lock(&self.container).clear();
        }

        log_phase(CyclePhase::Filtering, CyclePhase::Loading);
        let mut tasks = JoinSet::new();
        let mut task_names = HashMap::new();
        for name in &candidates {
            let job = self.job_for(name.clone());
            let handle = tasks.spawn(job.run());
            task_names.insert(handle.id(), name.clone());
        }

        let mut report = CycleReport {
            candidates,
            skipped,
            ..CycleReport::default()
        };
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(mounted))) => report.mounted.push(mounted),
                Ok((_, Err(failure))) => report.failed.push(failure),
                Err(join_error) => {
                    let Some(name) = task_names.get(&join_error.id()).cloned() else {
                        continue;
                    };
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    let error = CandidateError::Panicked(reason);
                    warn!(applet = %name, "{error}");
                    self.emit(LoaderEvent::Failed {
                        name: name.clone(),
                        error: error.to_string(),
                    });
                    report.failed.push(CandidateFailure { name, error });
                }
            }
        }

        log_phase(CyclePhase::Loading, CyclePhase::Done);
        info!(
            candidates = report.candidates.len(),
            mounted = report.mounted.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "applet cycle finished"
        );
        Ok(report)
    }

    /// Splits discovered names into candidates and names the policy skips.
    fn filter(&self, discovered: Vec<AppletName>) -> (Vec<AppletName>, Vec<AppletName>) {
        match self.config.candidate_policy {
            CandidatePolicy::All => (discovered, Vec::new()),
            CandidatePolicy::PreRegisteredOnly => discovered
                .into_iter()
                .partition(|name| self.registry.contains(name)),
        }
    }

    fn job_for(&self, name: AppletName) -> CandidateJob {
        CandidateJob {
            name,
            api: self.api.clone(),
            registry: Arc::clone(&self.registry),
            source: Arc::clone(&self.source),
            container: Arc::clone(&self.container),
            events: self.events.clone(),
            pre_registered: self.config.candidate_policy == CandidatePolicy::PreRegisteredOnly,
            load_timeout: self.config.load_timeout,
            registration_timeout: self.config.registration_timeout,
        }
    }

    fn emit(&self, event: LoaderEvent) {
        emit(&self.events, event);
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("api", &self.api)
            .finish()
    }
}

/// Everything one candidate's task needs, owned so the task is `'static`.
struct CandidateJob {
    name: AppletName,
    api: ApiClient,
    registry: Arc<Registry>,
    source: Arc<dyn AppletSource>,
    container: Arc<Mutex<Container>>,
    events: Option<mpsc::UnboundedSender<LoaderEvent>>,
    /// A factory was registered before the cycle started.
    pre_registered: bool,
    load_timeout: Duration,
    registration_timeout: Duration,
}

impl CandidateJob {
    async fn run(self) -> Result<MountedApplet, CandidateFailure> {
        match self.mount().await {
            Ok(mounted) => Ok(mounted),
            Err(error) => {
                warn!(applet = %self.name, "applet not mounted: {error}");
                emit(
                    &self.events,
                    LoaderEvent::Failed {
                        name: self.name.clone(),
                        error: error.to_string(),
                    },
                );
                Err(CandidateFailure {
                    name: self.name,
                    error,
                })
            }
        }
    }

    async fn mount(&self) -> Result<MountedApplet, CandidateError> {
        let name = &self.name;

        emit(&self.events, LoaderEvent::LoadRequested { name: name.clone() });
        let registrar = self.registry.registrar();
        let loaded = tokio::time::timeout(self.load_timeout, self.source.load(name, &registrar))
            .await
            .map_err(|_| CandidateError::LoadTimeout(self.load_timeout))
            .and_then(|result| result.map_err(CandidateError::Load));
        match loaded {
            Ok(()) => {
                debug!(applet = %name, "applet code loaded");
                emit(&self.events, LoaderEvent::CodeLoaded { name: name.clone() });
            }
            Err(error) if self.pre_registered => {
                warn!(applet = %name, "using pre-registered factory: {error}");
            }
            Err(error) => return Err(error),
        }

        let factory = self
            .registry
            .wait_registered(name, self.registration_timeout)
            .await
            .ok_or(CandidateError::MissingRegistration)?;
        emit(&self.events, LoaderEvent::Registered { name: name.clone() });

        let card = Card::new(name.as_str());
        let applet = factory(&card, self.api.clone()).map_err(CandidateError::Instantiate)?;
        let card_id = card.id();
        lock(&self.container).append(Wrapper::new(name.clone(), card, applet));

        info!(applet = %name, %card_id, "applet mounted");
        emit(
            &self.events,
            LoaderEvent::Mounted {
                name: name.clone(),
                card_id,
            },
        );
        Ok(MountedApplet {
            name: name.clone(),
            card_id,
        })
    }
}

fn emit(events: &Option<mpsc::UnboundedSender<LoaderEvent>>, event: LoaderEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn log_phase(from: CyclePhase, to: CyclePhase) {
    debug!(%from, %to, "loader phase");
}

fn lock(container: &Mutex<Container>) -> MutexGuard<'_, Container> {
    container
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
