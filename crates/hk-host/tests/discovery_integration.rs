//! Integration tests for the discovery-and-mount cycle.
//!
//! These tests drive a [`Host`] through its public API with a scripted
//! in-memory backend, exercising discovery, candidate filtering, the applet
//! sources, the registry, and the container together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hk_core::protocol::mock::MockTransport;
use hk_core::{ApiClient, AppletName, Element, Method, Registrar, Transport};
use hk_host::application::host::Host;
use hk_host::application::load_applets::{
    CandidateError, CandidatePolicy, LoadError, LoaderConfig, LoaderEvent,
};
use hk_host::infrastructure::applet_source::{
    AppletSource, BundledSource, RemoteSource, SourceError,
};
use serde_json::json;

const BASE: &str = "http://localhost:8000/";
const MANIFEST_URL: &str = "http://localhost:8000/_/";

/// Delegates to the bundled source and records every name it is asked for.
#[derive(Default)]
struct RecordingSource {
    inner: BundledSource,
    loads: Mutex<Vec<String>>,
}

impl RecordingSource {
    fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppletSource for RecordingSource {
    async fn load(&self, name: &AppletName, registrar: &Registrar) -> Result<(), SourceError> {
        self.loads.lock().unwrap().push(name.to_string());
        self.inner.load(name, registrar).await
    }
}

fn config() -> LoaderConfig {
    LoaderConfig {
        load_timeout: Duration::from_secs(2),
        registration_timeout: Duration::from_millis(200),
        ..LoaderConfig::default()
    }
}

fn host_with(transport: &Arc<MockTransport>, source: Arc<dyn AppletSource>) -> Host {
    Host::new(
        BASE,
        config(),
        Arc::clone(transport) as Arc<dyn Transport>,
        source,
    )
}

#[tokio::test]
async fn test_manifest_with_resource_key_mounts_exactly_one_card() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"music": {}, "static/foo": {}}));
    let source = Arc::new(RecordingSource::default());
    let host = host_with(&transport, Arc::clone(&source) as Arc<dyn AppletSource>);

    // Act
    host.start().await.expect("discovery must succeed");

    // Assert
    assert_eq!(source.loads(), vec!["music"]);
    let container = host.container();
    assert_eq!(container.len(), 1);
    let card = container.wrappers()[0].card();
    assert_eq!(card.title().snapshot(), vec![Element::Text("music".to_string())]);
    assert!(card.has_control("play"));
}

#[tokio::test]
async fn test_discovery_network_failure_attempts_no_loads() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    transport.fail(MANIFEST_URL);
    let source = Arc::new(RecordingSource::default());
    let host = host_with(&transport, Arc::clone(&source) as Arc<dyn AppletSource>);

    // Act
    let result = host.start().await;

    // Assert
    assert!(matches!(result, Err(LoadError::Discovery(_))));
    assert!(source.loads().is_empty());
    assert!(host.container().is_empty());
    assert_eq!(transport.requested_urls(), vec![MANIFEST_URL.to_string()]);
}

#[tokio::test]
async fn test_unregistered_candidate_does_not_block_the_rest() {
    // Arrange: `ghost` is advertised but the bundled catalog has no code for it
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"ghost": {}, "music": {}}));
    let host = host_with(&transport, Arc::new(RecordingSource::default()));

    // Act
    let report = host.start().await.unwrap();

    // Assert
    assert_eq!(host.mounted_names(), vec![AppletName::parse("music").unwrap()]);
    assert!(matches!(report.failure("ghost"), Some(CandidateError::Load(_))));
}

#[tokio::test]
async fn test_remote_descriptor_applet_round_trip() {
    // Arrange: discovery, the descriptor, and the applet's backend action
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"lights": {}, "lights/on": {}}));
    transport.respond_json(
        "http://localhost:8000/static/js/applets/lights.json",
        json!({"controls": [
            {"kind": "input", "id": "room", "placeholder": "Room"},
            {"kind": "button", "id": "on", "label": "On",
             "action": {"path": "/lights/on/", "send_input": "room"}}
        ]}),
    );
    transport.respond_json("http://localhost:8000/lights/on", json!({"result": "kitchen lit"}));
    let api = ApiClient::new(BASE, Arc::clone(&transport) as Arc<dyn Transport>);
    let source = RemoteSource::new(api, "static/js/applets/{name}.json");
    let host = host_with(&transport, Arc::new(source));
    host.start().await.unwrap();

    // Act
    host.activate("lights", "room", Some("kitchen".to_string()))
        .await
        .unwrap();
    host.activate("lights", "on", None).await.unwrap();

    // Assert
    let request = transport
        .requests()
        .into_iter()
        .find(|r| r.url == "http://localhost:8000/lights/on")
        .expect("action request sent");
    assert_eq!(request.method, Method::Post);
    let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
    assert_eq!(body, json!({"value": "kitchen"}));
    assert!(host.render_text().contains("on: \"kitchen lit\""));
}

#[tokio::test]
async fn test_failed_backend_call_surfaces_to_caller() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"music": {}}));
    transport.fail("http://localhost:8000/music/stop");
    let host = host_with(&transport, Arc::new(BundledSource::new()));
    host.start().await.unwrap();

    // Act
    let result = host.activate("music", "stop", None).await;

    // Assert
    assert!(result.is_err());
    assert!(host.render_text().contains("stop failed"));
}

#[tokio::test]
async fn test_events_separate_code_loaded_from_registered() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"music": {}}));
    let mut host = host_with(&transport, Arc::new(BundledSource::new()));
    let mut events = host.subscribe();

    // Act
    host.start().await.unwrap();

    // Assert
    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            LoaderEvent::Discovered { .. } => "discovered",
            LoaderEvent::LoadRequested { .. } => "load_requested",
            LoaderEvent::CodeLoaded { .. } => "code_loaded",
            LoaderEvent::Registered { .. } => "registered",
            LoaderEvent::Mounted { .. } => "mounted",
            LoaderEvent::Failed { .. } => "failed",
        });
    }
    assert_eq!(
        kinds,
        vec!["discovered", "load_requested", "code_loaded", "registered", "mounted"]
    );
}

#[tokio::test]
async fn test_refresh_runs_a_fresh_discovery() {
    // Arrange
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"music": {}}));
    let host = host_with(&transport, Arc::new(BundledSource::new()));
    host.start().await.unwrap();

    // Act: the backend stops advertising music
    transport.respond_json(MANIFEST_URL, json!({}));
    host.refresh().await.unwrap();

    // Assert
    assert!(host.container().is_empty());
    let discoveries = transport
        .requested_urls()
        .into_iter()
        .filter(|u| u == MANIFEST_URL)
        .count();
    assert_eq!(discoveries, 2);
}

#[tokio::test]
async fn test_slow_descriptor_times_out_while_sibling_mounts() {
    // Arrange: two remote applets, one served too slowly
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"slow": {}, "fast": {}}));
    let descriptor = json!({"controls": [{"kind": "text", "text": "hello"}]});
    transport.respond_json(
        "http://localhost:8000/static/js/applets/slow.json",
        descriptor.clone(),
    );
    transport.respond_json("http://localhost:8000/static/js/applets/fast.json", descriptor);
    transport.delay(
        "http://localhost:8000/static/js/applets/slow.json",
        Duration::from_secs(5),
    );
    let api = ApiClient::new(BASE, Arc::clone(&transport) as Arc<dyn Transport>);
    let config = LoaderConfig {
        load_timeout: Duration::from_millis(100),
        ..config()
    };
    let host = Host::new(
        BASE,
        config,
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(RemoteSource::new(api, "static/js/applets/{name}.json")),
    );

    // Act
    let report = host.start().await.unwrap();

    // Assert
    assert_eq!(host.mounted_names(), vec![AppletName::parse("fast").unwrap()]);
    assert!(matches!(report.failure("slow"), Some(CandidateError::LoadTimeout(_))));
    assert!(host.render_text().contains("hello"));
}

#[tokio::test]
async fn test_pre_registered_bundled_applet_survives_missing_remote_code() {
    // Arrange: music is bundled up front; the backend serves no descriptor for it
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(MANIFEST_URL, json!({"music": {}, "weather": {}}));
    let api = ApiClient::new(BASE, Arc::clone(&transport) as Arc<dyn Transport>);
    let config = LoaderConfig {
        candidate_policy: CandidatePolicy::PreRegisteredOnly,
        ..config()
    };
    let host = Host::new(
        BASE,
        config,
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(RemoteSource::new(api, "static/js/applets/{name}.json")),
    );
    BundledSource::new().preregister(&host.registrar());

    // Act
    let report = host.start().await.unwrap();

    // Assert
    assert!(report.is_complete());
    assert_eq!(report.skipped, vec![AppletName::parse("weather").unwrap()]);
    assert_eq!(host.mounted_names(), vec![AppletName::parse("music").unwrap()]);
}
