//! The music control panel.
//!
//! Content region layout:
//!
//! ```text
//! <query input> [Play] [Stop] [Status]
//! <status line>
//! ```
//!
//! Backend actions (opaque to the host):
//!
//! | Control  | Request                                   |
//! |----------|-------------------------------------------|
//! | `play`   | `POST music/play` with `{"query": …}` or `{}` |
//! | `stop`   | `POST music/stop` with `{}`               |
//! | `status` | `GET music`                               |

use std::sync::Mutex;

use async_trait::async_trait;
use hk_core::{
    factory, ApiClient, Applet, AppletError, AppletName, Card, Element, Region, Registrar,
};
use serde_json::{json, Value};
use tracing::debug;

/// Name the applet registers under.
pub const NAME: &str = "music";

/// Entry point: registers the music applet factory.
pub fn register(registrar: &Registrar) {
    let Ok(name) = AppletName::parse(NAME) else {
        return;
    };
    registrar.register(
        name,
        factory(|card, api| Ok(Box::new(MusicApplet::mount(card, api)) as Box<dyn Applet>)),
    );
}

/// Music applet instance bound to one card.
pub struct MusicApplet {
    api: ApiClient,
    content: Region,
    query: Mutex<String>,
}

impl MusicApplet {
    /// Builds the controls into `card`'s content region.
    pub fn mount(card: &Card, api: ApiClient) -> Self {
        let applet = Self {
            api,
            content: card.content().clone(),
            query: Mutex::new(String::new()),
        };
        applet.render("idle");
        applet
    }

    fn render(&self, status: &str) {
        self.content.replace(vec![
            Element::Input {
                control: "query".to_string(),
                placeholder: "Song or playlist".to_string(),
            },
            Element::Button {
                control: "play".to_string(),
                label: "Play".to_string(),
            },
            Element::Button {
                control: "stop".to_string(),
                label: "Stop".to_string(),
            },
            Element::Button {
                control: "status".to_string(),
                label: "Status".to_string(),
            },
            Element::Text(status.to_string()),
        ]);
    }

    fn current_query(&self) -> String {
        self.query
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    async fn play(&self) -> Result<Value, AppletError> {
        let query = self.current_query();
        let result = if query.is_empty() {
            self.api.post_empty("music/play").await?
        } else {
            self.api.post("music/play", &json!({ "query": query })).await?
        };
        Ok(result)
    }
}

#[async_trait]
impl Applet for MusicApplet {
    fn name(&self) -> &str {
        NAME
    }

    async fn on_control(&self, control: &str, value: Option<String>) -> Result<(), AppletError> {
        debug!(control, "music control activated");
        let outcome = match control {
            "query" => {
                if let Ok(mut query) = self.query.lock() {
                    *query = value.unwrap_or_default();
                }
                return Ok(());
            }
            "play" => self.play().await,
            "stop" => self.api.post_empty("music/stop").await.map_err(AppletError::from),
            "status" => self.api.get("music").await.map_err(AppletError::from),
            other => return Err(AppletError::UnknownControl(other.to_string())),
        };

        match outcome {
            Ok(payload) => {
                self.render(&describe(control, &payload));
                Ok(())
            }
            Err(e) => {
                self.render(&format!("{control} failed"));
                Err(e)
            }
        }
    }
}

fn describe(control: &str, payload: &Value) -> String {
    match payload {
        Value::Null => format!("{control}: ok"),
        Value::String(s) => format!("{control}: {s}"),
        other => format!("{control}: {other}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
