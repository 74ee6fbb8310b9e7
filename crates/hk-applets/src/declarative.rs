//! Applets described by a JSON descriptor.
//!
//! Remote and native-library applet sources do not hand the host compiled
//! Rust code.  They deliver a descriptor listing the card's controls and the
//! backend action each button triggers; the host turns it into an applet with
//! [`declarative_factory`].  A descriptor can only reach the backend through
//! the request client it is given, which keeps loaded applets
//! capability-scoped.
//!
//! ```json
//! {
//!   "controls": [
//!     {"kind": "input",  "id": "query", "placeholder": "Song"},
//!     {"kind": "button", "id": "play",  "label": "Play",
//!      "action": {"path": "music/play", "send_input": "query"}},
//!     {"kind": "button", "id": "status", "label": "Status",
//!      "action": {"method": "get", "path": "music"}}
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use hk_core::{factory, ApiClient, Applet, AppletError, AppletFactory, Card, Element, Region};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Error type for descriptor decoding and validation.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor is not valid: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("control id '{0}' is used more than once")]
    DuplicateControl(String),
    #[error("button '{0}' has an empty action path")]
    EmptyActionPath(String),
    #[error("button '{button}' sends input '{input}', which is not an input control")]
    UnknownInput { button: String, input: String },
}

/// HTTP method of a button action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMethod {
    Get,
    #[default]
    Post,
}

/// Backend request issued when a button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(default)]
    pub method: ActionMethod,
    pub path: String,
    /// Id of an input control whose value is posted as `{"value": …}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_input: Option<String>,
}

/// One entry of the card's content region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControlSpec {
    Text {
        text: String,
    },
    Input {
        id: String,
        #[serde(default)]
        placeholder: String,
    },
    Button {
        id: String,
        label: String,
        action: ActionSpec,
    },
}

/// A declarative applet description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppletDescriptor {
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
}

impl AppletDescriptor {
    /// Decodes and validates a descriptor from a JSON document.
    ///
    /// # Errors
    ///
    /// See [`DescriptorError`].
    pub fn from_value(doc: Value) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_value(doc)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Decodes and validates a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// See [`DescriptorError`].
    pub fn from_json(text: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(text)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks control ids are unique and every action is well-formed.
    ///
    /// # Errors
    ///
    /// See [`DescriptorError`].
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let mut ids = HashSet::new();
        let mut inputs = HashSet::new();
        for control in &self.controls {
            let id = match control {
                ControlSpec::Text { .. } => continue,
                ControlSpec::Input { id, .. } => {
                    inputs.insert(id.as_str());
                    id
                }
                ControlSpec::Button { id, .. } => id,
            };
            if !ids.insert(id.as_str()) {
                return Err(DescriptorError::DuplicateControl(id.clone()));
            }
        }

        for control in &self.controls {
            if let ControlSpec::Button { id, action, .. } = control {
                if hk_core::protocol::client::normalize_path(&action.path).is_empty() {
                    return Err(DescriptorError::EmptyActionPath(id.clone()));
                }
                if let Some(input) = &action.send_input {
                    if !inputs.contains(input.as_str()) {
                        return Err(DescriptorError::UnknownInput {
                            button: id.clone(),
                            input: input.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn elements(&self) -> Vec<Element> {
        self.controls
            .iter()
            .map(|control| match control {
                ControlSpec::Text { text } => Element::Text(text.clone()),
                ControlSpec::Input { id, placeholder } => Element::Input {
                    control: id.clone(),
                    placeholder: placeholder.clone(),
                },
                ControlSpec::Button { id, label, .. } => Element::Button {
                    control: id.clone(),
                    label: label.clone(),
                },
            })
            .collect()
    }

    fn action(&self, control: &str) -> Option<&ActionSpec> {
        self.controls.iter().find_map(|c| match c {
            ControlSpec::Button { id, action, .. } if id == control => Some(action),
            _ => None,
        })
    }

    fn is_input(&self, control: &str) -> bool {
        self.controls
            .iter()
            .any(|c| matches!(c, ControlSpec::Input { id, .. } if id == control))
    }
}

/// Builds a factory that mounts `descriptor` into every card it is given.
///
/// # Errors
///
/// Returns a [`DescriptorError`] if the descriptor does not validate.
pub fn declarative_factory(
    name: &str,
    descriptor: AppletDescriptor,
) -> Result<AppletFactory, DescriptorError> {
    descriptor.validate()?;
    let name = name.to_string();
    Ok(factory(move |card, api| {
        let applet = DeclarativeApplet::mount(&name, descriptor.clone(), card, api);
        Ok(Box::new(applet) as Box<dyn Applet>)
    }))
}

/// Applet instance driven by an [`AppletDescriptor`].
pub struct DeclarativeApplet {
    name: String,
    descriptor: AppletDescriptor,
    api: ApiClient,
    content: Region,
    inputs: Mutex<HashMap<String, String>>,
}

impl DeclarativeApplet {
    fn mount(name: &str, descriptor: AppletDescriptor, card: &Card, api: ApiClient) -> Self {
        let applet = Self {
            name: name.to_string(),
            descriptor,
            api,
            content: card.content().clone(),
            inputs: Mutex::new(HashMap::new()),
        };
        applet.render(None);
        applet
    }

    fn render(&self, status: Option<String>) {
        let mut elements = self.descriptor.elements();
        elements.extend(status.map(Element::Text));
        self.content.replace(elements);
    }

    fn input_value(&self, input: &str) -> String {
        self.inputs
            .lock()
            .ok()
            .and_then(|inputs| inputs.get(input).cloned())
            .unwrap_or_default()
    }

    async fn run(&self, action: &ActionSpec) -> Result<Value, AppletError> {
        let payload = match action.method {
            ActionMethod::Get => self.api.get(&action.path).await?,
            ActionMethod::Post => match &action.send_input {
                Some(input) => {
                    let body = json!({ "value": self.input_value(input) });
                    self.api.post(&action.path, &body).await?
                }
                None => self.api.post_empty(&action.path).await?,
            },
        };
        Ok(payload)
    }
}

#[async_trait]
impl Applet for DeclarativeApplet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_control(&self, control: &str, value: Option<String>) -> Result<(), AppletError> {
        if self.descriptor.is_input(control) {
            if let Ok(mut inputs) = self.inputs.lock() {
                inputs.insert(control.to_string(), value.unwrap_or_default());
            }
            return Ok(());
        }

        let action = self
            .descriptor
            .action(control)
            .ok_or_else(|| AppletError::UnknownControl(control.to_string()))?;

        match self.run(action).await {
            Ok(Value::Null) => {
                self.render(Some(format!("{control}: ok")));
                Ok(())
            }
            Ok(payload) => {
                self.render(Some(format!("{control}: {payload}")));
                Ok(())
            }
            Err(e) => {
                self.render(Some(format!("{control} failed")));
                Err(e)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
