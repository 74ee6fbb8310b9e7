//! The Card: a passive mount surface owned by exactly one applet instance.
//!
//! A card owns two regions: a title region labelled with the applet's name,
//! and a content region that the applet fills in while it is being
//! constructed.  Cards are created immediately before instantiation and are
//! never reused across applets.
//!
//! # Regions are shared handles
//!
//! [`Region`] wraps an `Arc<Mutex<Vec<Element>>>`.  Cloning a region clones the
//! handle, not the elements, so an applet can keep a clone of its content
//! region and update it later (e.g. to show a status line) while the host
//! keeps the card in its container.  [`Region::same_region`] compares handle
//! identity, which is how "two cards never share a region" is checked.

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Unique identifier of a [`Card`].
pub type CardId = Uuid;

/// Unique identifier of a [`Region`].
pub type RegionId = Uuid;

/// One item inside a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Static text.
    Text(String),
    /// A clickable control.  `control` is the id passed back to the applet.
    Button { control: String, label: String },
    /// A single-line text field.  Its current value accompanies control events.
    Input { control: String, placeholder: String },
}

/// A shared, owned list of [`Element`]s.
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    elements: Arc<Mutex<Vec<Element>>>,
}

impl Region {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            elements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Appends `element` to the end of the region.
    pub fn push(&self, element: Element) {
        self.lock().push(element);
    }

    /// Replaces every element in the region.
    pub fn replace(&self, elements: Vec<Element>) {
        *self.lock() = elements;
    }

    /// Returns a copy of the current elements.
    pub fn snapshot(&self) -> Vec<Element> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `true` if both handles refer to the same underlying region.
    pub fn same_region(&self, other: &Region) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Element>> {
        // A panic while holding the lock leaves a Vec that is still valid.
        self.elements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Mount surface for one applet instance.
#[derive(Debug, Clone)]
pub struct Card {
    id: CardId,
    name: String,
    title: Region,
    content: Region,
}

impl Card {
    /// Creates a card with two fresh regions and labels the title with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let title = Region::new();
        title.push(Element::Text(name.clone()));
        Self {
            id: Uuid::new_v4(),
            name,
            title,
            content: Region::new(),
        }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    /// The display name the title region was labelled with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &Region {
        &self.title
    }

    pub fn content(&self) -> &Region {
        &self.content
    }

    /// `true` if the card contains an input or button with this control id.
    pub fn has_control(&self, control: &str) -> bool {
        self.content.snapshot().iter().any(|e| match e {
            Element::Button { control: c, .. } | Element::Input { control: c, .. } => c == control,
            Element::Text(_) => false,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
