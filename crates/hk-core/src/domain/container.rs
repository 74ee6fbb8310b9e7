//! The host container that mounted cards are appended to.
//!
//! Each mounted applet becomes one [`Wrapper`] holding the card's two regions
//! and the applet instance that populated them.  Wrappers are kept in append
//! order, which is load-completion order rather than manifest order; callers
//! that compare containers should compare the set of names.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::domain::applet::AppletName;
use crate::domain::card::{Card, CardId, Element, Region};
use crate::registry::Applet;

/// One mounted applet: its card plus the instance that owns it.
#[derive(Clone)]
pub struct Wrapper {
    name: AppletName,
    card: Card,
    applet: Arc<dyn Applet>,
}

impl Wrapper {
    pub fn new(name: AppletName, card: Card, applet: Box<dyn Applet>) -> Self {
        Self {
            name,
            card,
            applet: Arc::from(applet),
        }
    }

    pub fn name(&self) -> &AppletName {
        &self.name
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn applet(&self) -> Arc<dyn Applet> {
        Arc::clone(&self.applet)
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("name", &self.name)
            .field("card", &self.card.id())
            .finish()
    }
}

/// The root container of the dashboard.
#[derive(Debug, Default, Clone)]
pub struct Container {
    wrappers: Vec<Wrapper>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wrapper as the last child of the container.
    pub fn append(&mut self, wrapper: Wrapper) {
        self.wrappers.push(wrapper);
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Removes every wrapper, dropping the applet instances they own.
    pub fn clear(&mut self) {
        self.wrappers.clear();
    }

    pub fn wrappers(&self) -> &[Wrapper] {
        &self.wrappers
    }

    /// Names of the mounted applets, in append order.
    pub fn names(&self) -> Vec<AppletName> {
        self.wrappers.iter().map(|w| w.name.clone()).collect()
    }

    /// Finds the wrapper whose card has `id`.
    pub fn find(&self, id: CardId) -> Option<&Wrapper> {
        self.wrappers.iter().find(|w| w.card.id() == id)
    }

    /// Finds the first wrapper mounted under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Wrapper> {
        self.wrappers.iter().find(|w| w.name.as_str() == name)
    }

    /// Renders the container as HTML, one `div` per wrapper.
    pub fn render_html(&self) -> String {
        let mut out = String::from("<div class=\"container\">");
        for wrapper in &self.wrappers {
            let _ = write!(
                out,
                "<div class=\"applet {}\"><div class=\"applet-title\">",
                escape_html(wrapper.name.as_str())
            );
            render_region_html(&mut out, wrapper.card.title());
            out.push_str("</div><div class=\"applet-content\">");
            render_region_html(&mut out, wrapper.card.content());
            out.push_str("</div></div>");
        }
        out.push_str("</div>");
        out
    }

    /// Renders a plain-text outline of the container for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for wrapper in &self.wrappers {
            let title: Vec<String> = wrapper
                .card
                .title()
                .snapshot()
                .iter()
                .map(element_text)
                .collect();
            let _ = writeln!(out, "┌─ {}", title.join(" "));
            for element in wrapper.card.content().snapshot() {
                let _ = writeln!(out, "│  {}", element_text(&element));
            }
            out.push_str("└─\n");
        }
        out
    }
}

fn render_region_html(out: &mut String, region: &Region) {
    for element in region.snapshot() {
        match element {
            Element::Text(text) => out.push_str(&escape_html(&text)),
            Element::Button { control, label } => {
                let _ = write!(
                    out,
                    "<button data-control=\"{}\">{}</button>",
                    escape_html(&control),
                    escape_html(&label)
                );
            }
            Element::Input {
                control,
                placeholder,
            } => {
                let _ = write!(
                    out,
                    "<input type=\"text\" data-control=\"{}\" placeholder=\"{}\">",
                    escape_html(&control),
                    escape_html(&placeholder)
                );
            }
        }
    }
}

fn element_text(element: &Element) -> String {
    match element {
        Element::Text(text) => text.clone(),
        Element::Button { control, label } => format!("[{label}] ({control})"),
        Element::Input {
            control,
            placeholder,
        } => format!("<{placeholder}> ({control})"),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AppletError;
    use async_trait::async_trait;

    struct Inert(String);

    #[async_trait]
    impl Applet for Inert {
        fn name(&self) -> &str {
            &self.0
        }

        async fn on_control(
            &self,
            _control: &str,
            _value: Option<String>,
        ) -> Result<(), AppletError> {
            Ok(())
        }
    }

    fn mounted(name: &str) -> Wrapper {
        let card = Card::new(name);
        card.content().push(Element::Button {
            control: "play".to_string(),
            label: "Play".to_string(),
        });
        Wrapper::new(
            AppletName::parse(name).unwrap(),
            card,
            Box::new(Inert(name.to_string())),
        )
    }

    #[test]
    fn test_container_starts_empty() {
        let container = Container::new();
        assert!(container.is_empty());
        assert_eq!(container.render_html(), "<div class=\"container\"></div>");
    }

    #[test]
    fn test_append_keeps_order() {
        let mut container = Container::new();
        container.append(mounted("music"));
        container.append(mounted("weather"));

        let names: Vec<String> = container.names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["music", "weather"]);
    }

    #[test]
    fn test_find_by_card_id() {
        let mut container = Container::new();
        let wrapper = mounted("music");
        let id = wrapper.card().id();
        container.append(wrapper);

        assert_eq!(container.find(id).unwrap().name().as_str(), "music");
        assert!(container.find(uuid::Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_clear_removes_all_wrappers() {
        let mut container = Container::new();
        container.append(mounted("music"));
        container.clear();
        assert!(container.is_empty());
    }

    #[test]
    fn test_render_html_wraps_title_and_content() {
        let mut container = Container::new();
        container.append(mounted("music"));

        let html = container.render_html();

        assert!(html.contains("<div class=\"applet music\">"));
        assert!(html.contains("<div class=\"applet-title\">music</div>"));
        assert!(html.contains("<button data-control=\"play\">Play</button>"));
    }

    #[test]
    fn test_render_html_escapes_text() {
        let mut container = Container::new();
        let wrapper = mounted("music");
        wrapper
            .card()
            .content()
            .push(Element::Text("<b>Tom & Jerry</b>".to_string()));
        container.append(wrapper);

        let html = container.render_html();

        assert!(html.contains("&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_render_text_lists_each_card() {
        let mut container = Container::new();
        container.append(mounted("music"));

        let text = container.render_text();

        assert!(text.contains("┌─ music"));
        assert!(text.contains("[Play] (play)"));
    }
}
