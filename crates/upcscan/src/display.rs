//! Results view model and rendering.
//!
//! The controller never formats output itself. It builds a [`ResultsView`],
//! a [`ScanButton`] and the offline banner state, and hands them to a
//! [`Renderer`].

use std::fmt;
use std::io::Write;

use chrono::Local;

use crate::item::ScannedItem;

/// Placeholder for absent product fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Text shown for an empty store.
pub const EMPTY_MESSAGE: &str = "No items scanned yet";

/// Text of the offline warning banner.
pub const OFFLINE_BANNER: &str = "Not connected to the Internet";

/// Label of the scan button while idle.
pub const START_LABEL: &str = "Start Scanner";

/// Label of the scan button while scanning.
pub const STOP_LABEL: &str = "Stop Scanner";

/// One stored item, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    /// Product title, or "N/A".
    pub title: String,
    /// Product brand, or "N/A".
    pub brand: String,
    /// Product description, or "N/A".
    pub description: String,
    /// The barcode.
    pub upc: String,
    /// When the item was scanned, as local date and time.
    pub scanned: String,
}

impl From<&ScannedItem> for ItemView {
    fn from(item: &ScannedItem) -> Self {
        Self {
            title: or_not_available(item.title.as_deref()),
            brand: or_not_available(item.brand.as_deref()),
            description: or_not_available(item.description.as_deref()),
            upc: item.id.clone(),
            scanned: item
                .timestamp
                .with_timezone(&Local)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string(),
        }
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Build the view of a stored item list.
#[must_use]
pub fn item_views(items: &[ScannedItem]) -> Vec<ItemView> {
    items.iter().map(ItemView::from).collect()
}

/// Content of the results area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsView {
    /// The stored items, in store order.
    Items(Vec<ItemView>),
    /// The API knows no product for the barcode.
    NotFound {
        /// The barcode that was looked up.
        barcode: String,
    },
    /// An operation failed; the stored items are still shown below.
    Failed {
        /// User-facing description of the failure.
        message: String,
        /// The stored items.
        items: Vec<ItemView>,
    },
}

impl ResultsView {
    /// The items shown in this view.
    #[must_use]
    pub fn items(&self) -> &[ItemView] {
        match self {
            Self::Items(items) | Self::Failed { items, .. } => items,
            Self::NotFound { .. } => &[],
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[ItemView]) -> fmt::Result {
    if items.is_empty() {
        return write!(f, "{EMPTY_MESSAGE}");
    }

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            writeln!(f, "{}", "-".repeat(40))?;
        }
        writeln!(f, "Title: {}", item.title)?;
        writeln!(f, "Brand: {}", item.brand)?;
        writeln!(f, "Description: {}", item.description)?;
        writeln!(f, "UPC: {}", item.upc)?;
        write!(f, "Scanned: {}", item.scanned)?;
        if i + 1 < items.len() {
            writeln!(f)?;
        }
    }
    Ok(())
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items(items) => write_items(f, items),
            Self::NotFound { barcode } => write!(f, "No product found for barcode: {barcode}"),
            Self::Failed { message, items } => {
                writeln!(f, "{message}")?;
                writeln!(f)?;
                write_items(f, items)
            }
        }
    }
}

/// State of the scan toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanButton {
    /// Button label.
    pub label: &'static str,
    /// Whether the button can be pressed.
    pub enabled: bool,
}

impl ScanButton {
    /// The button for the given scanner and network state.
    #[must_use]
    pub fn new(scanning: bool, online: bool) -> Self {
        Self {
            label: if scanning { STOP_LABEL } else { START_LABEL },
            enabled: online,
        }
    }
}

/// A surface that displays the scanner UI.
pub trait Renderer: Send {
    /// Replace the results area with `view`.
    fn render_results(&mut self, view: &ResultsView);

    /// Show the scan button state.
    fn render_button(&mut self, button: &ScanButton);

    /// Show `banner`, or hide the banner when `None`.
    fn render_banner(&mut self, banner: Option<&str>);
}

/// Renderer writing plain text to a writer.
///
/// Button and banner changes are written as short status lines. The banner
/// is only written when it changes.
#[derive(Debug)]
pub struct TextRenderer<W> {
    out: W,
    banner: Option<String>,
}

impl TextRenderer<std::io::Stdout> {
    /// Create a renderer writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextRenderer<W> {
    /// Create a renderer writing to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out, banner: None }
    }

    /// Consume the renderer and return the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        // A closed stdout is not worth failing a scan over.
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn render_results(&mut self, view: &ResultsView) {
        let text = view.to_string();
        self.emit("");
        self.emit(&text);
    }

    fn render_button(&mut self, button: &ScanButton) {
        let text = if button.enabled {
            format!("[{}]", button.label)
        } else {
            format!("[{}] (disabled)", button.label)
        };
        self.emit(&text);
    }

    fn render_banner(&mut self, banner: Option<&str>) {
        if self.banner.as_deref() == banner {
            return;
        }
        self.banner = banner.map(String::from);
        match banner {
            Some(text) => self.emit(&format!("! {text}")),
            None => self.emit("Connection restored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn item(id: &str, title: Option<&str>, brand: Option<&str>) -> ScannedItem {
        ScannedItem {
            id: id.to_string(),
            title: title.map(String::from),
            brand: brand.map(String::from),
            description: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap(),
        }
    }

    fn rendered(renderer: TextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_empty_store_renders_exact_message() {
        assert_eq!(ResultsView::Items(Vec::new()).to_string(), "No items scanned yet");
    }

    #[test]
    fn test_item_view_defaults_missing_fields() {
        let view = ItemView::from(&item("012345678905", Some("Widget"), Some("Acme")));

        assert_eq!(view.title, "Widget");
        assert_eq!(view.brand, "Acme");
        assert_eq!(view.description, "N/A");
        assert_eq!(view.upc, "012345678905");
    }

    #[test]
    fn test_item_view_treats_empty_as_missing() {
        let view = ItemView::from(&item("96385074", Some(""), None));
        assert_eq!(view.title, "N/A");
        assert_eq!(view.brand, "N/A");
    }

    #[test]
    fn test_item_view_scanned_format() {
        let view = ItemView::from(&item("96385074", None, None));
        let expected = Utc
            .with_ymd_and_hms(2024, 1, 2, 15, 4, 5)
            .unwrap()
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string();

        assert_eq!(view.scanned, expected);
        assert!(view.scanned.ends_with("AM") || view.scanned.ends_with("PM"));
    }

    #[test]
    fn test_items_render_in_order() {
        let items = vec![
            item("111", Some("First"), None),
            item("222", Some("Second"), None),
        ];
        let text = ResultsView::Items(item_views(&items)).to_string();

        let first = text.find("Title: First").unwrap();
        let second = text.find("Title: Second").unwrap();
        assert!(first < second);
        assert!(text.contains("UPC: 111"));
        assert!(text.contains("Description: N/A"));
        assert_eq!(text.lines().filter(|l| l.starts_with("---")).count(), 1);
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_not_found_replaces_list() {
        let view = ResultsView::NotFound {
            barcode: "000000000000".to_string(),
        };
        assert_eq!(view.to_string(), "No product found for barcode: 000000000000");
        assert!(view.items().is_empty());
    }

    #[test]
    fn test_failed_shows_message_then_items() {
        let view = ResultsView::Failed {
            message: "Error looking up product: No internet connection".to_string(),
            items: Vec::new(),
        };
        assert_eq!(
            view.to_string(),
            "Error looking up product: No internet connection\n\nNo items scanned yet"
        );
    }

    #[test]
    fn test_scan_button_states() {
        assert_eq!(ScanButton::new(false, true).label, "Start Scanner");
        assert_eq!(ScanButton::new(true, true).label, "Stop Scanner");
        assert!(!ScanButton::new(false, false).enabled);
    }

    #[test]
    fn test_text_renderer_results() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render_results(&ResultsView::Items(Vec::new()));

        assert_eq!(rendered(renderer), "\nNo items scanned yet\n");
    }

    #[test]
    fn test_text_renderer_button() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render_button(&ScanButton::new(true, true));
        renderer.render_button(&ScanButton::new(false, false));

        assert_eq!(
            rendered(renderer),
            "[Stop Scanner]\n[Start Scanner] (disabled)\n"
        );
    }

    #[test]
    fn test_text_renderer_banner_only_on_change() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render_banner(None);
        renderer.render_banner(Some(OFFLINE_BANNER));
        renderer.render_banner(Some(OFFLINE_BANNER));
        renderer.render_banner(None);

        assert_eq!(
            rendered(renderer),
            "! Not connected to the Internet\nConnection restored\n"
        );
    }
}
