use scraper::{Html, Selector};

/// A navigation anchor: rendered text plus href target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// Narrow DOM-query capability the Layer-2 submodules depend on.
///
/// Submodules never touch a concrete parser; this keeps them testable
/// against hand-built fixtures and lets the HTML library be swapped without
/// touching scoring logic.
pub trait DomQuery {
    /// Number of elements matching a CSS selector.
    fn count(&self, selector: &str) -> usize;

    /// Text content of every element matching a CSS selector.
    fn texts(&self, selector: &str) -> Vec<String>;

    /// Anchors matching a CSS selector, with text and href.
    fn links(&self, selector: &str) -> Vec<Link>;

    /// Visible text of the document body.
    fn body_text(&self) -> String;
}

/// `DomQuery` backed by the `scraper` crate.
///
/// An invalid selector yields zero matches rather than an error; selector
/// strings are compile-time constants in the submodules, so a miss here is
/// a programming defect that still must not abort a classification.
pub struct ScraperDom {
    document: Html,
}

impl ScraperDom {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }
}

impl DomQuery for ScraperDom {
    fn count(&self, selector: &str) -> usize {
        match Selector::parse(selector) {
            Ok(selector) => self.document.select(&selector).count(),
            Err(_) => 0,
        }
    }

    fn texts(&self, selector: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
            .collect()
    }

    fn links(&self, selector: &str) -> Vec<Link> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|element| Link {
                text: collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")),
                href: element.value().attr("href").unwrap_or_default().to_string(),
            })
            .collect()
    }

    fn body_text(&self) -> String {
        let Ok(selector) = Selector::parse("body") else {
            return String::new();
        };
        match self.document.select(&selector).next() {
            Some(body) => collapse_whitespace(&body.text().collect::<Vec<_>>().join(" ")),
            None => String::new(),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
