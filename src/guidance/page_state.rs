use std::fmt;

use serde::{Serialize, Serializer};

use crate::guidance::types::PageElement;

/// Coarse position of the user inside the ERP desk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Home,
    /// Module workspace, e.g. "buying".
    Module(String),
    /// Record list of a doctype, by short name, e.g. "po".
    List(String),
    /// A single record's form, by short name.
    Form(String),
    Unknown,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Home => write!(f, "home"),
            PageState::Module(m) => write!(f, "{m} module"),
            PageState::List(d) => write!(f, "{d} list"),
            PageState::Form(d) => write!(f, "{d} form"),
            PageState::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for PageState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Match over path segments, so `/a/b` and `/a/b/` are the same route.
#[derive(Debug, Clone)]
enum Predicate {
    /// The whole path.
    Exact(Vec<String>),
    /// The path itself or anything below it.
    Prefix(Vec<String>),
    /// Strictly below the path.
    Under(Vec<String>),
}

impl Predicate {
    fn segments(&self) -> &[String] {
        match self {
            Predicate::Exact(s) | Predicate::Prefix(s) | Predicate::Under(s) => s,
        }
    }

    fn matches(&self, path: &[&str]) -> bool {
        match self {
            Predicate::Exact(s) => s.len() == path.len() && starts_with(path, s),
            Predicate::Prefix(s) => starts_with(path, s),
            Predicate::Under(s) => s.len() < path.len() && starts_with(path, s),
        }
    }
}

fn starts_with(path: &[&str], prefix: &[String]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}

fn segs(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_lowercase()).collect()
}

#[derive(Debug, Clone)]
struct Rule {
    predicate: Predicate,
    state: PageState,
}

/// Ordered first-match classifier over normalised page locators.
///
/// Rules are kept sorted by segment count, longest first, so the list-view
/// route `/app/purchase-order/view` is tested before the record routes under
/// `/app/purchase-order`.
#[derive(Debug, Clone, Default)]
pub struct PageClassifier {
    rules: Vec<Rule>,
}

impl PageClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut classifier = Self::new().with_home(&["app", "home"]).with_home(&["app"]);
        for module in ["buying", "selling", "accounting", "stock", "hr", "setup"] {
            classifier = classifier.with_module(module);
        }
        for (slug, short) in [
            ("purchase-order", "po"),
            ("supplier", "supplier"),
            ("sales-order", "so"),
            ("customer", "customer"),
            ("sales-invoice", "invoice"),
            ("material-request", "material request"),
            ("journal-entry", "journal entry"),
            ("company", "company"),
        ] {
            classifier = classifier.with_doctype(slug, short);
        }
        classifier
    }

    pub fn with_home(mut self, path: &[&str]) -> Self {
        self.push(Predicate::Exact(segs(path)), PageState::Home);
        self
    }

    pub fn with_module(mut self, module: &str) -> Self {
        let module = module.to_lowercase();
        self.push(Predicate::Exact(segs(&["app", module.as_str()])), PageState::Module(module));
        self
    }

    /// Register list, list-view and record routes for a doctype slug.
    ///
    /// `/app/<slug>` and anything under `/app/<slug>/view` are lists; any
    /// other path below `/app/<slug>` is a record form.
    pub fn with_doctype(mut self, slug: &str, short: &str) -> Self {
        let short = short.to_lowercase();
        self.push(
            Predicate::Prefix(segs(&["app", slug, "view"])),
            PageState::List(short.clone()),
        );
        self.push(Predicate::Under(segs(&["app", slug])), PageState::Form(short.clone()));
        self.push(Predicate::Exact(segs(&["app", slug])), PageState::List(short));
        self
    }

    fn push(&mut self, predicate: Predicate, state: PageState) {
        self.rules.push(Rule { predicate, state });
        self.rules
            .sort_by(|a, b| b.predicate.segments().len().cmp(&a.predicate.segments().len()));
    }

    /// Total and deterministic: anything no rule recognises is `Unknown`.
    pub fn classify(&self, locator: &str, elements: &[PageElement]) -> PageState {
        let normalized = normalize_locator(locator);
        let path: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        let state = if path.is_empty() {
            PageState::Unknown
        } else {
            self.rules
                .iter()
                .find(|r| r.predicate.matches(&path))
                .map(|r| r.state.clone())
                .unwrap_or(PageState::Unknown)
        };
        tracing::debug!(locator = %locator, elements = elements.len(), state = %state, "page classified");
        state
    }
}

/// Lower-case, drop scheme and host, drop query string and fragment.
fn normalize_locator(locator: &str) -> String {
    let lowered = locator.trim().to_lowercase();
    let cut = lowered.find(['?', '#']).unwrap_or(lowered.len());
    let path = &lowered[..cut];
    match path.find("://") {
        Some(i) => {
            let rest = &path[i + 3..];
            rest.find('/').map(|j| rest[j..].to_string()).unwrap_or_default()
        }
        None => path.to_string(),
    }
}
