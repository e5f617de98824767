pub mod atlas;
pub mod roles;
pub mod workflows;

/// Result of a keyed catalogue lookup that never fails.
///
/// `UsedDefault` carries the designated default entry so callers can tell a
/// configuration gap apart from a real match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    UsedDefault(T),
}

impl<T> Lookup<T> {
    pub fn value(self) -> T {
        match self {
            Lookup::Found(v) | Lookup::UsedDefault(v) => v,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Lookup::UsedDefault(_))
    }
}

/// Lower-case and collapse internal whitespace so "Purchase  Order " == "purchase order".
pub(crate) fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
