//! Mapping between user-visible attach names and internal database names

/// Bidirectional, case-insensitive mapping between the database name a user
/// attached under and the name the engine knows it by.
#[derive(Debug, Clone, Default)]
pub struct AttachNameMap {
    entries: Vec<(String, String)>,
}

impl AttachNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair; `attach_name` is the user-visible side
    pub fn insert(&mut self, attach_name: impl Into<String>, internal_name: impl Into<String>) {
        self.entries.push((attach_name.into(), internal_name.into()));
    }

    /// Translate an attach name to the internal name. Names not present on
    /// the attach side come back unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(attach, _)| attach.eq_ignore_ascii_case(name))
            .map(|(_, internal)| internal.as_str())
            .unwrap_or(name)
    }

    /// Reverse lookup: the attach name registered for an internal name
    pub fn attach_name(&self, internal_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, internal)| internal.eq_ignore_ascii_case(internal_name))
            .map(|(attach, _)| attach.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
