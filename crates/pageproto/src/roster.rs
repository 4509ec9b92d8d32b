/// Ordered set of admin names allowed to answer pages.
///
/// Kept sorted for deterministic display. Matching is exact: the identity is
/// whatever name the chat transport reports, nothing more. Only configuration
/// updates mutate the roster; chat traffic never does.
#[derive(Debug, Clone, Default)]
pub struct AdminRoster {
    names: Vec<String>,
}

impl AdminRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .is_ok()
    }

    /// Add one admin. Returns false for blank names and duplicates.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.names.binary_search_by(|n| n.as_str().cmp(name)) {
            Ok(_) => false,
            Err(i) => {
                self.names.insert(i, name.to_string());
                true
            }
        }
    }

    /// Remove one admin. Returns false if the name was not on the roster.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.names.binary_search_by(|n| n.as_str().cmp(name)) {
            Ok(i) => {
                let _ = self.names.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Replace the whole roster.
    pub fn set_all<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.names = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        self.names.sort();
        self.names.dedup();
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
