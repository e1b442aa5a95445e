use std::collections::HashMap;

/// Run-wide record of every media URL already assigned to a segment.
///
/// Sourcing runs one segment at a time, so the set is plain owned state and
/// needs no lock. A URL is claimed before it is downloaded.
#[derive(Debug, Default)]
pub struct DedupSet {
    owners: HashMap<String, usize>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.owners.contains_key(url)
    }

    /// Record `url` as owned by `segment`.
    ///
    /// Returns `false` and leaves the set untouched when the URL was already
    /// claimed, by this segment or any other.
    pub fn claim(&mut self, url: &str, segment: usize) -> bool {
        if self.owners.contains_key(url) {
            return false;
        }
        self.owners.insert(url.to_string(), segment);
        true
    }

    #[cfg(test)]
    pub fn owner(&self, url: &str) -> Option<usize> {
        self.owners.get(url).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.owners.len()
    }
}
