// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashSet};

/// Checked rows of one screen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn select(&mut self, id: &str) {
        self.ids.insert(id.to_string());
    }

    pub fn deselect(&mut self, id: &str) {
        self.ids.remove(id);
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn reset_to<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.ids = ids.into_iter().collect();
    }

    /// Drops ids that are not in `existing` any more.
    pub fn retain_existing(&mut self, existing: &HashSet<String>) {
        self.ids.retain(|id| existing.contains(id));
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::Selection;

    #[test]
    fn toggle_and_reset() {
        let mut s = Selection::default();
        s.toggle("2");
        s.toggle("4");
        s.toggle("2");
        assert_eq!(s.ids(), vec!["4"]);

        s.reset_to(vec!["7".to_string(), "1".to_string()]);
        assert_eq!(s.ids(), vec!["1", "7"]);
        assert!(!s.contains("4"));

        s.clear();
        assert!(s.is_empty());
    }
}
