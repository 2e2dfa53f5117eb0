// SPDX-License-Identifier: MIT

use std::{collections::HashSet, sync::Arc};

const TEMPORARY_ID_PREFIX: &str = "tmp-";

/// A record with a stable identity that can live in an [`OptimisticList`].
pub trait Item: Send + Sync {
    fn id(&self) -> String;
    fn with_id(&self, id: &str) -> Self
    where
        Self: Sized;
}

pub fn temporary_id() -> String {
    format!("{TEMPORARY_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMPORARY_ID_PREFIX)
}

pub enum Mutation<T> {
    Remove(HashSet<String>),
    Append(Vec<T>),
    Replace(T),
}

/// The collection as it was before a mutation. Items are shared, not cloned.
pub struct Snapshot<T> {
    items: Vec<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// Single-writer ordered collection owned by one screen.
pub struct OptimisticList<T> {
    items: Vec<Arc<T>>,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Item> OptimisticList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items.into_iter().map(Arc::new).collect();
    }

    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.iter().find(|i| i.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            items: self.items.clone(),
        }
    }

    /// Applies the mutation right away and returns the state to roll back to.
    pub fn apply_optimistic(&mut self, m: Mutation<T>) -> Snapshot<T> {
        let prior = self.snapshot();

        match m {
            Mutation::Remove(ids) => self.items.retain(|i| !ids.contains(&i.id())),
            Mutation::Append(items) => self.items.extend(items.into_iter().map(Arc::new)),
            Mutation::Replace(item) => {
                let id = item.id();
                match self.items.iter_mut().find(|i| i.id() == id) {
                    Some(slot) => *slot = Arc::new(item),
                    None => tracing::warn!(target: "optimistic_list", id=id, "Replace an unknown item"),
                }
            }
        }

        prior
    }

    pub fn rollback(&mut self, prior: Snapshot<T>) {
        self.items = prior.items;
    }

    /// Puts the failed items back where they were in `prior`.
    /// Items removed successfully stay removed, items added after `prior` stay at the end.
    pub fn restore_failed(&mut self, prior: &Snapshot<T>, failed: &HashSet<String>) {
        let current_ids = self.items.iter().map(|i| i.id()).collect::<HashSet<String>>();
        let prior_ids = prior.items.iter().map(|i| i.id()).collect::<HashSet<String>>();

        let mut restored = Vec::with_capacity(prior.items.len());
        for item in &prior.items {
            let id = item.id();
            if current_ids.contains(&id) {
                if let Some(current) = self.items.iter().find(|i| i.id() == id) {
                    restored.push(current.clone());
                }
            } else if failed.contains(&id) {
                restored.push(item.clone());
            }
        }
        restored.extend(self.items.iter().filter(|i| !prior_ids.contains(&i.id())).cloned());

        self.items = restored;
    }

    /// Drops the given items wherever they are now, leaving the rest of the list untouched.
    pub fn discard(&mut self, ids: &HashSet<String>) {
        self.items.retain(|i| !ids.contains(&i.id()));
    }

    /// Puts back the `prior` version of one item if the item is still in the list.
    pub fn revert(&mut self, prior: &Snapshot<T>, id: &str) {
        let Some(old) = prior.items.iter().find(|i| i.id() == id) else {
            return;
        };
        if let Some(slot) = self.items.iter_mut().find(|i| i.id() == id) {
            *slot = old.clone();
        }
    }

    /// Swaps temporary identities for the ones assigned by the server.
    pub fn assign_ids(&mut self, pairs: &[(String, String)]) {
        for (temporary, assigned) in pairs {
            if let Some(slot) = self.items.iter_mut().find(|i| &i.id() == temporary) {
                *slot = Arc::new(slot.with_id(assigned));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        name: String,
    }

    impl Item for Row {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn with_id(&self, id: &str) -> Self {
            Self {
                id: id.to_string(),
                name: self.name.clone(),
            }
        }
    }

    fn row(id: &str) -> Row {
        Row {
            id: id.to_string(),
            name: format!("row {id}"),
        }
    }

    fn list(ids: &[&str]) -> OptimisticList<Row> {
        OptimisticList::new(ids.iter().map(|id| row(id)).collect())
    }

    fn ids(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn remove_and_rollback() {
        let mut l = list(&["1", "2", "3"]);
        let prior = l.apply_optimistic(Mutation::Remove(ids(&["1", "3"])));
        assert_eq!(l.ids(), vec!["2"]);
        assert_eq!(prior.len(), 3);

        l.rollback(prior);
        assert_eq!(l.ids(), vec!["1", "2", "3"]);
    }

    #[test]
    fn restore_only_failed_items_in_place() {
        let mut l = list(&["1", "2", "3", "4", "5"]);
        let prior = l.apply_optimistic(Mutation::Remove(ids(&["2", "4"])));
        assert_eq!(l.ids(), vec!["1", "3", "5"]);

        l.restore_failed(&prior, &ids(&["4"]));
        assert_eq!(l.ids(), vec!["1", "3", "4", "5"]);
    }

    #[test]
    fn restore_keeps_items_added_later() {
        let mut l = list(&["1", "2"]);
        let prior = l.apply_optimistic(Mutation::Remove(ids(&["1"])));
        l.apply_optimistic(Mutation::Append(vec![row("9")]));

        l.restore_failed(&prior, &ids(&["1"]));
        assert_eq!(l.ids(), vec!["1", "2", "9"]);
    }

    #[test]
    fn replace_in_place() {
        let mut l = list(&["1", "2"]);
        let prior = l.apply_optimistic(Mutation::Replace(Row {
            id: "2".to_string(),
            name: "renamed".to_string(),
        }));
        assert_eq!(l.get("2").unwrap().name, "renamed");

        l.rollback(prior);
        assert_eq!(l.get("2").unwrap().name, "row 2");
    }

    #[test]
    fn discard_and_revert_touch_only_their_items() {
        let mut l = list(&["1", "2", "3"]);
        let prior = l.apply_optimistic(Mutation::Replace(Row {
            id: "3".to_string(),
            name: "renamed".to_string(),
        }));
        l.apply_optimistic(Mutation::Append(vec![row("tmp-a")]));
        l.apply_optimistic(Mutation::Remove(ids(&["2"])));

        l.revert(&prior, "3");
        l.discard(&ids(&["tmp-a"]));
        assert_eq!(l.ids(), vec!["1", "3"]);
        assert_eq!(l.get("3").unwrap().name, "row 3");

        l.apply_optimistic(Mutation::Remove(ids(&["3"])));
        l.revert(&prior, "3");
        assert_eq!(l.ids(), vec!["1"]);
    }

    #[test]
    fn temporary_ids_are_replaced() {
        let mut l = list(&["1"]);
        let tmp = temporary_id();
        assert!(is_temporary_id(&tmp));
        assert!(!is_temporary_id("1"));

        l.apply_optimistic(Mutation::Append(vec![row(&tmp)]));
        l.assign_ids(&[(tmp.clone(), "42".to_string())]);

        assert_eq!(l.ids(), vec!["1", "42"]);
        assert!(!l.contains(&tmp));
    }
}
