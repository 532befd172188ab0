//! In-process record ledger for route groups that do not need the database.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Records that carry their own identifier.
pub(crate) trait Identified {
    fn id(&self) -> &str;
}

/// Insertion-ordered records shared across handlers.
#[derive(Debug)]
pub(crate) struct Ledger<T> {
    entries: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for Ledger<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<T> Ledger<T>
where
    T: Identified + Clone,
{
    pub(crate) async fn list(&self) -> Vec<T> {
        self.entries.read().await.clone()
    }

    pub(crate) async fn get(&self, id: &str) -> Option<T> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id() == id)
            .cloned()
    }

    pub(crate) async fn contains(&self, id: &str) -> bool {
        self.entries.read().await.iter().any(|entry| entry.id() == id)
    }

    pub(crate) async fn insert(&self, entry: T) -> T {
        self.entries.write().await.push(entry.clone());
        entry
    }

    /// Applies `change` to the entry with `id`, returning the updated copy.
    pub(crate) async fn update<F>(&self, id: &str, change: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().await;
        let entry = entries.iter_mut().find(|entry| entry.id() == id)?;
        change(entry);
        Some(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Note {
        id: String,
        body: String,
    }

    impl Identified for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str) -> Note {
        Note {
            id: id.to_owned(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn lists_in_insertion_order() {
        let ledger = Ledger::default();
        ledger.insert(note("b")).await;
        ledger.insert(note("a")).await;
        let ids: Vec<_> = ledger.list().await.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn update_touches_only_the_named_entry() {
        let ledger = Ledger::default();
        ledger.insert(note("a")).await;
        ledger.insert(note("b")).await;
        let updated = ledger
            .update("b", |entry| entry.body = "changed".to_owned())
            .await
            .expect("entry exists");
        assert_eq!(updated.body, "changed");
        assert_eq!(ledger.get("a").await.map(|n| n.body), Some(String::new()));
        assert!(ledger.update("missing", |_| {}).await.is_none());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let ledger = Ledger::default();
        let other = ledger.clone();
        ledger.insert(note("a")).await;
        assert!(other.contains("a").await);
    }
}
