//! Minimal-diff synchronization of a user's genre preferences
//!
//! Confirming a selection never rewrites the whole set. The stored set is
//! read once, ids missing from the selection are removed, then ids missing
//! from storage are added. Each write is awaited before the next one starts,
//! and a failed write is logged and skipped so the rest of the diff still
//! lands.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::repositories::GenrePreferenceStore;

/// A storage step of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    Load,
    Remove(i64),
    Add(i64),
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStep::Load => write!(f, "load"),
            ReconcileStep::Remove(id) => write!(f, "remove genre {}", id),
            ReconcileStep::Add(id) => write!(f, "add genre {}", id),
        }
    }
}

/// A step that failed, with the storage error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub step: ReconcileStep,
    pub message: String,
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ids successfully removed, in the order they were removed
    pub removed: Vec<i64>,
    /// Ids successfully added, in the order they were added
    pub added: Vec<i64>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn changed(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }

    fn record(&mut self, user_id: &str, step: ReconcileStep, error: impl fmt::Display) {
        warn!(user_id, "Genre preference step failed ({}): {}", step, error);
        self.failures.push(ReconcileFailure {
            step,
            message: error.to_string(),
        });
    }
}

/// Applies confirmed selections to the preference store
#[derive(Clone)]
pub struct PreferenceReconciler {
    store: Arc<dyn GenrePreferenceStore>,
}

impl PreferenceReconciler {
    pub fn new(store: Arc<dyn GenrePreferenceStore>) -> Self {
        Self { store }
    }

    /// Read the stored set for a user
    pub async fn current(&self, user_id: &str) -> Option<BTreeSet<i64>> {
        match self.store.get_user_genres(user_id).await {
            Ok(genres) => Some(genres),
            Err(e) => {
                warn!(user_id, "Failed to read genre preferences: {}", e);
                None
            }
        }
    }

    /// Make the stored set for `user_id` equal `desired`
    ///
    /// Never fails. If the stored set cannot be read, nothing is written and
    /// the report carries a single [`ReconcileStep::Load`] failure.
    pub async fn reconcile(&self, user_id: &str, desired: &BTreeSet<i64>) -> ReconcileReport {
        self.apply(user_id, desired, true).await
    }

    /// Add what `desired` has and storage lacks, removing nothing
    pub async fn add_missing(&self, user_id: &str, desired: &BTreeSet<i64>) -> ReconcileReport {
        self.apply(user_id, desired, false).await
    }

    async fn apply(
        &self,
        user_id: &str,
        desired: &BTreeSet<i64>,
        remove: bool,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let current = match self.store.get_user_genres(user_id).await {
            Ok(current) => current,
            Err(e) => {
                warn!(user_id, "Skipping reconciliation, stored genres unreadable: {}", e);
                report.failures.push(ReconcileFailure {
                    step: ReconcileStep::Load,
                    message: e.to_string(),
                });
                return report;
            }
        };

        let stale: Vec<i64> = if remove {
            current.difference(desired).copied().collect()
        } else {
            Vec::new()
        };

        for genre_id in stale {
            match self.store.remove_user_genre(user_id, genre_id).await {
                Ok(_) => report.removed.push(genre_id),
                Err(e) => report.record(user_id, ReconcileStep::Remove(genre_id), e),
            }
        }

        for &genre_id in desired.difference(&current) {
            match self.store.save_user_genre(user_id, genre_id).await {
                Ok(()) => report.added.push(genre_id),
                Err(e) => report.record(user_id, ReconcileStep::Add(genre_id), e),
            }
        }

        info!(
            user_id,
            removed = report.removed.len(),
            added = report.added.len(),
            failures = report.failures.len(),
            "Reconciled genre preferences"
        );

        report
    }
}

/// The togglable selection a user edits before confirming
pub struct GenreSelection {
    user_id: String,
    selected: BTreeSet<i64>,
    loaded: bool,
    reconciler: PreferenceReconciler,
}

impl GenreSelection {
    /// Start from the stored set, or from nothing if it cannot be read
    pub async fn load(reconciler: PreferenceReconciler, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let current = reconciler.current(&user_id).await;

        Self {
            user_id,
            loaded: current.is_some(),
            selected: current.unwrap_or_default(),
            reconciler,
        }
    }

    /// Whether the selection started from the stored set
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Flip a genre; returns whether it is now selected
    pub fn toggle(&mut self, genre_id: i64) -> bool {
        if self.selected.remove(&genre_id) {
            false
        } else {
            self.selected.insert(genre_id);
            true
        }
    }

    pub fn is_selected(&self, genre_id: i64) -> bool {
        self.selected.contains(&genre_id)
    }

    pub fn selected(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Persist the selection as a minimal diff
    ///
    /// A selection that never saw the stored set cannot tell a deselected
    /// genre from an unseen one, so it only adds.
    pub async fn confirm(&self) -> ReconcileReport {
        if self.loaded {
            self.reconciler.reconcile(&self.user_id, &self.selected).await
        } else {
            warn!(user_id = %self.user_id, "Stored genres were not loaded, skipping removals");
            self.reconciler.add_missing(&self.user_id, &self.selected).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::error::{DatabaseError, DatabaseResult};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Get,
        Save(i64),
        Remove(i64),
    }

    /// In-memory store that records every call and fails on demand
    #[derive(Default)]
    struct RecordingStore {
        genres: Mutex<HashMap<String, BTreeSet<i64>>>,
        calls: Mutex<Vec<Call>>,
        fail_get: bool,
        fail_first_get: AtomicBool,
        fail_remove: BTreeSet<i64>,
        fail_save: BTreeSet<i64>,
    }

    impl RecordingStore {
        fn with(user_id: &str, genres: &[i64]) -> Self {
            let store = Self::default();
            store
                .genres
                .lock()
                .unwrap()
                .insert(user_id.to_string(), genres.iter().copied().collect());
            store
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn stored(&self, user_id: &str) -> BTreeSet<i64> {
            self.genres
                .lock()
                .unwrap()
                .get(user_id)
                .cloned()
                .unwrap_or_default()
        }
    }

    fn failure() -> DatabaseError {
        DatabaseError::Configuration("storage unavailable".to_string())
    }

    #[async_trait]
    impl GenrePreferenceStore for RecordingStore {
        async fn get_user_genres(&self, user_id: &str) -> DatabaseResult<BTreeSet<i64>> {
            self.calls.lock().unwrap().push(Call::Get);
            if self.fail_get || self.fail_first_get.swap(false, Ordering::SeqCst) {
                return Err(failure());
            }
            Ok(self.stored(user_id))
        }

        async fn save_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<()> {
            self.calls.lock().unwrap().push(Call::Save(genre_id));
            if self.fail_save.contains(&genre_id) {
                return Err(failure());
            }
            self.genres
                .lock()
                .unwrap()
                .entry(user_id.to_string())
                .or_default()
                .insert(genre_id);
            Ok(())
        }

        async fn remove_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<u64> {
            self.calls.lock().unwrap().push(Call::Remove(genre_id));
            if self.fail_remove.contains(&genre_id) {
                return Err(failure());
            }
            let removed = self
                .genres
                .lock()
                .unwrap()
                .get_mut(user_id)
                .map(|set| set.remove(&genre_id))
                .unwrap_or(false);
            Ok(removed as u64)
        }
    }

    fn set(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_reconcile_issues_minimal_diff() {
        let store = Arc::new(RecordingStore::with("u1", &[1, 2, 3]));
        let reconciler = PreferenceReconciler::new(store.clone());

        let report = reconciler.reconcile("u1", &set(&[2, 3, 4])).await;

        assert_eq!(store.calls(), vec![Call::Get, Call::Remove(1), Call::Save(4)]);
        assert_eq!(report.removed, vec![1]);
        assert_eq!(report.added, vec![4]);
        assert!(report.is_clean());
        assert_eq!(store.stored("u1"), set(&[2, 3, 4]));
    }

    #[tokio::test]
    async fn test_toggle_off_then_on_writes_nothing() {
        let store = Arc::new(RecordingStore::with("u1", &[1]));
        let reconciler = PreferenceReconciler::new(store.clone());

        let mut selection = GenreSelection::load(reconciler, "u1").await;
        assert!(!selection.toggle(1));
        assert!(selection.toggle(1));
        assert!(selection.is_selected(1));

        let report = selection.confirm().await;

        assert_eq!(store.calls(), vec![Call::Get, Call::Get]);
        assert!(!report.changed());
        assert_eq!(store.stored("u1"), set(&[1]));
    }

    #[tokio::test]
    async fn test_removals_run_before_additions() {
        let store = Arc::new(RecordingStore::with("u1", &[5, 7]));
        let reconciler = PreferenceReconciler::new(store.clone());

        reconciler.reconcile("u1", &set(&[1, 9])).await;

        assert_eq!(
            store.calls(),
            vec![
                Call::Get,
                Call::Remove(5),
                Call::Remove(7),
                Call::Save(1),
                Call::Save(9),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_remove_does_not_abort() {
        let store = Arc::new(RecordingStore {
            fail_remove: set(&[1]),
            ..RecordingStore::with("u1", &[1, 2])
        });
        let reconciler = PreferenceReconciler::new(store.clone());

        let report = reconciler.reconcile("u1", &set(&[3, 4])).await;

        assert_eq!(
            store.calls(),
            vec![
                Call::Get,
                Call::Remove(1),
                Call::Remove(2),
                Call::Save(3),
                Call::Save(4),
            ]
        );
        assert_eq!(report.removed, vec![2]);
        assert_eq!(report.added, vec![3, 4]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, ReconcileStep::Remove(1));
        assert_eq!(store.stored("u1"), set(&[1, 3, 4]));
    }

    #[tokio::test]
    async fn test_failed_add_is_recorded() {
        let store = Arc::new(RecordingStore {
            fail_save: set(&[8]),
            ..RecordingStore::default()
        });
        let reconciler = PreferenceReconciler::new(store.clone());

        let report = reconciler.reconcile("u1", &set(&[8, 9])).await;

        assert_eq!(report.added, vec![9]);
        assert_eq!(report.failures[0].step, ReconcileStep::Add(8));
        assert_eq!(report.failures[0].message, "Database configuration error: storage unavailable");
    }

    #[tokio::test]
    async fn test_unreadable_store_writes_nothing() {
        let store = Arc::new(RecordingStore {
            fail_get: true,
            ..RecordingStore::with("u1", &[1])
        });
        let reconciler = PreferenceReconciler::new(store.clone());

        let report = reconciler.reconcile("u1", &set(&[2])).await;

        assert_eq!(store.calls(), vec![Call::Get]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, ReconcileStep::Load);
        assert!(!report.changed());
    }

    #[tokio::test]
    async fn test_selection_starts_empty_when_store_unreadable() {
        let store = Arc::new(RecordingStore {
            fail_get: true,
            ..RecordingStore::with("u1", &[1, 2])
        });

        let selection = GenreSelection::load(PreferenceReconciler::new(store), "u1").await;

        assert!(selection.selected().is_empty());
        assert!(!selection.is_loaded());
        assert_eq!(selection.user_id(), "u1");
    }

    #[tokio::test]
    async fn test_unloaded_selection_keeps_stored_genres() {
        let store = Arc::new(RecordingStore {
            fail_first_get: AtomicBool::new(true),
            ..RecordingStore::with("u1", &[1, 2])
        });

        let mut selection =
            GenreSelection::load(PreferenceReconciler::new(store.clone()), "u1").await;
        selection.toggle(3);
        let report = selection.confirm().await;

        assert_eq!(store.calls(), vec![Call::Get, Call::Get, Call::Save(3)]);
        assert!(report.removed.is_empty());
        assert_eq!(report.added, vec![3]);
        assert_eq!(store.stored("u1"), set(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_deselecting_only_genre_against_database() {
        use crate::repositories::GenrePreferenceRepository;
        use common::database::{Database, DatabaseConfig};

        let repo = Arc::new(GenrePreferenceRepository::new(Database::new(
            DatabaseConfig::in_memory(),
        )));
        repo.save_user_genre("u1", 5).await.unwrap();

        let mut selection =
            GenreSelection::load(PreferenceReconciler::new(repo.clone()), "u1").await;
        assert!(selection.is_selected(5));
        selection.toggle(5);

        let report = selection.confirm().await;

        assert_eq!(report.removed, vec![5]);
        assert!(report.added.is_empty());
        assert!(repo.get_user_genres("u1").await.unwrap().is_empty());
    }
}
