//! Application state built once at startup

use anyhow::Result;
use auth::{AuthClient, Authenticator, SessionManager};
use common::config::ClientConfig;
use common::database::{Database, DatabaseConfig};
use common::kv::SqliteKeyValueStore;
use std::sync::Arc;

use crate::client::BackendClient;
use crate::reconciler::{GenreSelection, PreferenceReconciler};
use crate::recommendations::RecommendationLoader;
use crate::repositories::GenrePreferenceRepository;

/// Every long-lived handle the client needs, sharing one database
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub session: SessionManager,
    pub authenticator: Authenticator,
    pub backend: Arc<BackendClient>,
    pub preferences: Arc<GenrePreferenceRepository>,
    pub reconciler: PreferenceReconciler,
    pub recommendations: RecommendationLoader,
}

impl AppState {
    /// Wire up the client; the database is not opened until first use
    pub fn from_config(
        database_config: DatabaseConfig,
        client_config: ClientConfig,
    ) -> Result<Self> {
        let database = Database::new(database_config);

        let session = SessionManager::new(Arc::new(SqliteKeyValueStore::new(database.clone())));
        let authenticator =
            Authenticator::new(AuthClient::new(client_config.clone())?, session.clone());
        let backend = Arc::new(BackendClient::new(client_config)?);

        let preferences = Arc::new(GenrePreferenceRepository::new(database.clone()));
        let reconciler = PreferenceReconciler::new(preferences.clone());
        let recommendations = RecommendationLoader::new(backend.clone(), preferences.clone());

        Ok(Self {
            database,
            session,
            authenticator,
            backend,
            preferences,
            reconciler,
            recommendations,
        })
    }

    /// Load the editable genre selection for a user
    pub async fn genre_selection(&self, user_id: &str) -> GenreSelection {
        GenreSelection::load(self.reconciler.clone(), user_id).await
    }
}
