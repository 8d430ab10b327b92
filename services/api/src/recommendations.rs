//! Session-gated recommendation loading

use auth::SessionManager;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::RecommendationSource;
use crate::error::ApiResult;
use crate::models::Movie;
use crate::repositories::GenrePreferenceStore;

/// Who the recommendations were picked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Guest,
    Member { username: String },
}

#[derive(Debug, Clone)]
pub struct Recommendations {
    pub audience: Audience,
    pub movies: Vec<Movie>,
}

/// Picks the personalized or anonymous recommendation path from the session
#[derive(Clone)]
pub struct RecommendationLoader {
    source: Arc<dyn RecommendationSource>,
    preferences: Arc<dyn GenrePreferenceStore>,
}

impl RecommendationLoader {
    pub fn new(
        source: Arc<dyn RecommendationSource>,
        preferences: Arc<dyn GenrePreferenceStore>,
    ) -> Self {
        Self {
            source,
            preferences,
        }
    }

    /// Load recommendations once the session has been restored
    ///
    /// Members get movies filtered by their stored genres. An unreadable
    /// preference store degrades to an unfiltered personalized request.
    pub async fn load(&self, session: &SessionManager) -> ApiResult<Recommendations> {
        session.wait_until_ready().await;
        let snapshot = session.snapshot().await;

        let Some((token, user)) = snapshot.credentials() else {
            let movies = self.source.get_random_recommendations().await?;
            return Ok(Recommendations {
                audience: Audience::Guest,
                movies,
            });
        };

        let genre_ids: Vec<i64> = match self.preferences.get_user_genres(&user.id).await {
            Ok(genres) => genres.into_iter().collect(),
            Err(e) => {
                warn!(user_id = %user.id, "Failed to read genre preferences: {}", e);
                Vec::new()
            }
        };

        info!(
            user_id = %user.id,
            genres = genre_ids.len(),
            "Loading personalized recommendations"
        );

        let movies = self
            .source
            .get_personalized_recommendations(token, &genre_ids)
            .await?;

        Ok(Recommendations {
            audience: Audience::Member {
                username: user.username.clone(),
            },
            movies,
        })
    }
}
