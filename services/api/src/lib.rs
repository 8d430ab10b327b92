//! Movie-review client core
//!
//! Talks to the review backend, keeps per-user genre preferences in the
//! local database, and picks personalized or anonymous recommendations
//! depending on the session.

pub mod client;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod recommendations;
pub mod repositories;
pub mod state;

pub use client::{BackendClient, RecommendationSource};
pub use error::{ApiError, ApiResult};
pub use reconciler::{GenreSelection, PreferenceReconciler, ReconcileReport};
pub use recommendations::{Audience, RecommendationLoader, Recommendations};
pub use repositories::{GenrePreferenceRepository, GenrePreferenceStore};
pub use state::AppState;
