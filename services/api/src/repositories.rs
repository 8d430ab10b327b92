//! Repositories for local database operations

pub mod genre_preferences;

pub use genre_preferences::{GenrePreference, GenrePreferenceRepository, GenrePreferenceStore};
