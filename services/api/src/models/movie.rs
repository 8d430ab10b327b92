//! Movie and genre models

use serde::{Deserialize, Serialize};

/// Base URL for poster paths returned by the backend
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Movie record as returned by the movie and recommendation endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub posters: Vec<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub genre_names: Vec<String>,
}

impl Movie {
    /// Full URL of the first poster, if any
    pub fn poster_url(&self) -> Option<String> {
        self.posters
            .first()
            .map(|path| format!("{}{}", POSTER_BASE_URL, path))
    }
}

/// Genre as listed by `GET /genres`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_tolerates_missing_optional_fields() {
        let movie: Movie = serde_json::from_value(json!({
            "_id": "m1",
            "title": "Alien",
        }))
        .unwrap();

        assert_eq!(movie.id, "m1");
        assert!(movie.posters.is_empty());
        assert_eq!(movie.poster_url(), None);
    }

    #[test]
    fn test_poster_url_uses_first_poster() {
        let movie: Movie = serde_json::from_value(json!({
            "_id": "m1",
            "title": "Alien",
            "posters": ["/a.jpg", "/b.jpg"],
            "genre_names": ["Horror"],
        }))
        .unwrap();

        assert_eq!(
            movie.poster_url().as_deref(),
            Some("https://image.tmdb.org/t/p/w500/a.jpg")
        );
    }
}
