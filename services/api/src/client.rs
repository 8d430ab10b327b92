//! HTTP client for the movie-review backend
//!
//! Covers reviews, movies, genres and recommendations. Bearer-authenticated
//! calls refuse to run without a token, before any request is sent.

use async_trait::async_trait;
use common::config::ClientConfig;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::error::{ApiError, ApiResult};
use crate::models::{DataEnvelope, Genre, Movie, NewReview, Review, ReviewUpdate};

/// Header the backend uses to tell mobile writes from web writes
const REQUESTED_FROM: (&str, &str) = ("X-Requested-From", "mobile");

/// Source of movie recommendations
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Anonymous selection for guests
    async fn get_random_recommendations(&self) -> ApiResult<Vec<Movie>>;

    /// Personalized selection, filtered by the given genres when non-empty
    async fn get_personalized_recommendations(
        &self,
        token: &str,
        genre_ids: &[i64],
    ) -> ApiResult<Vec<Movie>>;
}

/// Backend REST client
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: HttpClient,
    config: ClientConfig,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// GET `/review`
    pub async fn get_all_reviews(&self) -> ApiResult<Vec<Review>> {
        let request = self.http.get(self.config.endpoint("review"));
        self.fetch_data(request, "get_all_reviews").await
    }

    /// GET `/review/movie/:id`
    pub async fn get_reviews_by_movie(&self, movie_id: &str) -> ApiResult<Vec<Review>> {
        require("movie id", movie_id)?;

        let request = self
            .http
            .get(self.config.endpoint(&format!("review/movie/{}", movie_id)));
        self.fetch_data(request, "get_reviews_by_movie").await
    }

    /// GET `/review/user/:userId`
    pub async fn get_reviews_by_user(&self, token: &str, user_id: &str) -> ApiResult<Vec<Review>> {
        require_token(token)?;
        require("user id", user_id)?;

        let request = self
            .http
            .get(self.config.endpoint(&format!("review/user/{}", user_id)))
            .bearer_auth(token);
        self.fetch_data(request, "get_reviews_by_user").await
    }

    /// POST `/review/user/`
    pub async fn create_review(&self, token: &str, review: &NewReview) -> ApiResult<Review> {
        require_token(token)?;
        require("movie id", &review.movie)?;
        if review.rating == 0 {
            return Err(ApiError::MissingArgument("rating"));
        }

        let request = self
            .http
            .post(self.config.endpoint("review/user/"))
            .bearer_auth(token)
            .header(REQUESTED_FROM.0, REQUESTED_FROM.1)
            .json(review);

        let created: Review = self.fetch_data(request, "create_review").await?;
        info!(review_id = %created.id, "Created review");
        Ok(created)
    }

    /// PATCH `/review/user/:id`
    pub async fn update_review(
        &self,
        token: &str,
        review_id: &str,
        update: &ReviewUpdate,
    ) -> ApiResult<Review> {
        require_token(token)?;
        require("review id", review_id)?;
        if update.is_empty() {
            return Err(ApiError::MissingArgument("review data"));
        }

        let request = self
            .http
            .patch(self.config.endpoint(&format!("review/user/{}", review_id)))
            .bearer_auth(token)
            .header(REQUESTED_FROM.0, REQUESTED_FROM.1)
            .json(update);
        self.fetch_data(request, "update_review").await
    }

    /// DELETE `/review/user/:id`
    pub async fn delete_review(&self, token: &str, review_id: &str) -> ApiResult<Review> {
        require_token(token)?;
        require("review id", review_id)?;

        let request = self
            .http
            .delete(self.config.endpoint(&format!("review/user/{}", review_id)))
            .bearer_auth(token)
            .header(REQUESTED_FROM.0, REQUESTED_FROM.1);
        self.fetch_data(request, "delete_review").await
    }

    /// GET `/genres`
    pub async fn fetch_genres(&self) -> ApiResult<Vec<Genre>> {
        let request = self.http.get(self.config.endpoint("genres"));
        self.fetch_json(request, "fetch_genres").await
    }

    /// GET `/movies`
    pub async fn fetch_movies(&self) -> ApiResult<Vec<Movie>> {
        let request = self.http.get(self.config.endpoint("movies"));
        self.fetch_json(request, "fetch_movies").await
    }

    fn personalized_request(&self, token: &str, genre_ids: &[i64]) -> RequestBuilder {
        let query: Vec<(&str, i64)> = genre_ids.iter().map(|id| ("genreIds", *id)).collect();

        self.http
            .get(self.config.endpoint("recommended/user/"))
            .query(&query)
            .bearer_auth(token)
    }

    /// Send a request whose response body is `{ "data": T }`
    async fn fetch_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> ApiResult<T> {
        let envelope: DataEnvelope<T> = self.fetch_json(request, operation).await?;
        Ok(envelope.data)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> ApiResult<T> {
        debug!(operation, "Sending request");

        let response = request.send().await.map_err(|e| {
            error!(operation, "Request failed: {}", e);
            ApiError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(operation, status = status.as_u16(), "Backend returned an error");
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response.json::<T>().await.map_err(|e| {
            error!(operation, "Failed to decode response: {}", e);
            ApiError::Http(e)
        })?;

        debug!(operation, "Request succeeded");
        Ok(body)
    }
}

#[async_trait]
impl RecommendationSource for BackendClient {
    async fn get_random_recommendations(&self) -> ApiResult<Vec<Movie>> {
        let request = self.http.get(self.config.endpoint("recommended"));
        let movies: Vec<Movie> = self.fetch_data(request, "get_random_recommendations").await?;
        info!(count = movies.len(), "Fetched random recommendations");
        Ok(movies)
    }

    async fn get_personalized_recommendations(
        &self,
        token: &str,
        genre_ids: &[i64],
    ) -> ApiResult<Vec<Movie>> {
        require_token(token)?;

        let request = self.personalized_request(token, genre_ids);
        let movies: Vec<Movie> = self
            .fetch_data(request, "get_personalized_recommendations")
            .await?;
        info!(
            count = movies.len(),
            genres = genre_ids.len(),
            "Fetched personalized recommendations"
        );
        Ok(movies)
    }
}

fn require_token(token: &str) -> ApiResult<()> {
    if token.trim().is_empty() {
        return Err(ApiError::MissingToken);
    }
    Ok(())
}

fn require(name: &'static str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::MissingArgument(name));
    }
    Ok(())
}
