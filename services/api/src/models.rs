//! Backend payloads consumed by the client

use serde::{Deserialize, Serialize};

pub mod movie;
pub mod review;

pub use movie::{Genre, Movie};
pub use review::{NewReview, Reference, Review, ReviewUpdate};

/// Most endpoints wrap their payload as `{ "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}
