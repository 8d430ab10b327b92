use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::AppState;
use api::recommendations::Audience;
use auth::Credentials;
use common::config::ClientConfig;
use common::database::DatabaseConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting movie review client");

    let state = AppState::from_config(DatabaseConfig::from_env()?, ClientConfig::from_env())?;

    if !state.database.health_check().await? {
        anyhow::bail!("Failed to open local database");
    }

    let mut notices = state.session.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            warn!("{}", notice.message());
        }
    });

    let session = state.session.restore().await;
    info!(status = ?session.status, "Session ready");

    if let (Ok(username), Ok(password)) = (
        env::var("MOVIE_REVIEW_USERNAME"),
        env::var("MOVIE_REVIEW_PASSWORD"),
    ) {
        match state
            .authenticator
            .sign_in(&Credentials::new(username, password))
            .await
        {
            Ok(user) => info!(user_id = %user.id, "Signed in as {}", user.username),
            Err(e) => error!("Sign-in failed: {}", e.user_message()),
        }
    }

    if let Ok(raw) = env::var("MOVIE_REVIEW_GENRES") {
        let desired = parse_genre_ids(&raw)?;

        match state.session.user().await {
            Some(user) => {
                let report = state.reconciler.reconcile(&user.id, &desired).await;
                info!(
                    removed = ?report.removed,
                    added = ?report.added,
                    failures = report.failures.len(),
                    "Genre preferences updated"
                );
            }
            None => warn!("MOVIE_REVIEW_GENRES ignored without a signed-in user"),
        }
    }

    match state.recommendations.load(&state.session).await {
        Ok(recommendations) => {
            match &recommendations.audience {
                Audience::Guest => info!("Recommendations for guest"),
                Audience::Member { username } => info!("Recommendations for {}", username),
            }
            for movie in &recommendations.movies {
                info!(movie_id = %movie.id, "{}", movie.title);
            }
        }
        Err(e) => error!("Failed to load recommendations: {}", e),
    }

    // Keep running so an armed session expiry is still reported
    tokio::signal::ctrl_c().await?;
    info!("Shutting down movie review client");

    Ok(())
}

/// Parse a comma-separated list of genre ids such as `"27, 35"`
fn parse_genre_ids(raw: &str) -> Result<BTreeSet<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("Invalid genre id in MOVIE_REVIEW_GENRES: {}", part))
        })
        .collect()
}
