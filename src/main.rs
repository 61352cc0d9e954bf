use movierecs_client::{
    app::AppState,
    config::Config,
    models::PAGE_SIZE,
    services::MovieFilter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(api = %config.api_base_url, app = %config.app_name, "Starting client");

    // Initialize application state
    let state = AppState::new(&config);
    let guards = state.spawn_guard_watcher();

    let session = state.session.start().await;
    match &session.identity {
        Some(identity) => tracing::info!(
            email = %identity.email,
            is_admin = session.is_admin,
            "Session restored"
        ),
        None => tracing::info!("No active session"),
    }

    let token = state.session.token();
    let movies = state
        .api
        .list_movies(0, PAGE_SIZE, &MovieFilter::default(), token.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch movies: {}", e.user_message()))?;

    println!("{} - {} movies on the first page", state.app_name, movies.len());
    for movie in &movies {
        println!(
            "  [{}] {} ({})",
            movie.id,
            movie.title,
            movie.genres.as_deref().unwrap_or("-")
        );
    }

    guards.abort();
    Ok(())
}
