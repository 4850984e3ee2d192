mod config;
mod envelope;
mod routes;
mod services;
mod state;
mod views;
mod words;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env();
    let port = config.port;

    // Word-list loading is non-fatal: without one the server runs with a
    // permissive dictionary (logged inside the loader).
    let lexicon = words::load_lexicon(&config);

    let state = state::AppState::new(config, lexicon);

    // Background enforcement: turn deadlines and idle-room eviction.
    let _turn_ticker = services::timers::spawn_turn_ticker(state.clone());
    let _idle_sweeper = services::timers::spawn_idle_sweeper(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "scrabble server listening");
    axum::serve(listener, app).await.expect("server failed");
}
