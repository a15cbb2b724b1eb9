use std::sync::Arc;

use peptide_ops_api::{
    app,
    config::{init_tracing, load_config},
    db,
    entities::user::UserRole,
    events::{process_events, EventSender},
    services::users::CreateUserInput,
    AppState,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        port = config.port,
        "Starting peptide-ops-api"
    );

    let pool = db::establish_connection_from_app_config(&config).await?;
    if config.auto_migrate {
        db::run_migrations(&pool).await?;
    }
    let pool = Arc::new(pool);

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_handle = tokio::spawn(process_events(event_rx));

    let config = Arc::new(config);
    let state = AppState::new(pool, config.clone(), EventSender::new(event_tx))?;

    bootstrap_admin(&state).await;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    event_handle.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Creates the first admin account when the users table is empty and the
/// bootstrap credentials are configured. Without it a fresh deployment has
/// no way to log in.
async fn bootstrap_admin(state: &AppState) {
    let (email, password) = match (
        &state.config.bootstrap_admin_email,
        &state.config.bootstrap_admin_password,
    ) {
        (Some(email), Some(password)) => (email.clone(), password.clone()),
        _ => return,
    };

    match state.services.users.list_users(1, 1).await {
        Ok((_, total)) if total > 0 => {}
        Ok(_) => {
            let input = CreateUserInput {
                email,
                name: "Administrator".to_string(),
                password,
                role: UserRole::Admin,
            };
            match state.services.users.create_user(input, "system").await {
                Ok(user) => info!(user_id = %user.id, "Bootstrap admin created"),
                Err(e) => error!(error = %e, "Failed to create bootstrap admin"),
            }
        }
        Err(e) => warn!(error = %e, "Could not check for existing users"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
