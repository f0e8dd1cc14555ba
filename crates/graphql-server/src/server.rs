use std::net::SocketAddr;

use axum::{routing::get, Router};
use graphql_playground::PlaygroundConfig;
use graphql_transport::{
    transport::{Get, MultipartForm, Options, Post},
    Server,
};
use size::Size;
use tokio::{net::TcpListener, signal};

use crate::{config::Config, schema};

pub(crate) fn router(config: &Config) -> Router {
    let uploads = &config.uploads;

    let graphql = Server::builder(schema::build(config))
        .transport(Options)
        .transport(Get)
        .transport(Post)
        .transport(MultipartForm::new(
            bytes(uploads.max_upload_size),
            bytes(uploads.max_memory),
        ))
        .build();

    let mut router = Router::new().route_service(&config.graph.path, graphql);

    if config.playground.enabled {
        let mut playground = PlaygroundConfig::new(config.graph.path.clone());

        if let Some(ref title) = config.playground.title {
            playground = playground.title(title.clone());
        }

        router = router.route(&config.playground.path, get(graphql_playground::handler(playground)));
    }

    router
}

pub(crate) async fn serve(listen_address: SocketAddr, config: Config) -> anyhow::Result<()> {
    let router = router(&config);
    let listener = TcpListener::bind(listen_address).await?;

    tracing::info!("GraphQL endpoint exposed at http://{listen_address}{}", config.graph.path);

    if config.playground.enabled {
        tracing::info!("Playground available at http://{listen_address}{}", config.playground.path);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown())
        .await?;

    Ok(())
}

fn bytes(size: Size) -> u64 {
    size.bytes().max(0).unsigned_abs()
}

/// Resolves once the process receives Ctrl+C or, on unix, a termination signal.
async fn graceful_shutdown() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down gracefully...");
}
