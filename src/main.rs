//! # HTTP Framework - Entry Point
//! src/main.rs
//!
//! Arranca la aplicación de demostración con la configuración de CLI y
//! variables de entorno. El nivel de log se controla con `RUST_LOG`.

use http_framework::app;
use http_framework::config::Config;
use http_framework::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_framework=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        std::process::exit(2);
    }

    tracing::info!("http_framework v{} starting", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let mut server = Server::new(config);

    // Una ruta duplicada es un error de programación: no se arranca
    if let Err(e) = app::register_routes(&mut server) {
        tracing::error!(error = %e, "route registration failed");
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
