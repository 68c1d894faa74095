use anyhow::Result;
use axum::{routing::get, Router};
use tracing::info;

/// Servidor HTTP mínimo de keepalive.
///
/// Las plataformas de hosting gratuitas apagan el proceso si nadie lo visita;
/// `/health` responde `OK` para el chequeo y `/` una línea informativa.
pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new()
        .route("/", get(banner))
        .route("/health", get(health));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("🌐 Keepalive HTTP escuchando en el puerto {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn banner() -> &'static str {
    "Aurora Music está en línea"
}
