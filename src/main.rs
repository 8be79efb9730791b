use keyturn::api;
use keyturn::logger::*;
use keyturn::server::*;
use keyturn::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap()?;

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.session_service.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    let shutdown_signal = async {
        signal::ctrl_c().await.expect("Could not register SIGINT");
    };

    match (
        project_settings.http.cert_path.as_deref(),
        project_settings.http.key_path.as_deref(),
    ) {
        (Some(cert_path), Some(key_path)) => {
            if !fs::metadata(cert_path)?.is_file() {
                return Err(anyhow::anyhow!(
                    "TLS cert is not a regular file: {:?}",
                    cert_path
                ));
            }
            if !fs::metadata(key_path)?.is_file() {
                return Err(anyhow::anyhow!(
                    "TLS key is not a regular file: {:?}",
                    key_path
                ));
            }
            info!(%address, "serving https");
            warp::serve(api_v1)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown_signal)
                .1
                .await;
        }
        (None, None) => {
            warn!(%address, "no TLS cert configured, serving plain http");
            let (_, serving) = warp::serve(api_v1).bind_with_graceful_shutdown(address, shutdown_signal);
            serving.await;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "http.cert_path and http.key_path must be set together"
            ));
        }
    }

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => tracing::info!("server shutdown successfully"),
        Err(_) => tracing::error!("server shutdown timed out"),
    }

    Ok(())
}
