//! menubot HTTP server and one-shot operational commands.

use crate::config::BotConfig;
use crate::router::Responder;
use crate::routes;
use crate::routes::webhook::WebhookState;
use anyhow::Result;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use mb_channels::{MessageSender, OutboundContent, SenderId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Webhook requests are acknowledged well before this; it only bounds stuck clients.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn check_config(cfg: &BotConfig) -> Result<()> {
    let adapter = cfg.whatsapp_adapter()?;
    tracing::info!(
        config = ?cfg,
        messages_url = %adapter.messages_url()?,
        signature_verification = cfg.app_secret.is_some(),
        "config ok"
    );
    Ok(())
}

pub async fn send_one_shot(cfg: &BotConfig, recipient: &str, message: &str) -> Result<()> {
    let adapter = cfg.whatsapp_adapter()?;
    let ack = adapter
        .send(&SenderId::from(recipient), OutboundContent::text(message))
        .await?;
    tracing::info!(recipient, message_id = ?ack.message_id, "one-shot send ok");
    Ok(())
}

pub async fn serve(cfg: BotConfig) -> Result<()> {
    let adapter = cfg.whatsapp_adapter()?;
    let sender: Arc<dyn MessageSender> = Arc::new(adapter);
    let responder = Responder::new(sender);
    let webhook_state = Arc::new(WebhookState::new(
        cfg.verify_token.clone(),
        cfg.app_secret.clone(),
        responder,
    ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri().path(),
                request_id = ?request.headers().get("x-request-id")
            )
        })
        .on_response(
            |response: &Response, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "http request completed"
                );
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    error_class = %error,
                    latency_ms = latency.as_millis() as u64,
                    "http request failed"
                );
            },
        );

    let app = routes::router(webhook_state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            HTTP_REQUEST_TIMEOUT,
        ))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let listener = bind_listener(cfg.listen_addr).await?;
    tracing::info!(addr = %cfg.listen_addr, "menubot serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("http server shutdown completed");
    Ok(())
}

async fn bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind failed for {addr}: {e}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to await ctrl-c signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("received ctrl-c; beginning graceful shutdown"),
        _ = terminate => tracing::warn!("received SIGTERM; beginning graceful shutdown"),
    }
}
