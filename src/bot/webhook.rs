//! Webhook mode implementation for the bot.
//!
//! Uses teloxide's built-in axum webhook support to:
//! - Call `setWebhook` on Telegram with `<PUBLIC_URL>/webhook/<secret>`
//! - Build the axum router that turns POSTed updates into dispatcher input
//!
//! In front of teloxide's route sits [`guard_webhook`]: a wrong secret path
//! segment gets 403 and a body that is not JSON gets 400. Accepted updates
//! are answered with 200 as soon as they are queued for the dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::{debug, error, info, warn};
use url::Url;

use super::dispatcher::ThrottledBot;
use crate::config::WebhookConfig;

/// Largest update body we are willing to buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Path layout of the webhook endpoint.
#[derive(Debug, Clone)]
struct WebhookGuard {
    /// Everything before the secret segment, ending in `/webhook/`.
    prefix: String,
    secret: String,
}

impl WebhookGuard {
    fn new(public_url: &Url, secret: &str) -> Self {
        let base = public_url.path().trim_end_matches('/');
        Self {
            prefix: format!("{base}/webhook/"),
            secret: secret.to_string(),
        }
    }

    /// Full webhook URL to register with Telegram.
    fn url(&self, public_url: &Url) -> Url {
        let mut url = public_url.clone();
        url.set_path(&format!("{}{}", self.prefix, self.secret));
        url.set_query(None);
        url
    }

    /// `Ok(true)` for the webhook path, `Ok(false)` for anything outside
    /// the webhook prefix, 403 for a wrong secret segment.
    fn check_path(&self, path: &str) -> Result<bool, StatusCode> {
        match path.strip_prefix(&self.prefix) {
            None => Ok(false),
            Some(segment) if segment == self.secret => Ok(true),
            Some(_) => Err(StatusCode::FORBIDDEN),
        }
    }
}

/// 400 unless the body was read and parses as JSON.
fn check_body(body: Option<&[u8]>) -> Result<(), StatusCode> {
    match body {
        Some(bytes) if serde_json::from_slice::<serde_json::Value>(bytes).is_ok() => Ok(()),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// axum middleware guarding the webhook route.
async fn guard_webhook(State(guard): State<Arc<WebhookGuard>>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    match guard.check_path(&path) {
        Err(status) => {
            warn!("Rejected webhook call to {}: {}", path, status);
            return status.into_response();
        }
        Ok(false) => return next.run(request).await,
        Ok(true) => {}
    }

    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, MAX_BODY_BYTES).await.ok();

    if let Err(status) = check_body(bytes.as_deref()) {
        debug!("Rejected webhook body: {}", status);
        return status.into_response();
    }

    let body = bytes.map(Body::from).unwrap_or_else(Body::empty);
    next.run(Request::from_parts(parts, body)).await
}

/// Start the bot in webhook mode.
///
/// Registers the webhook, serves it on `0.0.0.0:<port>`, and dispatches
/// updates until Ctrl+C.
pub async fn start_webhook(
    config: &WebhookConfig,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    let guard = Arc::new(WebhookGuard::new(&config.public_url, &config.secret));
    let url = guard.url(&config.public_url);

    // Server address - listen on all interfaces at the configured port
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("🔗 Setting webhook URL: {}<secret>", url.as_str().trim_end_matches(&config.secret));
    info!("📡 Listening on: {}", address);

    let options = Options::new(address, url).secret_token(config.secret.clone());

    // Calls setWebhook and returns the listener plus the router feeding it.
    // The setup only needs basic API access, so skip the Throttle adaptor.
    let (listener, stop_flag, router) = webhooks::axum_to_router(bot.inner().clone(), options).await?;

    let app = router
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(guard, guard_webhook));

    let tcp = tokio::net::TcpListener::bind(address).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
            error!("Webhook server error: {}", e);
        }
    });

    info!("✅ Webhook setup complete, waiting for updates...");

    let error_handler = LoggingErrorHandler::with_custom_text("Error from update listener");

    dispatcher
        .dispatch_with_listener(listener, error_handler)
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> WebhookGuard {
        WebhookGuard::new(&Url::parse("https://coffee.example.com").unwrap(), "s3cret")
    }

    #[test]
    fn test_webhook_url() {
        let public = Url::parse("https://coffee.example.com/bot/").unwrap();
        let guard = WebhookGuard::new(&public, "s3cret");

        assert_eq!(guard.prefix, "/bot/webhook/");
        assert_eq!(
            guard.url(&public).as_str(),
            "https://coffee.example.com/bot/webhook/s3cret"
        );
    }

    #[test]
    fn test_secret_path() {
        let guard = guard();

        assert_eq!(guard.check_path("/webhook/s3cret"), Ok(true));
        for path in ["/webhook/wrong", "/webhook/", "/webhook/s3cret/extra"] {
            assert_eq!(guard.check_path(path), Err(StatusCode::FORBIDDEN));
        }
    }

    #[test]
    fn test_other_paths_pass_through() {
        let guard = guard();

        assert_eq!(guard.check_path("/health"), Ok(false));
        assert_eq!(guard.check_path("/webhook"), Ok(false));
    }

    #[test]
    fn test_body_must_be_json() {
        let update = br#"{"update_id": 1, "message": {}}"#;
        assert_eq!(check_body(Some(update.as_slice())), Ok(()));

        assert_eq!(
            check_body(Some(b"update_id=1".as_slice())),
            Err(StatusCode::BAD_REQUEST)
        );
        // Unreadable or oversized body
        assert_eq!(check_body(None), Err(StatusCode::BAD_REQUEST));
    }
}
