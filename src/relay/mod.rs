//! The email relay: a small HTTP service that accepts `{to, subject, html}` and forwards it to
//! the upstream mail provider.
//!
//! It exists so that the provider's API key lives in one place (the relay's environment) rather
//! than with every client. Every response carries permissive CORS headers so a browser client
//! can call it as well.

mod provider;

pub use provider::{MailProvider, OutgoingMail, ProviderReply, ResendProvider, RESEND_API_URL};

use crate::email::Email;
use crate::error::{Error, ErrorType, Res};
use anyhow::{anyhow, Context};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// The sender used when none is configured.
pub const DEFAULT_FROM: &str = "EduWallet <notifications@resend.dev>";

/// The address the relay listens on when none is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1:8888";

/// Handles relay requests. Cheap to share between connections behind an `Arc`.
pub struct Relay {
    provider: Box<dyn MailProvider>,
    from: String,
}

impl Relay {
    pub fn new(provider: Box<dyn MailProvider>, from: impl Into<String>) -> Self {
        Self {
            provider,
            from: from.into(),
        }
    }

    /// Answers a single request. This never fails: every error becomes a JSON response.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        if request.method() == Method::OPTIONS {
            return respond(StatusCode::OK, Bytes::new());
        }
        if request.method() != Method::POST {
            return respond_json(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({ "error": "Method not allowed" }),
            );
        }

        let body = match request.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => return rejected(anyhow!("Unable to read the request body: {e}")),
        };
        let email: Email = match serde_json::from_slice(&body) {
            Ok(email) => email,
            Err(e) => return rejected(anyhow::Error::new(e).context("Invalid request body")),
        };

        let mail = OutgoingMail {
            from: self.from.clone(),
            to: vec![email.to.clone()],
            subject: email.subject,
            html: email.html,
        };
        match self.provider.send(&mail).await {
            Ok(reply) if reply.is_success() => {
                info!("Relayed email to {}", email.to);
                respond_json(
                    StatusCode::OK,
                    &json!({
                        "success": true,
                        "message": "Email sent successfully",
                        "data": reply.body,
                    }),
                )
            }
            Ok(reply) => {
                let message = reply
                    .body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Failed to send email")
                    .to_string();
                warn!(
                    "The mail provider rejected an email to {} ({}): {message}",
                    email.to, reply.status
                );
                let status =
                    StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
                failure(status, message)
            }
            Err(e) => {
                warn!("Unable to reach the mail provider: {e:#}");
                failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        }
    }
}

/// Serves `relay` on `listener` until `shutdown` completes. Each connection runs on its own
/// task.
pub async fn serve<F>(listener: TcpListener, relay: Arc<Relay>, shutdown: F) -> Res<()>
where
    F: Future<Output = ()>,
{
    let local = listener
        .local_addr()
        .context("Unable to read the relay's listening address")?;
    info!("Email relay listening on http://{local}");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Unable to accept a connection: {e}");
                        continue;
                    }
                };
                debug!("Connection from {peer}");
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    let service = service_fn(move |request: Request<Incoming>| {
                        let relay = Arc::clone(&relay);
                        async move { Ok::<_, Infallible>(relay.handle(request).await) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("Connection from {peer} ended with an error: {e}");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Email relay shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// A 400 answer for a request the relay cannot act on.
fn rejected(e: anyhow::Error) -> Response<Full<Bytes>> {
    let error = Error::new(ErrorType::Request, e);
    debug!("Rejected relay request: {error}");
    failure(StatusCode::BAD_REQUEST, error.to_string())
}

fn failure(status: StatusCode, error: String) -> Response<Full<Bytes>> {
    respond_json(status, &json!({ "success": false, "error": error }))
}

fn respond_json(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let mut response = respond(status, Bytes::from(value.to_string()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn respond(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;

    /// A provider that answers with a canned reply and remembers what it was asked to send.
    struct FakeProvider {
        reply: Option<ProviderReply>,
        sent: Arc<Mutex<Vec<OutgoingMail>>>,
    }

    impl FakeProvider {
        fn replying(status: u16, body: Value) -> (Self, Arc<Mutex<Vec<OutgoingMail>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let provider = Self {
                reply: Some(ProviderReply { status, body }),
                sent: Arc::clone(&sent),
            };
            (provider, sent)
        }

        fn unreachable() -> Self {
            Self {
                reply: None,
                sent: Arc::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl MailProvider for FakeProvider {
        async fn send(&self, mail: &OutgoingMail) -> Res<ProviderReply> {
            self.sent.lock().unwrap().push(mail.clone());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => bail!("connection refused"),
            }
        }
    }

    fn request(method: Method, body: &str) -> Request<Full<Bytes>> {
        let mut request = Request::new(Full::new(Bytes::from(body.to_string())));
        *request.method_mut() = method;
        request
    }

    async fn read(response: Response<Full<Bytes>>) -> (StatusCode, String) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const BODY: &str = r#"{"to":"s@uni.edu","subject":"Hi","html":"<p>x</p>"}"#;

    #[tokio::test]
    async fn test_options_is_empty_ok_with_cors() {
        let (provider, sent) = FakeProvider::replying(200, json!({}));
        let relay = Relay::new(Box::new(provider), DEFAULT_FROM);
        let response = relay.handle(request(Method::OPTIONS, "")).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS"
        );
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let relay = Relay::new(Box::new(FakeProvider::unreachable()), DEFAULT_FROM);
        let (status, body) = read(relay.handle(request(Method::GET, "")).await).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, r#"{"error":"Method not allowed"}"#);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let relay = Relay::new(Box::new(FakeProvider::unreachable()), DEFAULT_FROM);
        let (status, body) = read(relay.handle(request(Method::POST, "{nope")).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], false);
        let error = value["error"].as_str().unwrap();
        assert!(error.starts_with("request error: Invalid request body"), "{error}");
    }

    #[tokio::test]
    async fn test_missing_field_is_request_error() {
        let (provider, sent) = FakeProvider::replying(200, json!({}));
        let relay = Relay::new(Box::new(provider), DEFAULT_FROM);
        let body = r#"{"to":"s@uni.edu","html":"<p>x</p>"}"#;
        let (status, body) = read(relay.handle(request(Method::POST, body)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("request error"), "{body}");
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_forwards_with_from_and_list_recipient() {
        let (provider, sent) = FakeProvider::replying(200, json!({"id": "abc"}));
        let relay = Relay::new(Box::new(provider), "Test <t@example.com>");
        let (status, body) = read(relay.handle(request(Method::POST, BODY)).await).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Email sent successfully");
        assert_eq!(value["data"]["id"], "abc");

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "Test <t@example.com>");
        assert_eq!(sent[0].to, vec!["s@uni.edu".to_string()]);
        assert_eq!(sent[0].subject, "Hi");
    }

    #[tokio::test]
    async fn test_upstream_rejection_mirrors_status() {
        let (provider, _) = FakeProvider::replying(422, json!({"message": "Invalid `to` field"}));
        let relay = Relay::new(Box::new(provider), DEFAULT_FROM);
        let (status, body) = read(relay.handle(request(Method::POST, BODY)).await).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Invalid `to` field");
    }

    #[tokio::test]
    async fn test_upstream_rejection_without_message() {
        let (provider, _) = FakeProvider::replying(500, Value::Null);
        let relay = Relay::new(Box::new(provider), DEFAULT_FROM);
        let (status, body) = read(relay.handle(request(Method::POST, BODY)).await).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Failed to send email"));
    }

    #[tokio::test]
    async fn test_transport_error_is_500() {
        let relay = Relay::new(Box::new(FakeProvider::unreachable()), DEFAULT_FROM);
        let (status, body) = read(relay.handle(request(Method::POST, BODY)).await).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_serve_end_to_end_with_relay_dispatcher() {
        use crate::notify::{deliver, RelayDispatcher};

        let (provider, sent) = FakeProvider::replying(200, json!({"id": "1"}));
        let relay = Arc::new(Relay::new(Box::new(provider), DEFAULT_FROM));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, relay, async move {
            let _ = stopped.await;
        }));

        let dispatcher = RelayDispatcher::new(format!("http://{addr}/send-email")).unwrap();
        let email = Email {
            to: "s@uni.edu".into(),
            subject: "Hello".into(),
            html: "<p>hello</p>".into(),
        };
        assert!(deliver(&dispatcher, &email).await);
        assert_eq!(sent.lock().unwrap()[0].subject, "Hello");

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
