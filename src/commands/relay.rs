//! The `relay` command, which runs the email relay until interrupted.

use crate::args::RelayArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::relay::{serve, Relay, ResendProvider};
use crate::Result;
use anyhow::{bail, Context};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Runs the email relay on `args.bind()` until Ctrl-C is received.
///
/// # Errors
/// - Returns a config error if the API key is empty.
/// - Returns a service error if the address cannot be bound or the server fails.
pub async fn relay(args: RelayArgs) -> Result<Out<()>> {
    if args.api_key().trim().is_empty() {
        return Err(anyhow::anyhow!(
            "An API key is required, pass --api-key or set RESEND_API_KEY"
        ))
        .pub_result(ErrorType::Config);
    }
    let provider = ResendProvider::new(args.api_key()).pub_result(ErrorType::Service)?;
    let service = Arc::new(Relay::new(Box::new(provider), args.from()));
    let listener = bind(args.bind()).await.pub_result(ErrorType::Service)?;

    info!("Press Ctrl-C to stop the relay");
    serve(listener, service, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {e}");
        }
    })
    .await
    .pub_result(ErrorType::Service)?;
    Ok("The email relay has stopped".into())
}

async fn bind(address: &str) -> crate::error::Res<TcpListener> {
    if address.trim().is_empty() {
        bail!("The bind address is empty");
    }
    TcpListener::bind(address)
        .await
        .with_context(|| format!("Unable to listen on {address}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let args = RelayArgs::new("127.0.0.1:0", crate::relay::DEFAULT_FROM, " ");
        let err = relay(args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_bad_bind_address() {
        assert!(bind("not an address").await.is_err());
        assert!(bind("").await.is_err());
    }
}
