//! The `eduwallet mcp` server: every command exposed as an MCP tool over stdio, so an agent can
//! record spending and read the analytics for the user.

/// Returns the "not initialized" tool error from the calling tool unless `initialize_service`
/// has run in this session.
macro_rules! require_init {
    ($self:expr) => {
        if !$self.check_initialized().await {
            return Self::uninitialized();
        }
    };
}

mod mcp_utils;
mod tools;

use crate::error::{ErrorType, IntoResult};
use crate::{Config, Mode};
use anyhow::anyhow;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Serves one user's wallet. Tools that can raise alerts or send the weekly report pick their
/// dispatcher from `mode`.
#[derive(Debug, Clone)]
pub struct EduWalletServer {
    initialized: Arc<Mutex<bool>>,
    mode: Mode,
    config: Arc<Config>,
    tool_router: ToolRouter<EduWalletServer>,
}

impl EduWalletServer {
    pub fn new(config: Config, mode: Mode) -> Self {
        Self {
            initialized: Arc::new(Mutex::new(false)),
            mode,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    async fn check_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    fn uninitialized() -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![rmcp::model::Content::text(
            "You have not yet initialized the service. Please call initialize_service first.",
        )]))
    }

    /// The command handlers take the config by value.
    fn config(&self) -> Config {
        (*self.config).clone()
    }
}

#[tool_handler]
impl ServerHandler for EduWalletServer {
    /// The short introduction in `docs/INTRO.md`. The category limits, the budget rules and the
    /// amount formats are in `docs/INSTRUCTIONS.md`, returned by `initialize_service`.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "eduwallet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Where the server reads requests from and writes replies to.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// One end of an in-process duplex pipe; the test client holds the other.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Serves the wallet in `config` until the client goes away. Failing to start or a transport
/// error is a `Service` error.
pub(crate) async fn run_server(config: Config, mode: Mode, io: Io) -> crate::Result<()> {
    let server = EduWalletServer::new(config, mode);
    info!("Starting the eduwallet MCP server for {}", server.config.email());

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow!("Unable to start the MCP server: {e}")),
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow!("Unable to start the MCP server: {e}")),
    }
    .pub_result(ErrorType::Service)?;

    let reason = service
        .waiting()
        .await
        .map_err(|e| anyhow!("The MCP server stopped with an error: {e}"))
        .pub_result(ErrorType::Service)?;
    info!("MCP server stopped: {reason:?}");
    Ok(())
}
