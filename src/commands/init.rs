use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and:
/// - Creates an initial `config.json` holding `email`, the relay URL and a new user id
/// - Creates the SQLite database and brings its schema up to date
///
/// # Arguments
/// - `eduwallet_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/eduwallet`
/// - `email` - Where alerts and reports are sent.
/// - `relay_url` - The relay's send-email endpoint. `None` uses the local default.
///
/// # Errors
/// - Returns an error if the directory is already initialized.
/// - Returns an error if the email or relay URL is invalid.
/// - Returns an error if any file or database operation fails.
pub async fn init(
    eduwallet_home: &Path,
    email: &str,
    relay_url: Option<&str>,
) -> Result<Out<()>> {
    let config = Config::create(eduwallet_home, email, relay_url)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the eduwallet directory at {}",
        config.root().display()
    )
    .into())
}
