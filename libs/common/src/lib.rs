//! Common library for the clinic administration console
//!
//! This crate provides functionality shared by every part of the console:
//! configuration, the HTTP client for the remote clinic API, the error type
//! that client returns, and the operator's session context.

pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use http::ApiClient;
pub use session::{AuthUser, SessionContext, SessionState, UserRole};

/// Example usage of the session module
///
/// ```rust,no_run
/// use common::{ApiClient, ApiConfig, SessionContext};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ApiConfig::from_env()?;
///     let client = ApiClient::new(&config)?;
///     let mut session = SessionContext::new(&config.token_path);
///     session.init().await?;
///     if !session.is_active() {
///         session.login(&client, "admin", "Passw0rd!").await?;
///     }
///     println!("Signed in as {:?}", session.current_user());
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
