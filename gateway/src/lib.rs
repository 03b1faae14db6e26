//! # Courier Gateway
//!
//! Request gateway that layers correlation ids, loading-spinner signaling,
//! shared default headers/params, rotating-authorization capture and
//! centralized error dispatch on top of a generic HTTP [`Transport`].
//!
//! ## Call lifecycle
//!
//! ```text
//! caller ──► Gateway::call
//!              │ 1. fresh CorrelationId
//!              │ 2. resolve app/sub-app (default mainApp/subMainApp)
//!              │ 3. ProgressIndicator::start
//!              │ 4. merge SharedDefaults, Transport::send
//!              │ 5. ProgressIndicator::end   (always, exactly once)
//!              ├─ Ok  ─► capture rotating auth header ─► Ok(Response)
//!              └─ Err ─► NormalizedError ─► ErrorHandler::dispatch ─► Err(NormalizedError)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use courier_core::RequestDescriptor;
//! use courier_gateway::{Gateway, GatewayConfig, GatewayEnvironment, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new("https://api.example.com")
//!     .with_common_authorization_header("X-Token");
//! let transport = HttpTransport::from_config(&config)?;
//! let gateway = Gateway::new(config, transport, GatewayEnvironment::default());
//!
//! gateway.set_common_header("Accept", "application/json");
//!
//! let request = RequestDescriptor::get("/users/me").with_base_url("https://api.example.com");
//! match gateway.call(request).await {
//!     Ok(response) => println!("status {}", response.status),
//!     Err(error) => println!("failed: {error}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Transport`]: courier_core::environment::Transport

pub mod config;
pub mod defaults;
pub mod environment;
pub mod gateway;
pub mod metrics;
pub mod transport;

// Re-export main types for convenience
pub use config::{ConfigError, GatewayConfig};
pub use defaults::{SharedDefaults, UrlParam};
pub use environment::{GatewayEnvironment, TracingErrorHandler, TracingProgressIndicator};
pub use gateway::{Gateway, BROADCAST_ACTION_PATH, SESSION_TOKEN_KEY};
pub use transport::HttpTransport;
