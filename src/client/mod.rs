//! # Call API
//!
//! Caller-facing surface of the engine: describe a [`Call`], run it through
//! [`GrpcWebClient`], and consume its ordered [`CallEvent`]s through a
//! [`CallHandle`] (as a `Stream`, with `next_event`, or with a
//! [`CallObserver`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grpc_web_core::client::GrpcWebClient;
//! use grpc_web_core::config::ClientConfig;
//! use grpc_web_core::metadata::Metadata;
//!
//! # async fn example() -> grpc_web_core::Result<()> {
//! let client = GrpcWebClient::new(ClientConfig::load()?)?;
//! let response = client
//!     .unary("/grpc.testing.TestService/EmptyCall", Vec::<u8>::new(), Metadata::new(), None)
//!     .await?;
//! println!("status: {}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod call;
mod driver;
pub mod grpc_web_client;
pub mod handle;
pub mod traits;

// Re-export main types for easy access
pub use call::{Call, CallEvent, MethodPath};
pub use grpc_web_client::{GrpcWebClient, UnaryResponse};
pub use handle::CallHandle;
pub use traits::CallObserver;
