//! Tower middleware for the hyper transport.
//!
//! Layers wrap the [`BoxedService`](crate::BoxedService) of a
//! [`HyperTransport`](crate::HyperTransport) and see every round-trip up to the
//! response head. The last layer added is the outermost one.
//!
//! # Example
//!
//! ```ignore
//! use fetchline::HyperTransport;
//! use fetchline::middleware::{ConcurrencyLimitLayer, LoggingLayer};
//!
//! let transport = HyperTransport::builder()
//!     .layer(ConcurrencyLimitLayer::new(8))
//!     .layer(LoggingLayer::new())
//!     .build();
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
