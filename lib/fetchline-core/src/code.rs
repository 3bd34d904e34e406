//! Reserved codes with pipeline-internal meaning.
//!
//! These never come from the backend: [`crate::classify`] only maps them to their
//! dedicated [`crate::Error`] variants when no server message accompanies the code.

/// Generic failure of a request-side stage or of the transport.
pub const REQUEST_FAILED: i64 = 400;

/// Streaming response consumed to completion (synthetic success).
pub const STREAM_COMPLETED: i64 = 700;

/// Streaming path reached without a stream handler.
pub const MISSING_STREAM_HANDLER: i64 = 701;

/// Response has no readable body to stream.
pub const NO_BODY: i64 = 702;

/// Transport call exceeded the configured timeout.
pub const TIMEOUT: i64 = 703;

/// Request aborted by a newer identical request.
pub const SUPERSEDED: i64 = 704;
