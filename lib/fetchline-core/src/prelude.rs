//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fetchline_core::prelude::*;
//! ```

pub use crate::{
    Blob, Error, ErrorPayload, Form, Method, Part, Request, Response, ResponseData, Result,
    StreamingResponse, Transport, classify,
};
