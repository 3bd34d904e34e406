//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fetchline::prelude::*;
//! ```

pub use crate::{
    Blob, Error, FetchConfig, FetchDefaults, FetchResponse, Fetcher, Form, HyperTransport,
    Interceptor, Method, Part, Rejection, RequestConfig, ResponseData, Result, Transport,
};
pub use serde::{Deserialize, Serialize};
