//! Resilient data-access client for the feedback board.
//!
//! This crate provides the throttled, retrying JSON fetch pipeline, the
//! coalescing response cache, item normalization, and the reviews API used
//! by the UI.

pub mod cache;
pub mod fetch;
pub mod normalize;
pub mod reviews;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheMode, ResponseCache};
pub use fetch::{
    HttpReply, OnlineCheck, ReqwestTransport, RequestThrottle, RetryPolicy, RetryingFetcher, Transport, TransportError,
};
pub use normalize::normalize;
pub use reviews::{QueryOptions, ReviewsClient};

pub use feedback_core::{ClientConfig, Error, ErrorKind, MetaSummary, NormalizedItem, ReviewPage};
