//! Fetch collaborator abstraction.
//!
//! The cache only decides *what* to request; a [`FeatureSource`] performs
//! the request. Errors are handed back unchanged and never retried here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use foundation::BoundingBox;

use crate::config::LayerConfig;
use crate::feature::{Feature, GeoJsonError};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches the features of one layer inside a bounding box.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait FeatureSource: Send + Sync {
    fn fetch<'a>(
        &'a self,
        layer: &'a LayerConfig,
        bounds: BoundingBox,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>>;
}

impl<T: FeatureSource + ?Sized> FeatureSource for Arc<T> {
    fn fetch<'a>(
        &'a self,
        layer: &'a LayerConfig,
        bounds: BoundingBox,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        (**self).fetch(layer, bounds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response.
    Network(String),
    /// The server answered with a non-success status.
    Server { status: u16, message: String },
    /// The response body was not a usable feature collection.
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "feature request failed: {msg}"),
            FetchError::Server { status, message } => {
                write!(f, "feature server returned {status}: {message}")
            }
            FetchError::Decode(msg) => write!(f, "failed to decode features: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<GeoJsonError> for FetchError {
    fn from(e: GeoJsonError) -> Self {
        FetchError::Decode(e.message)
    }
}
