//! Viewport-driven vector feature cache and its fetch collaborators.

pub mod cache;
pub mod config;
pub mod feature;
pub mod loader;
pub mod registry;
pub mod request;
pub mod shared;
pub mod source;
pub mod wfs;

pub use cache::*;
pub use config::{ConfigError, LayerConfig, ViewerConfig, WfsConfig};
pub use feature::{AttributeValue, Feature, GeoJsonError, Geometry, parse_feature_collection};
pub use loader::{LoadError, RefreshOutcome, ViewportLoader};
pub use registry::FeatureCache;
pub use request::*;
pub use shared::*;
pub use source::{BoxFuture, FeatureSource, FetchError};
pub use wfs::WfsSource;
