use std::sync::Arc;

use foundation::BoundingBox;
use tracing::warn;

use crate::cache::{FetchPlan, InstallOutcome, InstallPolicy, SkipReason};
use crate::config::LayerConfig;
use crate::registry::FeatureCache;
use crate::request::Request;
use crate::shared::SharedLayer;
use crate::source::{FeatureSource, FetchError};

/// Result of one [`ViewportLoader::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Skipped(SkipReason),
    Reused,
    Installed {
        request: Request,
        bounds: BoundingBox,
        features: usize,
    },
    /// A newer response had already been installed.
    Discarded { request: Request },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    UnknownLayer(String),
    Fetch(FetchError),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::UnknownLayer(id) => write!(f, "layer {id:?} is not enabled"),
            LoadError::Fetch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(e) => Some(e),
            LoadError::UnknownLayer(_) => None,
        }
    }
}

impl From<FetchError> for LoadError {
    fn from(e: FetchError) -> Self {
        LoadError::Fetch(e)
    }
}

/// Drives the per-layer decide, fetch, install cycle for viewport changes.
///
/// Refreshes may overlap; nothing deduplicates or cancels in-flight fetches.
/// The install policy decides what a late response does.
pub struct ViewportLoader<S> {
    source: S,
    cache: FeatureCache,
}

impl<S: FeatureSource> ViewportLoader<S> {
    pub fn new(source: S) -> Self {
        Self::with_cache(source, FeatureCache::new())
    }

    pub fn with_policy(source: S, policy: InstallPolicy) -> Self {
        Self::with_cache(source, FeatureCache::with_policy(policy))
    }

    pub fn with_cache(source: S, cache: FeatureCache) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// See [`FeatureCache::enable`]; an enabled layer keeps its contents.
    pub fn enable(&mut self, config: LayerConfig) -> Arc<SharedLayer> {
        self.cache.enable(config)
    }

    /// Clears and forgets a layer. Returns `true` if it was enabled.
    pub fn disable(&mut self, id: &str) -> bool {
        self.cache.disable(id)
    }

    pub fn layer(&self, id: &str) -> Option<Arc<SharedLayer>> {
        self.cache.layer(id)
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.cache.ids()
    }

    /// Brings one layer up to date for `viewport` at `zoom`.
    ///
    /// On a failed fetch the layer keeps its previous contents.
    pub async fn refresh(
        &self,
        layer_id: &str,
        viewport: BoundingBox,
        zoom: i32,
    ) -> Result<RefreshOutcome, LoadError> {
        let (config, layer) = self
            .cache
            .entry(layer_id)
            .ok_or_else(|| LoadError::UnknownLayer(layer_id.to_string()))?;

        let (request, bounds) = match layer.begin_fetch(viewport, zoom) {
            FetchPlan::Skip(reason) => return Ok(RefreshOutcome::Skipped(reason)),
            FetchPlan::Reuse => return Ok(RefreshOutcome::Reused),
            FetchPlan::Fetch { request, bounds } => (request, bounds),
        };

        let features = match self.source.fetch(config, bounds).await {
            Ok(features) => features,
            Err(e) => {
                warn!(layer = %layer_id, request = request.0, error = %e, "feature fetch failed");
                return Err(e.into());
            }
        };

        let count = features.len();
        Ok(match layer.complete(request, bounds, features) {
            InstallOutcome::Installed => RefreshOutcome::Installed {
                request,
                bounds,
                features: count,
            },
            InstallOutcome::Discarded => RefreshOutcome::Discarded { request },
        })
    }

    /// Refreshes every enabled layer in id order; stops at the first error.
    pub async fn refresh_all(
        &self,
        viewport: BoundingBox,
        zoom: i32,
    ) -> Result<Vec<(String, RefreshOutcome)>, LoadError> {
        let mut outcomes = Vec::with_capacity(self.cache.len());
        for id in self.cache.ids() {
            outcomes.push((id.to_string(), self.refresh(id, viewport, zoom).await?));
        }
        Ok(outcomes)
    }
}
