use std::sync::Arc;

use foundation::BoundingBox;
use parking_lot::RwLock;

use crate::cache::{CachedLayer, FetchDecision, FetchPlan, InstallOutcome, LayerContents};
use crate::feature::Feature;
use crate::request::Request;

/// A [`CachedLayer`] that can be read and updated from several threads.
///
/// Writers hold the lock only long enough to swap the contents `Arc`, so a
/// reader sees either the old `(coverage, features)` pair or the new one.
#[derive(Debug)]
pub struct SharedLayer {
    inner: RwLock<CachedLayer>,
}

impl SharedLayer {
    pub fn new(layer: CachedLayer) -> Self {
        Self {
            inner: RwLock::new(layer),
        }
    }

    pub fn id(&self) -> String {
        self.inner.read().id().to_string()
    }

    pub fn should_fetch(&self, viewport: BoundingBox, zoom: i32) -> FetchDecision {
        self.inner.read().should_fetch(viewport, zoom)
    }

    pub fn begin_fetch(&self, viewport: BoundingBox, zoom: i32) -> FetchPlan {
        self.inner.write().begin_fetch(viewport, zoom)
    }

    pub fn complete(
        &self,
        request: Request,
        bounds: BoundingBox,
        features: Vec<Feature>,
    ) -> InstallOutcome {
        self.inner.write().complete(request, bounds, features)
    }

    pub fn install(&self, requested_bounds: BoundingBox, features: Vec<Feature>) {
        self.inner.write().install(requested_bounds, features)
    }

    pub fn clear(&self) {
        self.inner.write().clear()
    }

    /// Current contents; stays valid after later installs.
    pub fn snapshot(&self) -> Option<Arc<LayerContents>> {
        self.inner.read().contents()
    }

    /// Runs `f` against the layer under the read lock.
    pub fn with_layer<R>(&self, f: impl FnOnce(&CachedLayer) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` against the layer under the write lock.
    pub fn with_layer_mut<R>(&self, f: impl FnOnce(&mut CachedLayer) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl From<CachedLayer> for SharedLayer {
    fn from(layer: CachedLayer) -> Self {
        Self::new(layer)
    }
}
