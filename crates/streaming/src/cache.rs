use std::sync::Arc;

use foundation::{BoundingBox, BufferFraction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LayerConfig;
use crate::feature::Feature;
use crate::request::Request;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BelowMinZoom,
}

/// What the caller should do for the current viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FetchDecision {
    Skip(SkipReason),
    Reuse,
    /// Fetch this buffered box, not the bare viewport.
    FetchWithBounds(BoundingBox),
}

/// The pair that is always replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerContents {
    pub coverage: BoundingBox,
    pub features: Vec<Feature>,
}

/// How `complete` treats responses that arrive out of order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstallPolicy {
    /// Every response installs. A slow, older response may reinstate stale
    /// coverage until the next viewport change.
    #[default]
    LastWriteWins,
    /// Responses issued before the newest installed one are dropped.
    LatestRequestWins,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FetchPlan {
    Skip(SkipReason),
    Reuse,
    Fetch { request: Request, bounds: BoundingBox },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Discarded,
}

/// Fetched state of one logical vector layer.
///
/// Created empty when the layer is toggled on. `coverage` and `features`
/// live in one shared [`LayerContents`] that is swapped whole on install.
#[derive(Debug, Clone)]
pub struct CachedLayer {
    id: String,
    min_zoom: Option<i32>,
    buffer: BufferFraction,
    policy: InstallPolicy,
    contents: Option<Arc<LayerContents>>,
    next_request: u64,
    installed_request: Option<Request>,
}

impl CachedLayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_zoom: None,
            buffer: BufferFraction::default(),
            policy: InstallPolicy::default(),
            contents: None,
            next_request: 1,
            installed_request: None,
        }
    }

    pub fn from_config(config: &LayerConfig) -> Self {
        let mut layer = Self::new(config.id.clone()).with_buffer_fraction(config.buffer_fraction);
        layer.min_zoom = config.min_zoom;
        layer
    }

    pub fn with_min_zoom(mut self, min_zoom: i32) -> Self {
        self.min_zoom = Some(min_zoom);
        self
    }

    pub fn with_buffer_fraction(mut self, buffer: BufferFraction) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_policy(mut self, policy: InstallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn min_zoom(&self) -> Option<i32> {
        self.min_zoom
    }

    pub fn policy(&self) -> InstallPolicy {
        self.policy
    }

    pub fn coverage(&self) -> Option<BoundingBox> {
        self.contents.as_ref().map(|c| c.coverage)
    }

    pub fn features(&self) -> &[Feature] {
        self.contents
            .as_deref()
            .map(|c| c.features.as_slice())
            .unwrap_or(&[])
    }

    /// Shared handle on the current contents, if any were installed.
    pub fn contents(&self) -> Option<Arc<LayerContents>> {
        self.contents.clone()
    }

    pub fn should_fetch(&self, viewport: BoundingBox, zoom: i32) -> FetchDecision {
        if let Some(min_zoom) = self.min_zoom
            && zoom < min_zoom
        {
            debug!(layer = %self.id, zoom, min_zoom, "below min zoom; skipping");
            return FetchDecision::Skip(SkipReason::BelowMinZoom);
        }
        if let Some(coverage) = self.coverage()
            && coverage.contains(&viewport)
        {
            debug!(layer = %self.id, "viewport covered; reusing features");
            return FetchDecision::Reuse;
        }
        let bounds = viewport.buffered(self.buffer);
        debug!(layer = %self.id, bounds = ?bounds.to_array(), "viewport not covered; fetching");
        FetchDecision::FetchWithBounds(bounds)
    }

    /// Replaces coverage and features in one step.
    ///
    /// An empty `features` list is a valid result and is installed too.
    pub fn install(&mut self, requested_bounds: BoundingBox, features: Vec<Feature>) {
        info!(
            layer = %self.id,
            features = features.len(),
            coverage = ?requested_bounds.to_array(),
            "installed layer contents"
        );
        self.contents = Some(Arc::new(LayerContents {
            coverage: requested_bounds,
            features,
        }));
    }

    /// Drops coverage and features. Issued tickets stay valid.
    pub fn clear(&mut self) {
        debug!(layer = %self.id, "cleared layer contents");
        self.contents = None;
    }

    /// [`CachedLayer::should_fetch`] plus a ticket for the fetch, if any.
    pub fn begin_fetch(&mut self, viewport: BoundingBox, zoom: i32) -> FetchPlan {
        match self.should_fetch(viewport, zoom) {
            FetchDecision::Skip(reason) => FetchPlan::Skip(reason),
            FetchDecision::Reuse => FetchPlan::Reuse,
            FetchDecision::FetchWithBounds(bounds) => {
                let request = Request(self.next_request);
                self.next_request += 1;
                FetchPlan::Fetch { request, bounds }
            }
        }
    }

    /// Installs the response to `request` according to the install policy.
    pub fn complete(
        &mut self,
        request: Request,
        bounds: BoundingBox,
        features: Vec<Feature>,
    ) -> InstallOutcome {
        if self.policy == InstallPolicy::LatestRequestWins
            && let Some(latest) = self.installed_request
            && request < latest
        {
            warn!(
                layer = %self.id,
                request = request.0,
                latest = latest.0,
                "discarding stale response"
            );
            return InstallOutcome::Discarded;
        }
        self.install(bounds, features);
        self.installed_request = Some(self.installed_request.map_or(request, |r| r.max(request)));
        InstallOutcome::Installed
    }
}

/// Free-function form of [`CachedLayer::should_fetch`].
pub fn should_fetch(layer: &CachedLayer, viewport: BoundingBox, zoom: i32) -> FetchDecision {
    layer.should_fetch(viewport, zoom)
}

/// Free-function form of [`CachedLayer::install`].
pub fn install(layer: &mut CachedLayer, requested_bounds: BoundingBox, features: Vec<Feature>) {
    layer.install(requested_bounds, features)
}

/// Free-function form of [`CachedLayer::clear`].
pub fn clear(layer: &mut CachedLayer) {
    layer.clear()
}
