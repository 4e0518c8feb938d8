use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CachedLayer, InstallPolicy};
use crate::config::LayerConfig;
use crate::shared::SharedLayer;

#[derive(Debug)]
struct Entry {
    config: LayerConfig,
    layer: Arc<SharedLayer>,
}

/// Registry of enabled layers keyed by id.
///
/// Enabling a layer that is already enabled keeps its contents. Disabling
/// clears the layer before dropping it, so handles still held elsewhere see
/// an empty cache and enabling it again always refetches.
#[derive(Debug, Default)]
pub struct FeatureCache {
    policy: InstallPolicy,
    layers: BTreeMap<String, Entry>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy given to every layer enabled from now on.
    pub fn with_policy(policy: InstallPolicy) -> Self {
        Self {
            policy,
            layers: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> InstallPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn enable(&mut self, config: LayerConfig) -> Arc<SharedLayer> {
        if let Some(entry) = self.layers.get(&config.id) {
            return Arc::clone(&entry.layer);
        }
        debug!(layer = %config.id, "layer enabled");
        let layer = Arc::new(SharedLayer::new(
            CachedLayer::from_config(&config).with_policy(self.policy),
        ));
        self.layers.insert(
            config.id.clone(),
            Entry {
                config,
                layer: Arc::clone(&layer),
            },
        );
        layer
    }

    /// Returns `true` if the layer was enabled.
    pub fn disable(&mut self, id: &str) -> bool {
        match self.layers.remove(id) {
            Some(entry) => {
                entry.layer.clear();
                debug!(layer = %id, "layer disabled");
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    pub fn layer(&self, id: &str) -> Option<Arc<SharedLayer>> {
        self.layers.get(id).map(|e| Arc::clone(&e.layer))
    }

    pub fn config(&self, id: &str) -> Option<&LayerConfig> {
        self.layers.get(id).map(|e| &e.config)
    }

    pub(crate) fn entry(&self, id: &str) -> Option<(&LayerConfig, &SharedLayer)> {
        self.layers.get(id).map(|e| (&e.config, e.layer.as_ref()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchDecision;
    use crate::feature::{Feature, Geometry};
    use foundation::BoundingBox;
    use pretty_assertions::assert_eq;

    fn bb(a: f64, b: f64, c: f64, d: f64) -> BoundingBox {
        BoundingBox::new(a, b, c, d).unwrap()
    }

    fn road(id: &str) -> Feature {
        Feature::new(Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]])).with_id(id)
    }

    fn roads() -> LayerConfig {
        LayerConfig::new("roads", "ibf-system:roads").with_min_zoom(3)
    }

    #[test]
    fn reenabling_keeps_the_same_layer() {
        let mut cache = FeatureCache::new();
        let first = cache.enable(roads());
        first.install(bb(-1.0, -1.0, 2.0, 2.0), vec![road("a")]);

        let again = cache.enable(roads());
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.with_layer(|l| l.features().len()), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn disable_clears_outstanding_handles() {
        let mut cache = FeatureCache::with_policy(InstallPolicy::LatestRequestWins);
        let view = bb(0.0, 0.0, 1.0, 1.0);

        let held = cache.enable(roads());
        assert_eq!(held.with_layer(|l| l.policy()), InstallPolicy::LatestRequestWins);
        assert_eq!(held.with_layer(|l| l.min_zoom()), Some(3));
        held.install(bb(-1.0, -1.0, 2.0, 2.0), vec![road("a")]);
        assert_eq!(held.should_fetch(view, 3), FetchDecision::Reuse);

        assert!(cache.disable("roads"));
        assert!(!cache.disable("roads"));
        assert!(cache.layer("roads").is_none());
        assert!(held.snapshot().is_none());

        let fresh = cache.enable(roads());
        assert!(!Arc::ptr_eq(&held, &fresh));
        assert!(matches!(
            fresh.should_fetch(view, 3),
            FetchDecision::FetchWithBounds(_)
        ));
    }

    #[test]
    fn iterates_in_id_order() {
        let mut cache = FeatureCache::new();
        cache.enable(LayerConfig::new("roads", "x:roads"));
        cache.enable(LayerConfig::new("borders", "x:borders"));
        cache.enable(LayerConfig::new("buildings", "x:buildings"));
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["borders", "buildings", "roads"]);
        assert_eq!(cache.config("borders").map(|c| c.type_name.as_str()), Some("x:borders"));
        assert!(cache.is_enabled("buildings"));

        let roads = cache.layer("roads").unwrap();
        roads.install(bb(0.0, 0.0, 1.0, 1.0), vec![road("a")]);
        roads.with_layer_mut(|l| l.clear());
        assert!(roads.snapshot().is_none());
    }
}
