//! GeoServer WFS `GetFeature` collaborator.

use foundation::BoundingBox;
use reqwest::Url;
use tracing::debug;

use crate::config::{LayerConfig, WfsConfig};
use crate::feature::{Feature, parse_feature_collection};
use crate::source::{BoxFuture, FeatureSource, FetchError};

const WFS_VERSION: &str = "1.0.0";
const OUTPUT_FORMAT: &str = "application/json";
/// Longest server error body kept in a [`FetchError::Server`].
const MAX_ERROR_BODY: usize = 512;

pub struct WfsSource {
    config: WfsConfig,
    client: reqwest::Client,
}

impl WfsSource {
    pub fn new(config: WfsConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: WfsConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(WfsConfig::from_env())
    }

    pub fn config(&self) -> &WfsConfig {
        &self.config
    }

    /// Query string of a `GetFeature` call for `layer` inside `bounds`.
    ///
    /// GeoServer refuses `bbox` together with `CQL_FILTER`, so a layer with a
    /// filter carries its box as a CQL `BBOX` term instead.
    pub fn query_params(
        &self,
        layer: &LayerConfig,
        bounds: BoundingBox,
    ) -> Vec<(&'static str, String)> {
        let srs = &self.config.srs_name;
        let [min_x, min_y, max_x, max_y] = bounds.to_array();
        let mut params = vec![
            ("service", "WFS".to_string()),
            ("version", WFS_VERSION.to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", layer.type_name.clone()),
            ("outputFormat", OUTPUT_FORMAT.to_string()),
            ("srsName", srs.clone()),
        ];
        match layer.filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => params.push((
                "CQL_FILTER",
                format!(
                    "BBOX({},{min_x},{min_y},{max_x},{max_y},'{srs}') AND ({filter})",
                    self.config.geometry_column
                ),
            )),
            _ => params.push(("bbox", format!("{min_x},{min_y},{max_x},{max_y},{srs}"))),
        }
        params
    }

    pub fn request_url(&self, layer: &LayerConfig, bounds: BoundingBox) -> Result<Url, FetchError> {
        Url::parse_with_params(&self.config.url, self.query_params(layer, bounds))
            .map_err(|e| FetchError::Network(format!("invalid WFS url {:?}: {e}", self.config.url)))
    }
}

impl FeatureSource for WfsSource {
    fn fetch<'a>(
        &'a self,
        layer: &'a LayerConfig,
        bounds: BoundingBox,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        Box::pin(async move {
            let url = self.request_url(layer, bounds)?;
            debug!(layer = %layer.id, %url, "WFS GetFeature");

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let mut message = resp.text().await.unwrap_or_default();
                if message.len() > MAX_ERROR_BODY {
                    let mut end = MAX_ERROR_BODY;
                    while !message.is_char_boundary(end) {
                        end -= 1;
                    }
                    message.truncate(end);
                }
                return Err(FetchError::Server {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let features = parse_feature_collection(&body)?;
            debug!(layer = %layer.id, features = features.len(), "WFS response decoded");
            Ok(features)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roads() -> LayerConfig {
        LayerConfig::new("roads", "ibf-system:roads")
    }

    fn view() -> BoundingBox {
        BoundingBox::new(-5.0, -5.0, 15.5, 15.0).unwrap()
    }

    #[test]
    fn builds_bbox_query() {
        let source = WfsSource::new(WfsConfig::default());
        let params = source.query_params(&roads(), view());
        assert_eq!(
            params,
            vec![
                ("service", "WFS".to_string()),
                ("version", "1.0.0".to_string()),
                ("request", "GetFeature".to_string()),
                ("typeName", "ibf-system:roads".to_string()),
                ("outputFormat", "application/json".to_string()),
                ("srsName", "EPSG:4326".to_string()),
                ("bbox", "-5,-5,15.5,15,EPSG:4326".to_string()),
            ]
        );
    }

    #[test]
    fn folds_bbox_into_cql_filter() {
        let source = WfsSource::new(WfsConfig::default());
        let layer = roads().with_filter("highway = 'primary'");
        let params = source.query_params(&layer, view());
        assert!(!params.iter().any(|(k, _)| *k == "bbox"));
        assert_eq!(
            params.last(),
            Some(&(
                "CQL_FILTER",
                "BBOX(geom,-5,-5,15.5,15,'EPSG:4326') AND (highway = 'primary')".to_string()
            ))
        );
    }

    #[test]
    fn blank_filter_uses_plain_bbox() {
        let source = WfsSource::new(WfsConfig::default());
        let params = source.query_params(&roads().with_filter("  "), view());
        assert_eq!(params.last().map(|(k, _)| *k), Some("bbox"));
    }

    #[test]
    fn request_url_encodes_parameters() {
        let source = WfsSource::new(WfsConfig::default());
        let url = source.request_url(&roads(), view()).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8081));
        assert_eq!(url.path(), "/geoserver/ibf-system/wfs");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("typeName".into(), "ibf-system:roads".into())));
        assert!(pairs.contains(&("bbox".into(), "-5,-5,15.5,15,EPSG:4326".into())));
    }

    #[test]
    fn bad_base_url_is_reported() {
        let source = WfsSource::new(WfsConfig {
            url: "not a url".into(),
            ..WfsConfig::default()
        });
        assert!(matches!(
            source.request_url(&roads(), view()),
            Err(FetchError::Network(_))
        ));
    }
}
