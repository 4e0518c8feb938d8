use std::collections::BTreeSet;
use std::env;

use foundation::BufferFraction;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WFS_URL: &str = "http://localhost:8081/geoserver/ibf-system/wfs";
pub const DEFAULT_SRS: &str = "EPSG:4326";
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geom";

pub const WFS_URL_ENV: &str = "MAPPY_WFS_URL";
pub const WFS_SRS_ENV: &str = "MAPPY_WFS_SRS";

/// Where and how to reach the feature server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WfsConfig {
    pub url: String,
    pub srs_name: String,
    /// Geometry attribute used when the bbox has to be expressed in CQL.
    pub geometry_column: String,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WFS_URL.to_string(),
            srs_name: DEFAULT_SRS.to_string(),
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
        }
    }
}

impl WfsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`WfsConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: lookup(WFS_URL_ENV).unwrap_or(defaults.url),
            srs_name: lookup(WFS_SRS_ENV).unwrap_or(defaults.srs_name),
            geometry_column: defaults.geometry_column,
        }
    }
}

/// One toggleable vector layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    /// Qualified feature type, e.g. `ibf-system:roads`.
    pub type_name: String,
    #[serde(default)]
    pub min_zoom: Option<i32>,
    /// Extra CQL filter ANDed with the bbox.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub buffer_fraction: BufferFraction,
}

impl LayerConfig {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            min_zoom: None,
            filter: None,
            buffer_fraction: BufferFraction::default(),
        }
    }

    pub fn with_min_zoom(mut self, min_zoom: i32) -> Self {
        self.min_zoom = Some(min_zoom);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_buffer_fraction(mut self, fraction: BufferFraction) -> Self {
        self.buffer_fraction = fraction;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub wfs: WfsConfig,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wfs.url.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                layer: None,
                field: "wfs.url",
            });
        }
        let mut seen = BTreeSet::new();
        for layer in &self.layers {
            if layer.id.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    layer: None,
                    field: "id",
                });
            }
            if layer.type_name.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    layer: Some(layer.id.clone()),
                    field: "type_name",
                });
            }
            if !seen.insert(layer.id.as_str()) {
                return Err(ConfigError::DuplicateLayer(layer.id.clone()));
            }
        }
        Ok(())
    }

    pub fn layer(&self, id: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    DuplicateLayer(String),
    EmptyField {
        layer: Option<String>,
        field: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::DuplicateLayer(id) => write!(f, "layer {id:?} configured twice"),
            ConfigError::EmptyField {
                layer: Some(layer),
                field,
            } => write!(f, "layer {layer:?}: {field} must not be empty"),
            ConfigError::EmptyField { layer: None, field } => {
                write!(f, "{field} must not be empty")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn env_lookup_falls_back_to_defaults() {
        let config = WfsConfig::from_lookup(|_| None);
        assert_eq!(config, WfsConfig::default());
        assert_eq!(config.url, DEFAULT_WFS_URL);
        assert_eq!(config.srs_name, "EPSG:4326");

        let config = WfsConfig::from_lookup(|key| match key {
            WFS_URL_ENV => Some("https://geo.example.org/wfs".to_string()),
            _ => None,
        });
        assert_eq!(config.url, "https://geo.example.org/wfs");
        assert_eq!(config.srs_name, DEFAULT_SRS);
    }

    #[test]
    fn loads_viewer_config() {
        let config = ViewerConfig::from_json(
            r#"{
                "wfs": {"srs_name": "EPSG:3857"},
                "layers": [
                    {"id": "roads", "type_name": "ibf-system:roads", "min_zoom": 10},
                    {"id": "schools", "type_name": "ibf-system:schools",
                     "filter": "status = 'open'", "buffer_fraction": 0.25}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.wfs.url, DEFAULT_WFS_URL);
        assert_eq!(config.wfs.srs_name, "EPSG:3857");
        assert_eq!(
            config.layer("roads"),
            Some(&LayerConfig::new("roads", "ibf-system:roads").with_min_zoom(10))
        );
        let schools = config.layer("schools").unwrap();
        assert_eq!(schools.buffer_fraction.value(), 0.25);
        assert_eq!(schools.filter.as_deref(), Some("status = 'open'"));
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(matches!(
            ViewerConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json(
                r#"{"layers": [{"id": "a", "type_name": "x:a", "buffer_fraction": -1}]}"#
            ),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            ViewerConfig::from_json(
                r#"{"layers": [{"id": "a", "type_name": "x:a"}, {"id": "a", "type_name": "x:b"}]}"#
            ),
            Err(ConfigError::DuplicateLayer("a".into()))
        );
        assert_eq!(
            ViewerConfig::from_json(r#"{"layers": [{"id": "a", "type_name": " "}]}"#),
            Err(ConfigError::EmptyField {
                layer: Some("a".into()),
                field: "type_name"
            })
        );
    }
}
