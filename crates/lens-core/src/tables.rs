//! Versioned lookup tables.
//!
//! Label → filter, product → health score, score → band, and class/filter →
//! colour live in a single TOML file. The default table is embedded at compile
//! time from `contrib/tables/healthy-lens.toml`; an override file can be loaded
//! at start-up. Tables are immutable once built.

use crate::filters::FilterParams;
use crate::mapper::{HealthBand, HealthBands};
use crate::types::{Emotion, FilterName, Gesture, Product, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Table schema version understood by this build.
pub const TABLE_VERSION: u32 = 3;

const BUILTIN_TABLES: &str = include_str!("../../../contrib/tables/healthy-lens.toml");

static BUILTIN: OnceLock<LensTables> = OnceLock::new();

#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to read table file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad table TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize tables: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(
        "unsupported table version {found} (this build reads up to {max})",
        max = TABLE_VERSION
    )]
    UnsupportedVersion { found: u32 },
    #[error("unknown {section} key: {key}")]
    UnknownKey { section: &'static str, key: String },
    #[error("invalid health bands: {0}")]
    InvalidBands(String),
    #[error("health score for {product} is not finite")]
    InvalidScore { product: String },
    #[error("invalid filter params: {0}")]
    InvalidParams(String),
}

/// On-disk layout. Keys stay as strings here and are resolved to typed labels in
/// [`LensTables::from_file`], so unknown keys are reported by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFile {
    pub version: u32,
    #[serde(default)]
    pub default_filter: FilterName,
    #[serde(default)]
    pub params: FilterParams,
    #[serde(default)]
    pub gestures: BTreeMap<String, FilterName>,
    #[serde(default)]
    pub emotions: BTreeMap<String, FilterName>,
    pub health: HealthSection,
    #[serde(default)]
    pub colors: ColorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSection {
    #[serde(default)]
    pub scores: BTreeMap<String, f32>,
    pub bands: Vec<HealthBand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSection {
    #[serde(default = "default_box_color")]
    pub default: Rgb,
    #[serde(default = "default_text_color")]
    pub text: Rgb,
    #[serde(default)]
    pub products: BTreeMap<String, Rgb>,
    #[serde(default)]
    pub filters: BTreeMap<String, Rgb>,
}

impl Default for ColorSection {
    fn default() -> Self {
        Self {
            default: default_box_color(),
            text: default_text_color(),
            products: BTreeMap::new(),
            filters: BTreeMap::new(),
        }
    }
}

fn default_box_color() -> Rgb {
    [255, 0, 0]
}

fn default_text_color() -> Rgb {
    [255, 255, 255]
}

/// Validated, typed lookup tables.
#[derive(Debug, Clone, PartialEq)]
pub struct LensTables {
    pub version: u32,
    /// Filter for labels with no entry (and products with no score).
    pub default_filter: FilterName,
    pub params: FilterParams,
    pub gestures: BTreeMap<Gesture, FilterName>,
    pub emotions: BTreeMap<Emotion, FilterName>,
    pub health_scores: BTreeMap<Product, f32>,
    pub health_bands: HealthBands,
    pub product_colors: BTreeMap<Product, Rgb>,
    pub filter_colors: BTreeMap<FilterName, Rgb>,
    pub default_color: Rgb,
    pub text_color: Rgb,
}

/// Largest kernel or pixelate block accepted from a table file.
pub const MAX_FILTER_SIZE: u32 = 255;

/// Reject params that would make a filter allocate or loop without bound.
fn check_params(params: &FilterParams) -> Result<(), TableError> {
    for (name, size) in [
        ("blur_kernel", params.blur_kernel),
        ("smooth_kernel", params.smooth_kernel),
        ("pixelate_block", params.pixelate_block),
    ] {
        if size > MAX_FILTER_SIZE {
            return Err(TableError::InvalidParams(format!(
                "{name} = {size} exceeds {MAX_FILTER_SIZE}"
            )));
        }
    }
    if !params.brightness_alpha.is_finite() || !params.brightness_beta.is_finite() {
        return Err(TableError::InvalidParams(
            "brightness_alpha and brightness_beta must be finite".into(),
        ));
    }
    Ok(())
}

fn resolve_keys<K: Ord, V: Copy>(
    section: &'static str,
    raw: &BTreeMap<String, V>,
    parse: fn(&str) -> Option<K>,
) -> Result<BTreeMap<K, V>, TableError> {
    raw.iter()
        .map(|(key, value)| {
            parse(key)
                .map(|k| (k, *value))
                .ok_or_else(|| TableError::UnknownKey {
                    section,
                    key: key.clone(),
                })
        })
        .collect()
}

impl LensTables {
    /// Parse and validate a TOML table document.
    pub fn from_toml_str(src: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(src)?;
        Self::from_file(file)
    }

    /// Load an override table from disk.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let src = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tables = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), version = tables.version, "loaded lens tables");
        Ok(tables)
    }

    pub fn from_file(file: TableFile) -> Result<Self, TableError> {
        if file.version == 0 || file.version > TABLE_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: file.version,
            });
        }

        let health_scores = resolve_keys("health.scores", &file.health.scores, Product::from_key)?;
        if let Some((product, _)) = health_scores.iter().find(|(_, s)| !s.is_finite()) {
            return Err(TableError::InvalidScore {
                product: product.key().to_string(),
            });
        }

        check_params(&file.params)?;

        let colors = &file.colors;
        Ok(Self {
            version: file.version,
            default_filter: file.default_filter,
            params: file.params,
            gestures: resolve_keys("gestures", &file.gestures, Gesture::from_key)?,
            emotions: resolve_keys("emotions", &file.emotions, Emotion::from_key)?,
            health_scores,
            health_bands: HealthBands::new(file.health.bands)?,
            product_colors: resolve_keys("colors.products", &colors.products, Product::from_key)?,
            filter_colors: resolve_keys("colors.filters", &colors.filters, FilterName::from_key)?,
            default_color: file.colors.default,
            text_color: file.colors.text,
        })
    }

    /// Convert back to the on-disk layout.
    pub fn to_file(&self) -> TableFile {
        fn keyed<K, V: Copy>(
            map: &BTreeMap<K, V>,
            key: fn(&K) -> &'static str,
        ) -> BTreeMap<String, V> {
            map.iter().map(|(k, v)| (key(k).to_string(), *v)).collect()
        }
        TableFile {
            version: self.version,
            default_filter: self.default_filter,
            params: self.params,
            gestures: keyed(&self.gestures, Gesture::key),
            emotions: keyed(&self.emotions, Emotion::key),
            health: HealthSection {
                scores: keyed(&self.health_scores, Product::key),
                bands: self.health_bands.to_bands(),
            },
            colors: ColorSection {
                default: self.default_color,
                text: self.text_color,
                products: keyed(&self.product_colors, Product::key),
                filters: keyed(&self.filter_colors, FilterName::key),
            },
        }
    }

    pub fn to_toml_string(&self) -> Result<String, TableError> {
        Ok(toml::to_string_pretty(&self.to_file())?)
    }

    /// Tables that map every label to the identity filter.
    pub fn passthrough() -> Self {
        Self {
            version: TABLE_VERSION,
            default_filter: FilterName::None,
            params: FilterParams::default(),
            gestures: BTreeMap::new(),
            emotions: BTreeMap::new(),
            health_scores: BTreeMap::new(),
            health_bands: HealthBands::single(FilterName::None),
            product_colors: BTreeMap::new(),
            filter_colors: BTreeMap::new(),
            default_color: default_box_color(),
            text_color: default_text_color(),
        }
    }
}

/// The embedded default tables, parsed once.
pub fn builtin_tables() -> &'static LensTables {
    BUILTIN.get_or_init(|| match LensTables::from_toml_str(BUILTIN_TABLES) {
        Ok(tables) => tables,
        Err(e) => {
            tracing::error!(
                error = %e,
                "embedded lens tables are invalid; mapping everything to no filter"
            );
            LensTables::passthrough()
        }
    })
}
