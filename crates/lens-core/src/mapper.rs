//! Classification-to-filter mapping.
//!
//! Two disciplines are supported:
//! - direct lookup for gesture and emotion labels, with a table default for
//!   absent keys;
//! - threshold bucketing for product health scores, through ordered half-open
//!   bands that partition the whole number line.

use crate::tables::{LensTables, TableError};
use crate::types::{ClassLabel, FilterName, Product, Rgb};
use serde::{Deserialize, Serialize};

/// One health band as written in the table file. Only the last band omits `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthBand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    pub filter: FilterName,
}

/// Validated, ordered score bands.
///
/// Band `i` covers `[min_i, min_{i-1})`; the first band is unbounded above and
/// the floor band is unbounded below, so every score (NaN included) resolves to
/// exactly one band.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthBands {
    /// `(lower bound, filter)`, strictly descending by bound.
    upper: Vec<(f32, FilterName)>,
    floor: FilterName,
}

impl HealthBands {
    pub fn new(bands: Vec<HealthBand>) -> Result<Self, TableError> {
        let Some((floor, upper)) = bands.split_last() else {
            return Err(TableError::InvalidBands(
                "at least one band is required".into(),
            ));
        };
        if floor.min.is_some() {
            return Err(TableError::InvalidBands(
                "last band must be unbounded below (omit `min`)".into(),
            ));
        }

        let mut bounds = Vec::with_capacity(upper.len());
        let mut previous: Option<f32> = None;
        for (i, band) in upper.iter().enumerate() {
            let Some(min) = band.min else {
                return Err(TableError::InvalidBands(format!(
                    "band {i} has no `min`; only the last band may omit it"
                )));
            };
            if !min.is_finite() {
                return Err(TableError::InvalidBands(format!(
                    "band {i} lower bound {min} is not finite"
                )));
            }
            if let Some(prev) = previous {
                if min >= prev {
                    return Err(TableError::InvalidBands(format!(
                        "band {i} lower bound {min} must be below the previous bound {prev}"
                    )));
                }
            }
            previous = Some(min);
            bounds.push((min, band.filter));
        }

        Ok(Self {
            upper: bounds,
            floor: floor.filter,
        })
    }

    /// A single band covering every score.
    pub fn single(filter: FilterName) -> Self {
        Self {
            upper: Vec::new(),
            floor: filter,
        }
    }

    /// Index of the band containing `score` (0 = highest band).
    pub fn band_index(&self, score: f32) -> usize {
        self.upper
            .iter()
            .position(|(min, _)| score >= *min)
            .unwrap_or(self.upper.len())
    }

    pub fn lookup(&self, score: f32) -> FilterName {
        self.upper
            .get(self.band_index(score))
            .map(|(_, filter)| *filter)
            .unwrap_or(self.floor)
    }

    pub fn len(&self) -> usize {
        self.upper.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Human-readable range for each band, highest first.
    pub fn describe(&self) -> Vec<(String, FilterName)> {
        let mut rows = Vec::with_capacity(self.len());
        let mut above: Option<f32> = None;
        for (min, filter) in &self.upper {
            let range = match above {
                None => format!("score >= {min}"),
                Some(hi) => format!("{min} <= score < {hi}"),
            };
            rows.push((range, *filter));
            above = Some(*min);
        }
        let floor_range = match above {
            None => "any score".to_string(),
            Some(hi) => format!("score < {hi}"),
        };
        rows.push((floor_range, self.floor));
        rows
    }

    /// Back to the table-file representation.
    pub fn to_bands(&self) -> Vec<HealthBand> {
        self.upper
            .iter()
            .map(|(min, filter)| HealthBand {
                min: Some(*min),
                filter: *filter,
            })
            .chain(std::iter::once(HealthBand {
                min: None,
                filter: self.floor,
            }))
            .collect()
    }
}

/// Maps detector labels to filters using immutable, injected tables.
#[derive(Debug, Clone)]
pub struct Mapper {
    tables: LensTables,
}

impl Mapper {
    pub fn new(tables: LensTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &LensTables {
        &self.tables
    }

    /// Resolve the filter for a label. Labels absent from the tables map to the
    /// table default; this never fails.
    pub fn map_label(&self, label: &ClassLabel) -> FilterName {
        let default = self.tables.default_filter;
        match label {
            ClassLabel::Product(product) => match self.health_score(*product) {
                Some(score) => self.map_score(score),
                None => default,
            },
            ClassLabel::Emotion(emotion) => {
                self.tables.emotions.get(emotion).copied().unwrap_or(default)
            }
            ClassLabel::Gesture(gesture) => {
                self.tables.gestures.get(gesture).copied().unwrap_or(default)
            }
            ClassLabel::Unknown(_) => default,
        }
    }

    /// Bucket a health score (nominally 0–100) into its band's filter.
    pub fn map_score(&self, score: f32) -> FilterName {
        self.tables.health_bands.lookup(score)
    }

    pub fn health_score(&self, product: Product) -> Option<f32> {
        self.tables.health_scores.get(&product).copied()
    }

    /// Box colour: per-product colour, else the filter's colour, else the default.
    pub fn color_for(&self, label: &ClassLabel, filter: FilterName) -> Rgb {
        if let ClassLabel::Product(product) = label {
            if let Some(color) = self.tables.product_colors.get(product) {
                return *color;
            }
        }
        self.tables
            .filter_colors
            .get(&filter)
            .copied()
            .unwrap_or(self.tables.default_color)
    }

    pub fn text_color(&self) -> Rgb {
        self.tables.text_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::builtin_tables;
    use crate::types::{Emotion, Gesture};

    fn mapper() -> Mapper {
        Mapper::new(builtin_tables().clone())
    }

    fn band(min: Option<f32>, filter: FilterName) -> HealthBand {
        HealthBand { min, filter }
    }

    #[test]
    fn test_score_band_boundaries() {
        let m = mapper();
        assert_eq!(m.map_score(100.0), FilterName::GaussianBlur);
        assert_eq!(m.map_score(80.0), FilterName::GaussianBlur);
        assert_eq!(m.map_score(79.999), FilterName::Smooth);
        assert_eq!(m.map_score(79.0), FilterName::Smooth);
        assert_eq!(m.map_score(50.0), FilterName::Smooth);
        assert_eq!(m.map_score(49.0), FilterName::Sobel);
        assert_eq!(m.map_score(30.0), FilterName::Sobel);
        assert_eq!(m.map_score(29.0), FilterName::Laplacian);
        assert_eq!(m.map_score(0.0), FilterName::Laplacian);
    }

    #[test]
    fn test_scores_outside_range_and_nan() {
        let m = mapper();
        assert_eq!(m.map_score(250.0), FilterName::GaussianBlur);
        assert_eq!(m.map_score(-5.0), FilterName::Laplacian);
        assert_eq!(m.map_score(f32::NAN), FilterName::Laplacian);
    }

    #[test]
    fn test_bands_partition_zero_to_hundred() {
        // Every score lands in exactly one band and bands never re-open as the
        // score decreases.
        let bands = &builtin_tables().health_bands;
        let mut last_index = 0;
        for step in (0..=10_000).rev() {
            let score = step as f32 / 100.0;
            let idx = bands.band_index(score);
            assert!(idx < bands.len());
            assert!(idx >= last_index, "band order broke at score {score}");
            last_index = idx;
        }
        assert_eq!(last_index, bands.len() - 1);
    }

    #[test]
    fn test_describe_bands() {
        let rows = builtin_tables().health_bands.describe();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], ("score >= 80".to_string(), FilterName::GaussianBlur));
        assert_eq!(rows[1], ("50 <= score < 80".to_string(), FilterName::Smooth));
        assert_eq!(rows[3], ("score < 30".to_string(), FilterName::Laplacian));
    }

    #[test]
    fn test_bands_reject_unordered() {
        let result = HealthBands::new(vec![
            band(Some(50.0), FilterName::Smooth),
            band(Some(80.0), FilterName::GaussianBlur),
            band(None, FilterName::Laplacian),
        ]);
        assert!(matches!(result, Err(TableError::InvalidBands(_))));
    }

    #[test]
    fn test_bands_reject_duplicate_bound() {
        let result = HealthBands::new(vec![
            band(Some(50.0), FilterName::Smooth),
            band(Some(50.0), FilterName::Sobel),
            band(None, FilterName::Laplacian),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bands_reject_bounded_floor_and_gaps() {
        assert!(HealthBands::new(vec![]).is_err());
        assert!(HealthBands::new(vec![band(Some(30.0), FilterName::Sobel)]).is_err());
        assert!(HealthBands::new(vec![
            band(None, FilterName::Sobel),
            band(None, FilterName::Laplacian),
        ])
        .is_err());
        assert!(HealthBands::new(vec![
            band(Some(f32::INFINITY), FilterName::Sobel),
            band(None, FilterName::Laplacian),
        ])
        .is_err());
    }

    #[test]
    fn test_single_floor_band_covers_everything() {
        let bands = HealthBands::new(vec![band(None, FilterName::Invert)]).unwrap();
        assert_eq!(bands.lookup(-1e9), FilterName::Invert);
        assert_eq!(bands.lookup(1e9), FilterName::Invert);
        assert_eq!(bands.describe(), vec![("any score".to_string(), FilterName::Invert)]);
    }

    #[test]
    fn test_bands_round_trip_to_table_form() {
        let bands = &builtin_tables().health_bands;
        assert_eq!(&HealthBands::new(bands.to_bands()).unwrap(), bands);
    }

    #[test]
    fn test_products_use_health_bands() {
        let m = mapper();
        assert_eq!(m.map_label(&ClassLabel::Product(Product::Apple)), FilterName::GaussianBlur);
        assert_eq!(m.map_label(&ClassLabel::Product(Product::Sandwich)), FilterName::Smooth);
        assert_eq!(m.map_label(&ClassLabel::Product(Product::Juice)), FilterName::Sobel);
        assert_eq!(
            m.map_label(&ClassLabel::Product(Product::InstantNoodle)),
            FilterName::Laplacian
        );
    }

    #[test]
    fn test_direct_lookup_and_defaults() {
        let m = mapper();
        assert_eq!(m.map_label(&ClassLabel::Gesture(Gesture::OpenHand)), FilterName::GaussianBlur);
        assert_eq!(m.map_label(&ClassLabel::Gesture(Gesture::Fist)), FilterName::Sobel);
        assert_eq!(m.map_label(&ClassLabel::Gesture(Gesture::Pointing)), FilterName::Laplacian);
        assert_eq!(m.map_label(&ClassLabel::Gesture(Gesture::Victory)), FilterName::Smooth);
        assert_eq!(m.map_label(&ClassLabel::Emotion(Emotion::Happy)), FilterName::Brightness);
        assert_eq!(m.map_label(&ClassLabel::Emotion(Emotion::Sad)), FilterName::GaussianBlur);
        assert_eq!(m.map_label(&ClassLabel::Emotion(Emotion::Fear)), FilterName::TonalShift);
        assert_eq!(m.map_label(&ClassLabel::Emotion(Emotion::Angry)), FilterName::None);
        assert_eq!(m.map_label(&ClassLabel::Unknown("red".into())), FilterName::None);
    }

    #[test]
    fn test_injected_tables_change_defaults() {
        let mut tables = builtin_tables().clone();
        tables.default_filter = FilterName::Invert;
        tables.health_scores.remove(&Product::Orange);
        let m = Mapper::new(tables);
        assert_eq!(m.map_label(&ClassLabel::Unknown("cup".into())), FilterName::Invert);
        assert_eq!(m.map_label(&ClassLabel::Product(Product::Orange)), FilterName::Invert);
        assert_eq!(m.map_label(&ClassLabel::Emotion(Emotion::Neutral)), FilterName::Invert);
    }

    #[test]
    fn test_color_precedence() {
        let m = mapper();
        let apple = ClassLabel::Product(Product::Apple);
        assert_eq!(m.color_for(&apple, FilterName::GaussianBlur), [0, 255, 0]);
        let happy = ClassLabel::Emotion(Emotion::Happy);
        assert_eq!(m.color_for(&happy, FilterName::Sobel), [0, 255, 0]);
        assert_eq!(m.color_for(&happy, FilterName::Brightness), [255, 0, 0]);
    }
}
