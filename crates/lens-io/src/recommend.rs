//! Product recommendation lookup.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("failed to read recommendation database {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad recommendation database: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    recommendations: Vec<String>,
}

/// `{ "<product>": { "recommendations": ["...", ...] }, ... }`, loaded once.
#[derive(Debug, Clone, Default)]
pub struct RecommendationStore {
    entries: HashMap<String, Entry>,
}

impl RecommendationStore {
    pub fn from_json_str(src: &str) -> Result<Self, RecommendationError> {
        Ok(Self {
            entries: serde_json::from_str(src)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, RecommendationError> {
        let src = std::fs::read_to_string(path).map_err(|source| RecommendationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_json_str(&src)?;
        tracing::info!(path = %path.display(), products = store.len(), "loaded recommendations");
        Ok(store)
    }

    /// Recommendations for `product`; unknown products give an empty list.
    pub fn lookup(&self, product: &str) -> &[String] {
        self.entries
            .get(product)
            .map(|e| e.recommendations.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = r#"{
        "instant_noodle": { "recommendations": ["whole-grain noodles", "vegetable soup"] },
        "juice": { "recommendations": ["whole fruit"] },
        "apple": {}
    }"#;

    #[test]
    fn test_lookup_known_and_unknown() {
        let store = RecommendationStore::from_json_str(DB).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.lookup("instant_noodle"),
            ["whole-grain noodles", "vegetable soup"]
        );
        assert!(store.lookup("apple").is_empty());
        assert!(store.lookup("pizza").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), DB).unwrap();
        let store = RecommendationStore::load(file.path()).unwrap();
        assert_eq!(store.lookup("juice"), ["whole fruit"]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            RecommendationStore::load(Path::new("/nonexistent/db.json")),
            Err(RecommendationError::Io { .. })
        ));
        assert!(matches!(
            RecommendationStore::from_json_str("{"),
            Err(RecommendationError::Parse(_))
        ));
    }
}
