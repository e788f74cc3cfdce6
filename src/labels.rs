// flora-inference 🚀 AGPL-3.0 License

//! Category-names mapping.
//!
//! A JSON object keyed by class label, e.g. `{"21": "fire lily", ...}`,
//! produced alongside the dataset and read once per run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ClassifyError, Result};

/// Read-only class-label to display-name table.
#[derive(Debug, Clone, Default)]
pub struct CategoryNames {
    names: HashMap<String, String>,
}

impl CategoryNames {
    /// Wrap an existing mapping.
    #[must_use]
    pub const fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Load the mapping from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file does not exist, cannot be read, or is
    /// not a JSON object of strings.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ClassifyError::LabelMapError(format!(
                "Failed to read category names {}: {e}",
                path.display()
            ))
        })?;

        let names: HashMap<String, String> = serde_json::from_str(&raw)?;
        Ok(Self { names })
    }

    /// Look up the display name for a class label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    /// Number of labels in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup() {
        let mut map = HashMap::new();
        map.insert("1".to_string(), "pink primrose".to_string());
        let names = CategoryNames::new(map);

        assert_eq!(names.get("1"), Some("pink primrose"));
        assert_eq!(names.get("2"), None);
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"21": "fire lily", "3": "canterbury bells"}}"#).unwrap();

        let names = CategoryNames::load(file.path()).unwrap();
        assert_eq!(names.get("21"), Some("fire lily"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = CategoryNames::load("does_not_exist.json");
        assert!(matches!(result, Err(ClassifyError::LabelMapError(_))));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(CategoryNames::load(file.path()).is_err());
    }
}
