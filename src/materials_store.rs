use crate::error::{GenerationError, Result};
use crate::json_parser::JsonParser;
use crate::phase::Phase;
use crate::psd::Psd;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Physical data the materials store keeps for an aggregate source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateProperties {
    pub specific_gravity: f64,
    #[serde(default)]
    pub bulk_modulus: f64,
    #[serde(default)]
    pub shear_modulus: f64,
    #[serde(default)]
    pub conductivity: f64,
}

/// Source of named material data. Lookups of unknown names fail with
/// [`GenerationError::MissingMaterial`], which callers propagate as is.
pub trait MaterialStore {
    /// Raw PSD table text for a named curve
    fn psd_text(&self, name: &str) -> Result<String>;

    /// Name of the PSD a phase uses when the recipe does not pick one
    fn default_psd_name(&self, phase: Phase) -> Option<String>;

    fn aggregate(&self, name: &str) -> Result<AggregateProperties>;

    fn psd(&self, name: &str) -> Result<Psd> {
        let text = self.psd_text(name)?;
        Psd::parse(name, &text)
    }
}

/// Materials kept in a JSON document:
///
/// ```json
/// {
///   "psds": { "cement140": "1.0 0.05\n10.0 0.6\n40.0 1.0" },
///   "default_psds": { "silica_fume": "sf500" },
///   "aggregates": { "Granite": { "specific_gravity": 2.65, "bulk_modulus": 44.0 } }
/// }
/// ```
pub struct JsonMaterialStore {
    json: Value,
}

impl JsonMaterialStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            json: JsonParser::load_json(path)?,
        })
    }

    pub fn from_json_str(key: &str, json_str: &str) -> Result<Self> {
        Ok(Self {
            json: JsonParser::load_json_str(key, json_str)?,
        })
    }

    /// Conventional location of the store inside a data directory
    pub fn default_file_path(data_dir: &Path) -> PathBuf {
        data_dir.join("materials.json")
    }
}

impl MaterialStore for JsonMaterialStore {
    fn psd_text(&self, name: &str) -> Result<String> {
        JsonParser::get_str(&self.json, &["psds", name])
            .map(str::to_string)
            .ok_or_else(|| GenerationError::MissingMaterial(format!("PSD '{}'", name)))
    }

    fn default_psd_name(&self, phase: Phase) -> Option<String> {
        JsonParser::get_str(&self.json, &["default_psds", phase.name()]).map(str::to_string)
    }

    fn aggregate(&self, name: &str) -> Result<AggregateProperties> {
        let value = JsonParser::get_value(&self.json, &["aggregates", name])
            .ok_or_else(|| GenerationError::MissingMaterial(format!("aggregate '{}'", name)))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            GenerationError::MissingMaterial(format!("aggregate '{}' is unreadable: {}", name, e))
        })
    }
}

/// Store held in memory, filled by the caller.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMaterialStore {
    psds: HashMap<String, String>,
    defaults: HashMap<Phase, String>,
    aggregates: HashMap<String, AggregateProperties>,
}

impl InMemoryMaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_psd(mut self, name: &str, text: &str) -> Self {
        self.psds.insert(name.to_string(), text.to_string());
        self
    }

    pub fn with_default_psd(mut self, phase: Phase, name: &str) -> Self {
        self.defaults.insert(phase, name.to_string());
        self
    }

    pub fn with_aggregate(mut self, name: &str, properties: AggregateProperties) -> Self {
        self.aggregates.insert(name.to_string(), properties);
        self
    }
}

impl MaterialStore for InMemoryMaterialStore {
    fn psd_text(&self, name: &str) -> Result<String> {
        self.psds
            .get(name)
            .cloned()
            .ok_or_else(|| GenerationError::MissingMaterial(format!("PSD '{}'", name)))
    }

    fn default_psd_name(&self, phase: Phase) -> Option<String> {
        self.defaults.get(&phase).cloned()
    }

    fn aggregate(&self, name: &str) -> Result<AggregateProperties> {
        self.aggregates
            .get(name)
            .cloned()
            .ok_or_else(|| GenerationError::MissingMaterial(format!("aggregate '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_JSON: &str = r#"{
        "psds": { "cement140": "1.0 0.05\n10.0 0.6\n40.0 1.0" },
        "default_psds": { "silica_fume": "sf500" },
        "aggregates": {
            "Granite": { "specific_gravity": 2.65, "bulk_modulus": 44.0, "shear_modulus": 30.0 },
            "Broken": { "bulk_modulus": 1.0 }
        }
    }"#;

    #[test]
    fn test_json_store_lookups() {
        let store = JsonMaterialStore::from_json_str("materials_store_test", STORE_JSON).unwrap();

        let psd = store.psd("cement140").unwrap();
        assert_eq!(psd.points().len(), 3);
        assert_eq!(store.default_psd_name(Phase::SilicaFume), Some("sf500".to_string()));
        assert_eq!(store.default_psd_name(Phase::Slag), None);

        let granite = store.aggregate("Granite").unwrap();
        assert_eq!(granite.specific_gravity, 2.65);
        assert_eq!(granite.conductivity, 0.0);
    }

    #[test]
    fn test_json_store_missing_names() {
        let store = JsonMaterialStore::from_json_str("materials_store_test", STORE_JSON).unwrap();

        assert!(matches!(store.psd("nope"), Err(GenerationError::MissingMaterial(_))));
        assert!(matches!(store.aggregate("Basalt"), Err(GenerationError::MissingMaterial(_))));
        assert!(matches!(store.aggregate("Broken"), Err(GenerationError::MissingMaterial(_))));
    }

    #[test]
    fn test_json_store_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = JsonMaterialStore::default_file_path(dir.path());
        std::fs::write(&path, STORE_JSON).unwrap();

        let store = JsonMaterialStore::load(&path).unwrap();
        assert!(store.psd_text("cement140").unwrap().starts_with("1.0"));
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryMaterialStore::new()
            .with_psd("fine", "1 0.2\n5 1.0")
            .with_default_psd(Phase::Slag, "fine");

        assert_eq!(store.default_psd_name(Phase::Slag).as_deref(), Some("fine"));
        assert!(store.psd("fine").is_ok());
        assert!(matches!(store.psd("coarse"), Err(GenerationError::MissingMaterial(_))));
    }
}
