use crate::constants::{
    AGGREGATE_MASS_EPSILON, DEFAULT_MAX_OVERSIZE_FRACTION, DEFAULT_SIZE_SAFETY_COEFFICIENT,
    FRACTION_SUM_TOLERANCE,
};
use crate::error::{GenerationError, Result};
use crate::json_parser::JsonParser;
use crate::math_utils::in_range;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the external engines. Resolved against the working directory
/// or PATH by the process runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableConfig {
    pub genmic: String,
    pub genaggpack: String,
    pub stat3d: String,
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            genmic: "genmic".to_string(),
            genaggpack: "genaggpack".to_string(),
            stat3d: "stat3d".to_string(),
        }
    }
}

/// Tunables of a generation run. Every field has a default, so a config
/// file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Largest particle diameter as a fraction of the smallest binder system dimension
    pub size_safety_coefficient: f64,
    /// Largest share of a PSD's mass that may be cut off above that diameter
    pub max_oversize_fraction: f64,
    /// Allowed drift of fraction groups that must sum to one
    pub fraction_sum_tolerance: f64,
    /// Aggregate sources with a mass fraction at or below this are absent
    pub aggregate_mass_epsilon: f64,
    pub executables: ExecutableConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            size_safety_coefficient: DEFAULT_SIZE_SAFETY_COEFFICIENT,
            max_oversize_fraction: DEFAULT_MAX_OVERSIZE_FRACTION,
            fraction_sum_tolerance: FRACTION_SUM_TOLERANCE,
            aggregate_mass_epsilon: AGGREGATE_MASS_EPSILON,
            executables: ExecutableConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = JsonParser::load_json(path.as_ref())?;
        Self::from_value(json)
    }

    pub fn from_json_str(key: &str, json_str: &str) -> Result<Self> {
        let json = JsonParser::load_json_str(key, json_str)?;
        Self::from_value(json)
    }

    fn from_value(json: serde_json::Value) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_value(json)
            .map_err(|e| GenerationError::invalid(format!("bad generator config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.size_safety_coefficient > 0.0 && self.size_safety_coefficient <= 1.0) {
            return Err(GenerationError::invalid(format!(
                "size_safety_coefficient must be in (0, 1], got {}",
                self.size_safety_coefficient
            )));
        }
        if !in_range(self.max_oversize_fraction, 0.0, 1.0) {
            return Err(GenerationError::invalid("max_oversize_fraction must be in [0, 1]"));
        }
        if !in_range(self.fraction_sum_tolerance, 0.0, 1.0) {
            return Err(GenerationError::invalid("fraction_sum_tolerance must be in [0, 1]"));
        }
        if !in_range(self.aggregate_mass_epsilon, 0.0, 1.0) {
            return Err(GenerationError::invalid("aggregate_mass_epsilon must be in [0, 1]"));
        }
        Ok(())
    }
}
