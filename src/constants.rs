// Volume accounting: recipe fractions are rescaled onto a mm³ basis before renormalizing
pub const VOLUME_RESCALE: f64 = 1000.0;

// kg/L -> kg/mm³ step applied to specific gravities before the mass -> volume conversion
pub const SPECIFIC_GRAVITY_SCALE: f64 = 1000.0;

// Largest particle allowed as a fraction of the smallest system dimension
pub const DEFAULT_SIZE_SAFETY_COEFFICIENT: f64 = 0.5;
// Share of a PSD's mass allowed above that diameter before sampling is refused
pub const DEFAULT_MAX_OVERSIZE_FRACTION: f64 = 0.05;

// Sieve grading
pub const MAX_DIAMETER_EPSILON_MM: f64 = 1.0e-6;
pub const MAX_DIAMETER_HEADROOM: f64 = 1.10; // undeclared max diameter = 110% of the top sieve
pub const MIN_COUNTABLE_DIAMETER_VOX: f64 = 2.5;
pub const AGGREGATE_MASS_EPSILON: f64 = 1.0e-5;
pub const MAX_SOURCES_PER_KIND: usize = 2;

// Recipe consistency
pub const FRACTION_SUM_TOLERANCE: f64 = 0.01;

// Seeds handed to the engines are negative
pub const MAX_FRESH_SEED: i32 = 32767;

pub const COARSE_LABEL_PREFIX: &str = "coarse";
pub const FINE_LABEL_PREFIX: &str = "fine";

/// Labels the engines and the grading files use for aggregate sources: `coarse01`, `fine02`, ...
pub fn source_label(prefix: &str, index: usize) -> String {
    format!("{}{:02}", prefix, index + 1)
}
