pub mod constants;
pub mod error;
pub mod logging;
pub mod config;
pub mod json_parser;
pub mod math_utils;
pub mod phase;
pub mod geometry;
pub mod psd;
pub mod psd_sampler;
pub mod recipe;
pub mod materials_store;
pub mod sieve_grading;
pub mod volume_budget;
pub mod protocol;
pub mod paths;
pub mod process;
pub mod pipeline;

pub use config::GeneratorConfig;
pub use error::{GenerationError, Result};
pub use logging::init_logging;
pub use materials_store::{InMemoryMaterialStore, JsonMaterialStore, MaterialStore};
pub use paths::{OperationPaths, PathResolver};
pub use phase::Phase;
pub use pipeline::{GenerationArtifacts, GenerationPipeline};
pub use recipe::MixRecipe;
pub use volume_budget::{VolumeBudgetSolver, VoxelBudget};
