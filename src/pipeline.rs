use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use crate::materials_store::MaterialStore;
use crate::paths::PathResolver;
use crate::process::{ProcessRunner, Stage, StageOutcome, StageStatus};
use crate::protocol::{
    emit_aggregate_packing_protocol, emit_dissolution_bias_block, emit_microstructure_protocol,
};
use crate::recipe::{MixRecipe, SieveRow};
use crate::sieve_grading::grading_file_text;
use crate::volume_budget::{PhaseSamples, VolumeBudgetSolver, VoxelBudget};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

/// Everything one generation request produces, before anything is written.
#[derive(Debug, Clone)]
pub struct GenerationArtifacts {
    /// The recipe with store defaults filled in
    pub recipe: MixRecipe,
    pub budget: VoxelBudget,
    pub samples: PhaseSamples,
    pub microstructure_protocol: String,
    pub dissolution_bias: String,
    pub aggregate_protocol: Option<String>,
    pub grading_files: Vec<(PathBuf, String)>,
    pub psd_exports: Vec<(PathBuf, String)>,
    pub microstructure_protocol_file: PathBuf,
    pub dissolution_bias_file: PathBuf,
    pub aggregate_protocol_file: PathBuf,
}

impl GenerationArtifacts {
    /// Every file to write, paired with its content.
    pub fn files(&self) -> Vec<(&PathBuf, &str)> {
        let mut files = vec![
            (&self.microstructure_protocol_file, self.microstructure_protocol.as_str()),
            (&self.dissolution_bias_file, self.dissolution_bias.as_str()),
        ];
        if let Some(protocol) = &self.aggregate_protocol {
            files.push((&self.aggregate_protocol_file, protocol.as_str()));
        }
        for (path, text) in self.grading_files.iter().chain(&self.psd_exports) {
            files.push((path, text.as_str()));
        }
        files
    }
}

pub struct GenerationPipeline {
    solver: VolumeBudgetSolver,
    store: Box<dyn MaterialStore>,
    paths: Box<dyn PathResolver>,
}

impl GenerationPipeline {
    pub fn new(
        config: GeneratorConfig,
        store: Box<dyn MaterialStore>,
        paths: Box<dyn PathResolver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            solver: VolumeBudgetSolver::new(config),
            store,
            paths,
        })
    }

    pub fn paths(&self) -> &dyn PathResolver {
        self.paths.as_ref()
    }

    pub fn generate(&self, recipe: &MixRecipe) -> Result<GenerationArtifacts> {
        let recipe = recipe.resolve_materials(self.store.as_ref())?;
        let budget = self.solver.solve(&recipe)?;
        let samples = self.solver.sample_phases(&recipe, &budget, self.store.as_ref())?;
        let paths = self.paths.as_ref();

        let microstructure_protocol = emit_microstructure_protocol(&budget, &samples, &recipe, paths);
        let dissolution_bias = emit_dissolution_bias_block(&samples);
        let aggregate_protocol = emit_aggregate_packing_protocol(&budget, &recipe, paths);

        let mut grading_files = Vec::new();
        if let Some(aggregate) = &budget.aggregate {
            for source in aggregate.coarse.iter().chain(&aggregate.fine) {
                let rows: Vec<SieveRow> = source
                    .table
                    .sieves
                    .iter()
                    .map(|sieve| SieveRow::new(sieve.min_diameter_mm, sieve.mass_fraction))
                    .collect();
                grading_files.push((paths.grading_file(&source.label), grading_file_text(&rows)));
            }
        }

        let mut psd_exports = Vec::new();
        for phase_sample in &samples.phases {
            let psd = self.store.psd(&phase_sample.sample.psd_name)?;
            psd_exports.push((paths.psd_export(phase_sample.phase), psd.to_text()));
        }

        let microstructure_protocol_file = paths.protocol_file(Stage::Microstructure);
        let artifacts = GenerationArtifacts {
            dissolution_bias_file: microstructure_protocol_file.with_extension("bias"),
            microstructure_protocol_file,
            aggregate_protocol_file: paths.protocol_file(Stage::AggregatePacking),
            recipe,
            budget,
            samples,
            microstructure_protocol,
            dissolution_bias,
            aggregate_protocol,
            grading_files,
            psd_exports,
        };
        info!(
            "generated {} phases, {} aggregate sources, seed {}",
            artifacts.samples.phases.len(),
            artifacts.grading_files.len(),
            artifacts.budget.seed
        );
        Ok(artifacts)
    }

    /// Write every artifact file, creating parent directories as needed.
    pub fn write_to_disk(&self, artifacts: &GenerationArtifacts) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (path, text) in artifacts.files() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| GenerationError::io(parent, e))?;
            }
            fs::write(path, text).map_err(|e| GenerationError::io(path, e))?;
            written.push(path.clone());
        }
        info!("wrote {} files", written.len());
        Ok(written)
    }

    /// Pack the aggregate (when there is one), then build the binder
    /// microstructure. Each stage gets its statistics pass when its image
    /// exists; a stage that does not finish stops the run.
    pub fn execute(
        &self,
        artifacts: &GenerationArtifacts,
        runner: &dyn ProcessRunner,
        cancel: &AtomicBool,
    ) -> Vec<StageOutcome> {
        let mut outcomes = Vec::new();
        if let Some(protocol) = &artifacts.aggregate_protocol {
            let image = self.paths.aggregate_image();
            outcomes.extend(runner.run_with_statistics(
                Stage::AggregatePacking,
                protocol,
                &image,
                cancel,
            ));
            if outcomes.first().map(|o| o.status) != Some(StageStatus::Finished) {
                warn!("aggregate packing did not finish; skipping the microstructure");
                return outcomes;
            }
        }
        let image = self.paths.microstructure_image();
        outcomes.extend(runner.run_with_statistics(
            Stage::Microstructure,
            &artifacts.microstructure_protocol,
            &image,
            cancel,
        ));
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials_store::InMemoryMaterialStore;
    use crate::paths::OperationPaths;
    use crate::phase::Phase;
    use crate::recipe::fixtures::{coarse_source, paste_recipe};
    use crate::recipe::{AggregateBlock, AggregateSystem, ParticleShape, SystemDims};
    use std::sync::Mutex;

    const CEMENT_PSD: &str = "0.5 0.02\n1.0 0.05\n5.0 0.3\n10.0 0.55\n20.0 0.85\n40.0 1.0\n";

    fn pipeline(root: &std::path::Path) -> GenerationPipeline {
        let store = InMemoryMaterialStore::new()
            .with_psd("cement140", CEMENT_PSD)
            .with_psd("sf", "0.1 0.3\n0.5 1.0\n")
            .with_default_psd(Phase::SilicaFume, "sf");
        let paths = OperationPaths::new(root, "op", root.join("shapes"), root.join("corr"));
        GenerationPipeline::new(GeneratorConfig::default(), Box::new(store), Box::new(paths)).unwrap()
    }

    #[test]
    fn test_generate_fills_store_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = paste_recipe();
        recipe.binder.cement = 0.9;
        recipe.binder.silica_fume = 0.1;

        let artifacts = pipeline(dir.path()).generate(&recipe).unwrap();
        assert_eq!(artifacts.recipe.psds.get(Phase::SilicaFume), Some("sf"));
        assert_eq!(artifacts.samples.phases.len(), 2);
        assert_eq!(artifacts.psd_exports.len(), 2);
        assert!(artifacts.aggregate_protocol.is_none());
        assert_eq!(artifacts.files().len(), 4);
    }

    #[test]
    fn test_failed_request_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = paste_recipe();
        recipe.psds.cement = Some("unknown".to_string());

        let result = pipeline(dir.path()).generate(&recipe);
        assert!(matches!(result, Err(GenerationError::MissingMaterial(_))));
        assert!(!dir.path().join("op").exists());
    }

    #[test]
    fn test_write_to_disk_with_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = paste_recipe();
        recipe.binder_volume_fraction = 0.25;
        recipe.water_volume_fraction = 0.15;
        recipe.aggregate = Some(AggregateBlock {
            system: AggregateSystem {
                dims: SystemDims::cube(100),
                resolution_mm: 0.5,
            },
            shape: ParticleShape::Spheres,
            coarse: vec![coarse_source("Granite", 0.6)],
            fine: vec![],
        });

        let pipeline = pipeline(dir.path());
        let artifacts = pipeline.generate(&recipe).unwrap();
        let written = pipeline.write_to_disk(&artifacts).unwrap();
        assert_eq!(written.len(), 5);

        let op = dir.path().join("op");
        let protocol = fs::read_to_string(op.join("genmic.in")).unwrap();
        assert_eq!(protocol, artifacts.microstructure_protocol);
        assert!(op.join("genmic.bias").exists());
        assert!(op.join("genaggpack.in").exists());
        assert!(op.join("cement.psd").exists());
        let grading = fs::read_to_string(op.join("coarse01.gdg")).unwrap();
        assert!(grading.starts_with("min_diameter_mm mass_fraction\n19 0.1\n"));
    }

    /// Finishes every stage except `fail`, recording what it was asked to run.
    struct RecordingRunner {
        fail: Option<Stage>,
        calls: Mutex<Vec<(Stage, String)>>,
    }

    impl RecordingRunner {
        fn new(fail: Option<Stage>) -> Self {
            Self {
                fail,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn stages(&self) -> Vec<Stage> {
            self.calls.lock().unwrap().iter().map(|(stage, _)| *stage).collect()
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, stage: Stage, stdin_text: &str, _cancel: &AtomicBool) -> StageOutcome {
            self.calls.lock().unwrap().push((stage, stdin_text.to_string()));
            let status = if self.fail == Some(stage) {
                StageStatus::Failed
            } else {
                StageStatus::Finished
            };
            StageOutcome {
                stage,
                status,
                exit_code: Some(if status == StageStatus::Finished { 0 } else { 1 }),
                log_file: PathBuf::from(format!("{}.log", stage.file_stem())),
                error: None,
            }
        }
    }

    fn concrete_artifacts(pipeline: &GenerationPipeline) -> GenerationArtifacts {
        let mut recipe = paste_recipe();
        recipe.binder_volume_fraction = 0.25;
        recipe.water_volume_fraction = 0.15;
        recipe.aggregate = Some(AggregateBlock {
            system: AggregateSystem {
                dims: SystemDims::cube(100),
                resolution_mm: 0.5,
            },
            shape: ParticleShape::Spheres,
            coarse: vec![coarse_source("Granite", 0.6)],
            fine: vec![],
        });
        pipeline.generate(&recipe).unwrap()
    }

    #[test]
    fn test_execute_chains_statistics_for_each_image() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let artifacts = concrete_artifacts(&pipeline);
        pipeline.write_to_disk(&artifacts).unwrap();
        let aggregate_image = pipeline.paths().aggregate_image();
        let image = pipeline.paths().microstructure_image();
        fs::write(&aggregate_image, "").unwrap();
        fs::write(&image, "").unwrap();

        let runner = RecordingRunner::new(None);
        let outcomes = pipeline.execute(&artifacts, &runner, &AtomicBool::new(false));

        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            runner.stages(),
            [
                Stage::AggregatePacking,
                Stage::AggregateStatistics,
                Stage::Microstructure,
                Stage::MicrostructureStatistics
            ]
        );
        let calls = runner.calls.lock().unwrap();
        assert_eq!(Some(&calls[0].1), artifacts.aggregate_protocol.as_ref());
        assert_eq!(calls[1].1.trim(), aggregate_image.display().to_string());
        assert_eq!(calls[2].1, artifacts.microstructure_protocol);
        assert_eq!(calls[3].1.trim(), image.display().to_string());
    }

    #[test]
    fn test_execute_skips_statistics_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let artifacts = concrete_artifacts(&pipeline);

        let runner = RecordingRunner::new(None);
        let outcomes = pipeline.execute(&artifacts, &runner, &AtomicBool::new(false));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(runner.stages(), [Stage::AggregatePacking, Stage::Microstructure]);
    }

    #[test]
    fn test_failed_aggregate_packing_skips_microstructure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let artifacts = concrete_artifacts(&pipeline);
        pipeline.write_to_disk(&artifacts).unwrap();
        fs::write(pipeline.paths().aggregate_image(), "").unwrap();

        let runner = RecordingRunner::new(Some(Stage::AggregatePacking));
        let outcomes = pipeline.execute(&artifacts, &runner, &AtomicBool::new(false));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, StageStatus::Failed);
        assert_eq!(runner.stages(), [Stage::AggregatePacking]);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_feeds_protocol_to_engine() {
        use crate::config::ExecutableConfig;
        use crate::process::ChildProcessRunner;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let artifacts = pipeline.generate(&paste_recipe()).unwrap();
        pipeline.write_to_disk(&artifacts).unwrap();

        let executables = ExecutableConfig {
            genmic: "cat".to_string(),
            genaggpack: "cat".to_string(),
            stat3d: "cat".to_string(),
        };
        let paths = OperationPaths::new(dir.path(), "op", dir.path().join("shapes"), dir.path().join("corr"));
        let runner = ChildProcessRunner::new(executables, paths);
        let outcomes = pipeline.execute(&artifacts, &runner, &AtomicBool::new(false));

        // cat writes no image, so there is no statistics pass
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, StageStatus::Finished);
        let log = fs::read_to_string(&outcomes[0].log_file).unwrap();
        assert_eq!(log, artifacts.microstructure_protocol);
    }
}
