use crate::phase::Phase;
use crate::process::Stage;
use std::path::{Path, PathBuf};

/// Operation-scoped file locations handed to the engines. Paths are passed
/// through to the protocols unchanged.
pub trait PathResolver {
    /// Exported PSD of a placed phase; `C3s` names the cement PSD
    fn psd_export(&self, phase: Phase) -> PathBuf;
    fn grading_file(&self, label: &str) -> PathBuf;
    fn microstructure_image(&self) -> PathBuf;
    fn particle_image(&self) -> PathBuf;
    fn aggregate_image(&self) -> PathBuf;
    fn aggregate_particle_image(&self) -> PathBuf;
    fn shape_set_dir(&self, shape_set: &str) -> PathBuf;
    fn clinker_correlation_dir(&self) -> PathBuf;
    fn protocol_file(&self, stage: Stage) -> PathBuf;
    fn log_file(&self, stage: Stage) -> PathBuf;
}

/// One operation directory plus the shared resource directories.
///
/// ```
/// use cement_microgen::paths::{OperationPaths, PathResolver};
/// use cement_microgen::phase::Phase;
///
/// let paths = OperationPaths::new("/ops", "mix01", "/data/shapes", "/data/cement/type1");
/// assert_eq!(paths.microstructure_image().to_str(), Some("/ops/mix01/mix01.img"));
/// assert_eq!(paths.psd_export(Phase::C3s).to_str(), Some("/ops/mix01/cement.psd"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OperationPaths {
    operation_name: String,
    operation_dir: PathBuf,
    shape_root: PathBuf,
    correlation_dir: PathBuf,
}

impl OperationPaths {
    pub fn new(
        operations_root: impl AsRef<Path>,
        operation_name: &str,
        shape_root: impl Into<PathBuf>,
        correlation_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            operation_dir: operations_root.as_ref().join(operation_name),
            shape_root: shape_root.into(),
            correlation_dir: correlation_dir.into(),
        }
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn operation_dir(&self) -> &Path {
        &self.operation_dir
    }

    fn file(&self, file_name: String) -> PathBuf {
        self.operation_dir.join(file_name)
    }
}

impl PathResolver for OperationPaths {
    fn psd_export(&self, phase: Phase) -> PathBuf {
        match phase {
            Phase::C3s => self.file("cement.psd".to_string()),
            other => self.file(format!("{}.psd", other.name())),
        }
    }

    fn grading_file(&self, label: &str) -> PathBuf {
        self.file(format!("{}.gdg", label))
    }

    fn microstructure_image(&self) -> PathBuf {
        self.file(format!("{}.img", self.operation_name))
    }

    fn particle_image(&self) -> PathBuf {
        self.file(format!("{}.pimg", self.operation_name))
    }

    fn aggregate_image(&self) -> PathBuf {
        self.file(format!("{}_aggregate.img", self.operation_name))
    }

    fn aggregate_particle_image(&self) -> PathBuf {
        self.file(format!("{}_aggregate.pimg", self.operation_name))
    }

    fn shape_set_dir(&self, shape_set: &str) -> PathBuf {
        self.shape_root.join(shape_set)
    }

    fn clinker_correlation_dir(&self) -> PathBuf {
        self.correlation_dir.clone()
    }

    fn protocol_file(&self, stage: Stage) -> PathBuf {
        self.file(format!("{}.in", stage.file_stem()))
    }

    fn log_file(&self, stage: Stage) -> PathBuf {
        self.file(format!("{}.log", stage.file_stem()))
    }
}
