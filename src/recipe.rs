//! The immutable description of one microstructure generation request.
//!
//! Mix-level fractions (binder, water, air, aggregate sources) are relative
//! to the whole mix and are not expected to be normalized. Binder
//! composition fractions are relative to the binder solids, sulfate
//! fractions to the cement, clinker fractions to the clinker.

use crate::config::GeneratorConfig;
use crate::constants::{MAX_DIAMETER_EPSILON_MM, MAX_FRESH_SEED, MAX_SOURCES_PER_KIND};
use crate::error::{GenerationError, Result};
use crate::materials_store::MaterialStore;
use crate::math_utils::in_range;
use crate::phase::Phase;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl SystemDims {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn cube(edge: u32) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Voxel count, or `None` when it does not fit an `i64`.
    pub fn checked_voxels(&self) -> Option<i64> {
        (self.x as i64)
            .checked_mul(self.y as i64)?
            .checked_mul(self.z as i64)
    }

    /// Voxel count, saturating. Validated recipes never saturate.
    pub fn voxels(&self) -> i64 {
        self.checked_voxels().unwrap_or(i64::MAX)
    }

    pub fn min_dimension(&self) -> u32 {
        self.x.min(self.y).min(self.z)
    }
}

/// Binder microstructure box; one voxel edge is `resolution_um` micrometers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderSystem {
    #[serde(flatten)]
    pub dims: SystemDims,
    pub resolution_um: f64,
}

/// Aggregate packing box; one voxel edge is `resolution_mm` millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSystem {
    #[serde(flatten)]
    pub dims: SystemDims,
    pub resolution_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomSeed {
    Explicit(i32),
    Fresh,
}

impl RandomSeed {
    pub fn use_own_random_seed(&self) -> bool {
        matches!(self, RandomSeed::Explicit(_))
    }

    /// The explicit seed unchanged, or a newly drawn negative seed.
    pub fn resolve(&self) -> i32 {
        match self {
            RandomSeed::Explicit(seed) => *seed,
            RandomSeed::Fresh => -rand::rng().random_range(1..=MAX_FRESH_SEED),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ParticleShape {
    #[default]
    Spheres,
    Real { shape_set: String },
}

impl ParticleShape {
    pub fn flag(&self) -> u8 {
        match self {
            ParticleShape::Spheres => 0,
            ParticleShape::Real { .. } => 1,
        }
    }

    pub fn shape_set(&self) -> Option<&str> {
        match self {
            ParticleShape::Spheres => None,
            ParticleShape::Real { shape_set } => Some(shape_set),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseFractions {
    pub volume: f64,
    pub surface: f64,
}

impl PhaseFractions {
    pub fn new(volume: f64, surface: f64) -> Self {
        Self { volume, surface }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinkerPhases {
    pub c3s: PhaseFractions,
    pub c2s: PhaseFractions,
    pub c3a: PhaseFractions,
    pub c4af: PhaseFractions,
    pub k2so4: PhaseFractions,
    pub na2so4: PhaseFractions,
}

impl ClinkerPhases {
    /// Pairs in [`Phase::CLINKER`] order
    pub fn entries(&self) -> [(Phase, PhaseFractions); 6] {
        [
            (Phase::C3s, self.c3s),
            (Phase::C2s, self.c2s),
            (Phase::C3a, self.c3a),
            (Phase::C4af, self.c4af),
            (Phase::K2so4, self.k2so4),
            (Phase::Na2so4, self.na2so4),
        ]
    }

    pub fn volume_sum(&self) -> f64 {
        self.entries().iter().map(|(_, f)| f.volume).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderComposition {
    pub cement: f64,
    pub silica_fume: f64,
    pub fly_ash: f64,
    pub slag: f64,
    pub caco3: f64,
    pub free_lime: f64,
    pub inert_filler: f64,
    /// Sulfate forms, as fractions of the cement volume
    pub dihydrate: f64,
    pub hemihydrate: f64,
    pub anhydrite: f64,
}

impl BinderComposition {
    pub fn scm_entries(&self) -> [(Phase, f64); 6] {
        [
            (Phase::SilicaFume, self.silica_fume),
            (Phase::FlyAsh, self.fly_ash),
            (Phase::Slag, self.slag),
            (Phase::Caco3, self.caco3),
            (Phase::FreeLime, self.free_lime),
            (Phase::InertFiller, self.inert_filler),
        ]
    }

    pub fn sulfate_entries(&self) -> [(Phase, f64); 3] {
        [
            (Phase::Dihydrate, self.dihydrate),
            (Phase::Hemihydrate, self.hemihydrate),
            (Phase::Anhydrite, self.anhydrite),
        ]
    }

    pub fn solids_sum(&self) -> f64 {
        self.cement + self.scm_entries().iter().map(|(_, f)| f).sum::<f64>()
    }
}

/// Constituents of fly ash as fractions of the fly ash volume.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyAshComposition {
    pub aluminosilicate_glass: f64,
    pub calcium_aluminodisilicate: f64,
    pub amorphous_silica: f64,
    pub c3a: f64,
    pub cacl2: f64,
    pub anhydrite: f64,
    pub inert: f64,
}

impl FlyAshComposition {
    pub fn entries(&self) -> [(Phase, f64); 7] {
        [
            (Phase::Asg, self.aluminosilicate_glass),
            (Phase::Cas2, self.calcium_aluminodisilicate),
            (Phase::AmorphousSilica, self.amorphous_silica),
            (Phase::FlyAshC3a, self.c3a),
            (Phase::CaCl2, self.cacl2),
            (Phase::Anhydrite, self.anhydrite),
            (Phase::InertFiller, self.inert),
        ]
    }
}

/// PSD curve names for the phases placed as particles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PsdAssignments {
    pub cement: Option<String>,
    pub dihydrate: Option<String>,
    pub hemihydrate: Option<String>,
    pub anhydrite: Option<String>,
    pub silica_fume: Option<String>,
    pub fly_ash: Option<String>,
    pub slag: Option<String>,
    pub caco3: Option<String>,
    pub free_lime: Option<String>,
    pub inert_filler: Option<String>,
}

impl PsdAssignments {
    fn slot(&self, phase: Phase) -> Option<&Option<String>> {
        match phase {
            Phase::C3s => Some(&self.cement),
            Phase::Dihydrate => Some(&self.dihydrate),
            Phase::Hemihydrate => Some(&self.hemihydrate),
            Phase::Anhydrite => Some(&self.anhydrite),
            Phase::SilicaFume => Some(&self.silica_fume),
            Phase::FlyAsh => Some(&self.fly_ash),
            Phase::Slag => Some(&self.slag),
            Phase::Caco3 => Some(&self.caco3),
            Phase::FreeLime => Some(&self.free_lime),
            Phase::InertFiller => Some(&self.inert_filler),
            _ => None,
        }
    }

    fn slot_mut(&mut self, phase: Phase) -> Option<&mut Option<String>> {
        match phase {
            Phase::C3s => Some(&mut self.cement),
            Phase::Dihydrate => Some(&mut self.dihydrate),
            Phase::Hemihydrate => Some(&mut self.hemihydrate),
            Phase::Anhydrite => Some(&mut self.anhydrite),
            Phase::SilicaFume => Some(&mut self.silica_fume),
            Phase::FlyAsh => Some(&mut self.fly_ash),
            Phase::Slag => Some(&mut self.slag),
            Phase::Caco3 => Some(&mut self.caco3),
            Phase::FreeLime => Some(&mut self.free_lime),
            Phase::InertFiller => Some(&mut self.inert_filler),
            _ => None,
        }
    }

    /// PSD name of a placed phase; `C3s` stands for the whole cement.
    /// Blank names count as absent.
    pub fn get(&self, phase: Phase) -> Option<&str> {
        self.slot(phase)
            .and_then(|name| name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn set(&mut self, phase: Phase, name: impl Into<String>) {
        if let Some(slot) = self.slot_mut(phase) {
            *slot = Some(name.into());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SieveRow {
    pub min_diameter_mm: f64,
    pub mass_fraction: f64,
}

impl SieveRow {
    pub fn new(min_diameter_mm: f64, mass_fraction: f64) -> Self {
        Self {
            min_diameter_mm,
            mass_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSource {
    pub name: String,
    /// kg/L; looked up in the materials store by name when absent
    #[serde(default)]
    pub specific_gravity: Option<f64>,
    pub mass_fraction: f64,
    pub volume_fraction: f64,
    /// 0 means "110% of the top sieve"
    #[serde(default)]
    pub max_diameter_mm: f64,
    /// Largest sieve first
    pub grading: Vec<SieveRow>,
}

impl AggregateSource {
    pub fn is_present(&self, epsilon: f64) -> bool {
        self.mass_fraction > epsilon
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBlock {
    pub system: AggregateSystem,
    #[serde(default)]
    pub shape: ParticleShape,
    #[serde(default)]
    pub coarse: Vec<AggregateSource>,
    #[serde(default)]
    pub fine: Vec<AggregateSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixRecipe {
    pub system: BinderSystem,
    pub seed: RandomSeed,
    #[serde(default)]
    pub shape: ParticleShape,
    #[serde(default)]
    pub flocculation_degree: f64,
    #[serde(default)]
    pub dispersion_distance: u8,
    pub binder_volume_fraction: f64,
    pub water_volume_fraction: f64,
    #[serde(default)]
    pub air_volume_fraction: f64,
    pub binder: BinderComposition,
    #[serde(default)]
    pub clinker: ClinkerPhases,
    #[serde(default)]
    pub fly_ash_phases: Option<FlyAshComposition>,
    #[serde(default)]
    pub psds: PsdAssignments,
    #[serde(default)]
    pub itz_aggregate_thickness: u32,
    #[serde(default)]
    pub aggregate: Option<AggregateBlock>,
}

impl MixRecipe {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GenerationError::invalid(format!("malformed recipe: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GenerationError::invalid(format!("recipe cannot be serialized: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GenerationError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| GenerationError::io(path, e))
    }

    /// Placed phases with their fraction of the binder-system solids they
    /// claim before sulfates are split off the cement.
    fn psd_demands(&self) -> Vec<(Phase, f64)> {
        let mut demands = vec![(Phase::C3s, self.binder.cement)];
        for (phase, fraction) in self.binder.sulfate_entries() {
            demands.push((phase, fraction * self.binder.cement));
        }
        demands.extend(self.binder.scm_entries());
        demands
    }

    /// A copy with collaborator-supplied gaps filled: default PSD names for
    /// placed phases without one and specific gravities of aggregate sources
    /// that do not declare it. Store failures propagate unchanged.
    pub fn resolve_materials(&self, store: &dyn MaterialStore) -> Result<MixRecipe> {
        let mut resolved = self.clone();

        for (phase, fraction) in self.psd_demands() {
            if fraction > 0.0 && resolved.psds.get(phase).is_none() {
                if let Some(name) = store.default_psd_name(phase) {
                    resolved.psds.set(phase, name);
                }
            }
        }

        if let Some(block) = resolved.aggregate.as_mut() {
            for source in block.coarse.iter_mut().chain(block.fine.iter_mut()) {
                if source.specific_gravity.is_none() {
                    source.specific_gravity = Some(store.aggregate(&source.name)?.specific_gravity);
                }
            }
        }
        Ok(resolved)
    }

    /// Checks every field that does not need the voxel accounting.
    pub fn validate(&self, config: &GeneratorConfig) -> Result<()> {
        let tolerance = config.fraction_sum_tolerance;
        let dims = self.system.dims;
        check_dims("binder", dims)?;
        if !(self.system.resolution_um.is_finite() && self.system.resolution_um > 0.0) {
            return Err(GenerationError::invalid("binder resolution must be positive"));
        }
        if !(self.binder_volume_fraction.is_finite() && self.binder_volume_fraction > 0.0) {
            return Err(GenerationError::invalid(format!(
                "binder volume fraction must be positive, got {}",
                self.binder_volume_fraction
            )));
        }
        check_non_negative("water volume fraction", self.water_volume_fraction)?;
        if !(in_range(self.air_volume_fraction, 0.0, 1.0) && self.air_volume_fraction < 1.0) {
            return Err(GenerationError::invalid("air volume fraction must be in [0, 1)"));
        }
        check_fraction("flocculation degree", self.flocculation_degree, 1.0)?;
        if self.dispersion_distance > 2 {
            return Err(GenerationError::invalid(format!(
                "dispersion distance must be 0, 1 or 2, got {}",
                self.dispersion_distance
            )));
        }
        if let Some(shape_set) = self.shape.shape_set() {
            if shape_set.trim().is_empty() {
                return Err(GenerationError::invalid("real-shape particles need a shape set"));
            }
        }

        check_fraction("cement fraction", self.binder.cement, 1.0)?;
        for (phase, fraction) in self.binder.scm_entries() {
            check_fraction(phase.name(), fraction, 1.0)?;
        }
        for (phase, fraction) in self.binder.sulfate_entries() {
            check_fraction(phase.name(), fraction, 1.0)?;
        }
        let solids = self.binder.solids_sum();
        if (solids - 1.0).abs() > tolerance {
            return Err(GenerationError::invalid(format!(
                "binder solid fractions sum to {:.4}, expected 1",
                solids
            )));
        }

        for (phase, fractions) in self.clinker.entries() {
            check_fraction(&format!("{} volume fraction", phase), fractions.volume, 1.0)?;
            check_fraction(&format!("{} surface fraction", phase), fractions.surface, 1.0)?;
        }
        let sulfate_share: f64 = self.binder.sulfate_entries().iter().map(|(_, f)| f).sum();
        if self.binder.cement > 0.0 && sulfate_share < 1.0 {
            let clinker_sum = self.clinker.volume_sum();
            if (clinker_sum - 1.0).abs() > tolerance {
                return Err(GenerationError::invalid(format!(
                    "clinker volume fractions sum to {:.4}, expected 1",
                    clinker_sum
                )));
            }
        }

        if self.binder.fly_ash > 0.0 {
            let composition = self.fly_ash_phases.ok_or_else(|| {
                GenerationError::invalid("fly ash is present but its phase composition is not")
            })?;
            let mut sum = 0.0;
            for (phase, fraction) in composition.entries() {
                check_fraction(&format!("fly ash {}", phase), fraction, 1.0)?;
                sum += fraction;
            }
            if (sum - 1.0).abs() > tolerance {
                return Err(GenerationError::invalid(format!(
                    "fly ash phase fractions sum to {:.4}, expected 1",
                    sum
                )));
            }
        }

        for (phase, fraction) in self.psd_demands() {
            if fraction > 0.0 && self.psds.get(phase).is_none() {
                let label = if phase == Phase::C3s { "cement" } else { phase.name() };
                return Err(GenerationError::invalid(format!(
                    "no PSD named for {} although its volume fraction is {}",
                    label, fraction
                )));
            }
        }

        if let Some(block) = &self.aggregate {
            validate_aggregate(block, config)?;
        }
        Ok(())
    }
}

fn check_fraction(label: &str, value: f64, max: f64) -> Result<()> {
    if in_range(value, 0.0, max) {
        Ok(())
    } else {
        Err(GenerationError::invalid(format!(
            "{} must be in [0, {}], got {}",
            label, max, value
        )))
    }
}

fn check_non_negative(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GenerationError::invalid(format!(
            "{} must be finite and non-negative, got {}",
            label, value
        )))
    }
}

fn check_dims(system: &str, dims: SystemDims) -> Result<()> {
    match dims.checked_voxels() {
        Some(voxels) if voxels > 0 => Ok(()),
        Some(_) => Err(GenerationError::invalid(format!(
            "{} system dimensions must be positive",
            system
        ))),
        None => Err(GenerationError::invalid(format!(
            "{} system of {}x{}x{} voxels is too large",
            system, dims.x, dims.y, dims.z
        ))),
    }
}

fn validate_aggregate(block: &AggregateBlock, config: &GeneratorConfig) -> Result<()> {
    check_dims("aggregate", block.system.dims)?;
    if !(block.system.resolution_mm.is_finite() && block.system.resolution_mm > 0.0) {
        return Err(GenerationError::invalid("aggregate resolution must be positive"));
    }
    if let Some(shape_set) = block.shape.shape_set() {
        if shape_set.trim().is_empty() {
            return Err(GenerationError::invalid("real-shape aggregate needs a shape set"));
        }
    }
    for (kind, sources) in [("coarse", &block.coarse), ("fine", &block.fine)] {
        if sources.len() > MAX_SOURCES_PER_KIND {
            return Err(GenerationError::invalid(format!(
                "at most {} {} aggregate sources are supported, got {}",
                MAX_SOURCES_PER_KIND,
                kind,
                sources.len()
            )));
        }
        for source in sources {
            check_non_negative(&format!("{} mass fraction", source.name), source.mass_fraction)?;
            check_non_negative(&format!("{} volume fraction", source.name), source.volume_fraction)?;
            if !source.is_present(config.aggregate_mass_epsilon) {
                continue;
            }
            match source.specific_gravity {
                Some(sg) if sg.is_finite() && sg > 0.0 => {}
                Some(sg) => {
                    return Err(GenerationError::invalid(format!(
                        "{}: specific gravity must be positive, got {}",
                        source.name, sg
                    )));
                }
                None => {
                    return Err(GenerationError::invalid(format!(
                        "{}: specific gravity was not resolved",
                        source.name
                    )));
                }
            }
            check_non_negative(&format!("{} max diameter", source.name), source.max_diameter_mm)?;
            validate_grading(&source.name, &source.grading)?;
            validate_max_diameter(&source.name, &source.grading, source.max_diameter_mm)?;
        }
    }
    Ok(())
}

pub(crate) fn validate_grading(name: &str, grading: &[SieveRow]) -> Result<()> {
    if grading.is_empty() {
        return Err(GenerationError::invalid(format!("{}: grading table is empty", name)));
    }
    for row in grading {
        if !(row.min_diameter_mm.is_finite() && row.min_diameter_mm > 0.0) {
            return Err(GenerationError::invalid(format!(
                "{}: sieve diameter {} must be positive",
                name, row.min_diameter_mm
            )));
        }
        check_fraction(&format!("{} sieve mass fraction", name), row.mass_fraction, 1.0)?;
    }
    for pair in grading.windows(2) {
        if pair[1].min_diameter_mm >= pair[0].min_diameter_mm {
            return Err(GenerationError::invalid(format!(
                "{}: sieves must be listed largest first ({} mm after {} mm)",
                name, pair[1].min_diameter_mm, pair[0].min_diameter_mm
            )));
        }
    }
    Ok(())
}

/// A declared maximum diameter (one above [`MAX_DIAMETER_EPSILON_MM`]) may
/// not undercut the largest sieve.
pub(crate) fn validate_max_diameter(
    name: &str,
    grading: &[SieveRow],
    declared_max_diameter_mm: f64,
) -> Result<()> {
    if declared_max_diameter_mm < MAX_DIAMETER_EPSILON_MM {
        return Ok(());
    }
    match grading.first() {
        Some(top) if declared_max_diameter_mm < top.min_diameter_mm => {
            Err(GenerationError::invalid(format!(
                "{}: max diameter {} mm is below the largest sieve ({} mm)",
                name, declared_max_diameter_mm, top.min_diameter_mm
            )))
        }
        _ => Ok(()),
    }
}
