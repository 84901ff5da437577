use super::writer::ProtocolWriter;
use crate::paths::PathResolver;
use crate::phase::Phase;
use crate::recipe::MixRecipe;
use crate::volume_budget::{PhaseSamples, VoxelBudget};

// Menu selections of the microstructure engine
const EXIT: u8 = 1;
const SPECIFY_SIZE: u8 = 2;
const ADD_PARTICLES: u8 = 3;
const FLOCCULATE: u8 = 4;
const ADD_AGGREGATE: u8 = 6;
const OUTPUT: u8 = 8;
const DISTRIBUTE_CLINKER: u8 = 9;
const DISTRIBUTE_FLY_ASH: u8 = 10;
const ONE_PIXEL_PARTICLES: u8 = 11;

/// Input for the microstructure engine, from sizing the system to exit.
pub fn emit_microstructure_protocol(
    budget: &VoxelBudget,
    samples: &PhaseSamples,
    recipe: &MixRecipe,
    paths: &dyn PathResolver,
) -> String {
    let mut w = ProtocolWriter::new();
    let system = &recipe.system;

    w.token(budget.seed);
    w.token(SPECIFY_SIZE)
        .token(system.dims.x)
        .token(system.dims.y)
        .token(system.dims.z)
        .token(system.resolution_um);

    w.token(ADD_PARTICLES).token(recipe.shape.flag());
    if let Some(shape_set) = recipe.shape.shape_set() {
        w.path(&paths.shape_set_dir(shape_set));
    }
    let placed: Vec<_> = samples.phases.iter().filter(|p| !p.sample.is_empty()).collect();
    w.token(placed.len());
    for phase in placed {
        w.token(phase.phase.id())
            .token(phase.volume_fraction)
            .token(phase.sample.class_count());
        for class in phase.sample.classes() {
            w.token(class.count).token(class.diameter_vox).token(class.massfrac);
        }
    }
    w.token(recipe.dispersion_distance);
    w.path(&paths.psd_export(Phase::C3s));

    if recipe.flocculation_degree > 0.0 {
        w.token(FLOCCULATE).token(recipe.flocculation_degree);
    }
    if recipe.itz_aggregate_thickness > 0 {
        w.token(ADD_AGGREGATE).token(recipe.itz_aggregate_thickness);
    }

    w.token(DISTRIBUTE_CLINKER);
    w.path(&paths.clinker_correlation_dir());
    for (_, fractions) in recipe.clinker.entries() {
        w.token(fractions.volume).token(fractions.surface);
    }

    if samples.get(Phase::FlyAsh).is_some() {
        if let Some(fractions) = &budget.fly_ash_fractions {
            w.token(DISTRIBUTE_FLY_ASH).token(fractions.len());
            for (phase, fraction) in fractions {
                w.token(phase.id()).token(fraction);
            }
        }
    }

    let one_pixel: Vec<_> = samples.one_pixel.iter().filter(|e| e.count > 0).collect();
    w.token(ONE_PIXEL_PARTICLES).token(one_pixel.len());
    for entry in one_pixel {
        w.token(entry.phase.id()).token(entry.count);
    }

    w.token(OUTPUT);
    w.path(&paths.microstructure_image());
    w.path(&paths.particle_image());
    w.token(EXIT);
    w.finish()
}

/// Dissolution bias of every one-voxel entry, clinker entries first.
pub fn emit_dissolution_bias_block(samples: &PhaseSamples) -> String {
    let mut w = ProtocolWriter::new();
    w.token(samples.one_pixel.len());
    for entry in &samples.one_pixel {
        w.token(entry.phase.id()).token(entry.bias);
    }
    w.finish()
}
