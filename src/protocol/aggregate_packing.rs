use super::writer::ProtocolWriter;
use crate::paths::PathResolver;
use crate::recipe::{MixRecipe, ParticleShape};
use crate::volume_budget::{SourceAllocation, VoxelBudget};

// Menu selections of the aggregate packer
const EXIT: u8 = 1;
const SPECIFY_SIZE: u8 = 2;
const ADD_COARSE: u8 = 3;
const ADD_FINE: u8 = 4;
const OUTPUT: u8 = 5;

/// Input for the aggregate packer; `None` when the recipe has no aggregate.
pub fn emit_aggregate_packing_protocol(
    budget: &VoxelBudget,
    recipe: &MixRecipe,
    paths: &dyn PathResolver,
) -> Option<String> {
    let block = recipe.aggregate.as_ref()?;
    let aggregate = budget.aggregate.as_ref()?;
    let mut w = ProtocolWriter::new();

    w.token(budget.seed);
    w.token(SPECIFY_SIZE)
        .token(block.system.dims.x)
        .token(block.system.dims.y)
        .token(block.system.dims.z)
        .token(block.system.resolution_mm);

    if !aggregate.coarse.is_empty() {
        w.token(ADD_COARSE);
        write_sources(&mut w, &block.shape, &aggregate.coarse, paths);
    }
    if !aggregate.fine.is_empty() {
        w.token(ADD_FINE);
        write_sources(&mut w, &block.shape, &aggregate.fine, paths);
    }

    w.token(OUTPUT);
    w.path(&paths.aggregate_image());
    w.path(&paths.aggregate_particle_image());
    w.token(EXIT);
    Some(w.finish())
}

fn write_sources(
    w: &mut ProtocolWriter,
    shape: &ParticleShape,
    sources: &[SourceAllocation],
    paths: &dyn PathResolver,
) {
    w.token(shape.flag());
    if let Some(shape_set) = shape.shape_set() {
        w.path(&paths.shape_set_dir(shape_set));
    }
    w.token(sources.len());
    for source in sources {
        w.path(&paths.grading_file(&source.label));
        w.token(source.table.present_sieve_count);
        for sieve in source.table.present() {
            w.token(sieve.particles)
                .token(sieve.upper_diameter_vox)
                .token(sieve.min_diameter_vox)
                .token(sieve.voxels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::paths::OperationPaths;
    use crate::recipe::fixtures::{coarse_source, paste_recipe};
    use crate::recipe::{AggregateBlock, AggregateSystem, SieveRow, SystemDims};
    use crate::volume_budget::VolumeBudgetSolver;

    fn concrete_recipe() -> MixRecipe {
        let mut recipe = paste_recipe();
        recipe.binder_volume_fraction = 0.2;
        recipe.water_volume_fraction = 0.1;
        let mut sand = coarse_source("Sand", 0.3);
        sand.grading = vec![SieveRow::new(4.75, 0.6), SieveRow::new(2.36, 0.4)];
        recipe.aggregate = Some(AggregateBlock {
            system: AggregateSystem {
                dims: SystemDims::cube(200),
                resolution_mm: 0.25,
            },
            shape: ParticleShape::Spheres,
            coarse: vec![coarse_source("Granite", 0.4)],
            fine: vec![sand],
        });
        recipe
    }

    #[test]
    fn test_coarse_and_fine_blocks() {
        let recipe = concrete_recipe();
        let budget = VolumeBudgetSolver::new(GeneratorConfig::default())
            .solve(&recipe)
            .unwrap();
        let paths = OperationPaths::new("/ops", "c1", "/shapes", "/corr");
        let text = emit_aggregate_packing_protocol(&budget, &recipe, &paths).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..6], ["-2814", "2", "200", "200", "200", "0.25"]);
        assert_eq!(&lines[6..11], ["3", "0", "1", "/ops/c1/coarse01.gdg", "4"]);

        let granite = &budget.aggregate.as_ref().unwrap().coarse[0].table;
        let top = &granite.sieves[0];
        assert_eq!(lines[11], top.particles.to_string());
        assert_eq!(lines[12], top.upper_diameter_vox.to_string());
        assert_eq!(lines[13], "76");
        assert_eq!(lines[14], top.voxels.to_string());

        let fine = 11 + 4 * 4;
        assert_eq!(&lines[fine..fine + 5], ["4", "0", "1", "/ops/c1/fine01.gdg", "2"]);
        assert_eq!(
            &lines[lines.len() - 4..],
            ["5", "/ops/c1/c1_aggregate.img", "/ops/c1/c1_aggregate.pimg", "1"]
        );
    }

    #[test]
    fn test_no_aggregate_no_protocol() {
        let recipe = paste_recipe();
        let budget = VolumeBudgetSolver::new(GeneratorConfig::default())
            .solve(&recipe)
            .unwrap();
        let paths = OperationPaths::new("/ops", "p", "/shapes", "/corr");
        assert!(emit_aggregate_packing_protocol(&budget, &recipe, &paths).is_none());
    }
}
