//! Aggregate sieve gradings turned into voxel and particle counts.

use crate::constants::{
    MAX_DIAMETER_EPSILON_MM, MAX_DIAMETER_HEADROOM, MIN_COUNTABLE_DIAMETER_VOX,
    SPECIFIC_GRAVITY_SCALE,
};
use crate::error::{GenerationError, Result};
use crate::geometry::diam2vol;
use crate::math_utils::volume_weighted_mean_diameter;
use crate::recipe::{SieveRow, validate_grading, validate_max_diameter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sieve {
    pub min_diameter_mm: f64,
    pub mass_fraction: f64,
    /// Share of the aggregate system volume
    pub volume_fraction: f64,
    pub voxels: i64,
    pub min_diameter_vox: f64,
    pub upper_diameter_vox: f64,
    pub average_diameter_vox: f64,
    pub particles: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SieveTable {
    /// Largest sieve first
    pub sieves: Vec<Sieve>,
    pub max_diameter_vox: f64,
    pub present_sieve_count: usize,
}

impl SieveTable {
    /// Sieves that hold voxels; the only ones the packer reads.
    pub fn present(&self) -> impl Iterator<Item = &Sieve> {
        self.sieves.iter().filter(|sieve| sieve.voxels > 0)
    }

    pub fn total_voxels(&self) -> i64 {
        self.sieves.iter().map(|sieve| sieve.voxels).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SieveGradingSolver;

impl SieveGradingSolver {
    pub fn new() -> Self {
        Self
    }

    /// Distribute one aggregate source over its sieves.
    ///
    /// `source_volume_fraction` is the source's share of the whole mix and
    /// `system_voxels` the size of the aggregate system. A declared maximum
    /// diameter below [`MAX_DIAMETER_EPSILON_MM`] falls back to 110% of the
    /// largest sieve; any other declared maximum must not be smaller than
    /// that sieve.
    pub fn solve(
        &self,
        grading: &[SieveRow],
        specific_gravity: f64,
        source_volume_fraction: f64,
        system_voxels: i64,
        resolution_mm: f64,
        declared_max_diameter_mm: f64,
    ) -> Result<SieveTable> {
        validate_grading("grading", grading)?;
        validate_max_diameter("grading", grading, declared_max_diameter_mm)?;
        if !(specific_gravity.is_finite() && specific_gravity > 0.0) {
            return Err(GenerationError::invalid(format!(
                "specific gravity must be positive, got {}",
                specific_gravity
            )));
        }
        if !(resolution_mm.is_finite() && resolution_mm > 0.0) {
            return Err(GenerationError::invalid("aggregate resolution must be positive"));
        }

        // kg/L to kg/mm3
        let density = specific_gravity / SPECIFIC_GRAVITY_SCALE;
        let mut volumes: Vec<f64> = grading.iter().map(|row| row.mass_fraction / density).collect();
        let total_volume: f64 = volumes.iter().sum();
        if total_volume > 0.0 {
            for volume in volumes.iter_mut() {
                *volume *= source_volume_fraction / total_volume;
            }
        } else {
            volumes.iter_mut().for_each(|volume| *volume = 0.0);
        }

        let max_diameter_mm = if declared_max_diameter_mm < MAX_DIAMETER_EPSILON_MM {
            MAX_DIAMETER_HEADROOM * grading[0].min_diameter_mm
        } else {
            declared_max_diameter_mm
        };
        let max_diameter_vox = max_diameter_mm / resolution_mm;

        let mut sieves = Vec::with_capacity(grading.len());
        let mut upper_diameter_vox = max_diameter_vox;
        for (row, volume_fraction) in grading.iter().zip(volumes) {
            let voxels = if volume_fraction > 0.0 {
                (volume_fraction * system_voxels as f64 + 0.5).round() as i64
            } else {
                0
            };
            let min_diameter_vox = row.min_diameter_mm / resolution_mm;
            let average_diameter_vox =
                volume_weighted_mean_diameter(upper_diameter_vox, min_diameter_vox);
            let particles = if average_diameter_vox <= MIN_COUNTABLE_DIAMETER_VOX {
                0
            } else {
                let particle_volume = diam2vol(average_diameter_vox);
                if particle_volume > 0 {
                    voxels.max(0) as u64 / particle_volume
                } else {
                    0
                }
            };
            sieves.push(Sieve {
                min_diameter_mm: row.min_diameter_mm,
                mass_fraction: row.mass_fraction,
                volume_fraction,
                voxels,
                min_diameter_vox,
                upper_diameter_vox,
                average_diameter_vox,
                particles,
            });
            upper_diameter_vox = min_diameter_vox;
        }

        let present_sieve_count = sieves.iter().filter(|sieve| sieve.voxels > 0).count();
        Ok(SieveTable {
            sieves,
            max_diameter_vox,
            present_sieve_count,
        })
    }
}

/// Grading file read by the aggregate packer.
pub fn grading_file_text(rows: &[SieveRow]) -> String {
    let mut text = String::from("min_diameter_mm mass_fraction\n");
    for row in rows {
        text.push_str(&format!("{} {}\n", row.min_diameter_mm, row.mass_fraction));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use more_asserts::assert_le;

    fn coarse_grading() -> Vec<SieveRow> {
        vec![
            SieveRow::new(19.0, 0.1),
            SieveRow::new(12.5, 0.4),
            SieveRow::new(9.5, 0.3),
            SieveRow::new(4.75, 0.2),
        ]
    }

    #[test]
    fn test_all_zero_grading_has_no_voxels() {
        let grading: Vec<SieveRow> =
            coarse_grading().iter().map(|r| SieveRow::new(r.min_diameter_mm, 0.0)).collect();
        let table = SieveGradingSolver::new()
            .solve(&grading, 2.65, 0.35, 1_000_000, 0.5, 0.0)
            .unwrap();

        assert!(table.sieves.iter().all(|s| s.voxels == 0 && s.particles == 0));
        assert_eq!(table.present_sieve_count, 0);
        assert_eq!(table.present().count(), 0);
    }

    #[test]
    fn test_voxels_follow_source_fraction() {
        let system_voxels = 200 * 200 * 200;
        let source_fraction = 0.35;
        let table = SieveGradingSolver::new()
            .solve(&coarse_grading(), 2.65, source_fraction, system_voxels, 0.5, 0.0)
            .unwrap();

        let expected = (source_fraction * system_voxels as f64).round() as i64;
        let bins = table.sieves.len() as i64;
        assert_le!((table.total_voxels() - expected).abs(), bins);
        assert_eq!(table.present_sieve_count, 4);

        let volumes: f64 = table.sieves.iter().map(|s| s.volume_fraction).sum();
        assert_abs_diff_eq!(volumes, source_fraction, epsilon = 1e-12);
    }

    #[test]
    fn test_diameters_and_particles() {
        let table = SieveGradingSolver::new()
            .solve(&coarse_grading(), 2.65, 0.35, 8_000_000, 0.5, 0.0)
            .unwrap();

        // 110% of the 19 mm sieve at 0.5 mm per voxel
        assert_abs_diff_eq!(table.max_diameter_vox, 41.8, epsilon = 1e-9);
        let top = &table.sieves[0];
        assert_eq!(top.upper_diameter_vox, table.max_diameter_vox);
        assert_eq!(top.min_diameter_vox, 38.0);
        assert_eq!(table.sieves[1].upper_diameter_vox, 38.0);
        assert_eq!(table.sieves[3].min_diameter_vox, 9.5);

        for sieve in &table.sieves {
            let expected = sieve.voxels as u64 / diam2vol(sieve.average_diameter_vox);
            assert_eq!(sieve.particles, expected);
            assert!(sieve.particles > 0);
        }
    }

    #[test]
    fn test_declared_max_diameter_is_used() {
        let table = SieveGradingSolver::new()
            .solve(&coarse_grading(), 2.65, 0.35, 1_000_000, 1.0, 25.0)
            .unwrap();
        assert_eq!(table.max_diameter_vox, 25.0);
        assert_eq!(table.sieves[0].upper_diameter_vox, 25.0);
    }

    #[test]
    fn test_declared_max_diameter_below_top_sieve_is_rejected() {
        let grading = vec![SieveRow::new(19.0, 0.5), SieveRow::new(9.5, 0.5)];
        let result = SieveGradingSolver::new().solve(&grading, 2.65, 0.3, 1_000_000, 0.5, 5.0);
        assert!(matches!(result, Err(GenerationError::InvalidRecipe(_))));

        // a maximum equal to the top sieve still gives a well-formed bin
        let table = SieveGradingSolver::new()
            .solve(&grading, 2.65, 0.3, 1_000_000, 0.5, 19.0)
            .unwrap();
        let top = &table.sieves[0];
        assert_eq!(top.upper_diameter_vox, top.min_diameter_vox);
        assert_abs_diff_eq!(top.average_diameter_vox, 38.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fine_sieves_below_resolution_hold_no_particles() {
        let grading = vec![SieveRow::new(2.36, 0.5), SieveRow::new(0.6, 0.5)];
        let table = SieveGradingSolver::new()
            .solve(&grading, 2.6, 0.3, 1_000_000, 1.0, 0.0)
            .unwrap();

        let fine = &table.sieves[1];
        assert!(fine.voxels > 0);
        assert!(fine.average_diameter_vox <= MIN_COUNTABLE_DIAMETER_VOX);
        assert_eq!(fine.particles, 0);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let solver = SieveGradingSolver::new();
        let mut reversed = coarse_grading();
        reversed.reverse();
        assert!(solver.solve(&reversed, 2.65, 0.3, 1000, 0.5, 0.0).is_err());
        assert!(solver.solve(&coarse_grading(), 0.0, 0.3, 1000, 0.5, 0.0).is_err());
        assert!(solver.solve(&[], 2.65, 0.3, 1000, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_grading_file_text() {
        let text = grading_file_text(&coarse_grading()[..2]);
        assert_eq!(text, "min_diameter_mm mass_fraction\n19 0.1\n12.5 0.4\n");
    }
}
