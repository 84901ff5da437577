use crate::config::GeneratorConfig;
use crate::constants::DEFAULT_MAX_OVERSIZE_FRACTION;
use crate::error::{GenerationError, Result};
use crate::geometry::diam2vol;
use crate::psd::Psd;
use crate::recipe::SystemDims;
use tracing::{debug, warn};

/// Particle classes drawn from one PSD for one phase, largest diameter first.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdSample {
    pub psd_name: String,
    /// Diameters in voxels, non-increasing
    pub diameters: Vec<u32>,
    /// Share of the phase's own mass in each class
    pub massfrac: Vec<f64>,
    pub particle_counts: Vec<u64>,
    pub one_pixel_bias: f64,
    /// Target voxels left over after whole particles are placed
    pub one_pixel_count: i64,
    pub target_pixels: i64,
    /// Share of the curve above the largest diameter the system holds
    pub oversize_fraction: f64,
}

/// One emitted particle class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleClass {
    pub count: u64,
    pub diameter_vox: u32,
    pub massfrac: f64,
}

impl PsdSample {
    fn empty(psd_name: &str, one_pixel_bias: f64) -> Self {
        Self {
            psd_name: psd_name.to_string(),
            diameters: Vec::new(),
            massfrac: Vec::new(),
            particle_counts: Vec::new(),
            one_pixel_bias,
            one_pixel_count: 0,
            target_pixels: 0,
            oversize_fraction: 0.0,
        }
    }

    /// Classes with a positive mass fraction, in order.
    pub fn classes(&self) -> impl Iterator<Item = ParticleClass> + '_ {
        self.diameters
            .iter()
            .zip(&self.massfrac)
            .zip(&self.particle_counts)
            .filter(|((_, massfrac), _)| **massfrac > 0.0)
            .map(|((diameter_vox, massfrac), count)| ParticleClass {
                count: *count,
                diameter_vox: *diameter_vox,
                massfrac: *massfrac,
            })
    }

    pub fn class_count(&self) -> usize {
        self.classes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.class_count() == 0
    }

    /// Voxels taken by whole particles
    pub fn placed_pixels(&self) -> i64 {
        self.target_pixels - self.one_pixel_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsdSampler {
    size_safety_coefficient: f64,
    max_oversize_fraction: f64,
}

impl PsdSampler {
    pub fn new(size_safety_coefficient: f64) -> Self {
        Self {
            size_safety_coefficient,
            max_oversize_fraction: DEFAULT_MAX_OVERSIZE_FRACTION,
        }
    }

    /// Share of the curve that may lie above the largest diameter before
    /// sampling fails instead of truncating.
    pub fn with_max_oversize_fraction(mut self, max_oversize_fraction: f64) -> Self {
        self.max_oversize_fraction = max_oversize_fraction;
        self
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.size_safety_coefficient)
            .with_max_oversize_fraction(config.max_oversize_fraction)
    }

    /// Largest particle diameter, in voxels, the system holds with margin.
    pub fn max_diameter(&self, dims: SystemDims) -> f64 {
        self.size_safety_coefficient * dims.min_dimension() as f64
    }

    pub fn sample(
        &self,
        psd: &Psd,
        resolution_um: f64,
        dims: SystemDims,
        target_pixels: i64,
    ) -> Result<PsdSample> {
        let max_diameter = self.max_diameter(dims);
        let discretization = psd.discretize(resolution_um, max_diameter);
        if target_pixels <= 0 {
            return Ok(PsdSample::empty(psd.name(), discretization.one_pixel_bias));
        }

        let too_small = || GenerationError::PsdTooSmall {
            psd: psd.name().to_string(),
            target_pixels,
            max_diameter,
        };

        let usable = discretization.usable_fraction;
        if usable <= 0.0 || discretization.bins.is_empty() {
            return Err(too_small());
        }
        if discretization.oversize_fraction > self.max_oversize_fraction + 1e-12 {
            debug!(
                "PSD '{}': {:.2}% of its mass is above {:.1} voxels",
                psd.name(),
                discretization.oversize_fraction * 100.0,
                max_diameter
            );
            return Err(too_small());
        }

        let target = target_pixels as f64;
        let mut diameters = Vec::with_capacity(discretization.bins.len());
        let mut massfrac = Vec::with_capacity(discretization.bins.len());
        let mut particle_counts = Vec::with_capacity(discretization.bins.len());
        let mut placed: i64 = 0;
        for bin in &discretization.bins {
            let fraction = bin.mass_fraction / usable;
            let volume = diam2vol(bin.diameter_vox as f64);
            let count = if volume > 0 {
                (fraction * target / volume as f64).floor() as u64
            } else {
                0
            };
            placed += (count * volume) as i64;
            diameters.push(bin.diameter_vox);
            massfrac.push(fraction);
            particle_counts.push(count);
        }

        if placed == 0 {
            return Err(too_small());
        }

        if discretization.oversize_fraction > 0.0 {
            warn!(
                "PSD '{}' truncated at {:.1} voxels: {:.2}% of its mass is larger",
                psd.name(),
                max_diameter,
                discretization.oversize_fraction * 100.0
            );
        }

        let sample = PsdSample {
            psd_name: psd.name().to_string(),
            diameters,
            massfrac,
            particle_counts,
            one_pixel_bias: discretization.one_pixel_bias,
            one_pixel_count: target_pixels - placed,
            target_pixels,
            oversize_fraction: discretization.oversize_fraction,
        };
        debug!(
            "PSD '{}': {} classes, {} of {} voxels in whole particles",
            sample.psd_name,
            sample.class_count(),
            placed,
            target_pixels
        );
        Ok(sample)
    }
}
