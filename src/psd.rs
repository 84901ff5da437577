//! Measured particle-size distributions.
//!
//! A PSD is a cumulative curve of mass fraction against particle diameter
//! in micrometers. The curve is interpolated linearly between measured
//! points and from the origin up to the first point.

use crate::error::{GenerationError, Result};

const FRACTION_SLACK: f64 = 1.0e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsdPoint {
    pub diameter_um: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    name: String,
    points: Vec<PsdPoint>,
}

/// One whole-voxel diameter class of a discretized PSD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiameterBin {
    pub diameter_vox: u32,
    /// Mass of the bin relative to the whole measured curve
    pub mass_fraction: f64,
}

/// A PSD cut into whole-voxel diameter classes, largest class first.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretization {
    pub bins: Vec<DiameterBin>,
    /// Share of the curve's mass at or below the largest class
    pub usable_fraction: f64,
    /// Share of the curve's mass above the largest class
    pub oversize_fraction: f64,
    /// Mass-weighted mean of `resolution / diameter` over the sub-voxel part of the curve
    pub one_pixel_bias: f64,
}

impl Psd {
    pub fn new(name: impl Into<String>, points: Vec<PsdPoint>) -> Result<Self> {
        let name = name.into();
        if points.is_empty() {
            return Err(GenerationError::invalid(format!("PSD '{}' has no data", name)));
        }

        let mut previous: Option<PsdPoint> = None;
        for point in &points {
            if !(point.diameter_um.is_finite() && point.diameter_um > 0.0) {
                return Err(GenerationError::invalid(format!(
                    "PSD '{}': diameter {} must be positive",
                    name, point.diameter_um
                )));
            }
            if !(point.cumulative.is_finite()
                && point.cumulative >= 0.0
                && point.cumulative <= 1.0 + FRACTION_SLACK)
            {
                return Err(GenerationError::invalid(format!(
                    "PSD '{}': cumulative fraction {} outside [0, 1]",
                    name, point.cumulative
                )));
            }
            if let Some(prev) = previous {
                if point.diameter_um <= prev.diameter_um {
                    return Err(GenerationError::invalid(format!(
                        "PSD '{}': diameters must increase ({} after {})",
                        name, point.diameter_um, prev.diameter_um
                    )));
                }
                if point.cumulative < prev.cumulative {
                    return Err(GenerationError::invalid(format!(
                        "PSD '{}': cumulative fraction decreases at {} um",
                        name, point.diameter_um
                    )));
                }
            }
            previous = Some(*point);
        }

        let psd = Psd { name, points };
        if psd.total() <= 0.0 {
            return Err(GenerationError::invalid(format!(
                "PSD '{}' carries no mass",
                psd.name
            )));
        }
        Ok(psd)
    }

    /// Parse a PSD table: one `diameter fraction` pair per line, separated by
    /// whitespace or a comma. Blank lines, `#` comments and a single header
    /// line before the data are skipped. Percent data (last value above 1)
    /// is scaled to fractions.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let mut points = Vec::new();
        let mut header_seen = false;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            match parse_pair(line) {
                Some((diameter_um, cumulative)) => points.push(PsdPoint {
                    diameter_um,
                    cumulative,
                }),
                None if points.is_empty() && !header_seen => header_seen = true,
                None => {
                    return Err(GenerationError::invalid(format!(
                        "PSD '{}': line {} is not a diameter/fraction pair",
                        name,
                        index + 1
                    )));
                }
            }
        }

        let last = points.last().map(|p| p.cumulative).unwrap_or(0.0);
        if last > 1.0 + FRACTION_SLACK && last <= 100.0 + FRACTION_SLACK {
            for point in &mut points {
                point.cumulative *= 0.01;
            }
        }

        Psd::new(name, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[PsdPoint] {
        &self.points
    }

    /// Cumulative fraction at the largest measured diameter
    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.cumulative).unwrap_or(0.0)
    }

    pub fn max_diameter_um(&self) -> f64 {
        self.points.last().map(|p| p.diameter_um).unwrap_or(0.0)
    }

    pub fn cumulative_at(&self, diameter_um: f64) -> f64 {
        if diameter_um <= 0.0 {
            return 0.0;
        }
        let first = self.points[0];
        if diameter_um <= first.diameter_um {
            return first.cumulative * diameter_um / first.diameter_um;
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if diameter_um <= hi.diameter_um {
                let ratio = (diameter_um - lo.diameter_um) / (hi.diameter_um - lo.diameter_um);
                return lo.cumulative + (hi.cumulative - lo.cumulative) * ratio;
            }
        }
        self.total()
    }

    /// Cut the curve into whole-voxel diameter classes from
    /// `floor(max_diameter_vox)` down to 1. Class `D` collects the mass
    /// between `(D - 0.5)` and `(D + 0.5)` voxels; class 1 also takes
    /// everything finer.
    pub fn discretize(&self, resolution_um: f64, max_diameter_vox: f64) -> Discretization {
        let total = self.total();
        let one_pixel_bias = self.sub_voxel_bias(resolution_um);
        let top = if max_diameter_vox.is_finite() {
            max_diameter_vox.floor()
        } else {
            0.0
        };
        if top < 1.0 || resolution_um <= 0.0 {
            return Discretization {
                bins: Vec::new(),
                usable_fraction: 0.0,
                oversize_fraction: 1.0,
                one_pixel_bias,
            };
        }
        let top = top as u32;

        let bins = (1..=top)
            .rev()
            .map(|diameter_vox| {
                let lower = if diameter_vox == 1 {
                    0.0
                } else {
                    (diameter_vox as f64 - 0.5) * resolution_um
                };
                let upper = (diameter_vox as f64 + 0.5) * resolution_um;
                let mass = self.cumulative_at(upper) - self.cumulative_at(lower);
                DiameterBin {
                    diameter_vox,
                    mass_fraction: (mass / total).max(0.0),
                }
            })
            .collect();

        let usable_fraction = (self.cumulative_at((top as f64 + 0.5) * resolution_um) / total).min(1.0);
        Discretization {
            bins,
            usable_fraction,
            oversize_fraction: (1.0 - usable_fraction).max(0.0),
            one_pixel_bias,
        }
    }

    fn sub_voxel_bias(&self, resolution_um: f64) -> f64 {
        if resolution_um <= 0.0 {
            return 1.0;
        }
        let mut weighted = 0.0;
        let mut mass = 0.0;
        let mut lower = PsdPoint {
            diameter_um: 0.0,
            cumulative: 0.0,
        };
        for &point in &self.points {
            if lower.diameter_um >= resolution_um {
                break;
            }
            let upper_d = point.diameter_um.min(resolution_um);
            let segment_mass = self.cumulative_at(upper_d) - lower.cumulative;
            let mid = 0.5 * (lower.diameter_um + upper_d);
            if segment_mass > 0.0 && mid > 0.0 {
                weighted += segment_mass * resolution_um / mid;
                mass += segment_mass;
            }
            lower = point;
        }
        if mass > 0.0 { weighted / mass } else { 1.0 }
    }

    /// Text form written next to the other operation files.
    pub fn to_text(&self) -> String {
        let mut text = format!("# {}\ndiameter_um cumulative_fraction\n", self.name);
        for point in &self.points {
            text.push_str(&format!("{} {}\n", point.diameter_um, point.cumulative));
        }
        text
    }
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut fields = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty());
    let diameter = fields.next()?.parse::<f64>().ok()?;
    let fraction = fields.next()?.parse::<f64>().ok()?;
    Some((diameter, fraction))
}
