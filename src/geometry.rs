//! Digitized sphere volumes.

use std::f64::consts::PI;

/// Number of voxels in a digitized sphere of the given diameter (in voxels).
///
/// The diameter is rounded to the nearest whole voxel. Odd diameters center
/// the sphere on a voxel, even diameters on a voxel corner, so the lattice
/// coordinates are shifted by half a voxel in the even case. A voxel belongs
/// to the sphere when its center lies within the radius.
///
/// ```
/// use cement_microgen::geometry::diam2vol;
///
/// assert_eq!(diam2vol(1.0), 1);
/// assert_eq!(diam2vol(2.0), 8);
/// assert_eq!(diam2vol(3.0), 19);
/// ```
pub fn diam2vol(diameter: f64) -> u64 {
    if !diameter.is_finite() {
        return 0;
    }
    let rounded = diameter.round();
    if rounded < 1.0 {
        return 0;
    }
    let idiam = rounded as i64;
    let radius = idiam as f64 / 2.0;
    let radius_sq = radius * radius;
    let offset = if idiam % 2 == 0 { 0.5 } else { 0.0 };
    let bound = idiam / 2 + 1;

    let mut count = 0u64;
    for i in -bound..=bound {
        let x = i as f64 + offset;
        let rem_x = radius_sq - x * x;
        if rem_x < 0.0 {
            continue;
        }
        for j in -bound..=bound {
            let y = j as f64 + offset;
            let rem = rem_x - y * y;
            if rem < 0.0 {
                continue;
            }
            count += column_count(rem.sqrt(), offset);
        }
    }
    count
}

/// Lattice points k with |k + offset| <= half_height along one axis.
fn column_count(half_height: f64, offset: f64) -> u64 {
    if offset == 0.0 {
        2 * half_height.floor() as u64 + 1
    } else {
        2 * (half_height + 0.5).floor() as u64
    }
}

/// Continuous sphere volume for a diameter in voxels.
pub fn sphere_volume(diameter: f64) -> f64 {
    PI / 6.0 * diameter.powi(3)
}
