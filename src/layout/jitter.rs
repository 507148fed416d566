//! Bounded cosmetic jitter of snapped coordinates.
//!
//! A perfect lattice reads as mechanical; a small perturbation makes the
//! collage feel hand-placed. Strength scales down linearly with distance
//! from the centroid of the cloud, so the center is pulled most and the
//! outer edge stays near the lattice. The per-axis magnitude never exceeds
//! `strength` (a fraction of one cell width, capped at 0.5 by config
//! validation), so a point can never wander into a neighbor's cell
//! visually.

use rand::Rng;

/// Epsilon below which the cloud is treated as a single point.
const EPSILON: f32 = 1e-10;

/// Perturb `coords` in place.
pub fn apply_jitter(coords: &mut [(f32, f32)], strength: f32, rng: &mut impl Rng) {
    if coords.is_empty() || strength <= 0.0 {
        return;
    }

    let n = coords.len() as f32;
    let cx = coords.iter().map(|c| c.0).sum::<f32>() / n;
    let cy = coords.iter().map(|c| c.1).sum::<f32>() / n;

    let max_dist = coords
        .iter()
        .map(|&(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .fold(0.0f32, f32::max);
    if max_dist < EPSILON {
        return;
    }

    for point in coords.iter_mut() {
        let dist = ((point.0 - cx).powi(2) + (point.1 - cy).powi(2)).sqrt();
        let scale = 1.0 - dist / max_dist;
        point.0 += rng.random_range(-strength..=strength) * scale;
        point.1 += rng.random_range(-strength..=strength) * scale;
    }
}
