//! Spatial resolver
//!
//! Obstacle generation, circle-vs-rectangle push-out, the (approximate)
//! segment-vs-rectangle test used for vision and look-ahead probes, and
//! spawn placement.

use rand::Rng;
use tracing::warn;

use crate::game::constants::{map, spawn};
use crate::game::state::{MapBounds, Obstacle};
use crate::util::vec2::Vec2;

/// Squared separation below which a push-out direction is considered degenerate
const DEGENERATE_DIST_SQ: f32 = 1e-6;

/// Generate the obstacle set for a session
///
/// Places `wall_count` elongated walls (random orientation) and
/// `debris_count` square blocks. Any candidate touching the safe zone around
/// the map center is rejected and re-rolled, up to a bounded number of tries
/// per obstacle, so the result can hold fewer obstacles than requested on
/// cramped maps. Seed the rng for a reproducible layout.
pub fn generate_obstacles<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: MapBounds,
    wall_count: usize,
    debris_count: usize,
    safe_zone_radius: f32,
) -> Vec<Obstacle> {
    let center = bounds.center();
    let mut obstacles = Vec::with_capacity(wall_count + debris_count);

    let place = |rng: &mut R, size: &mut dyn FnMut(&mut R) -> (f32, f32)| {
        for _ in 0..map::PLACEMENT_ATTEMPTS_PER_OBSTACLE {
            let (width, height) = size(rng);
            let x = rng.gen_range(0.0..(bounds.width - width).max(1.0));
            let y = rng.gen_range(0.0..(bounds.height - height).max(1.0));
            let candidate = Obstacle::new(x, y, width, height);
            if !touches_circle(&candidate, center, safe_zone_radius) {
                return Some(candidate);
            }
        }
        None
    };

    for _ in 0..wall_count {
        let mut wall_size = |rng: &mut R| {
            let length = rng.gen_range(map::WALL_LENGTH_MIN..map::WALL_LENGTH_MAX);
            if rng.gen_bool(0.5) {
                (length, map::WALL_THICKNESS)
            } else {
                (map::WALL_THICKNESS, length)
            }
        };
        if let Some(wall) = place(rng, &mut wall_size) {
            obstacles.push(wall);
        }
    }

    for _ in 0..debris_count {
        let mut debris_size = |rng: &mut R| {
            let side = rng.gen_range(map::DEBRIS_SIZE_MIN..map::DEBRIS_SIZE_MAX);
            (side, side)
        };
        if let Some(block) = place(rng, &mut debris_size) {
            obstacles.push(block);
        }
    }

    obstacles
}

/// Whether any part of the rectangle lies within `radius` of `center`
pub fn touches_circle(obstacle: &Obstacle, center: Vec2, radius: f32) -> bool {
    obstacle.closest_point(center).distance_sq_to(center) < radius * radius
}

/// Resolve a circle against the map bounds and the obstacle set
///
/// Clamps into `[radius, dimension - radius]`, then pushes the circle out of
/// each overlapping obstacle in order. Overlaps are resolved one obstacle at a
/// time, not jointly. A final clamp keeps the bounds invariant even when an
/// obstacle hugs the map edge.
pub fn resolve_collision(
    position: Vec2,
    radius: f32,
    bounds: MapBounds,
    obstacles: &[Obstacle],
) -> Vec2 {
    let mut pos = bounds.clamp(position, radius);

    for obstacle in obstacles {
        // Broad phase: AABB grown by the radius
        if !obstacle.contains(pos, radius) {
            continue;
        }

        let closest = obstacle.closest_point(pos);
        let separation = pos - closest;
        let dist_sq = separation.length_sq();

        if dist_sq >= radius * radius {
            continue;
        }

        let pushed = if dist_sq > DEGENERATE_DIST_SQ {
            let dist = dist_sq.sqrt();
            Some(pos + separation / dist * (radius - dist))
        } else {
            None
        };
        pos = match pushed {
            Some(p) if bounds.contains_circle(p, radius) => p,
            // Degenerate, or the separation points off the map
            _ => push_out_of_interior(pos, radius, bounds, obstacle),
        };
    }

    bounds.clamp(pos, radius)
}

/// Leave the rectangle through the nearest face that keeps the circle on the map
///
/// Used when the center is on or inside the rectangle, or when the separation
/// vector would push the circle off the map.
fn push_out_of_interior(pos: Vec2, radius: f32, bounds: MapBounds, obstacle: &Obstacle) -> Vec2 {
    let mut exits = [
        (pos.x - obstacle.x, Vec2::new(obstacle.x - radius, pos.y)),
        (obstacle.right() - pos.x, Vec2::new(obstacle.right() + radius, pos.y)),
        (pos.y - obstacle.y, Vec2::new(pos.x, obstacle.y - radius)),
        (obstacle.bottom() - pos.y, Vec2::new(pos.x, obstacle.bottom() + radius)),
    ];
    exits.sort_by(|a, b| a.0.total_cmp(&b.0));

    exits
        .iter()
        .map(|&(_, exit)| exit)
        .find(|&exit| bounds.contains_circle(exit, radius))
        .unwrap_or(exits[0].1)
}

/// Approximate segment-vs-rectangle test
///
/// Rejects on the segment's AABB, then tests only the segment midpoint against
/// the padded rectangle. Good enough for probes up to ~60 units; long diagonal
/// segments that graze a corner can be missed.
pub fn segment_rect_intersect(p1: Vec2, p2: Vec2, obstacle: &Obstacle, padding: f32) -> bool {
    let min_x = p1.x.min(p2.x);
    let max_x = p1.x.max(p2.x);
    let min_y = p1.y.min(p2.y);
    let max_y = p1.y.max(p2.y);

    if max_x < obstacle.x - padding
        || min_x > obstacle.right() + padding
        || max_y < obstacle.y - padding
        || min_y > obstacle.bottom() + padding
    {
        return false;
    }

    obstacle.contains(p1.midpoint(p2), padding)
}

/// Whether any obstacle blocks the line between two points
pub fn line_of_sight_blocked(from: Vec2, to: Vec2, obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .any(|o| segment_rect_intersect(from, to, o, 0.0))
}

/// Axis-aligned outward normal of the face nearest to `point`
///
/// Picks the axis with the smaller penetration relative to the obstacle's
/// half extents.
pub fn surface_normal(obstacle: &Obstacle, point: Vec2) -> Vec2 {
    let offset = point - obstacle.center();
    let penetration_x = obstacle.width * 0.5 - offset.x.abs();
    let penetration_y = obstacle.height * 0.5 - offset.y.abs();

    if penetration_x < penetration_y {
        Vec2::new(offset.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, offset.y.signum())
    }
}

/// Result of spawn placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnPoint {
    /// Clear of every padded obstacle
    Clear(Vec2),
    /// Search exhausted; position was pushed out by collision resolution
    Fallback(Vec2),
}

impl SpawnPoint {
    pub fn position(&self) -> Vec2 {
        match *self {
            SpawnPoint::Clear(p) | SpawnPoint::Fallback(p) => p,
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, SpawnPoint::Clear(_))
    }
}

/// Find a spawn position for a circle of `radius`
///
/// Rejection-samples up to 100 random points against the radius-padded
/// obstacle boxes, then sweeps a coarse grid. Only when both fail does it fall
/// back to the last random sample, resolved against the obstacles.
pub fn find_spawn_point<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: MapBounds,
    obstacles: &[Obstacle],
    radius: f32,
) -> SpawnPoint {
    let is_clear = |p: Vec2| !obstacles.iter().any(|o| o.contains(p, radius));
    let max_x = (bounds.width - radius).max(radius + 1.0);
    let max_y = (bounds.height - radius).max(radius + 1.0);

    let mut last = bounds.center();
    for _ in 0..spawn::MAX_ATTEMPTS {
        last = Vec2::new(rng.gen_range(radius..max_x), rng.gen_range(radius..max_y));
        if is_clear(last) {
            return SpawnPoint::Clear(last);
        }
    }

    let mut y = radius;
    while y <= bounds.height - radius {
        let mut x = radius;
        while x <= bounds.width - radius {
            let candidate = Vec2::new(x, y);
            if is_clear(candidate) {
                return SpawnPoint::Clear(candidate);
            }
            x += spawn::SWEEP_STEP;
        }
        y += spawn::SWEEP_STEP;
    }

    warn!(
        "No clear spawn point after {} samples and grid sweep, falling back",
        spawn::MAX_ATTEMPTS
    );
    SpawnPoint::Fallback(resolve_collision(last, radius, bounds, obstacles))
}
