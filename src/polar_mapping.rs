//! The coordinate tables that tie a disk to its unspun strip. Unspinning
//! and spinning read from the same [PolarMapping], so the two directions
//! cannot drift apart.
//!
//! Conventions, in pixel-index space (pixel `i` is centred on `i`):
//!
//! - The disk is `disk_size` pixels square, centred on
//!   `(disk_size - 1) / 2`, with radius `R = disk_size / 2`.
//! - Strip column `u` is the angle `u / angle_count * 2pi`, measured from
//!   the +x axis towards +y (clockwise on screen, since y runs down).
//! - Strip row `v` is the radius `v / radius_count * R`.

use std::{
    collections::HashMap,
    f32::consts::PI,
    sync::{Arc, Mutex, OnceLock},
};

/// The shape of a disk and of its unspun strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolarGeometry {
    /// Disk side length in pixels
    pub disk_size: u32,
    /// Strip width: angular steps per revolution
    pub angle_count: u32,
    /// Strip height: radial steps from centre to rim
    pub radius_count: u32,
}

impl PolarGeometry {
    /// Disk radius in pixels
    pub fn radius(&self) -> f32 {
        self.disk_size as f32 / 2.0
    }

    fn centre(&self) -> f32 {
        (self.disk_size as f32 - 1.0) / 2.0
    }
}

/// Precomputed forward and inverse lookups for one [PolarGeometry].
#[derive(Debug)]
pub struct PolarMapping {
    geometry: PolarGeometry,
    // strip (u, v) -> disk (x, y), row-major over the strip
    to_disk: Vec<(f32, f32)>,
    // disk (x, y) -> strip (u, v), row-major over the disk; None past the rim
    to_strip: Vec<Option<(f32, f32)>>,
}

/// Geometries kept by [PolarMapping::cached]. At the default geometry a
/// table pair is about 5 MB.
pub const CACHE_CAPACITY: usize = 8;

/// Tables by geometry, dropping the least recently used one when full.
/// Evicted tables stay alive for as long as a caller holds their [Arc].
#[derive(Debug)]
struct MappingCache {
    tables: HashMap<PolarGeometry, (Arc<PolarMapping>, u64)>,
    capacity: usize,
    clock: u64,
}

impl MappingCache {
    fn new(capacity: usize) -> Self {
        Self {
            tables: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    fn get_or_build(&mut self, geometry: PolarGeometry) -> Arc<PolarMapping> {
        self.clock += 1;
        if let Some((mapping, last_used)) = self.tables.get_mut(&geometry) {
            *last_used = self.clock;
            return Arc::clone(mapping);
        }

        if self.tables.len() >= self.capacity {
            let oldest = self
                .tables
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(geometry, _)| *geometry);
            if let Some(oldest) = oldest {
                self.tables.remove(&oldest);
            }
        }

        let mapping = Arc::new(PolarMapping::new(geometry));
        self.tables.insert(geometry, (Arc::clone(&mapping), self.clock));
        mapping
    }
}

fn cache() -> &'static Mutex<MappingCache> {
    static CACHE: OnceLock<Mutex<MappingCache>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(MappingCache::new(CACHE_CAPACITY)))
}

impl PolarMapping {
    /// Computes both tables for `geometry`.
    pub fn new(geometry: PolarGeometry) -> Self {
        let radius = geometry.radius();
        let centre = geometry.centre();
        let angles = geometry.angle_count as f32;
        let radii = geometry.radius_count as f32;

        let mut to_disk =
            Vec::with_capacity(geometry.angle_count as usize * geometry.radius_count as usize);
        for v in 0..geometry.radius_count {
            let r = v as f32 / radii * radius;
            for u in 0..geometry.angle_count {
                let theta = u as f32 / angles * 2.0 * PI;
                to_disk.push((centre + r * theta.cos(), centre + r * theta.sin()));
            }
        }

        let side = geometry.disk_size as usize;
        let mut to_strip = Vec::with_capacity(side * side);
        for y in 0..geometry.disk_size {
            for x in 0..geometry.disk_size {
                let dx = x as f32 - centre;
                let dy = y as f32 - centre;
                let r = dx.hypot(dy);
                if r > radius {
                    to_strip.push(None);
                    continue;
                }
                let theta = dy.atan2(dx).rem_euclid(2.0 * PI);
                to_strip.push(Some((theta / (2.0 * PI) * angles, r / radius * radii)));
            }
        }

        Self {
            geometry,
            to_disk,
            to_strip,
        }
    }

    /// Returns the shared mapping for `geometry`, building it on first use.
    /// Up to [CACHE_CAPACITY] geometries are kept.
    pub fn cached(geometry: PolarGeometry) -> Arc<Self> {
        let mut guard = match cache().lock() {
            Ok(guard) => guard,
            // the map only ever holds finished tables, so a poisoned lock is still usable
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get_or_build(geometry)
    }

    /// The geometry these tables were built for
    pub fn geometry(&self) -> PolarGeometry {
        self.geometry
    }

    /// Disk position (pixel-index space) that strip pixel (u, v) samples.
    pub fn disk_position(&self, u: u32, v: u32) -> (f32, f32) {
        self.to_disk[v as usize * self.geometry.angle_count as usize + u as usize]
    }

    /// Strip position that disk pixel (x, y) samples, or `None` when the
    /// pixel lies outside the disk.
    pub fn strip_position(&self, x: u32, y: u32) -> Option<(f32, f32)> {
        self.to_strip[y as usize * self.geometry.disk_size as usize + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> PolarGeometry {
        PolarGeometry {
            disk_size: 64,
            angle_count: 256,
            radius_count: 32,
        }
    }

    #[test]
    fn strip_origin_is_disk_centre() {
        let mapping = PolarMapping::new(geometry());
        let (x, y) = mapping.disk_position(17, 0);
        assert!((x - 31.5).abs() < 1e-4);
        assert!((y - 31.5).abs() < 1e-4);
    }

    #[test]
    fn quarter_turn_points_down() {
        let mapping = PolarMapping::new(geometry());
        // u = 64 of 256 is a quarter turn, v = 16 of 32 is half the radius
        let (x, y) = mapping.disk_position(64, 16);
        assert!((x - 31.5).abs() < 1e-3);
        assert!((y - 47.5).abs() < 1e-3);
    }

    #[test]
    fn corners_are_outside_the_disk() {
        let mapping = PolarMapping::new(geometry());
        assert_eq!(mapping.strip_position(0, 0), None);
        assert_eq!(mapping.strip_position(63, 63), None);
        assert!(mapping.strip_position(32, 32).is_some());
    }

    #[test]
    fn forward_then_inverse_lands_home() {
        let mapping = PolarMapping::new(geometry());
        for &(u, v) in &[(0u32, 8u32), (40, 20), (200, 31), (129, 3)] {
            let (x, y) = mapping.disk_position(u, v);
            let (xi, yi) = (x.round() as u32, y.round() as u32);
            let (su, sv) = mapping.strip_position(xi, yi).unwrap();
            // rounding to a disk pixel moves us less than a pixel away
            assert!((sv - v as f32).abs() < 1.0, "v {} came back as {}", v, sv);
            let du = (su - u as f32).abs();
            let du = du.min(256.0 - du);
            // one strip row per disk pixel here, so row v sits at radius v
            let r = v as f32;
            assert!(du <= 256.0 / (2.0 * PI) * (0.75 / r), "u {} came back as {}", u, su);
        }
    }

    #[test]
    fn cache_hands_out_one_table_per_geometry() {
        let a = PolarMapping::cached(geometry());
        let b = PolarMapping::cached(geometry());
        assert!(Arc::ptr_eq(&a, &b));
        let other = PolarMapping::cached(PolarGeometry {
            disk_size: 8,
            ..geometry()
        });
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn cache_forgets_the_least_recently_used_geometry() {
        let sized = |disk_size| PolarGeometry {
            disk_size,
            angle_count: 8,
            radius_count: 4,
        };
        let mut cache = MappingCache::new(2);
        let first = cache.get_or_build(sized(4));
        let second = cache.get_or_build(sized(5));
        // touching the first makes the second the oldest
        assert!(Arc::ptr_eq(&first, &cache.get_or_build(sized(4))));
        cache.get_or_build(sized(6));

        assert_eq!(cache.tables.len(), 2);
        assert!(cache.tables.contains_key(&sized(4)));
        assert!(!cache.tables.contains_key(&sized(5)));
        // evicted tables are still usable by whoever holds them
        assert_eq!(second.geometry(), sized(5));
        assert!(!Arc::ptr_eq(&second, &cache.get_or_build(sized(5))));
    }
}
