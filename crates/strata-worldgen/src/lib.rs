//! Deterministic terrain density and voxel-type selection.
//!
//! Density is a pure function of world coordinates; adjacent chunks sample the
//! same columns and therefore always agree at their seams.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::Path;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rayon::prelude::*;
use serde::Deserialize;
use strata_voxel::{Voxel, VoxelField, VoxelType};

/// One coherent-noise layer of the height field.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct OctaveParams {
    pub frequency: f32,
    pub amplitude: f32,
    pub octaves: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenParams {
    #[serde(default)]
    pub seed: i32,
    #[serde(default = "default_octaves")]
    pub octaves: Vec<OctaveParams>,
    /// Dirt band thickness below the grass layer varies per column within
    /// this inclusive range.
    #[serde(default = "default_dirt_depth_min")]
    pub dirt_depth_min: i32,
    #[serde(default = "default_dirt_depth_max")]
    pub dirt_depth_max: i32,
}

fn default_octaves() -> Vec<OctaveParams> {
    vec![
        OctaveParams {
            frequency: 0.003,
            amplitude: 25.0,
            octaves: 1,
        },
        OctaveParams {
            frequency: 0.03,
            amplitude: 5.0,
            octaves: 3,
        },
        OctaveParams {
            frequency: 0.09,
            amplitude: 1.0,
            octaves: 5,
        },
    ]
}

fn default_dirt_depth_min() -> i32 {
    2
}

fn default_dirt_depth_max() -> i32 {
    5
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: default_octaves(),
            dirt_depth_min: default_dirt_depth_min(),
            dirt_depth_max: default_dirt_depth_max(),
        }
    }
}

/// Loads generator parameters from a TOML file.
pub fn load_params_from_path(path: &Path) -> Result<GenParams, Box<dyn Error>> {
    let txt = fs::read_to_string(path)?;
    let params: GenParams = toml::from_str(&txt)?;
    Ok(params)
}

/// Pure world-coordinate density sampler and voxel classifier.
pub struct DensityGenerator {
    params: GenParams,
    layers: Vec<(FastNoiseLite, f32)>,
}

impl DensityGenerator {
    pub fn new(params: GenParams) -> Self {
        let layers = params
            .octaves
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let mut n = FastNoiseLite::with_seed(params.seed.wrapping_add(i as i32));
                n.set_noise_type(Some(NoiseType::OpenSimplex2));
                n.set_fractal_type(Some(FractalType::FBm));
                n.set_fractal_octaves(Some(o.octaves as i32));
                n.set_frequency(Some(o.frequency));
                (n, o.amplitude)
            })
            .collect();
        Self { params, layers }
    }

    /// Height-field sample for a column: the sum of all noise layers.
    #[inline]
    pub fn surface_level(&self, wx: i32, wz: i32) -> f32 {
        self.layers
            .iter()
            .map(|(n, amp)| n.get_noise_2d(wx as f32, wz as f32) * amp)
            .sum()
    }

    /// Signed density; a cell is solid when density is positive.
    #[inline]
    pub fn density(&self, wx: i32, wy: i32, wz: i32) -> f32 {
        self.surface_level(wx, wz) - wy as f32
    }

    /// Per-column dirt band thickness, derived from a seeded hash so it is
    /// deterministic without a separate RNG stream.
    #[inline]
    fn dirt_depth(&self, wx: i32, wz: i32) -> i32 {
        let span = (self.params.dirt_depth_max - self.params.dirt_depth_min).max(0) + 1;
        let h = column_hash(self.params.seed, wx, wz);
        self.params.dirt_depth_min + (h % span as u32) as i32
    }

    /// Classifies one world cell. The topmost solid cell of a column is
    /// grass, a hashed-thickness band below is dirt, everything deeper stone.
    pub fn voxel_at(&self, wx: i32, wy: i32, wz: i32) -> Voxel {
        let surface = self.surface_level(wx, wz);
        if (wy as f32) >= surface {
            return Voxel::AIR;
        }
        // Depth 0 is the topmost solid cell (surface falls in [wy, wy+1)).
        let depth = (surface.floor() as i32 - wy).max(0);
        let kind = if depth == 0 {
            VoxelType::Grass
        } else if depth <= self.dirt_depth(wx, wz) {
            VoxelType::Dirt
        } else {
            VoxelType::Stone
        };
        Voxel::new(kind)
    }

    /// Fills a chunk's field in parallel, one x-row per task. Every cell is
    /// sampled at its world coordinate only.
    pub fn fill(&self, field: &mut VoxelField) {
        let size = field.size;
        let (bx, by, bz) = field.key.origin(size);
        field
            .voxels_mut()
            .par_chunks_mut(size.x)
            .enumerate()
            .for_each(|(row, cells)| {
                let y = row / size.z;
                let z = row % size.z;
                let wy = by + y as i32;
                let wz = bz + z as i32;
                for (x, cell) in cells.iter_mut().enumerate() {
                    *cell = self.voxel_at(bx + x as i32, wy, wz);
                }
            });
    }
}

/// Small mixing hash over a column's world coordinates and the world seed.
#[inline]
fn column_hash(seed: i32, wx: i32, wz: i32) -> u32 {
    let mut h = (seed as u32).wrapping_mul(0x9e37_79b9);
    h ^= (wx as u32).wrapping_mul(0x85eb_ca6b);
    h = h.rotate_left(13);
    h ^= (wz as u32).wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h.wrapping_mul(0x7feb_352d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_voxel::{ChunkKey, ChunkSize};

    #[test]
    fn deep_cells_are_stone_and_sky_is_air() {
        let g = DensityGenerator::new(GenParams::default());
        assert!(g.voxel_at(0, -500, 0).kind == VoxelType::Stone);
        assert!(g.voxel_at(0, 500, 0).is_air());
    }

    #[test]
    fn column_is_air_above_surface_and_solid_below() {
        let g = DensityGenerator::new(GenParams::default());
        let surface = g.surface_level(10, -7).floor() as i32;
        assert!(g.voxel_at(10, surface + 1, -7).is_air());
        assert!(g.voxel_at(10, surface - 1, -7).is_solid());
    }

    #[test]
    fn fill_matches_point_samples() {
        let g = DensityGenerator::new(GenParams::default());
        let size = ChunkSize::new(4, 8, 4);
        let key = ChunkKey::new(-1, -1, 2);
        let mut field = VoxelField::new(key, size);
        g.fill(&mut field);
        let (bx, by, bz) = key.origin(size);
        for y in 0..size.y {
            for z in 0..size.z {
                for x in 0..size.x {
                    let expect = g.voxel_at(bx + x as i32, by + y as i32, bz + z as i32);
                    assert_eq!(field.get_local(x, y, z), expect);
                }
            }
        }
    }
}
