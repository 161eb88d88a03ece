//! World configuration: values only, loaded from TOML with full defaults.

use std::error::Error;
use std::path::Path;

use serde::Deserialize;
use strata_lighting::MissingNeighborPolicy;
use strata_mesh::MeshStrategy;
use strata_voxel::ChunkSize;
use strata_worldgen::GenParams;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    /// Chunk extent per axis, in cells.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: [usize; 3],
    /// Load window half-extent per axis, in chunks. Zero degenerates to
    /// tracking the single chunk under the target.
    #[serde(default = "default_window_radius")]
    pub window_radius: [i32; 3],
    /// Chunks started per tick.
    #[serde(default = "default_load_budget")]
    pub load_budget: usize,
    /// Dirty-chunk rebuilds dispatched per tick (urgent edits bypass this).
    #[serde(default = "default_mesh_budget")]
    pub mesh_budget: usize,
    /// Extra chunk distance past the window before a loaded chunk unloads,
    /// so hovering on a chunk boundary does not thrash loads.
    #[serde(default = "default_evict_margin")]
    pub evict_margin: i32,
    #[serde(default)]
    pub strategy: MeshStrategy,
    #[serde(default)]
    pub missing_neighbor: MissingNeighborPolicy,
    #[serde(default)]
    pub terrain: GenParams,
}

fn default_chunk_size() -> [usize; 3] {
    [32, 32, 32]
}

fn default_window_radius() -> [i32; 3] {
    [4, 1, 4]
}

fn default_load_budget() -> usize {
    8
}

fn default_mesh_budget() -> usize {
    8
}

fn default_evict_margin() -> i32 {
    1
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            window_radius: default_window_radius(),
            load_budget: default_load_budget(),
            mesh_budget: default_mesh_budget(),
            evict_margin: default_evict_margin(),
            strategy: MeshStrategy::default(),
            missing_neighbor: MissingNeighborPolicy::default(),
            terrain: GenParams::default(),
        }
    }
}

impl WorldConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let txt = std::fs::read_to_string(path)?;
        let cfg: WorldConfig = toml::from_str(&txt)?;
        Ok(cfg)
    }

    #[inline]
    pub fn chunk_size(&self) -> ChunkSize {
        ChunkSize::new(self.chunk_size[0], self.chunk_size[1], self.chunk_size[2])
    }
}
