//! Output vertex/index buffers and the reusable per-build arena.

use strata_geom::Vec3;
use strata_voxel::ChunkSize;

/// CPU-side mesh for one chunk. Every quad contributes exactly four vertices
/// and six indices; vertex attribute arrays always share one length.
///
/// Positions are chunk-local cell coordinates; callers translate by the chunk
/// origin when placing the mesh in the world. `uvs` carries
/// `[u_extent, v_extent, atlas_x, atlas_y]` per vertex and `colors` carries
/// the ambient-occlusion factor in the alpha channel.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 4]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.positions.len() / 4
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Total face area in cell units, summed over quads. Merging changes the
    /// quad count but never this total.
    pub fn surface_area(&self) -> f32 {
        let mut area = 0.0;
        for q in 0..self.quad_count() {
            // Vertex 3 of each quad is the (+u,+v) corner, so its uv extent
            // is the quad's full width and height.
            let uv = self.uvs[q * 4 + 3];
            area += uv[0] * uv[1];
        }
        area
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
    }

    pub fn reserve(&mut self, vertices: usize, indices: usize) {
        self.positions.reserve(vertices);
        self.normals.reserve(vertices);
        self.uvs.reserve(vertices);
        self.colors.reserve(vertices);
        self.indices.reserve(indices);
    }

    /// Moves `other`'s geometry onto the end of `self`, rebasing indices.
    pub fn append(&mut self, other: &mut MeshBuffers) {
        let base = self.positions.len() as u32;
        self.positions.append(&mut other.positions);
        self.normals.append(&mut other.normals);
        self.uvs.append(&mut other.uvs);
        self.colors.append(&mut other.colors);
        self.indices.extend(other.indices.drain(..).map(|i| base + i));
    }

    /// Structural invariants: attribute arrays share one length, vertices come
    /// in quads, indices come six per quad and stay in range.
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        n % 4 == 0
            && self.normals.len() == n
            && self.uvs.len() == n
            && self.colors.len() == n
            && self.indices.len() == n / 4 * 6
            && self.indices.iter().all(|&i| (i as usize) < n)
    }
}

pub(crate) struct DirectionScratch {
    pub(crate) out: MeshBuffers,
    pub(crate) visited: Vec<bool>,
}

/// Reusable scratch for mesh builds: one output sink and visited mask per
/// face direction, so the six directions can run concurrently without
/// allocating per build.
pub struct MeshArena {
    pub(crate) scratch: [DirectionScratch; 6],
}

impl MeshArena {
    pub fn new() -> Self {
        Self {
            scratch: std::array::from_fn(|_| DirectionScratch {
                out: MeshBuffers::default(),
                visited: Vec::new(),
            }),
        }
    }

    /// Clears the sinks and pre-sizes them for a chunk of the given extent.
    /// The per-direction worst case is a checkerboard fill, where half the
    /// cells expose a face in any one direction.
    pub(crate) fn reset(&mut self, size: ChunkSize) {
        let quads = size.volume() / 2 + 1;
        for s in &mut self.scratch {
            s.out.clear();
            s.out.reserve(quads * 4, quads * 6);
            s.visited.clear();
        }
    }
}

impl Default for MeshArena {
    fn default() -> Self {
        Self::new()
    }
}
