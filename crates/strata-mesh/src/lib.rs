//! CPU chunk meshing: exposed-face extraction with optional greedy merging.
//!
//! Three strategies share one face pass. `Culling` emits a unit quad per
//! exposed face, `GreedyOnlyHeight` merges runs along the face's v axis, and
//! `Greedy` merges maximal rectangles over both in-plane axes. Merging never
//! crosses a voxel-type change or an ambient-occlusion difference, so every
//! strategy produces the same lit surface with different quad counts.
#![forbid(unsafe_code)]

use rayon::prelude::*;
use serde::Deserialize;
use strata_lighting::{LightField, VoxelLight};
use strata_voxel::{Face, VoxelField};

mod buffers;
mod emit;

pub use buffers::{MeshArena, MeshBuffers};
pub use emit::ATLAS_DIM;

use buffers::DirectionScratch;
use emit::emit_quad;

/// How exposed faces are combined into quads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshStrategy {
    /// One quad per exposed face.
    Culling,
    /// Merge equal faces along the face's v axis only.
    GreedyOnlyHeight,
    /// Merge equal faces into maximal rectangles over both in-plane axes.
    #[default]
    Greedy,
}

impl MeshStrategy {
    #[inline]
    fn merge_axes(self) -> (bool, bool) {
        match self {
            MeshStrategy::Culling => (false, false),
            MeshStrategy::GreedyOnlyHeight => (false, true),
            MeshStrategy::Greedy => (true, true),
        }
    }
}

/// Grid cell for slice coordinates of one face direction: `depth` along the
/// normal axis, `u`/`v` along the in-plane axes.
#[inline]
fn cell_at(face: Face, depth: usize, u: usize, v: usize) -> (usize, usize, usize) {
    let mut c = [0usize; 3];
    c[face.normal_axis()] = depth;
    c[face.u_axis()] = u;
    c[face.v_axis()] = v;
    (c[0], c[1], c[2])
}

/// A face is exposed when the cell one step out is air or beyond the chunk.
/// Cross-chunk face culling is deliberately not attempted; border faces stay
/// and the renderer depth-tests them away.
#[inline]
fn exposed(field: &VoxelField, x: usize, y: usize, z: usize, face: Face) -> bool {
    let d = face.delta();
    match field.get(x as i32 + d.0, y as i32 + d.1, z as i32 + d.2) {
        Some(v) => v.is_air(),
        None => true,
    }
}

fn mesh_direction(
    field: &VoxelField,
    light: &LightField,
    face: Face,
    merge_u: bool,
    merge_v: bool,
    scratch: &mut DirectionScratch,
) {
    let size = field.size;
    let su = size.axis(face.u_axis());
    let sv = size.axis(face.v_axis());
    let sn = size.axis(face.normal_axis());
    scratch.visited.resize(su * sv, false);

    for depth in 0..sn {
        scratch.visited.fill(false);
        for v in 0..sv {
            for u in 0..su {
                if scratch.visited[v * su + u] {
                    continue;
                }
                let (x, y, z) = cell_at(face, depth, u, v);
                let voxel = field.get_local(x, y, z);
                if voxel.is_air() || !exposed(field, x, y, z, face) {
                    continue;
                }
                let seed_light: &VoxelLight = light.get(field.idx(x, y, z));

                let mergeable = |uu: usize, vv: usize| {
                    let (cx, cy, cz) = cell_at(face, depth, uu, vv);
                    let c = field.get_local(cx, cy, cz);
                    c.kind == voxel.kind
                        && exposed(field, cx, cy, cz, face)
                        && light.get(field.idx(cx, cy, cz)).face_equal(seed_light, face)
                };

                let mut height = 1;
                if merge_v {
                    while v + height < sv
                        && !scratch.visited[(v + height) * su + u]
                        && mergeable(u, v + height)
                    {
                        height += 1;
                    }
                }
                let mut width = 1;
                if merge_u {
                    'grow: while u + width < su {
                        for vv in v..v + height {
                            if scratch.visited[vv * su + (u + width)] || !mergeable(u + width, vv)
                            {
                                break 'grow;
                            }
                        }
                        width += 1;
                    }
                }

                for vv in v..v + height {
                    for uu in u..u + width {
                        scratch.visited[vv * su + uu] = true;
                    }
                }

                let ao = [
                    seed_light.corner(face, 0),
                    seed_light.corner(face, 1),
                    seed_light.corner(face, 2),
                    seed_light.corner(face, 3),
                ];
                emit_quad(&mut scratch.out, face, (x, y, z), width, height, voxel.kind, ao);
            }
        }
    }
}

/// Builds the chunk mesh for `field` under the given strategy. The six face
/// directions run concurrently on the caller's rayon pool, each into its own
/// arena sink, and concatenate in fixed face order so output is deterministic.
pub fn build_chunk_mesh(
    field: &VoxelField,
    light: &LightField,
    strategy: MeshStrategy,
    arena: &mut MeshArena,
) -> MeshBuffers {
    debug_assert_eq!(light.size, field.size);
    arena.reset(field.size);
    if field.is_all_air() {
        return MeshBuffers::default();
    }
    let (merge_u, merge_v) = strategy.merge_axes();
    arena
        .scratch
        .as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, scratch)| {
            mesh_direction(field, light, Face::from_index(i), merge_u, merge_v, scratch);
        });

    let verts: usize = arena.scratch.iter().map(|s| s.out.vertex_count()).sum();
    let mut out = MeshBuffers::default();
    out.reserve(verts, verts / 4 * 6);
    for s in &mut arena.scratch {
        out.append(&mut s.out);
    }
    debug_assert!(out.is_consistent());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_lighting::{MissingNeighborPolicy, Neighborhood, compute_ao};
    use strata_voxel::{ChunkKey, ChunkSize, Voxel, VoxelType};

    fn lit(field: &VoxelField) -> LightField {
        let nb = Neighborhood::new(field.key, field.size, 1);
        compute_ao(field, &nb, MissingNeighborPolicy::Transparent)
    }

    fn build(field: &VoxelField, strategy: MeshStrategy) -> MeshBuffers {
        let light = lit(field);
        let mut arena = MeshArena::new();
        build_chunk_mesh(field, &light, strategy, &mut arena)
    }

    #[test]
    fn single_voxel_emits_six_quads() {
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(4));
        field.set(2, 2, 2, Voxel::new(VoxelType::Stone));
        for strategy in [
            MeshStrategy::Culling,
            MeshStrategy::GreedyOnlyHeight,
            MeshStrategy::Greedy,
        ] {
            let mesh = build(&field, strategy);
            assert_eq!(mesh.quad_count(), 6);
            assert_eq!(mesh.vertex_count(), 24);
            assert_eq!(mesh.indices.len(), 36);
            assert_eq!(mesh.surface_area(), 6.0);
        }
    }

    #[test]
    fn empty_chunk_emits_nothing() {
        let field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(4));
        let mesh = build(&field, MeshStrategy::Greedy);
        assert!(mesh.is_empty());
        assert!(mesh.is_consistent());
    }

    #[test]
    fn buried_voxels_emit_no_interior_faces() {
        // 2x2x2 solid block: only the 24 outer faces survive culling.
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(4));
        for x in 1..3 {
            for y in 1..3 {
                for z in 1..3 {
                    field.set(x, y, z, Voxel::new(VoxelType::Stone));
                }
            }
        }
        let mesh = build(&field, MeshStrategy::Culling);
        assert_eq!(mesh.quad_count(), 24);
        assert_eq!(mesh.surface_area(), 24.0);
    }

    #[test]
    fn row_top_faces_merge_along_height() {
        // Four voxels in a row along Z. For the +Y face the v axis is Z, so
        // both greedy strategies collapse the four top faces into one quad.
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(6));
        for z in 1..5 {
            field.set(2, 2, z, Voxel::new(VoxelType::Grass));
        }
        let culled = build(&field, MeshStrategy::Culling);
        let tall = build(&field, MeshStrategy::GreedyOnlyHeight);
        let greedy = build(&field, MeshStrategy::Greedy);

        let top_quads = |m: &MeshBuffers| {
            (0..m.quad_count())
                .filter(|&q| m.normals[q * 4].y > 0.5)
                .count()
        };
        assert_eq!(top_quads(&culled), 4);
        assert_eq!(top_quads(&tall), 1);
        assert_eq!(top_quads(&greedy), 1);
        // The merged top quad spans height 4 along v.
        assert_eq!(culled.surface_area(), tall.surface_area());
        assert_eq!(culled.surface_area(), greedy.surface_area());
    }

    #[test]
    fn greedy_merges_both_axes_on_a_slab() {
        // A 3x3 one-voxel-thick slab: full greedy gives one quad per slab
        // face; height-only merging still needs one quad per column.
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(5));
        for x in 1..4 {
            for z in 1..4 {
                field.set(x, 2, z, Voxel::new(VoxelType::Stone));
            }
        }
        let greedy = build(&field, MeshStrategy::Greedy);
        let tall = build(&field, MeshStrategy::GreedyOnlyHeight);
        let top = |m: &MeshBuffers| {
            (0..m.quad_count())
                .filter(|&q| m.normals[q * 4].y > 0.5)
                .count()
        };
        assert_eq!(top(&greedy), 1);
        assert_eq!(top(&tall), 3);
        assert_eq!(greedy.surface_area(), tall.surface_area());
    }

    #[test]
    fn type_changes_split_merged_quads() {
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(6));
        for z in 1..5 {
            let kind = if z < 3 { VoxelType::Grass } else { VoxelType::Dirt };
            field.set(2, 2, z, Voxel::new(kind));
        }
        let greedy = build(&field, MeshStrategy::Greedy);
        let top = (0..greedy.quad_count())
            .filter(|&q| greedy.normals[q * 4].y > 0.5)
            .count();
        assert_eq!(top, 2);
    }

    #[test]
    fn ao_differences_split_merged_quads() {
        // A row of grass with an occluder hovering next to one end: that
        // voxel's top-face ambient record differs, so greedy keeps it apart.
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), ChunkSize::cubic(8));
        for z in 1..6 {
            field.set(2, 2, z, Voxel::new(VoxelType::Grass));
        }
        field.set(3, 3, 1, Voxel::new(VoxelType::Stone));
        let greedy = build(&field, MeshStrategy::Greedy);
        let top: Vec<usize> = (0..greedy.quad_count())
            .filter(|&q| {
                greedy.normals[q * 4].y > 0.5 && (greedy.positions[q * 4].y - 3.0).abs() < 1e-6
            })
            .collect();
        assert!(top.len() >= 2, "occluded end must not merge with the run");
    }
}
