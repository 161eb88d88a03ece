//! Per-voxel, per-face ambient occlusion from local voxel occupancy.
#![forbid(unsafe_code)]

use std::sync::Arc;

use rayon::prelude::*;
use serde::Deserialize;
use strata_voxel::{ChunkKey, ChunkSize, Face, VoxelField, offset_axis, to_3d, world_to_grid};


/// Ambient light record for one voxel: 6 faces x 4 corners in `[0,1]`.
/// Corner index bits select the in-plane side: bit0 = +u half, bit1 = +v half.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelLight {
    pub ambient: [f32; 24],
}

impl VoxelLight {
    pub const ZERO: VoxelLight = VoxelLight { ambient: [0.0; 24] };

    #[inline]
    pub fn corner(&self, face: Face, corner: usize) -> f32 {
        self.ambient[face.index() * 4 + corner]
    }

    #[inline]
    pub fn set_corner(&mut self, face: Face, corner: usize, value: f32) {
        self.ambient[face.index() * 4 + corner] = value;
    }

    /// Exact equality of one face's four corner values; the greedy meshers
    /// refuse to merge cells whose faces differ.
    #[inline]
    pub fn face_equal(&self, other: &VoxelLight, face: Face) -> bool {
        let base = face.index() * 4;
        self.ambient[base..base + 4] == other.ambient[base..base + 4]
    }
}

/// Ambient records for every voxel of one chunk, indexed like the field.
#[derive(Clone, Debug)]
pub struct LightField {
    pub size: ChunkSize,
    data: Vec<VoxelLight>,
}

impl LightField {
    #[inline]
    pub fn get(&self, index: usize) -> &VoxelLight {
        &self.data[index]
    }

    #[inline]
    pub fn records(&self) -> &[VoxelLight] {
        &self.data
    }
}

/// How occlusion sampling treats a cell in a chunk that is not loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingNeighborPolicy {
    /// Unloaded neighbors occlude. Borders start dark and stay stable when
    /// the neighbor streams in solid.
    #[default]
    Opaque,
    /// Unloaded neighbors do not occlude; borders may darken once the
    /// neighbor loads.
    Transparent,
}

/// Occupancy of a sampled cell as seen through the neighbor map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupancy {
    Solid,
    Empty,
    /// The owning chunk is not loaded.
    Unknown,
}

/// Committed neighbor fields around a center chunk, one slot per key in the
/// `(2r+1)^3` cube. A missing neighbor is a valid permanent state.
pub struct Neighborhood {
    center: ChunkKey,
    size: ChunkSize,
    radius: i32,
    fields: Vec<Option<Arc<VoxelField>>>,
}

impl Neighborhood {
    pub fn new(center: ChunkKey, size: ChunkSize, radius: i32) -> Self {
        let side = (2 * radius + 1) as usize;
        Self {
            center,
            size,
            radius,
            fields: vec![None; side * side * side],
        }
    }

    #[inline]
    pub fn radius(&self) -> i32 {
        self.radius
    }

    #[inline]
    fn slot(&self, key: ChunkKey) -> Option<usize> {
        let dx = key.x - self.center.x;
        let dy = key.y - self.center.y;
        let dz = key.z - self.center.z;
        let r = self.radius;
        if dx.abs() > r || dy.abs() > r || dz.abs() > r {
            return None;
        }
        let side = (2 * r + 1) as usize;
        let ix = (dx + r) as usize;
        let iy = (dy + r) as usize;
        let iz = (dz + r) as usize;
        Some((iy * side + iz) * side + ix)
    }

    /// Registers a committed field. Fields whose key lies outside the radius
    /// are ignored.
    pub fn insert(&mut self, field: Arc<VoxelField>) {
        debug_assert_eq!(field.size, self.size);
        if let Some(i) = self.slot(field.key) {
            self.fields[i] = Some(field);
        }
    }

    /// The committed field for a chunk key, if loaded and within the radius.
    pub fn field(&self, key: ChunkKey) -> Option<&Arc<VoxelField>> {
        self.slot(key).and_then(|i| self.fields[i].as_ref())
    }

    /// Resolves one world cell through the neighbor map.
    pub fn occupancy_at(&self, wx: i32, wy: i32, wz: i32) -> Occupancy {
        let key = ChunkKey::containing(wx, wy, wz, self.size);
        match self.field(key) {
            Some(f) => {
                let (gx, gy, gz) = world_to_grid(wx, wy, wz, self.size);
                if f.get_local(gx, gy, gz).is_solid() {
                    Occupancy::Solid
                } else {
                    Occupancy::Empty
                }
            }
            None => Occupancy::Unknown,
        }
    }
}

/// Occupancy of a grid coordinate that may fall outside the local field,
/// resolved through the neighbor map with the configured policy.
#[inline]
fn solid_at(
    field: &VoxelField,
    neighbors: &Neighborhood,
    policy: MissingNeighborPolicy,
    gx: i32,
    gy: i32,
    gz: i32,
) -> bool {
    if field.size.contains(gx, gy, gz) {
        return field
            .get_local(gx as usize, gy as usize, gz as usize)
            .is_solid();
    }
    let (bx, by, bz) = field.key.origin(field.size);
    match neighbors.occupancy_at(bx + gx, by + gy, bz + gz) {
        Occupancy::Solid => true,
        Occupancy::Empty => false,
        Occupancy::Unknown => policy == MissingNeighborPolicy::Opaque,
    }
}

/// Ambient value for one face corner from its three boundary samples:
/// two edge-adjacent cells and the diagonal cell, one step out along the
/// face normal. Both sides occluded forces zero.
#[inline]
fn corner_ambient(side1: bool, side2: bool, corner: bool) -> f32 {
    if side1 && side2 {
        return 0.0;
    }
    let occluded = side1 as u32 + side2 as u32 + corner as u32;
    (3 - occluded) as f32 / 3.0
}

/// Computes the ambient-occlusion record for every solid voxel of `field`.
/// Air voxels keep an all-zero record. Per-voxel work is independent and runs
/// on the rayon pool of the caller.
pub fn compute_ao(
    field: &VoxelField,
    neighbors: &Neighborhood,
    policy: MissingNeighborPolicy,
) -> LightField {
    let size = field.size;
    let mut data = vec![VoxelLight::ZERO; size.volume()];
    data.par_iter_mut().enumerate().for_each(|(index, out)| {
        let (x, y, z) = to_3d(index, size);
        if field.get_local(x, y, z).is_air() {
            return;
        }
        let p = (x as i32, y as i32, z as i32);
        let mut light = VoxelLight::ZERO;
        for face in Face::ALL {
            // Sampling plane one step out of the face.
            let base = offset_axis(p, face.normal_axis(), face.normal_sign());
            for corner in 0..4 {
                let su = if corner & 1 != 0 { 1 } else { -1 };
                let sv = if corner & 2 != 0 { 1 } else { -1 };
                let s1 = offset_axis(base, face.u_axis(), su);
                let s2 = offset_axis(base, face.v_axis(), sv);
                let sc = offset_axis(s1, face.v_axis(), sv);
                let side1 = solid_at(field, neighbors, policy, s1.0, s1.1, s1.2);
                let side2 = solid_at(field, neighbors, policy, s2.0, s2.1, s2.2);
                let diag = solid_at(field, neighbors, policy, sc.0, sc.1, sc.2);
                light.set_corner(face, corner, corner_ambient(side1, side2, diag));
            }
        }
        *out = light;
    });
    LightField { size, data }
}
