//! Voxel value types, chunk coordinates, and the per-chunk voxel field.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

mod face;

pub use face::{Face, offset_axis};

/// Material of a single grid cell. `Air` is the only transparent kind; every
/// other kind is solid for meshing and occlusion purposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoxelType {
    #[default]
    Air,
    Grass,
    Dirt,
    Stone,
}

impl VoxelType {
    /// Stable index used for texture-atlas addressing (`kind*6 + face`).
    #[inline]
    pub fn atlas_base(self) -> u32 {
        self as u32 * 6
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Voxel {
    pub kind: VoxelType,
}

impl Voxel {
    pub const AIR: Voxel = Voxel {
        kind: VoxelType::Air,
    };

    #[inline]
    pub const fn new(kind: VoxelType) -> Self {
        Self { kind }
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self.kind != VoxelType::Air
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.kind == VoxelType::Air
    }
}

/// Per-axis chunk extent in cells. Axes may differ; strides always follow the
/// configured extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSize {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl ChunkSize {
    #[inline]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn cubic(n: usize) -> Self {
        Self { x: n, y: n, z: n }
    }

    #[inline]
    pub fn volume(self) -> usize {
        self.x * self.y * self.z
    }

    /// Extent along axis index 0=X, 1=Y, 2=Z.
    #[inline]
    pub fn axis(self, axis: usize) -> usize {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn contains(self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.x
            && (y as usize) < self.y
            && (z as usize) < self.z
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize::cubic(32)
    }
}

/// Maps a grid coordinate to its flat index. Row layout matches the field
/// storage: x fastest, then z, then y.
#[inline]
pub fn to_1d(x: usize, y: usize, z: usize, size: ChunkSize) -> usize {
    (y * size.z + z) * size.x + x
}

/// Inverse of [`to_1d`].
#[inline]
pub fn to_3d(index: usize, size: ChunkSize) -> (usize, usize, usize) {
    let x = index % size.x;
    let z = (index / size.x) % size.z;
    let y = index / (size.x * size.z);
    (x, y, z)
}

/// Integer chunk-space coordinate. World↔chunk mapping is
/// `key = floor(world / chunk_size)` per axis, inverse `origin = key * size`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkKey) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Chunk containing the given world cell (floor division per axis).
    #[inline]
    pub fn containing(wx: i32, wy: i32, wz: i32, size: ChunkSize) -> Self {
        Self {
            x: wx.div_euclid(size.x as i32),
            y: wy.div_euclid(size.y as i32),
            z: wz.div_euclid(size.z as i32),
        }
    }

    /// World cell at this chunk's minimum corner.
    #[inline]
    pub fn origin(self, size: ChunkSize) -> (i32, i32, i32) {
        (
            self.x * size.x as i32,
            self.y * size.y as i32,
            self.z * size.z as i32,
        )
    }
}

impl From<(i32, i32, i32)> for ChunkKey {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Chunk-local grid coordinate of a world cell (always in-bounds of `size`).
#[inline]
pub fn world_to_grid(wx: i32, wy: i32, wz: i32, size: ChunkSize) -> (usize, usize, usize) {
    (
        wx.rem_euclid(size.x as i32) as usize,
        wy.rem_euclid(size.y as i32) as usize,
        wz.rem_euclid(size.z as i32) as usize,
    )
}

/// Flat array of one chunk's voxels. Length always equals `size.volume()`.
#[derive(Clone, Debug)]
pub struct VoxelField {
    pub key: ChunkKey,
    pub size: ChunkSize,
    voxels: Vec<Voxel>,
}

impl VoxelField {
    pub fn new(key: ChunkKey, size: ChunkSize) -> Self {
        Self {
            key,
            size,
            voxels: vec![Voxel::AIR; size.volume()],
        }
    }

    /// Wraps an existing voxel array, resizing to the exact volume if the
    /// caller supplied the wrong length.
    pub fn from_voxels(key: ChunkKey, size: ChunkSize, voxels: Vec<Voxel>) -> Self {
        let mut v = voxels;
        let expect = size.volume();
        if v.len() != expect {
            v.resize(expect, Voxel::AIR);
        }
        Self { key, size, voxels: v }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        to_1d(x, y, z, self.size)
    }

    /// Unchecked local read; callers guarantee in-bounds coordinates.
    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels[self.idx(x, y, z)]
    }

    /// Bounds-checked local read.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<Voxel> {
        if !self.size.contains(x, y, z) {
            return None;
        }
        Some(self.get_local(x as usize, y as usize, z as usize))
    }

    /// Bounds-checked local write. Returns false when out of range.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, v: Voxel) -> bool {
        if !self.size.contains(x, y, z) {
            return false;
        }
        let i = self.idx(x as usize, y as usize, z as usize);
        self.voxels[i] = v;
        true
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        let (bx, by, bz) = self.key.origin(self.size);
        wx >= bx
            && wx < bx + self.size.x as i32
            && wy >= by
            && wy < by + self.size.y as i32
            && wz >= bz
            && wz < bz + self.size.z as i32
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Voxel> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let (bx, by, bz) = self.key.origin(self.size);
        Some(self.get_local(
            (wx - bx) as usize,
            (wy - by) as usize,
            (wz - bz) as usize,
        ))
    }

    #[inline]
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    #[inline]
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    #[inline]
    pub fn has_solid(&self) -> bool {
        self.voxels.iter().any(|v| v.is_solid())
    }

    #[inline]
    pub fn is_all_air(&self) -> bool {
        !self.has_solid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coordinates() {
        let size = ChunkSize::cubic(16);
        assert_eq!(ChunkKey::containing(-1, 0, 15, size), ChunkKey::new(-1, 0, 0));
        assert_eq!(ChunkKey::containing(-16, 0, 0, size), ChunkKey::new(-1, 0, 0));
        assert_eq!(ChunkKey::containing(-17, 0, 0, size), ChunkKey::new(-2, 0, 0));
        assert_eq!(ChunkKey::containing(16, 31, -32, size), ChunkKey::new(1, 1, -2));
    }

    #[test]
    fn origin_inverts_containing() {
        let size = ChunkSize::new(8, 4, 16);
        let key = ChunkKey::new(-3, 2, 7);
        let (ox, oy, oz) = key.origin(size);
        assert_eq!(ChunkKey::containing(ox, oy, oz, size), key);
        assert_eq!(
            ChunkKey::containing(ox + size.x as i32 - 1, oy, oz + size.z as i32 - 1, size),
            key
        );
    }

    #[test]
    fn set_out_of_range_is_rejected() {
        let size = ChunkSize::cubic(4);
        let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), size);
        assert!(!field.set(4, 0, 0, Voxel::new(VoxelType::Stone)));
        assert!(!field.set(0, -1, 0, Voxel::new(VoxelType::Stone)));
        assert!(field.is_all_air());
        assert!(field.set(3, 3, 3, Voxel::new(VoxelType::Stone)));
        assert!(field.has_solid());
    }
}
