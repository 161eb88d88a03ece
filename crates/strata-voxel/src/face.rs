//! Cell face directions and their axis alignment.
//!
//! Each face direction fixes three grid axes: the outward normal axis plus an
//! in-plane "width" (u) and "height" (v) axis. Lighting corner indices and the
//! meshers' merge axes both follow this assignment, so the two stay aligned.

/// One of the six axis-aligned faces of a cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosY,
        Face::NegY,
        Face::PosX,
        Face::NegX,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a face index back into a `Face` value. `i` must be in `[0..6)`.
    #[inline]
    pub fn from_index(i: usize) -> Face {
        debug_assert!(i < 6, "face index out of range: {i}");
        match i {
            0 => Face::PosY,
            1 => Face::NegY,
            2 => Face::PosX,
            3 => Face::NegX,
            4 => Face::PosZ,
            _ => Face::NegZ,
        }
    }

    /// Integer grid delta `(dx,dy,dz)` when stepping out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
            Face::PosX => (1, 0, 0),
            Face::NegX => (-1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegZ => (0, 0, -1),
        }
    }

    /// Axis index (0=X,1=Y,2=Z) of the in-plane "width" direction.
    #[inline]
    pub fn u_axis(self) -> usize {
        match self {
            Face::PosY | Face::NegY => 0,
            Face::PosX | Face::NegX => 2,
            Face::PosZ | Face::NegZ => 0,
        }
    }

    /// Axis index of the in-plane "height" direction.
    #[inline]
    pub fn v_axis(self) -> usize {
        match self {
            Face::PosY | Face::NegY => 2,
            Face::PosX | Face::NegX => 1,
            Face::PosZ | Face::NegZ => 1,
        }
    }

    /// Axis index of the outward normal.
    #[inline]
    pub fn normal_axis(self) -> usize {
        match self {
            Face::PosY | Face::NegY => 1,
            Face::PosX | Face::NegX => 0,
            Face::PosZ | Face::NegZ => 2,
        }
    }

    /// Sign of the outward normal along [`Face::normal_axis`].
    #[inline]
    pub fn normal_sign(self) -> i32 {
        match self {
            Face::PosY | Face::PosX | Face::PosZ => 1,
            Face::NegY | Face::NegX | Face::NegZ => -1,
        }
    }
}

/// Adds a signed offset to a grid coordinate along an axis index.
#[inline]
pub fn offset_axis(p: (i32, i32, i32), axis: usize, delta: i32) -> (i32, i32, i32) {
    let (mut x, mut y, mut z) = p;
    match axis {
        0 => x += delta,
        1 => y += delta,
        _ => z += delta,
    }
    (x, y, z)
}
