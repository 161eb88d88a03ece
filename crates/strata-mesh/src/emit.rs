//! Quad emission: corner placement, atlas addressing, and AO-driven winding.
//!
//! Corner indices within a quad follow the lighting convention: bit0 selects
//! the +u half of the face plane, bit1 the +v half. Each face direction keeps
//! a fixed winding pattern chosen so triangles wind counter-clockwise seen
//! from outside; the diagonal switches to the brighter corner pair when the
//! ambient values call for it.

use strata_geom::Vec3;
use strata_voxel::{Face, VoxelType};

use crate::buffers::MeshBuffers;

/// Square texture atlas dimension in tiles. Tile index is
/// `kind.atlas_base() + face.index()`.
pub const ATLAS_DIM: u32 = 8;

// Index patterns over quad corners, two per handedness class. For PosY, PosX
// and NegZ the u cross v axis points against the outward normal; NegY, NegX
// and PosZ are the mirror class.
const WINDING: [[u32; 6]; 2] = [[0, 2, 3, 0, 3, 1], [0, 3, 2, 0, 1, 3]];
const WINDING_FLIPPED: [[u32; 6]; 2] = [[1, 0, 2, 1, 2, 3], [1, 2, 0, 1, 3, 2]];

#[inline]
fn winding_class(face: Face) -> usize {
    match face {
        Face::PosY | Face::PosX | Face::NegZ => 0,
        Face::NegY | Face::NegX | Face::PosZ => 1,
    }
}

/// The six-entry corner index pattern for a face, with the quad diagonal
/// flipped onto corners 1-2 when requested.
#[inline]
pub(crate) fn winding(face: Face, flip: bool) -> &'static [u32; 6] {
    let class = winding_class(face);
    if flip {
        &WINDING_FLIPPED[class]
    } else {
        &WINDING[class]
    }
}

/// Appends one face quad of `width x height` cells anchored at the grid cell
/// `cell`. `ao[c]` is the ambient factor at corner `c`; the diagonal flips
/// when the 0-3 corner pair is darker than the 1-2 pair, so interpolation
/// follows the brighter diagonal.
pub(crate) fn emit_quad(
    out: &mut MeshBuffers,
    face: Face,
    cell: (usize, usize, usize),
    width: usize,
    height: usize,
    kind: VoxelType,
    ao: [f32; 4],
) {
    let base = out.positions.len() as u32;
    let mut origin = Vec3::new(cell.0 as f32, cell.1 as f32, cell.2 as f32);
    if face.normal_sign() > 0 {
        *origin.axis_mut(face.normal_axis()) += 1.0;
    }
    let d = face.delta();
    let normal = Vec3::new(d.0 as f32, d.1 as f32, d.2 as f32);
    let tile = kind.atlas_base() + face.index() as u32;
    let atlas_x = (tile % ATLAS_DIM) as f32;
    let atlas_y = (tile / ATLAS_DIM) as f32;

    for c in 0..4 {
        let cu = if c & 1 != 0 { width as f32 } else { 0.0 };
        let cv = if c & 2 != 0 { height as f32 } else { 0.0 };
        let mut p = origin;
        *p.axis_mut(face.u_axis()) += cu;
        *p.axis_mut(face.v_axis()) += cv;
        out.positions.push(p);
        out.normals.push(normal);
        out.uvs.push([cu, cv, atlas_x, atlas_y]);
        out.colors.push([1.0, 1.0, 1.0, ao[c]]);
    }

    let flip = ao[0] + ao[3] < ao[1] + ao[2];
    out.indices
        .extend(winding(face, flip).iter().map(|&i| base + i));
}
