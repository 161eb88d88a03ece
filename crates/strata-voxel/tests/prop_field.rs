use proptest::prelude::*;
use strata_voxel::{ChunkKey, ChunkSize, Voxel, VoxelField, VoxelType, to_1d, to_3d, world_to_grid};

fn dim() -> impl Strategy<Value = usize> {
    1usize..=8
}

fn small_i32() -> impl Strategy<Value = i32> {
    -1_000i32..=1_000
}

proptest! {
    // to_1d(to_3d(i)) == i for every index in the volume
    #[test]
    fn index_round_trip(sx in dim(), sy in dim(), sz in dim()) {
        let size = ChunkSize::new(sx, sy, sz);
        for i in 0..size.volume() {
            let (x, y, z) = to_3d(i, size);
            prop_assert!(x < sx && y < sy && z < sz);
            prop_assert_eq!(to_1d(x, y, z, size), i);
        }
    }

    // every in-bounds coordinate maps to a unique in-range index
    #[test]
    fn indices_are_a_bijection(sx in dim(), sy in dim(), sz in dim()) {
        let size = ChunkSize::new(sx, sy, sz);
        let mut seen = vec![false; size.volume()];
        for y in 0..sy { for z in 0..sz { for x in 0..sx {
            let i = to_1d(x, y, z, size);
            prop_assert!(i < seen.len());
            prop_assert!(!seen[i]);
            seen[i] = true;
        }}}
        prop_assert!(seen.into_iter().all(|b| b));
    }

    // chunk-local round-trip: origin(containing(p)) + grid(p) reconstructs p
    #[test]
    fn world_round_trip(wx in small_i32(), wy in small_i32(), wz in small_i32(),
                        sx in dim(), sy in dim(), sz in dim()) {
        let size = ChunkSize::new(sx, sy, sz);
        let key = ChunkKey::containing(wx, wy, wz, size);
        let (ox, oy, oz) = key.origin(size);
        let (gx, gy, gz) = world_to_grid(wx, wy, wz, size);
        prop_assert_eq!(ox + gx as i32, wx);
        prop_assert_eq!(oy + gy as i32, wy);
        prop_assert_eq!(oz + gz as i32, wz);
        prop_assert!(gx < sx && gy < sy && gz < sz);
    }

    // get_world agrees with contains_world and local reads
    #[test]
    fn get_world_matches_local(kx in -64i32..64, ky in -64i32..64, kz in -64i32..64,
                               sx in dim(), sy in dim(), sz in dim()) {
        let size = ChunkSize::new(sx, sy, sz);
        let key = ChunkKey::new(kx, ky, kz);
        let mut field = VoxelField::new(key, size);
        for i in 0..size.volume() {
            let kind = match i % 4 {
                0 => VoxelType::Air,
                1 => VoxelType::Grass,
                2 => VoxelType::Dirt,
                _ => VoxelType::Stone,
            };
            field.voxels_mut()[i] = Voxel::new(kind);
        }
        let (ox, oy, oz) = key.origin(size);
        let samples = [
            (ox, oy, oz),
            (ox + sx as i32 - 1, oy + sy as i32 - 1, oz + sz as i32 - 1),
            (ox - 1, oy, oz),
            (ox + sx as i32, oy, oz),
            (ox, oy - 1, oz),
            (ox, oy + sy as i32, oz),
            (ox, oy, oz + sz as i32),
        ];
        for (wx, wy, wz) in samples {
            let inside = field.contains_world(wx, wy, wz);
            match field.get_world(wx, wy, wz) {
                None => prop_assert!(!inside),
                Some(v) => {
                    prop_assert!(inside);
                    let lx = (wx - ox) as usize;
                    let ly = (wy - oy) as usize;
                    let lz = (wz - oz) as usize;
                    prop_assert_eq!(v, field.get_local(lx, ly, lz));
                }
            }
        }
    }

    // from_voxels normalizes the backing length to the volume
    #[test]
    fn from_voxels_resizes(sx in dim(), sy in dim(), sz in dim()) {
        let size = ChunkSize::new(sx, sy, sz);
        let expect = size.volume();
        let short = VoxelField::from_voxels(ChunkKey::default(), size, vec![Voxel::AIR; expect.saturating_sub(1)]);
        prop_assert_eq!(short.voxels().len(), expect);
        let exact = VoxelField::from_voxels(ChunkKey::default(), size, vec![Voxel::AIR; expect]);
        prop_assert_eq!(exact.voxels().len(), expect);
    }
}
