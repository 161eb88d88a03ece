use criterion::{Criterion, black_box, criterion_group, criterion_main};
use strata_lighting::{MissingNeighborPolicy, Neighborhood, compute_ao};
use strata_mesh::{MeshArena, MeshStrategy, build_chunk_mesh};
use strata_voxel::{ChunkKey, ChunkSize, Voxel, VoxelField, VoxelType};

/// Rolling sine terrain with a dirt band under the surface, dense enough to
/// exercise merging without being a degenerate solid block.
fn terrain_chunk(size: ChunkSize) -> VoxelField {
    let mut field = VoxelField::new(ChunkKey::new(0, 0, 0), size);
    for z in 0..size.z {
        for x in 0..size.x {
            let h = (size.y as f32 * 0.5
                + (x as f32 * 0.31).sin() * 4.0
                + (z as f32 * 0.17).cos() * 3.0) as i32;
            for y in 0..size.y as i32 {
                let kind = match h - y {
                    d if d <= 0 => continue,
                    1 => VoxelType::Grass,
                    2..=4 => VoxelType::Dirt,
                    _ => VoxelType::Stone,
                };
                field.set(x as i32, y, z as i32, Voxel::new(kind));
            }
        }
    }
    field
}

fn bench_meshing(c: &mut Criterion) {
    let size = ChunkSize::cubic(32);
    let field = terrain_chunk(size);
    let neighbors = Neighborhood::new(field.key, size, 1);
    let light = compute_ao(&field, &neighbors, MissingNeighborPolicy::Opaque);

    let mut group = c.benchmark_group("mesh_chunk_32");
    for (name, strategy) in [
        ("culling", MeshStrategy::Culling),
        ("greedy_height", MeshStrategy::GreedyOnlyHeight),
        ("greedy", MeshStrategy::Greedy),
    ] {
        let mut arena = MeshArena::new();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mesh = build_chunk_mesh(
                    black_box(&field),
                    black_box(&light),
                    strategy,
                    &mut arena,
                );
                black_box(mesh.quad_count())
            })
        });
    }
    group.finish();

    c.bench_function("ao_chunk_32", |b| {
        b.iter(|| {
            let l = compute_ao(black_box(&field), &neighbors, MissingNeighborPolicy::Opaque);
            black_box(l.records().len())
        })
    });
}

criterion_group!(benches, bench_meshing);
criterion_main!(benches);
