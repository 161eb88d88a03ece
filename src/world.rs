//! The streaming voxel world: loaded-chunk map, scheduling tick, edits, and
//! mesh hand-off to the renderer.

use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, trace};
use strata_geom::Vec3;
use strata_lighting::Neighborhood;
use strata_mesh::MeshBuffers;
use strata_runtime::{BuildJob, BuildOutput, Runtime};
use strata_voxel::{ChunkKey, ChunkSize, Voxel, VoxelType, world_to_grid};
use strata_worldgen::DensityGenerator;

use crate::chunk::{Chunk, ChunkState};
use crate::config::WorldConfig;
use crate::scheduler::ChunkScheduler;

/// Per-tick activity counters, for stats logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub loads_started: usize,
    pub rebuilds_started: usize,
    pub committed: usize,
    pub discarded: usize,
    pub evicted: usize,
    pub pending: usize,
}

pub struct VoxelWorld {
    config: WorldConfig,
    size: ChunkSize,
    scheduler: ChunkScheduler,
    runtime: Runtime,
    chunks: HashMap<ChunkKey, Chunk>,
    ready_meshes: Vec<(ChunkKey, MeshBuffers)>,
    next_job_id: u64,
}

impl VoxelWorld {
    pub fn new(config: WorldConfig) -> Self {
        let size = config.chunk_size();
        let generator = Arc::new(DensityGenerator::new(config.terrain.clone()));
        let runtime = Runtime::new(generator, size);
        let scheduler = ChunkScheduler::new(size, config.window_radius);
        Self {
            config,
            size,
            scheduler,
            runtime,
            chunks: HashMap::new(),
            ready_meshes: Vec::new(),
            next_job_id: 0,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> ChunkSize {
        self.size
    }

    #[inline]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn queue_counts(&self) -> (usize, usize, usize, usize) {
        self.runtime.queue_counts()
    }

    /// One scheduling tick: commit finished builds, re-evaluate the load
    /// window around the target, evict, start loads within the load budget,
    /// and dispatch dirty rebuilds within the mesh budget.
    pub fn tick(&mut self, target: Vec3) -> TickStats {
        let mut stats = TickStats::default();

        for out in self.runtime.drain_results() {
            self.apply_result(out, &mut stats);
        }

        self.scheduler
            .retarget(target, |key| self.chunks.contains_key(&key));

        let gone: Vec<ChunkKey> = self
            .scheduler
            .evictable(self.config.evict_margin, self.chunks.keys().copied())
            .collect();
        for key in gone {
            // In-flight builds for this chunk finish against their shared
            // field and are dropped on arrival.
            self.chunks.remove(&key);
            stats.evicted += 1;
        }

        let started = self
            .scheduler
            .process_pending(self.config.load_budget, |key| {
                self.chunks.contains_key(&key)
            });
        for key in started {
            self.chunks.insert(key, Chunk::generating(key));
            self.submit_build(key, false);
            stats.loads_started += 1;
        }

        stats.rebuilds_started = self.dispatch_rebuilds();
        stats.pending = self.scheduler.pending().len();
        trace!(
            "tick: loads={} rebuilds={} committed={} discarded={} evicted={} pending={}",
            stats.loads_started,
            stats.rebuilds_started,
            stats.committed,
            stats.discarded,
            stats.evicted,
            stats.pending
        );
        stats
    }

    /// Rebuilds for dirty chunks: edit-driven ones ride the urgent lane and
    /// ignore the budget, the rest take the bg lane up to `mesh_budget`.
    fn dispatch_rebuilds(&mut self) -> usize {
        let mut urgent: Vec<ChunkKey> = Vec::new();
        let mut background: Vec<ChunkKey> = Vec::new();
        for (key, chunk) in &self.chunks {
            if chunk.is_ready() && chunk.dirty && !chunk.building {
                if chunk.urgent {
                    urgent.push(*key);
                } else {
                    background.push(*key);
                }
            }
        }
        background.truncate(self.config.mesh_budget);
        let started = urgent.len() + background.len();
        for key in urgent {
            self.submit_build(key, true);
        }
        for key in background {
            self.submit_build(key, false);
        }
        started
    }

    fn submit_build(&mut self, key: ChunkKey, urgent: bool) {
        let neighbors = self.neighborhood(key);
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return;
        };
        // At most one build in flight per chunk; generating chunks are
        // created with the flag already raised.
        debug_assert!(chunk.state == ChunkState::Generating || !chunk.building);
        chunk.building = true;
        chunk.dirty = false;
        chunk.urgent = false;
        self.next_job_id += 1;
        chunk.job_id = self.next_job_id;
        let job = BuildJob {
            key,
            rev: chunk.rev,
            job_id: chunk.job_id,
            prev_field: chunk.field().cloned(),
            neighbors,
            strategy: self.config.strategy,
            policy: self.config.missing_neighbor,
        };
        if urgent {
            self.runtime.submit_urgent(job);
        } else {
            self.runtime.submit_bg(job);
        }
    }

    /// Snapshot of committed neighbor fields in the radius-1 cube.
    fn neighborhood(&self, key: ChunkKey) -> Neighborhood {
        let mut nb = Neighborhood::new(key, self.size, 1);
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    if let Some(field) = self
                        .chunks
                        .get(&key.offset(dx, dy, dz))
                        .and_then(|c| c.field())
                    {
                        nb.insert(field.clone());
                    }
                }
            }
        }
        nb
    }

    fn apply_result(&mut self, out: BuildOutput, stats: &mut TickStats) {
        let Some(chunk) = self.chunks.get_mut(&out.key) else {
            // Unloaded while building: join-then-discard.
            stats.discarded += 1;
            return;
        };
        if out.job_id != chunk.job_id {
            // A build from before this chunk was evicted and reloaded. Its
            // revision can collide with the fresh chunk's, so the job id is
            // the discard authority; the current build stays in flight.
            stats.discarded += 1;
            return;
        }
        if out.rev != chunk.rev {
            // Edited while building; the rebuild is already queued as dirty.
            chunk.building = false;
            stats.discarded += 1;
            return;
        }
        debug_assert!(chunk.building);
        chunk.building = false;
        let first_commit = chunk.state == ChunkState::Generating;
        chunk.commit_field(out.field);
        self.ready_meshes.push((out.key, out.mesh));
        stats.committed += 1;
        debug!(
            "chunk {:?} built: rev={} gen={}ms light={}ms mesh={}ms total={}ms",
            out.key, out.rev, out.t_gen_ms, out.t_light_ms, out.t_mesh_ms, out.t_total_ms
        );

        if first_commit {
            // Newly committed contents can change ambient occlusion along
            // every touching boundary, edges and corners included.
            for dy in -1..=1 {
                for dz in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 && dz == 0 {
                            continue;
                        }
                        if let Some(nb) = self.chunks.get_mut(&out.key.offset(dx, dy, dz)) {
                            nb.neighbor_changed();
                        }
                    }
                }
            }
        }
    }

    /// Meshes finished since the last call, ready for renderer upload. An
    /// empty buffer means the chunk's previous mesh should be cleared.
    pub fn take_ready_meshes(&mut self) -> Vec<(ChunkKey, MeshBuffers)> {
        std::mem::take(&mut self.ready_meshes)
    }

    /// Reads one world cell from committed data.
    pub fn get_voxel(&self, wx: i32, wy: i32, wz: i32) -> Option<Voxel> {
        let key = ChunkKey::containing(wx, wy, wz, self.size);
        self.chunks.get(&key).and_then(|c| c.get_world(wx, wy, wz))
    }

    /// True when the cell is air or not loaded.
    pub fn is_air(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.get_voxel(wx, wy, wz).is_none_or(|v| v.is_air())
    }

    /// Writes one world cell. Fails without side effects when the owning
    /// chunk is not loaded or has no committed data yet. A successful edit
    /// marks the chunk for an urgent rebuild and flags every loaded neighbor
    /// that shares the edited cell's boundary.
    pub fn set_voxel(&mut self, wx: i32, wy: i32, wz: i32, kind: VoxelType) -> bool {
        let key = ChunkKey::containing(wx, wy, wz, self.size);
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return false;
        };
        if !chunk.set_world(wx, wy, wz, Voxel::new(kind)) {
            return false;
        }
        let (lx, ly, lz) = world_to_grid(wx, wy, wz, self.size);
        let dxs = boundary_offsets(lx, self.size.x);
        let dys = boundary_offsets(ly, self.size.y);
        let dzs = boundary_offsets(lz, self.size.z);
        for &dy in &dys {
            for &dz in &dzs {
                for &dx in &dxs {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    if let Some(nb) = self.chunks.get_mut(&key.offset(dx, dy, dz)) {
                        nb.neighbor_changed();
                    }
                }
            }
        }
        true
    }
}

/// Neighbor offsets along one axis that share the boundary of a local cell:
/// `0` always, `-1`/`+1` only when the cell touches that face.
fn boundary_offsets(local: usize, extent: usize) -> Vec<i32> {
    let mut out = vec![0];
    if local == 0 {
        out.push(-1);
    }
    if local + 1 == extent {
        out.push(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use strata_voxel::VoxelField;

    fn small_config() -> WorldConfig {
        WorldConfig {
            chunk_size: [8, 8, 8],
            window_radius: [1, 1, 1],
            load_budget: 64,
            mesh_budget: 64,
            ..WorldConfig::default()
        }
    }

    /// Installs a chunk with committed (all-air) voxels, bypassing workers.
    fn install_ready(world: &mut VoxelWorld, key: ChunkKey) {
        let mut chunk = Chunk::generating(key);
        chunk.building = false;
        chunk.commit_field(Arc::new(VoxelField::new(key, world.size)));
        world.chunks.insert(key, chunk);
    }

    #[test]
    fn set_voxel_outside_loaded_range_fails() {
        let mut world = VoxelWorld::new(small_config());
        assert!(!world.set_voxel(100, 0, 0, VoxelType::Stone));
        assert_eq!(world.get_voxel(100, 0, 0), None);
        assert!(world.is_air(100, 0, 0));
        assert_eq!(world.loaded_count(), 0);
    }

    #[test]
    fn interior_edit_dirties_no_neighbors() {
        let mut world = VoxelWorld::new(small_config());
        for dx in -1..=1 {
            install_ready(&mut world, ChunkKey::new(dx, 0, 0));
        }
        assert!(world.set_voxel(4, 4, 4, VoxelType::Stone));
        assert!(world.chunks[&ChunkKey::new(0, 0, 0)].dirty);
        assert!(!world.chunks[&ChunkKey::new(-1, 0, 0)].dirty);
        assert!(!world.chunks[&ChunkKey::new(1, 0, 0)].dirty);
    }

    #[test]
    fn boundary_edit_dirties_exactly_the_sharing_neighbors() {
        let mut world = VoxelWorld::new(small_config());
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    install_ready(&mut world, ChunkKey::new(dx, dy, dz));
                }
            }
        }
        // Local (0, 4, 4): touches only the -x face.
        assert!(world.set_voxel(0, 4, 4, VoxelType::Stone));
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let dirty = world.chunks[&ChunkKey::new(dx, dy, dz)].dirty;
                    assert_eq!(dirty, (dx, dy, dz) == (-1, 0, 0), "offset {dx},{dy},{dz}");
                }
            }
        }
    }

    #[test]
    fn corner_edit_dirties_the_full_corner_neighborhood() {
        let mut world = VoxelWorld::new(small_config());
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    install_ready(&mut world, ChunkKey::new(dx, dy, dz));
                }
            }
        }
        // Local (0, 0, 0): shares the -x/-y/-z corner.
        assert!(world.set_voxel(0, 0, 0, VoxelType::Stone));
        let mut dirty = 0;
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy, dz) == (0, 0, 0) {
                        continue;
                    }
                    let is_dirty = world.chunks[&ChunkKey::new(dx, dy, dz)].dirty;
                    let shares = dx <= 0 && dy <= 0 && dz <= 0;
                    assert_eq!(is_dirty, shares, "offset {dx},{dy},{dz}");
                    dirty += is_dirty as usize;
                }
            }
        }
        assert_eq!(dirty, 7);
    }

    #[test]
    fn edits_on_generating_chunks_fail_cleanly() {
        let mut world = VoxelWorld::new(small_config());
        let key = ChunkKey::new(0, 0, 0);
        world.chunks.insert(key, Chunk::generating(key));
        assert!(!world.set_voxel(1, 1, 1, VoxelType::Dirt));
        assert_eq!(world.chunks[&key].rev, 1);
    }

    fn finished_build(key: ChunkKey, rev: u64, job_id: u64, field: Arc<VoxelField>) -> BuildOutput {
        BuildOutput {
            key,
            rev,
            job_id,
            kind: strata_runtime::JobKind::Bg,
            field,
            mesh: MeshBuffers::default(),
            t_total_ms: 0,
            t_gen_ms: 0,
            t_light_ms: 0,
            t_mesh_ms: 0,
        }
    }

    #[test]
    fn output_from_before_an_evict_reload_cycle_is_discarded() {
        // A chunk evicted with a build in flight and then reloaded restarts
        // at rev 1, the same revision the dead job carries. Arrival order:
        // the dead job's output lands first, then the reload's own.
        let mut world = VoxelWorld::new(small_config());
        let key = ChunkKey::new(0, 0, 0);
        let mut chunk = Chunk::generating(key);
        chunk.job_id = 7;
        world.chunks.insert(key, chunk);

        let field = Arc::new(VoxelField::new(key, world.size));
        let mut stats = TickStats::default();
        world.apply_result(finished_build(key, 1, 3, field.clone()), &mut stats);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.committed, 0);
        let c = &world.chunks[&key];
        assert!(!c.is_ready());
        assert!(c.building, "the reload's build must stay in flight");
        assert!(world.take_ready_meshes().is_empty());

        world.apply_result(finished_build(key, 1, 7, field), &mut stats);
        assert_eq!(stats.committed, 1);
        assert!(world.chunks[&key].is_ready());
        assert_eq!(world.take_ready_meshes().len(), 1);
    }

    #[test]
    fn streaming_loads_and_hands_off_meshes() {
        let mut world = VoxelWorld::new(small_config());
        // Park the target underground so the window holds solid chunks.
        let mut meshes = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while Instant::now() < deadline {
            world.tick(Vec3::new(4.0, -20.0, 4.0));
            meshes.extend(world.take_ready_meshes());
            if meshes.len() >= 27 && world.chunks.values().all(|c| c.is_ready()) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(world.loaded_count(), 27);
        assert!(meshes.len() >= 27);
        assert!(meshes.iter().all(|(_, m)| m.is_consistent()));
        // Deep chunks are fully buried rock.
        let key = ChunkKey::new(0, -3, 0);
        assert!(world.get_voxel(4, -20, 4).is_some());
        assert!(world.chunks[&key].is_ready());
    }

    #[test]
    fn moving_the_target_evicts_far_chunks() {
        let mut cfg = small_config();
        cfg.evict_margin = 0;
        let mut world = VoxelWorld::new(cfg);
        let deadline = Instant::now() + Duration::from_secs(30);
        while Instant::now() < deadline {
            world.tick(Vec3::new(4.0, -20.0, 4.0));
            if world.loaded_count() == 27 && world.chunks.values().all(|c| c.is_ready()) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(world.loaded_count(), 27);
        // Jump far along +x: every old chunk leaves the window.
        world.tick(Vec3::new(400.0, -20.0, 4.0));
        assert!(!world.chunks.contains_key(&ChunkKey::new(0, -3, 0)));
    }
}
