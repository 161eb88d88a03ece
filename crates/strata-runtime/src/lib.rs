//! Background job queues and worker orchestration for chunk builds.
//!
//! A build job takes one chunk from voxels (generated or carried in) through
//! ambient occlusion to a mesh, entirely off the caller's thread. Two lanes
//! feed the workers: `urgent` for edit-driven rebuilds that must land next
//! frame, `bg` for streaming loads. Background workers drain the urgent lane
//! first so a deep streaming backlog cannot starve edits.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use log::trace;
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_lighting::{MissingNeighborPolicy, Neighborhood, compute_ao};
use strata_mesh::{MeshArena, MeshBuffers, MeshStrategy, build_chunk_mesh};
use strata_voxel::{ChunkKey, ChunkSize, VoxelField};
use strata_worldgen::DensityGenerator;

/// One chunk build request. `prev_field` carries the committed voxels on a
/// remesh (edits already applied); when absent the worker generates them.
/// `neighbors` is a snapshot taken at submit time; later neighbor loads do
/// not retroactively change this build.
pub struct BuildJob {
    pub key: ChunkKey,
    pub rev: u64,
    pub job_id: u64,
    pub prev_field: Option<Arc<VoxelField>>,
    pub neighbors: Neighborhood,
    pub strategy: MeshStrategy,
    pub policy: MissingNeighborPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    Urgent,
    Bg,
}

pub struct BuildOutput {
    pub key: ChunkKey,
    pub rev: u64,
    pub job_id: u64,
    pub kind: JobKind,
    /// Committed voxels, shared so the owner can keep them without copying.
    pub field: Arc<VoxelField>,
    /// Lit geometry; the ambient records themselves are baked into the vertex
    /// colors and not carried further.
    pub mesh: MeshBuffers,
    pub t_total_ms: u32,
    pub t_gen_ms: u32,
    pub t_light_ms: u32,
    pub t_mesh_ms: u32,
}

#[inline]
fn ms_since(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn process_build_job(
    job: BuildJob,
    kind: JobKind,
    generator: &DensityGenerator,
    size: ChunkSize,
    arena: &mut MeshArena,
    tx: &Sender<BuildOutput>,
) {
    let BuildJob {
        key,
        rev,
        job_id,
        prev_field,
        neighbors,
        strategy,
        policy,
    } = job;

    let t_start = Instant::now();
    let mut t_gen_ms = 0;
    let field = match prev_field {
        Some(f) => f,
        None => {
            let t0 = Instant::now();
            let mut f = VoxelField::new(key, size);
            generator.fill(&mut f);
            t_gen_ms = ms_since(t0);
            Arc::new(f)
        }
    };

    if field.is_all_air() {
        let _ = tx.send(BuildOutput {
            key,
            rev,
            job_id,
            kind,
            field,
            mesh: MeshBuffers::default(),
            t_total_ms: ms_since(t_start),
            t_gen_ms,
            t_light_ms: 0,
            t_mesh_ms: 0,
        });
        return;
    }

    let t0 = Instant::now();
    let light = compute_ao(&field, &neighbors, policy);
    let t_light_ms = ms_since(t0);

    let t0 = Instant::now();
    let mesh = build_chunk_mesh(&field, &light, strategy, arena);
    let t_mesh_ms = ms_since(t0);

    trace!(
        "built {:?} rev={} quads={} ({:?})",
        key,
        rev,
        mesh.quad_count(),
        kind
    );
    let _ = tx.send(BuildOutput {
        key,
        rev,
        job_id,
        kind,
        field,
        mesh,
        t_total_ms: ms_since(t_start),
        t_gen_ms,
        t_light_ms,
        t_mesh_ms,
    });
}

pub struct Runtime {
    job_tx_urgent: Sender<BuildJob>,
    job_tx_bg: Sender<BuildJob>,
    res_rx: Receiver<BuildOutput>,
    _urgent_pool: Arc<ThreadPool>,
    _bg_pool: Arc<ThreadPool>,
    q_urgent: Arc<AtomicUsize>,
    q_bg: Arc<AtomicUsize>,
    inflight_urgent: Arc<AtomicUsize>,
    inflight_bg: Arc<AtomicUsize>,
    pub w_urgent: usize,
    pub w_bg: usize,
}

impl Runtime {
    pub fn new(generator: Arc<DensityGenerator>, size: ChunkSize) -> Self {
        let (job_tx_urgent, job_rx_urgent) = unbounded::<BuildJob>();
        let (job_tx_bg, job_rx_bg) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<BuildOutput>();

        let worker_count = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let w_urgent = 1usize;
        let w_bg = worker_count.saturating_sub(w_urgent).max(1);

        let q_urgent = Arc::new(AtomicUsize::new(0));
        let q_bg = Arc::new(AtomicUsize::new(0));
        let inflight_urgent = Arc::new(AtomicUsize::new(0));
        let inflight_bg = Arc::new(AtomicUsize::new(0));

        let urgent_pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(w_urgent)
                .thread_name(|i| format!("strata-urgent-{i}"))
                .build()
                .unwrap_or_else(|e| panic!("urgent worker pool: {e}")),
        );
        for _ in 0..w_urgent {
            let rx = job_rx_urgent.clone();
            let tx = res_tx.clone();
            let generator = generator.clone();
            let queued = q_urgent.clone();
            let inflight = inflight_urgent.clone();
            urgent_pool.spawn(move || {
                let mut arena = MeshArena::new();
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_build_job(job, JobKind::Urgent, &generator, size, &mut arena, &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }

        // At least one background worker even on a single-core host; the
        // select loop keeps it serving the urgent lane too.
        let bg_pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(w_bg)
                .thread_name(|i| format!("strata-bg-{i}"))
                .build()
                .unwrap_or_else(|e| panic!("bg worker pool: {e}")),
        );
        for _ in 0..w_bg {
            let urgent_rx = job_rx_urgent.clone();
            let bg_rx = job_rx_bg.clone();
            let tx = res_tx.clone();
            let generator = generator.clone();
            let q_urgent = q_urgent.clone();
            let q_bg = q_bg.clone();
            let inflight_urgent = inflight_urgent.clone();
            let inflight_bg = inflight_bg.clone();
            bg_pool.spawn(move || {
                let mut arena = MeshArena::new();
                loop {
                    // Urgent work preempts the streaming backlog.
                    match urgent_rx.try_recv() {
                        Ok(job) => {
                            q_urgent.fetch_sub(1, Ordering::Relaxed);
                            inflight_urgent.fetch_add(1, Ordering::Relaxed);
                            process_build_job(
                                job,
                                JobKind::Urgent,
                                &generator,
                                size,
                                &mut arena,
                                &tx,
                            );
                            inflight_urgent.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }
                        Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }
                    select! {
                        recv(urgent_rx) -> res => match res {
                            Ok(job) => {
                                q_urgent.fetch_sub(1, Ordering::Relaxed);
                                inflight_urgent.fetch_add(1, Ordering::Relaxed);
                                process_build_job(job, JobKind::Urgent, &generator, size, &mut arena, &tx);
                                inflight_urgent.fetch_sub(1, Ordering::Relaxed);
                            }
                            Err(_) => break,
                        },
                        recv(bg_rx) -> res => match res {
                            Ok(job) => {
                                q_bg.fetch_sub(1, Ordering::Relaxed);
                                inflight_bg.fetch_add(1, Ordering::Relaxed);
                                process_build_job(job, JobKind::Bg, &generator, size, &mut arena, &tx);
                                inflight_bg.fetch_sub(1, Ordering::Relaxed);
                            }
                            Err(_) => break,
                        },
                    }
                }
            });
        }

        Self {
            job_tx_urgent,
            job_tx_bg,
            res_rx,
            _urgent_pool: urgent_pool,
            _bg_pool: bg_pool,
            q_urgent,
            q_bg,
            inflight_urgent,
            inflight_bg,
            w_urgent,
            w_bg,
        }
    }

    pub fn submit_urgent(&self, job: BuildJob) {
        self.q_urgent.fetch_add(1, Ordering::Relaxed);
        if self.job_tx_urgent.send(job).is_err() {
            self.q_urgent.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn submit_bg(&self, job: BuildJob) {
        self.q_bg.fetch_add(1, Ordering::Relaxed);
        if self.job_tx_bg.send(job).is_err() {
            self.q_bg.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Collects every finished build without blocking.
    pub fn drain_results(&self) -> Vec<BuildOutput> {
        self.res_rx.try_iter().collect()
    }

    /// `(queued, inflight)` per lane, for stats logging.
    pub fn queue_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.q_urgent.load(Ordering::Relaxed),
            self.inflight_urgent.load(Ordering::Relaxed),
            self.q_bg.load(Ordering::Relaxed),
            self.inflight_bg.load(Ordering::Relaxed),
        )
    }
}
