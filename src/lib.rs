//! Streaming voxel terrain: chunk scheduling around a moving target, noise
//! terrain generation, ambient-occlusion lighting, and greedy surface
//! extraction, with builds running on background workers.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod config;
pub mod scheduler;
pub mod world;

pub use chunk::{Chunk, ChunkState};
pub use config::WorldConfig;
pub use scheduler::{ChunkScheduler, PendingQueue};
pub use world::{TickStats, VoxelWorld};
