//! # tinyarena-core
//!
//! First-fit block allocator over a caller-supplied byte region.
//!
//! The host lends the arena a `&mut [u8]`; the arena threads an
//! address-ordered, doubly linked list of block headers through it and
//! never touches memory outside it. Free space is implicit: it is whatever
//! lies between consecutive headers, before the first one, or after the last
//! one. Allocation scans those gaps in address order and takes the first
//! that fits.
//!
//! Block handles are region offsets ([`BlockPtr`]), so the crate needs no
//! `unsafe`. Headers carry a canary that is checked before their links are
//! trusted; stale, foreign and corrupted handles are reported as errors
//! rather than followed.
//!
//! ```
//! use tinyarena_core::{Arena, ArenaConfig};
//!
//! let mut region = vec![0u8; 1024];
//! let mut arena = Arena::with_config(&mut region, ArenaConfig::default());
//! let block = arena.allocate(10).unwrap();
//! arena.data_mut(block).unwrap()[..5].copy_from_slice(b"hello");
//! let block = arena.resize(Some(block), 100).unwrap();
//! assert_eq!(&arena.data(block).unwrap()[..5], b"hello");
//! arena.release(Some(block)).unwrap();
//! assert_eq!(arena.stats().unwrap().allocated_blocks, 0);
//! ```

#![deny(unsafe_code)]

pub mod align;
pub mod arena;
pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod lifecycle;
pub mod lock;
pub mod metrics;
mod region;
pub mod stats;

pub use align::{HEADER_LEN, WORD_SIZE};
pub use arena::Arena;
pub use config::{ArenaConfig, CheckLevel};
pub use engine::PlacementSite;
pub use error::{ArenaError, CorruptionKind};
pub use header::{BlockHeader, BlockPtr};
pub use lifecycle::{ArenaLogLevel, ArenaLogRecord, LIFECYCLE_LOG_CAPACITY};
pub use lock::{ArenaLock, MutexLock, NoLock};
pub use metrics::{ArenaMetrics, MetricsSnapshot};
pub use stats::{ArenaStats, BlockInfo};
