//! Memory primitives for the Hit engine.
//!
//! The renderer, module and asset layers sit on top of four hand-built
//! structures instead of the standard containers:
//!
//! ```text
//! Arena                      growable byte buffer, stack discipline, pow2 growth
//! └── TypedArena<T, D>       typed push/pop over an Arena
//!     └── HandleList<T, D>   generational slot map
//!         ├── TypedArena<T, D>        live resources, densely packed
//!         └── SlotTable               FastTypedArena<Slot> + occupied chain
//! FreelistCore               offset/size sub-allocator with coalescing
//! ```
//!
//! # Construction disciplines
//!
//! - **[`Constructed`]:** any `T`. Elements are dropped when popped, cleared
//!   or when the arena dies, and cloning clones element by element.
//! - **[`Trivial`]:** `T: bytemuck::Pod`. Popping only moves the cursor and
//!   cloning copies the raw bytes. [`FastTypedArena`] and [`FastHandleList`]
//!   are the `Trivial` aliases.
//!
//! # Threading
//!
//! None of these structures are thread-safe. Each instance is owned by
//! exactly one component (a buffer, a pipeline instance table, a
//! serializer). Only the usage registry in [`usage`] is shared.
//!
//! `unsafe` is confined to `raw` and [`typed`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod freelist;
pub mod handle;
pub mod handle_list;
mod raw;
mod slot;
pub mod typed;
pub mod usage;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use config::HandleListConfig;
pub use error::MemoryError;
pub use freelist::FreelistCore;
pub use handle::Handle;
pub use handle_list::{FastHandleList, HandleList};
pub use typed::{Constructed, Discipline, FastTypedArena, Trivial, TypedArena};
pub use usage::{AllocationId, AllocationRecord, MemoryUsage, UsageReport};
