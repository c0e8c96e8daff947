//! Usage-tagged allocation tracking.
//!
//! Every arena buffer is registered here under the [`MemoryUsage`] it was
//! created with. The registry answers "how many bytes does the renderer
//! hold right now" and, at shutdown, "what was never released".
//!
//! The registry is the one piece of shared state in the crate and sits
//! behind a mutex. Arenas touch it only on create, growth and release,
//! never on push/pop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Category an allocation is charged to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryUsage {
    /// Uncategorised.
    #[default]
    Any,
    /// Slot bookkeeping of a handle list.
    HandleList,
    /// Renderer-owned data (command queues, pipeline instances).
    Renderer,
    /// Window and platform layer.
    Platform,
    /// Device buffer shadows and sub-allocation tables.
    Buffer,
    /// Serialization byte streams.
    Serializer,
}

impl MemoryUsage {
    /// Every usage category, in declaration order.
    pub const ALL: [MemoryUsage; 6] = [
        MemoryUsage::Any,
        MemoryUsage::HandleList,
        MemoryUsage::Renderer,
        MemoryUsage::Platform,
        MemoryUsage::Buffer,
        MemoryUsage::Serializer,
    ];

    /// Lowercase name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::HandleList => "handle_list",
            Self::Renderer => "renderer",
            Self::Platform => "platform",
            Self::Buffer => "buffer",
            Self::Serializer => "serializer",
        }
    }
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counter for unique [`AllocationId`] assignment.
static ALLOCATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a registered allocation.
///
/// Never reused, so a released id cannot alias a later allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(u64);

impl AllocationId {
    fn next() -> Self {
        Self(ALLOCATION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the registry knows about one live allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Category the bytes are charged to.
    pub usage: MemoryUsage,
    /// Current size in bytes.
    pub size: usize,
}

/// Live allocations keyed by id.
static REGISTRY: LazyLock<Mutex<IndexMap<AllocationId, AllocationRecord>>> =
    LazyLock::new(|| Mutex::new(IndexMap::new()));

pub(crate) fn register(usage: MemoryUsage, size: usize) -> AllocationId {
    let id = AllocationId::next();
    REGISTRY.lock().insert(id, AllocationRecord { usage, size });
    tracing::trace!(%id, %usage, size, "allocation registered");
    id
}

pub(crate) fn record_resize(id: AllocationId, size: usize) {
    if let Some(record) = REGISTRY.lock().get_mut(&id) {
        record.size = size;
    }
}

pub(crate) fn release(id: AllocationId) {
    // Report order is not significant.
    if REGISTRY.lock().swap_remove(&id).is_none() {
        tracing::warn!(%id, "releasing an allocation that is not registered");
    }
}

/// Look up a live allocation.
pub fn allocation(id: AllocationId) -> Option<AllocationRecord> {
    REGISTRY.lock().get(&id).copied()
}

/// Snapshot of every live allocation.
pub fn live_allocations() -> Vec<(AllocationId, AllocationRecord)> {
    REGISTRY
        .lock()
        .iter()
        .map(|(&id, &record)| (id, record))
        .collect()
}

/// Bytes and allocation counts per usage category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsageReport {
    by_usage: IndexMap<MemoryUsage, (usize, usize)>,
}

impl UsageReport {
    /// Bytes currently charged to `usage`.
    pub fn bytes(&self, usage: MemoryUsage) -> usize {
        self.by_usage.get(&usage).map_or(0, |&(bytes, _)| bytes)
    }

    /// Number of live allocations charged to `usage`.
    pub fn allocations(&self, usage: MemoryUsage) -> usize {
        self.by_usage.get(&usage).map_or(0, |&(_, count)| count)
    }

    /// Bytes across every category.
    pub fn total_bytes(&self) -> usize {
        self.by_usage.values().map(|&(bytes, _)| bytes).sum()
    }

    /// Live allocations across every category.
    pub fn total_allocations(&self) -> usize {
        self.by_usage.values().map(|&(_, count)| count).sum()
    }
}

/// Aggregate the registry by usage category.
pub fn usage_report() -> UsageReport {
    let mut by_usage: IndexMap<MemoryUsage, (usize, usize)> =
        MemoryUsage::ALL.iter().map(|&u| (u, (0, 0))).collect();
    for record in REGISTRY.lock().values() {
        let entry = by_usage.entry(record.usage).or_default();
        entry.0 += record.size;
        entry.1 += 1;
    }
    UsageReport { by_usage }
}

/// Log every live allocation at `warn` and return how many there are.
///
/// Meant for engine shutdown, after every owner has been dropped.
pub fn report_leaks() -> usize {
    let live = live_allocations();
    for (id, record) in &live {
        tracing::warn!(%id, usage = %record.usage, size = record.size, "memory leak");
    }
    live.len()
}
