//! Handle list configuration.

use crate::error::MemoryError;
use crate::usage::MemoryUsage;

/// Configuration for a [`HandleList`](crate::HandleList).
///
/// Validated by [`HandleList::with_config`](crate::HandleList::with_config).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandleListConfig {
    /// Resources (and slots) reserved up front.
    ///
    /// Default: 32. Must be non-zero. Both arenas grow past it on demand.
    pub initial_capacity: usize,

    /// Usage category charged for the resource arena.
    ///
    /// Default: [`MemoryUsage::Any`].
    pub resource_usage: MemoryUsage,

    /// Usage category charged for the slot arena.
    ///
    /// Default: [`MemoryUsage::HandleList`].
    pub slot_usage: MemoryUsage,
}

impl HandleListConfig {
    /// Default initial capacity.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 32;

    /// Config with the given initial capacity and default usages.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Charge resources to `usage`.
    pub fn with_resource_usage(mut self, usage: MemoryUsage) -> Self {
        self.resource_usage = usage;
        self
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.initial_capacity == 0 {
            return Err(MemoryError::InvalidConfig {
                reason: "initial_capacity must be non-zero".into(),
            });
        }
        if u32::try_from(self.initial_capacity).is_err() {
            return Err(MemoryError::InvalidConfig {
                reason: format!(
                    "initial_capacity {} exceeds the u32 slot index range",
                    self.initial_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for HandleListConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            resource_usage: MemoryUsage::Any,
            slot_usage: MemoryUsage::HandleList,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HandleListConfig::default();
        assert_eq!(config.initial_capacity, 32);
        assert_eq!(config.slot_usage, MemoryUsage::HandleList);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = HandleListConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, MemoryError::InvalidConfig { .. }));
    }

    #[test]
    fn builder_sets_resource_usage() {
        let config = HandleListConfig::new(8).with_resource_usage(MemoryUsage::Renderer);
        assert_eq!(config.initial_capacity, 8);
        assert_eq!(config.resource_usage, MemoryUsage::Renderer);
    }
}
