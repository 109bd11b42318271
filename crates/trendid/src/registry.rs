use crate::{
    error::{Error, Result},
    mutex::{Mutex, lock},
};
use std::{
    collections::HashSet,
    sync::{Arc, LazyLock},
};

static GLOBAL: LazyLock<Arc<InstanceRegistry>> = LazyLock::new(|| Arc::new(InstanceRegistry::new()));

/// The set of node identities bound to live generators.
///
/// Registering a node twice fails, which stops two generators in the same
/// process from silently producing colliding ids. There is no way to
/// unregister: a generator is expected to live until the process exits.
///
/// Generators register with [`InstanceRegistry::global`] unless given another
/// registry, which is mostly useful for isolating tests.
///
/// # Example
///
/// ```
/// use trendid::{Error, InstanceRegistry};
///
/// let registry = InstanceRegistry::new();
/// registry.register(7).unwrap();
/// assert_eq!(registry.register(7), Err(Error::DuplicateInstance { node: 7 }));
/// ```
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    nodes: Mutex<HashSet<u64>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Records `node` as in use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateInstance`] if `node` is already registered.
    pub fn register(&self, node: u64) -> Result<()> {
        if !lock(&self.nodes)?.insert(node) {
            return Err(Error::DuplicateInstance { node });
        }
        Ok(())
    }

    /// Returns `true` if `node` is registered.
    ///
    /// # Errors
    ///
    /// May return an error if the lock is poisoned.
    pub fn contains(&self, node: u64) -> Result<bool> {
        Ok(lock(&self.nodes)?.contains(&node))
    }

    /// Number of registered nodes.
    ///
    /// # Errors
    ///
    /// May return an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.nodes)?.len())
    }

    /// # Errors
    ///
    /// May return an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(lock(&self.nodes)?.is_empty())
    }
}
