use crate::{
    BitLayout, Generator, GeneratorBuilder, IdInt, InstanceRegistry, RandSource, ReseedStrategy,
    Result, SystemClock, ThreadRandom, TimeSource,
    generator::DEFAULT_CLOCK_REGRESSION_TOLERANCE,
    mutex::{Mutex, lock},
};
use std::{collections::HashMap, sync::Arc};

/// Tells an [`IdService`] which instance number to generate ids for.
///
/// The number is asked for on every call, so it may change over time, for
/// example when an external coordinator renews a lease. Closures returning
/// `Result<u64>` implement this trait.
pub trait InstanceSupplier: Send + Sync {
    /// # Errors
    ///
    /// Whatever the supplier reports; the service passes it on unchanged.
    fn instance(&self) -> Result<u64>;
}

impl<F> InstanceSupplier for F
where
    F: Fn() -> Result<u64> + Send + Sync,
{
    fn instance(&self) -> Result<u64> {
        self()
    }
}

/// A supplier that always returns the same instance number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedInstance(pub u64);

impl InstanceSupplier for FixedInstance {
    fn instance(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Generates ids for whatever instance number its supplier currently hands
/// out.
///
/// One [`Generator`] is built per distinct instance number, on first use, and
/// kept for the life of the service. The instance number becomes the node
/// identity, so it must fit the layout's node field.
///
/// # Example
///
/// ```
/// use trendid::{BitLayout, FixedInstance, IdService, InstanceRegistry};
/// use std::sync::Arc;
///
/// let service = IdService::new(BitLayout::WORKER, FixedInstance(12))
///     .registry(Arc::new(InstanceRegistry::new()));
///
/// let id: u64 = service.next_id().unwrap();
/// assert_eq!(BitLayout::WORKER.decode(id).node, 12);
/// ```
pub struct IdService<S, T = u64, C = SystemClock, R = ThreadRandom>
where
    T: IdInt,
{
    supplier: S,
    layout: BitLayout,
    reseed: ReseedStrategy,
    tolerance: u64,
    registry: Arc<InstanceRegistry>,
    clock: C,
    rand: R,
    generators: Mutex<HashMap<u64, Arc<Generator<T, C, R>>>>,
}

impl<S, T> IdService<S, T>
where
    S: InstanceSupplier,
    T: IdInt,
{
    pub fn new(layout: BitLayout, supplier: S) -> Self {
        Self {
            supplier,
            layout,
            reseed: ReseedStrategy::default(),
            tolerance: DEFAULT_CLOCK_REGRESSION_TOLERANCE,
            registry: InstanceRegistry::global(),
            clock: SystemClock,
            rand: ThreadRandom,
            generators: Mutex::new(HashMap::new()),
        }
    }
}

impl<S, T, C, R> IdService<S, T, C, R>
where
    S: InstanceSupplier,
    T: IdInt,
    C: TimeSource + Clone,
    R: RandSource + Clone,
{
    pub fn reseed(mut self, reseed: ReseedStrategy) -> Self {
        self.reseed = reseed;
        self
    }

    pub fn clock_regression_tolerance(mut self, ticks: u64) -> Self {
        self.tolerance = ticks;
        self
    }

    pub fn registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Clock handed to every generator the service builds.
    pub fn clock<C2>(self, clock: C2) -> IdService<S, T, C2, R>
    where
        C2: TimeSource + Clone,
    {
        IdService {
            supplier: self.supplier,
            layout: self.layout,
            reseed: self.reseed,
            tolerance: self.tolerance,
            registry: self.registry,
            clock,
            rand: self.rand,
            generators: Mutex::new(HashMap::new()),
        }
    }

    pub fn rand<R2>(self, rand: R2) -> IdService<S, T, C, R2>
    where
        R2: RandSource + Clone,
    {
        IdService {
            supplier: self.supplier,
            layout: self.layout,
            reseed: self.reseed,
            tolerance: self.tolerance,
            registry: self.registry,
            clock: self.clock,
            rand,
            generators: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the next id of the current instance.
    ///
    /// # Errors
    ///
    /// - errors of the supplier;
    /// - build errors for a new instance number, most notably
    ///   [`Error::ValueOutOfRange`] and [`Error::DuplicateInstance`];
    /// - errors of [`Generator::next_id`].
    ///
    /// [`Error::ValueOutOfRange`]: crate::Error::ValueOutOfRange
    /// [`Error::DuplicateInstance`]: crate::Error::DuplicateInstance
    pub fn next_id(&self) -> Result<T> {
        let instance = self.supplier.instance()?;
        self.generator(instance)?.next_id()
    }

    /// The generator for `instance`, built on first use.
    ///
    /// # Errors
    ///
    /// Build errors, see [`GeneratorBuilder::build`].
    pub fn generator(&self, instance: u64) -> Result<Arc<Generator<T, C, R>>> {
        let mut generators = lock(&self.generators)?;
        if let Some(generator) = generators.get(&instance) {
            return Ok(Arc::clone(generator));
        }

        let generator = Arc::new(
            GeneratorBuilder::new(self.layout)
                .node(instance)
                .reseed(self.reseed)
                .clock_regression_tolerance(self.tolerance)
                .registry(Arc::clone(&self.registry))
                .clock(self.clock.clone())
                .rand(self.rand.clone())
                .build::<T>()?,
        );
        #[cfg(feature = "tracing")]
        tracing::debug!(instance, cached = generators.len() + 1, "new instance generator");
        generators.insert(instance, Arc::clone(&generator));
        Ok(generator)
    }

    /// Number of instance generators built so far.
    ///
    /// # Errors
    ///
    /// May return an error if the lock is poisoned.
    pub fn instances(&self) -> Result<usize> {
        Ok(lock(&self.generators)?.len())
    }
}
