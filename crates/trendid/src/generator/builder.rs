use crate::{
    BitLayout, Degradation, IdInt, InstanceRegistry, NodeResolver, RandSource, ReseedStrategy,
    SystemClock, ThreadRandom, TimeSource, check_range, cluster_server_node,
    error::{Error, Result},
    generator::{
        Generator,
        state::{Rules, SequenceState},
    },
    mutex::Mutex,
};
use core::marker::PhantomData;
use std::sync::Arc;

/// Ticks a clock may fall behind before generation fails instead of waiting.
pub const DEFAULT_CLOCK_REGRESSION_TOLERANCE: u64 = 10;

#[derive(Debug)]
enum NodeSource {
    Auto,
    Explicit(u64),
    ClusterServer {
        cluster: u64,
        server: u64,
        cluster_bits: u8,
    },
    Resolver(NodeResolver),
}

/// Configures and builds a [`Generator`].
///
/// Unless told otherwise the builder resolves the node identity from the
/// environment ([`NodeResolver::for_layout`]), reseeds randomly, tolerates a
/// clock regression of [`DEFAULT_CLOCK_REGRESSION_TOLERANCE`] ticks, reads
/// [`SystemClock`] and registers with [`InstanceRegistry::global`].
///
/// # Example
///
/// ```
/// use trendid::{BitLayout, Generator, InstanceRegistry, ReseedStrategy};
/// use std::sync::Arc;
///
/// let generator = Generator::builder(BitLayout::CLUSTERED)
///     .cluster_server(3, 17, 6)
///     .reseed(ReseedStrategy::Zero)
///     .registry(Arc::new(InstanceRegistry::new()))
///     .build::<u64>()
///     .unwrap();
///
/// assert_eq!(generator.node(), (3 << 6) | 17);
/// let id = generator.next_id().unwrap();
/// assert_eq!(generator.decode(id).node, generator.node());
/// ```
#[derive(Debug)]
pub struct GeneratorBuilder<C = SystemClock, R = ThreadRandom> {
    layout: BitLayout,
    reseed: ReseedStrategy,
    tolerance: u64,
    node: NodeSource,
    registry: Option<Arc<InstanceRegistry>>,
    clock: C,
    rand: R,
}

impl GeneratorBuilder {
    pub fn new(layout: BitLayout) -> Self {
        Self {
            layout,
            reseed: ReseedStrategy::default(),
            tolerance: DEFAULT_CLOCK_REGRESSION_TOLERANCE,
            node: NodeSource::Auto,
            registry: None,
            clock: SystemClock,
            rand: ThreadRandom,
        }
    }
}

impl<C, R> GeneratorBuilder<C, R> {
    pub fn reseed(mut self, reseed: ReseedStrategy) -> Self {
        self.reseed = reseed;
        self
    }

    /// How many ticks the clock may fall behind the last issued id before
    /// [`Generator::next_id`] fails with [`Error::ClockMovedBackwards`]
    /// rather than waiting. A gap equal to the tolerance is still waited out.
    pub fn clock_regression_tolerance(mut self, ticks: u64) -> Self {
        self.tolerance = ticks;
        self
    }

    /// Uses `node` as the node identity. It must fit the layout's node field.
    pub fn node(mut self, node: u64) -> Self {
        self.node = NodeSource::Explicit(node);
        self
    }

    /// Builds the node identity from a cluster and a server number. The
    /// cluster takes the top `cluster_bits` of the node field, the server the
    /// rest.
    pub fn cluster_server(mut self, cluster: u64, server: u64, cluster_bits: u8) -> Self {
        self.node = NodeSource::ClusterServer {
            cluster,
            server,
            cluster_bits,
        };
        self
    }

    /// Resolves the node identity with a custom resolver.
    pub fn resolver(mut self, resolver: NodeResolver) -> Self {
        self.node = NodeSource::Resolver(resolver);
        self
    }

    /// Registers the generator with `registry` instead of the global one.
    pub fn registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn clock<C2>(self, clock: C2) -> GeneratorBuilder<C2, R> {
        GeneratorBuilder {
            layout: self.layout,
            reseed: self.reseed,
            tolerance: self.tolerance,
            node: self.node,
            registry: self.registry,
            clock,
            rand: self.rand,
        }
    }

    pub fn rand<R2>(self, rand: R2) -> GeneratorBuilder<C, R2> {
        GeneratorBuilder {
            layout: self.layout,
            reseed: self.reseed,
            tolerance: self.tolerance,
            node: self.node,
            registry: self.registry,
            clock: self.clock,
            rand,
        }
    }
}

impl<C, R> GeneratorBuilder<C, R>
where
    C: TimeSource,
    R: RandSource,
{
    /// Validates the configuration, samples the clock and registers the node.
    ///
    /// Registration is the last step, so a failed build never leaves a node
    /// registered.
    ///
    /// # Errors
    ///
    /// - layout errors from [`BitLayout::validate`];
    /// - [`Error::ValueOutOfRange`] or [`Error::InvalidLayout`] for a node
    ///   identity that does not fit the node field;
    /// - [`Error::EpochInFuture`] if the clock reads before the layout epoch;
    /// - [`Error::TimestampOverflow`] if the clock is past the last
    ///   representable tick;
    /// - [`Error::DuplicateInstance`] if the node is already registered.
    pub fn build<T: IdInt>(self) -> Result<Generator<T, C, R>> {
        let layout = self.layout;
        layout.validate::<T>()?;

        let (node, degradations) = Self::resolve_node(self.node, &layout)?;

        let now_millis = self.clock.current_millis();
        if now_millis < layout.epoch_millis {
            return Err(Error::EpochInFuture {
                now_millis,
                epoch_millis: layout.epoch_millis,
            });
        }
        let tick = layout.tick_of(now_millis);
        if tick > layout.max_timestamp() {
            return Err(Error::TimestampOverflow {
                tick,
                max: layout.max_timestamp(),
            });
        }

        let rules = Rules {
            max_tick: layout.max_timestamp(),
            counter_mask: layout.max_sequence(),
            reseed: self.reseed,
            tolerance: self.tolerance,
        };
        let seed = rules.seed(&self.rand);

        self.registry
            .unwrap_or_else(InstanceRegistry::global)
            .register(node)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            id = T::NAME,
            ?layout,
            node,
            reseed = ?rules.reseed,
            tolerance = rules.tolerance,
            tick,
            "generator created"
        );

        Ok(Generator {
            state: Mutex::new(SequenceState::new(tick, seed)),
            rules,
            layout,
            node,
            clock: self.clock,
            rand: self.rand,
            degradations,
            _id: PhantomData,
        })
    }

    fn resolve_node(source: NodeSource, layout: &BitLayout) -> Result<(u64, Vec<Degradation>)> {
        match source {
            NodeSource::Explicit(node) => Ok((check_range("node", node, layout.node_bits)?, Vec::new())),
            NodeSource::ClusterServer {
                cluster,
                server,
                cluster_bits,
            } => {
                let Some(server_bits) = layout.node_bits.checked_sub(cluster_bits) else {
                    return Err(Error::InvalidLayout {
                        reason: "cluster bits exceed the node field",
                    });
                };
                let node = cluster_server_node(cluster, server, cluster_bits, server_bits)?;
                Ok((node, Vec::new()))
            }
            NodeSource::Resolver(resolver) => {
                if resolver.node_bits() > layout.node_bits {
                    return Err(Error::InvalidLayout {
                        reason: "resolver is wider than the node field",
                    });
                }
                let resolved = resolver.resolve();
                Ok((resolved.node, resolved.degradations))
            }
            NodeSource::Auto => {
                let resolved = NodeResolver::for_layout(layout).resolve();
                Ok((resolved.node, resolved.degradations))
            }
        }
    }
}
