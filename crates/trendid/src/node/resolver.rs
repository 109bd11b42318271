use crate::{
    BitLayout, EnvironmentProbe, HardwareAddressProbe, IdentityProbe, ProcessIdProbe, RandSource,
    ThreadRandom, id::mask,
};
use core::fmt;
use sha2::{Digest, Sha256};

/// The two halves of an automatically resolved node identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Machine,
    Process,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Machine => "machine",
            Self::Process => "process",
        })
    }
}

/// A component that had to be filled with a random value because every probe
/// failed.
///
/// Random components are unique only with high probability, so callers may
/// want to surface this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Degradation {
    pub component: Component,
    /// The last probe failure, for diagnostics.
    pub reason: String,
}

/// A node identity produced by [`NodeResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNode {
    /// `machine << process_bits | process`
    pub node: u64,
    pub machine: u64,
    pub process: u64,
    /// Components that fell back to randomness.
    pub degradations: Vec<Degradation>,
}

impl ResolvedNode {
    /// Returns `true` if any component is random rather than probed.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

type Probes = Vec<Box<dyn IdentityProbe>>;

/// Derives a node identity from the host and process.
///
/// The identity is `machine_bits` of machine component followed by
/// `process_bits` of process component:
///
/// - **machine**: by default the network hardware addresses. The top bit of
///   the component is always set (see [`NodeResolver::pin_machine_high_bit`]).
/// - **process**: by default the OS process id, falling back to a hash of
///   `<executable>@<host>`.
///
/// Probes of a component are tried in order; the first success wins. Probe
/// output of up to 8 bytes is read as a big-endian integer, longer output is
/// hashed, and the result is truncated to the component width. If every
/// probe fails the component is random and a [`Degradation`] is reported.
///
/// # Example
///
/// ```
/// use trendid::{NodeResolver, RandomProbe, ThreadRandom};
///
/// let resolver = NodeResolver::new(24, 16)
///     .with_machine_probes(vec![Box::new(RandomProbe::new(ThreadRandom))]);
/// let resolved = resolver.resolve();
/// assert!(resolved.node < 1 << 40);
/// assert!(!resolved.is_degraded());
/// ```
pub struct NodeResolver {
    machine_bits: u8,
    process_bits: u8,
    machine_probes: Probes,
    process_probes: Probes,
    rand: Box<dyn RandSource + Send + Sync>,
    pin_high_bit: bool,
}

impl NodeResolver {
    /// Creates a resolver with the default environment probes.
    ///
    /// Widths above 64 bits in total are clamped so the process component
    /// keeps its width.
    pub fn new(machine_bits: u8, process_bits: u8) -> Self {
        let process_bits = process_bits.min(64);
        let machine_bits = machine_bits.min(64 - process_bits);
        Self {
            machine_bits,
            process_bits,
            machine_probes: vec![Box::new(HardwareAddressProbe::new())],
            process_probes: vec![Box::new(ProcessIdProbe), Box::new(EnvironmentProbe)],
            rand: Box::new(ThreadRandom),
            pin_high_bit: true,
        }
    }

    /// Splits the layout's node field between machine and process: the
    /// process gets half, capped at 16 bits, and the machine the rest.
    pub fn for_layout(layout: &BitLayout) -> Self {
        let process_bits = (layout.node_bits / 2).min(16);
        Self::new(layout.node_bits - process_bits, process_bits)
    }

    pub fn with_machine_probes(mut self, probes: Vec<Box<dyn IdentityProbe>>) -> Self {
        self.machine_probes = probes;
        self
    }

    pub fn with_process_probes(mut self, probes: Vec<Box<dyn IdentityProbe>>) -> Self {
        self.process_probes = probes;
        self
    }

    /// Source of the random fallback values.
    pub fn with_rand(mut self, rand: impl RandSource + Send + Sync + 'static) -> Self {
        self.rand = Box::new(rand);
        self
    }

    /// Whether the top bit of the machine component is forced to 1 (default
    /// `true`). Pinning keeps the machine component at full width even when
    /// the probed value is small.
    pub fn pin_machine_high_bit(mut self, pin: bool) -> Self {
        self.pin_high_bit = pin;
        self
    }

    pub fn machine_bits(&self) -> u8 {
        self.machine_bits
    }

    pub fn process_bits(&self) -> u8 {
        self.process_bits
    }

    /// Total width of the resolved node identity.
    pub fn node_bits(&self) -> u8 {
        self.machine_bits + self.process_bits
    }

    /// Probes the environment and assembles a node identity.
    ///
    /// Never fails: components whose probes all fail are filled with random
    /// values and reported in [`ResolvedNode::degradations`].
    pub fn resolve(&self) -> ResolvedNode {
        let mut degradations = Vec::new();

        let mut machine = self.component(
            Component::Machine,
            &self.machine_probes,
            self.machine_bits,
            &mut degradations,
        );
        if self.pin_high_bit && self.machine_bits > 0 {
            machine |= 1 << (self.machine_bits - 1);
        }
        let process = self.component(
            Component::Process,
            &self.process_probes,
            self.process_bits,
            &mut degradations,
        );

        let node = machine.checked_shl(u32::from(self.process_bits)).unwrap_or(0) | process;

        #[cfg(feature = "tracing")]
        tracing::debug!(node, machine, process, degraded = !degradations.is_empty(), "resolved node identity");

        ResolvedNode {
            node,
            machine,
            process,
            degradations,
        }
    }

    fn component(
        &self,
        component: Component,
        probes: &[Box<dyn IdentityProbe>],
        bits: u8,
        degradations: &mut Vec<Degradation>,
    ) -> u64 {
        if bits == 0 {
            return 0;
        }

        let mut reason = String::from("no probes configured");
        for probe in probes {
            match probe.probe() {
                Ok(bytes) => return fold(&bytes) & mask(bits),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(%component, probe = probe.name(), error = %e, "identity probe failed");
                    reason = format!("{}: {e}", probe.name());
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(%component, %reason, "using a random value instead of a probed identity");

        degradations.push(Degradation { component, reason });
        self.rand.rand() & mask(bits)
    }
}

impl fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeResolver")
            .field("machine_bits", &self.machine_bits)
            .field("process_bits", &self.process_bits)
            .field(
                "machine_probes",
                &self.machine_probes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "process_probes",
                &self.process_probes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("pin_high_bit", &self.pin_high_bit)
            .finish_non_exhaustive()
    }
}

/// Reads up to 8 bytes as a big-endian integer. Anything longer is reduced
/// to the first 8 bytes of its SHA-256 digest, so the same host keeps the
/// same component across builds and toolchains.
fn fold(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    if bytes.len() <= 8 {
        buf[8 - bytes.len()..].copy_from_slice(bytes);
    } else {
        buf.copy_from_slice(&Sha256::digest(bytes)[..8]);
    }
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProbeError;

    struct Fixed(&'static [u8]);
    impl IdentityProbe for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn probe(&self) -> Result<Vec<u8>, ProbeError> {
            Ok(self.0.to_vec())
        }
    }

    struct Failing;
    impl IdentityProbe for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn probe(&self) -> Result<Vec<u8>, ProbeError> {
            Err(ProbeError::Unavailable("nothing here"))
        }
    }

    struct FixedRand(u64);
    impl RandSource for FixedRand {
        fn rand(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn short_probe_output_is_used_verbatim() {
        let resolved = NodeResolver::new(24, 16)
            .with_machine_probes(vec![Box::new(Fixed(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]))])
            .with_process_probes(vec![Box::new(Fixed(&[0x00, 0x01, 0x23, 0x45]))])
            .resolve();

        // low 24 bits of the address with the top bit pinned
        assert_eq!(resolved.machine, 0x11_0002 | 0x80_0000);
        assert_eq!(resolved.process, 0x2345);
        assert_eq!(resolved.node, (0x91_0002 << 16) | 0x2345);
        assert!(!resolved.is_degraded());
    }

    #[test]
    fn long_probe_output_is_hashed_deterministically() {
        let make = || {
            NodeResolver::new(24, 16)
                .with_machine_probes(vec![Box::new(Fixed(b"eth0-and-a-long-descriptor"))])
                .with_process_probes(vec![Box::new(Fixed(&[7]))])
                .pin_machine_high_bit(false)
        };
        let a = make().resolve();
        let b = make().resolve();
        assert_eq!(a, b);
        assert_eq!(a.machine, 0x08_6a43);
        assert_eq!(a.process, 7);
    }

    #[test]
    fn fold_is_a_fixed_digest() {
        assert_eq!(fold(&[0x12, 0x34]), 0x1234);
        assert_eq!(fold(b"01234567"), u64::from_be_bytes(*b"01234567"));
        assert_eq!(fold(b"0123456789"), 0x84d8_9877_f0d4_041e);
        assert_eq!(fold(b"/usr/bin/app@host-1"), 0xc79b_48eb_9aef_2a63);
    }

    #[test]
    fn falls_through_to_next_probe() {
        let resolved = NodeResolver::new(8, 8)
            .with_machine_probes(vec![Box::new(Fixed(&[1]))])
            .with_process_probes(vec![Box::new(Failing), Box::new(Fixed(&[9]))])
            .pin_machine_high_bit(false)
            .resolve();
        assert_eq!(resolved.node, (1 << 8) | 9);
        assert!(!resolved.is_degraded());
    }

    #[test]
    fn degrades_to_random_when_all_probes_fail() {
        let resolved = NodeResolver::new(24, 16)
            .with_machine_probes(vec![Box::new(Failing)])
            .with_process_probes(vec![Box::new(Failing)])
            .with_rand(FixedRand(u64::MAX))
            .resolve();

        assert_eq!(resolved.machine, (1 << 24) - 1);
        assert_eq!(resolved.process, (1 << 16) - 1);
        assert_eq!(resolved.node, (1 << 40) - 1);
        assert!(resolved.is_degraded());
        assert_eq!(
            resolved.degradations,
            vec![
                Degradation {
                    component: Component::Machine,
                    reason: "failing: nothing here".into()
                },
                Degradation {
                    component: Component::Process,
                    reason: "failing: nothing here".into()
                },
            ]
        );
    }

    #[test]
    fn empty_probe_list_degrades() {
        let resolved = NodeResolver::new(4, 4)
            .with_machine_probes(Vec::new())
            .with_process_probes(vec![Box::new(Fixed(&[3]))])
            .with_rand(FixedRand(0))
            .resolve();
        // random zero, but the high bit is still pinned
        assert_eq!(resolved.machine, 0b1000);
        assert_eq!(resolved.degradations.len(), 1);
        assert_eq!(resolved.degradations[0].reason, "no probes configured");
    }

    #[test]
    fn layout_split_matches_presets() {
        let wide = NodeResolver::for_layout(&BitLayout::WIDE);
        assert_eq!((wide.machine_bits(), wide.process_bits()), (24, 16));

        let compact = NodeResolver::for_layout(&BitLayout::COMPACT);
        assert_eq!((compact.machine_bits(), compact.process_bits()), (8, 8));

        let none = NodeResolver::for_layout(&BitLayout::RANDOM_TAIL);
        assert_eq!(none.node_bits(), 0);
        assert_eq!(none.resolve().node, 0);
    }

    #[test]
    fn default_probes_resolve_within_width() {
        let resolved = NodeResolver::new(24, 16).resolve();
        assert!(resolved.node < 1 << 40);
        assert!(resolved.machine >= 1 << 23);
    }
}
