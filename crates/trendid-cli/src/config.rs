use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use trendid::{BitLayout, IdInt, RadixExt, ReseedStrategy};

/// Generate and inspect trend-increasing unique ids.
///
/// Every option can also be set through a `TRENDID_*` environment variable,
/// or in a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "trendid", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print freshly generated ids, one per line.
    Generate(GenerateArgs),
    /// Split ids into tick, wall-clock time, node and sequence.
    Decode(DecodeArgs),
    /// List the built-in layouts.
    Layouts,
}

/// The built-in bit layouts.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPreset {
    /// u64: 44-bit ms timestamp, 6-bit cluster + 6-bit server, 7-bit sequence
    Clustered,
    /// u64: 44-bit ms timestamp, 7-bit instance, 12-bit sequence
    Worker,
    /// u64: 42-bit ms timestamp since 2018, 16-bit machine/process, 5-bit sequence
    Compact,
    /// u128: 48-bit 64 ms timestamp, 40-bit machine/process, 24-bit flagged sequence
    Wide,
    /// u128: 47-bit ms timestamp, no node, 32-bit random tail
    RandomTail,
}

impl LayoutPreset {
    pub const ALL: [Self; 5] = [
        Self::Clustered,
        Self::Worker,
        Self::Compact,
        Self::Wide,
        Self::RandomTail,
    ];

    pub fn layout(self) -> BitLayout {
        match self {
            Self::Clustered => BitLayout::CLUSTERED,
            Self::Worker => BitLayout::WORKER,
            Self::Compact => BitLayout::COMPACT,
            Self::Wide => BitLayout::WIDE,
            Self::RandomTail => BitLayout::RANDOM_TAIL,
        }
    }

    /// Whether ids of this layout need a `u128`.
    pub fn is_wide(self) -> bool {
        self.layout().total_bits() > u64::CAPACITY
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clustered => "clustered",
            Self::Worker => "worker",
            Self::Compact => "compact",
            Self::Wide => "wide",
            Self::RandomTail => "random-tail",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Decimal,
    Radix36,
}

impl Format {
    pub fn render<T: IdInt>(self, id: T) -> String {
        match self {
            Self::Decimal => id.to_string(),
            Self::Radix36 => id.to_radix36(),
        }
    }

    pub fn parse<T>(self, raw: &str) -> anyhow::Result<T>
    where
        T: IdInt + core::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self {
            Self::Decimal => raw
                .parse()
                .with_context(|| format!("`{raw}` is not a decimal {} id", T::NAME)),
            Self::Radix36 => {
                T::from_radix36(raw).with_context(|| format!("`{raw}` is not a radix-36 {} id", T::NAME))
            }
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reseed {
    Zero,
    Random,
}

impl From<Reseed> for ReseedStrategy {
    fn from(reseed: Reseed) -> Self {
        match reseed {
            Reseed::Zero => Self::Zero,
            Reseed::Random => Self::Random,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of ids to print.
    ///
    /// Environment variable: `TRENDID_COUNT`
    #[arg(short = 'n', long, env = "TRENDID_COUNT", default_value_t = 1)]
    pub count: usize,

    /// Number of threads sharing one generator.
    ///
    /// Environment variable: `TRENDID_THREADS`
    #[arg(short, long, env = "TRENDID_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Environment variable: `TRENDID_LAYOUT`
    #[arg(short, long, env = "TRENDID_LAYOUT", value_enum, default_value_t = LayoutPreset::Worker)]
    pub layout: LayoutPreset,

    /// Explicit node identity. Without `--node` or `--cluster`/`--server`
    /// the identity is derived from the host and process.
    ///
    /// Environment variable: `TRENDID_NODE`
    #[arg(long, env = "TRENDID_NODE", conflicts_with_all = ["cluster", "server"])]
    pub node: Option<u64>,

    /// Cluster number; requires `--server`.
    ///
    /// Environment variable: `TRENDID_CLUSTER`
    #[arg(long, env = "TRENDID_CLUSTER", requires = "server")]
    pub cluster: Option<u64>,

    /// Server number within the cluster; requires `--cluster`.
    ///
    /// Environment variable: `TRENDID_SERVER`
    #[arg(long, env = "TRENDID_SERVER", requires = "cluster")]
    pub server: Option<u64>,

    /// Width of the cluster number; the server gets the rest of the node
    /// field.
    ///
    /// Environment variable: `TRENDID_CLUSTER_BITS`
    #[arg(long, env = "TRENDID_CLUSTER_BITS", default_value_t = 6)]
    pub cluster_bits: u8,

    /// Environment variable: `TRENDID_RESEED`
    #[arg(long, env = "TRENDID_RESEED", value_enum, default_value_t = Reseed::Random)]
    pub reseed: Reseed,

    /// Ticks the clock may fall behind before generation fails.
    ///
    /// Environment variable: `TRENDID_TOLERANCE`
    #[arg(long, env = "TRENDID_TOLERANCE", default_value_t = trendid::DEFAULT_CLOCK_REGRESSION_TOLERANCE)]
    pub tolerance: u64,

    /// Environment variable: `TRENDID_FORMAT`
    #[arg(short, long, env = "TRENDID_FORMAT", value_enum, default_value_t = Format::Decimal)]
    pub format: Format,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Environment variable: `TRENDID_LAYOUT`
    #[arg(short, long, env = "TRENDID_LAYOUT", value_enum, default_value_t = LayoutPreset::Worker)]
    pub layout: LayoutPreset,

    /// Environment variable: `TRENDID_FORMAT`
    #[arg(short, long, env = "TRENDID_FORMAT", value_enum, default_value_t = Format::Decimal)]
    pub format: Format,

    /// Ids to decode.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Where the generator's node identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChoice {
    Auto,
    Explicit(u64),
    ClusterServer { cluster: u64, server: u64, cluster_bits: u8 },
}

/// Validated settings of `trendid generate`.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub count: usize,
    pub threads: usize,
    pub preset: LayoutPreset,
    pub node: NodeChoice,
    pub reseed: ReseedStrategy,
    pub tolerance: u64,
    pub format: Format,
}

impl TryFrom<GenerateArgs> for GenerateConfig {
    type Error = anyhow::Error;

    fn try_from(args: GenerateArgs) -> Result<Self, Self::Error> {
        if args.threads == 0 {
            bail!("TRENDID_THREADS must be greater than 0");
        }

        let max_threads = num_cpus::get() * 4;
        if args.threads > max_threads {
            bail!(
                "TRENDID_THREADS ({}) exceeds {} (4 per available cpu)",
                args.threads,
                max_threads
            );
        }

        let layout = args.layout.layout();
        let node = match (args.node, args.cluster, args.server) {
            (Some(node), None, None) => NodeChoice::Explicit(node),
            (None, Some(cluster), Some(server)) => {
                if args.cluster_bits > layout.node_bits {
                    bail!(
                        "TRENDID_CLUSTER_BITS ({}) exceeds the {}-bit node field of the {} layout",
                        args.cluster_bits,
                        layout.node_bits,
                        args.layout.name()
                    );
                }
                NodeChoice::ClusterServer {
                    cluster,
                    server,
                    cluster_bits: args.cluster_bits,
                }
            }
            (None, None, None) => NodeChoice::Auto,
            _ => bail!("use either --node or both --cluster and --server"),
        };

        if layout.node_bits == 0 && !matches!(node, NodeChoice::Auto | NodeChoice::Explicit(0)) {
            bail!("the {} layout has no node field", args.layout.name());
        }

        Ok(Self {
            count: args.count,
            threads: args.threads.min(args.count.max(1)),
            preset: args.layout,
            node,
            reseed: args.reseed.into(),
            tolerance: args.tolerance,
            format: args.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(argv: &[&str]) -> anyhow::Result<GenerateConfig> {
        let cli = CliArgs::try_parse_from(["trendid", "generate"].iter().chain(argv).copied())?;
        let Command::Generate(args) = cli.command else {
            unreachable!()
        };
        GenerateConfig::try_from(args)
    }

    #[test]
    fn defaults() {
        let config = generate(&[]).unwrap();
        assert_eq!(config.count, 1);
        assert_eq!(config.threads, 1);
        assert_eq!(config.preset, LayoutPreset::Worker);
        assert_eq!(config.node, NodeChoice::Auto);
        assert_eq!(config.reseed, ReseedStrategy::Random);
        assert_eq!(config.tolerance, trendid::DEFAULT_CLOCK_REGRESSION_TOLERANCE);
        assert_eq!(config.format, Format::Decimal);
    }

    #[test]
    fn cluster_and_server_go_together() {
        let config = generate(&["--layout", "clustered", "--cluster", "3", "--server", "4"]).unwrap();
        assert_eq!(
            config.node,
            NodeChoice::ClusterServer {
                cluster: 3,
                server: 4,
                cluster_bits: 6
            }
        );

        assert!(generate(&["--cluster", "3"]).is_err());
        assert!(generate(&["--node", "1", "--cluster", "3", "--server", "4"]).is_err());
    }

    #[test]
    fn rejects_impossible_settings() {
        assert!(generate(&["--threads", "0"]).is_err());
        assert!(generate(&["--layout", "worker", "--cluster", "1", "--server", "1", "--cluster-bits", "8"]).is_err());
        assert!(generate(&["--layout", "random-tail", "--node", "5"]).is_err());
        assert!(generate(&["--layout", "random-tail", "--node", "0"]).is_ok());
        assert!(generate(&["--reseed", "sometimes"]).is_err());
    }

    #[test]
    fn threads_never_exceed_count() {
        let config = generate(&["--count", "2", "--threads", "2"]).unwrap();
        assert_eq!(config.threads, 2);
        let config = generate(&["--count", "1", "--threads", "2"]).unwrap();
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn preset_widths() {
        let wide: Vec<_> = LayoutPreset::ALL
            .into_iter()
            .filter(|p| p.is_wide())
            .collect();
        assert_eq!(wide, [LayoutPreset::Wide, LayoutPreset::RandomTail]);
    }

    #[test]
    fn formats_round_trip() {
        assert_eq!(Format::Radix36.render(1_295u64), "zz");
        assert_eq!(Format::Radix36.parse::<u64>("ZZ").unwrap(), 1_295);
        assert_eq!(Format::Decimal.parse::<u128>("42").unwrap(), 42);
        assert!(Format::Decimal.parse::<u64>("zz").is_err());
    }
}
