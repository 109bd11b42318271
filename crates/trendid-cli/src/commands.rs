use crate::config::{DecodeArgs, GenerateConfig, LayoutPreset, NodeChoice};
use anyhow::{Context, anyhow, bail};
use std::{
    io::{self, BufWriter, Write},
    str::FromStr,
    thread::scope,
};
use trendid::{Generator, IdInt};

pub fn generate(config: &GenerateConfig) -> anyhow::Result<()> {
    if config.preset.is_wide() {
        generate_as::<u128>(config)
    } else {
        generate_as::<u64>(config)
    }
}

fn generate_as<T: IdInt>(config: &GenerateConfig) -> anyhow::Result<()> {
    let builder = Generator::builder(config.preset.layout())
        .reseed(config.reseed)
        .clock_regression_tolerance(config.tolerance);
    let builder = match config.node {
        NodeChoice::Auto => builder,
        NodeChoice::Explicit(node) => builder.node(node),
        NodeChoice::ClusterServer {
            cluster,
            server,
            cluster_bits,
        } => builder.cluster_server(cluster, server, cluster_bits),
    };
    let generator = builder
        .build::<T>()
        .with_context(|| format!("cannot create a generator for the {} layout", config.preset.name()))?;

    tracing::info!(
        layout = config.preset.name(),
        node = generator.node(),
        degraded = !generator.degradations().is_empty(),
        count = config.count,
        threads = config.threads,
        "generating ids"
    );

    let batches = scope(|s| {
        let handles: Vec<_> = split(config.count, config.threads)
            .map(|n| {
                let generator = &generator;
                s.spawn(move || (0..n).map(|_| generator.next_id()).collect::<trendid::Result<Vec<T>>>())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("generator thread panicked")))
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut out = BufWriter::new(io::stdout().lock());
    for batch in batches {
        for id in batch.context("id generation failed")? {
            writeln!(out, "{}", config.format.render(id))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Splits `count` into `parts` near-equal shares.
fn split(count: usize, parts: usize) -> impl Iterator<Item = usize> {
    let parts = parts.max(1);
    (0..parts).map(move |i| count / parts + usize::from(i < count % parts))
}

pub fn decode(args: &DecodeArgs) -> anyhow::Result<()> {
    if args.layout.is_wide() {
        decode_as::<u128>(args)
    } else {
        decode_as::<u64>(args)
    }
}

fn decode_as<T>(args: &DecodeArgs) -> anyhow::Result<()>
where
    T: IdInt + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let layout = args.layout.layout();
    let mut out = BufWriter::new(io::stdout().lock());
    for raw in &args.ids {
        let id: T = args.format.parse(raw)?;
        if !layout.is_valid(id) {
            bail!("`{raw}` was not produced with the {} layout", args.layout.name());
        }
        let parts = layout.decode(id);
        writeln!(
            out,
            "{raw}\ttick={} millis={} node={} sequence={}",
            parts.tick,
            layout.millis_of(parts.tick),
            parts.node,
            parts.sequence
        )?;
    }
    out.flush()?;
    Ok(())
}

pub fn layouts() -> anyhow::Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(
        out,
        "{:<12} {:>4} {:>9} {:>9} {:>8} {:>7} {:>14} {:>5}",
        "layout", "int", "ts bits", "node bits", "seq bits", "tick ms", "epoch ms", "flag"
    )?;
    for preset in LayoutPreset::ALL {
        let layout = preset.layout();
        writeln!(
            out,
            "{:<12} {:>4} {:>9} {:>9} {:>8} {:>7} {:>14} {:>5}",
            preset.name(),
            if preset.is_wide() { "u128" } else { "u64" },
            layout.timestamp_bits,
            layout.node_bits,
            layout.sequence_bits,
            layout.tick_millis(),
            layout.epoch_millis,
            if layout.sequence_flag { "yes" } else { "no" },
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_covers_count() {
        assert_eq!(split(10, 3).collect::<Vec<_>>(), [4, 3, 3]);
        assert_eq!(split(2, 4).collect::<Vec<_>>(), [1, 1, 0, 0]);
        assert_eq!(split(7, 1).sum::<usize>(), 7);
        assert_eq!(split(0, 0).collect::<Vec<_>>(), [0]);
    }
}
