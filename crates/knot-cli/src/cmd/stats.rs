//! `knot stats`: run the pipeline and summarize the edges it produced.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use knot_core::InferenceConfig;
use knot_infer::RelationStats;

use super::InputArgs;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `knot stats`.
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run_stats(args: &StatsArgs, config: &InferenceConfig, output: OutputMode) -> Result<()> {
    let graph = super::run_engine(&args.input, config, output)?;
    render_mode(output, &graph.stats(), render_text, render_pretty)
}

fn render_text(stats: &RelationStats, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "total\t{}", stats.total)?;
    writeln!(w, "avg_confidence\t{:.3}", stats.avg_confidence)?;
    for (kind, count) in &stats.by_type {
        writeln!(w, "type.{kind}\t{count}")?;
    }
    for (source, count) in &stats.by_source {
        writeln!(w, "source.{source}\t{count}")?;
    }
    Ok(())
}

fn render_pretty(stats: &RelationStats, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Relation stats")?;
    pretty_kv(w, "total", stats.total.to_string())?;
    pretty_kv(w, "avg confidence", format!("{:.3}", stats.avg_confidence))?;

    if !stats.by_type.is_empty() {
        writeln!(w)?;
        writeln!(w, "By type")?;
        pretty_rule(w)?;
        for (kind, count) in &stats.by_type {
            pretty_kv(w, kind.as_str(), count.to_string())?;
        }
    }

    if !stats.by_source.is_empty() {
        writeln!(w)?;
        writeln!(w, "By source")?;
        pretty_rule(w)?;
        for (source, count) in &stats.by_source {
            pretty_kv(w, source.as_str(), count.to_string())?;
        }
    }
    Ok(())
}
