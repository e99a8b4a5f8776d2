//! `knot infer`: run the pipeline and print the resulting edges.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use knot_core::{InferenceConfig, Relation, RelationSource, RelationType};

use super::InputArgs;
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `knot infer`.
#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Only print edges of this type (e.g. `similar_to`). Repeatable.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub types: Vec<RelationType>,

    /// Only print edges from this source (`explicit`, `computed`, `inferred`).
    #[arg(long, value_name = "SOURCE", value_parser = parse_source)]
    pub source: Option<RelationSource>,

    /// Drop edges below this confidence.
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    /// Only print edges touching this object id.
    #[arg(long, value_name = "ID")]
    pub object: Option<String>,
}

fn parse_source(raw: &str) -> Result<RelationSource, String> {
    let needle = raw.trim().to_ascii_lowercase();
    RelationSource::ALL
        .into_iter()
        .find(|s| s.as_str() == needle)
        .ok_or_else(|| format!("invalid source '{raw}' (expected explicit, computed or inferred)"))
}

impl InferArgs {
    fn keep(&self, rel: &Relation) -> bool {
        (self.types.is_empty() || self.types.contains(&rel.relation_type))
            && self.source.is_none_or(|s| s == rel.source)
            && self.min_confidence.is_none_or(|min| rel.confidence >= min)
            && self.object.as_deref().is_none_or(|id| rel.touches(id))
    }
}

/// Execute `knot infer`.
pub fn run_infer(args: &InferArgs, config: &InferenceConfig, output: OutputMode) -> Result<()> {
    let mut graph = super::run_engine(&args.input, config, output)?;
    graph.retain(|rel| args.keep(rel));

    render_mode(output, graph.relations(), render_text, render_pretty)
}

fn render_text(relations: &[Relation], w: &mut dyn Write) -> io::Result<()> {
    for rel in relations {
        writeln!(
            w,
            "{}\t{}\t{}\t{:.3}\t{}",
            rel.from_id, rel.relation_type, rel.to_id, rel.confidence, rel.source
        )?;
    }
    Ok(())
}

fn render_pretty(relations: &[Relation], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Relations ({})", relations.len()))?;
    if relations.is_empty() {
        writeln!(w, "(none)")?;
        return Ok(());
    }

    let width = relations.iter().map(|r| r.from_id.len()).max().unwrap_or(0);
    for rel in relations {
        write!(
            w,
            "{:<width$}  --{}-->  {}  ({:.2}, {})",
            rel.from_id, rel.relation_type, rel.to_id, rel.confidence, rel.source
        )?;
        if !rel.metadata.shared_keywords.is_empty() {
            write!(w, "  [{}]", rel.metadata.shared_keywords.join(", "))?;
        }
        writeln!(w)?;
    }
    Ok(())
}
