pub mod config;
pub mod infer;
pub mod input;
pub mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use knot_core::{CancellationToken, InferenceConfig};
use knot_infer::contrastive::{OpenAiJudge, RelatednessJudge};
use knot_infer::{RelationEngine, RelationGraph};

use crate::output::{CliError, OutputMode, render_error};

/// Input flags shared by every command that runs the engine.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Objects to analyze: a JSON array, or JSON Lines for `.jsonl` files.
    #[arg(long, short = 'i', value_name = "PATH")]
    pub objects: PathBuf,

    /// Embeddings file: a JSON object mapping object ids to vectors.
    #[arg(long, short = 'e', value_name = "PATH")]
    pub embeddings: Option<PathBuf>,

    /// Fill missing `semantic_hash` values from each object's title and body.
    #[arg(long)]
    pub fingerprint: bool,
}

/// Load inputs, run every enabled stage, and return the combined graph.
///
/// Ctrl-C cancels the run between pairs. Engine failures are rendered with
/// their error code before being returned.
pub fn run_engine(
    input: &InputArgs,
    config: &InferenceConfig,
    output: OutputMode,
) -> Result<RelationGraph> {
    let mut objects = input::load_objects(&input.objects)?;
    if input.fingerprint {
        let filled = input::fill_fingerprints(&mut objects);
        tracing::debug!(filled, "filled missing semantic hashes");
    }
    let embeddings = input
        .embeddings
        .as_deref()
        .map(input::load_embeddings)
        .transpose()?;

    let engine = match RelationEngine::new(config.clone()) {
        Ok(engine) => engine,
        Err(err) => {
            render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
            anyhow::bail!("invalid configuration");
        }
    };

    let judge = if config.include_inferred && config.use_contrastive_icl {
        match OpenAiJudge::from_config(&config.contrastive.llm) {
            Ok(judge) => Some(Arc::new(judge) as Arc<dyn RelatednessJudge>),
            Err(err) => {
                render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
                anyhow::bail!("contrastive judge unavailable");
            }
        }
    } else {
        None
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let cancel = CancellationToken::new();
    let result = runtime.block_on(async {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                token.cancel();
            }
        });
        engine
            .infer_with_judge(&objects, embeddings.as_ref(), judge, &cancel)
            .await
    });

    match result {
        Ok(graph) => Ok(graph),
        Err(err) => {
            render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
            anyhow::bail!("inference failed");
        }
    }
}
