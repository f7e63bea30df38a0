//! Aspectra command-line tool
//!
//! Extracts aspects from tagged documents, tags raw text with a neural
//! model, and evaluates predicted spans against gold annotations.

use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aspectra_core::dataset::{load_documents, read_jsonl};
use aspectra_core::{
    AspectExtractor, Document, Evaluator, Extraction, ExtractorConfig, MarkerStyle, NeuralTagger,
    SequenceTagger,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "aspectra")]
#[command(about = "Extract scientific aspects from Russian abstracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extractor configuration (JSON)
    #[arg(short, long, global = true, env = "ASPECTRA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract aspects from tagged documents (JSONL or TSV)
    Extract {
        /// Input file; JSONL documents are read from stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Grouped)]
        format: OutputFormat,
    },
    /// Score predicted spans against gold spans
    Evaluate {
        #[arg(long)]
        gold: PathBuf,

        #[arg(long)]
        pred: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tag raw text with a neural model and print its aspects
    Tag {
        /// Model directory (config.json, tokenizer.json, model.safetensors)
        #[arg(short, long, env = "ASPECTRA_MODEL")]
        model: PathBuf,

        /// Text to tag; stdin lines are tagged when omitted
        text: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Grouped)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Numbered aspects per category
    Grouped,
    /// Source text with ANSI-colored spans
    Color,
    /// Source text with `<CATEGORY>` markers
    Tags,
    /// One JSON object per document
    Json,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ExtractorConfig> {
    match path {
        Some(path) => ExtractorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ExtractorConfig::default()),
    }
}

fn write_extraction(
    out: &mut impl Write,
    extractor: &AspectExtractor,
    doc: &Document,
    extraction: &Extraction,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Grouped => {
            if let Some(id) = &extraction.id {
                writeln!(out, "# {id}")?;
            }
            write!(out, "{}", extractor.renderer().grouped(&extraction.aspects))?;
            writeln!(out)?;
        }
        OutputFormat::Color | OutputFormat::Tags => {
            let style = if format == OutputFormat::Color {
                MarkerStyle::Ansi
            } else {
                MarkerStyle::Tags
            };
            let renderer = aspectra_core::Renderer::new(extractor.scheme(), style);
            writeln!(out, "{}", renderer.colorize(doc.text(), &extraction.mentions()))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, extraction)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn run_extract(extractor: &AspectExtractor, input: Option<&Path>, format: OutputFormat) -> Result<()> {
    let docs = match input {
        Some(path) => load_documents(path)
            .with_context(|| format!("Failed to read documents from {}", path.display()))?,
        None => read_jsonl(io::stdin().lock()).context("Failed to read documents from stdin")?,
    };
    info!(documents = docs.len(), "extracting aspects");

    let extractions = extractor.extract_batch(&docs);
    let recovered: usize = extractions
        .iter()
        .map(|e| {
            let r = &e.report;
            r.malformed_continuations + r.unknown_tags + r.dropped_labels + r.empty_spans
        })
        .sum();
    if recovered > 0 {
        info!(recovered, "labels recovered during reconstruction");
    }

    let mut out = BufWriter::new(io::stdout().lock());
    for (doc, extraction) in docs.iter().zip(&extractions) {
        write_extraction(&mut out, extractor, doc, extraction, format)?;
    }
    out.flush()?;
    Ok(())
}

/// Pairs gold and predicted documents by position, checking ids when both
/// sides carry them.
fn pair_documents<'a>(
    gold: &'a [Document],
    pred: &'a [Document],
) -> Result<Vec<(&'a Document, &'a Document)>> {
    if gold.len() != pred.len() {
        anyhow::bail!(
            "Gold has {} documents but predictions have {}",
            gold.len(),
            pred.len()
        );
    }
    gold.iter()
        .zip(pred)
        .enumerate()
        .map(|(i, (g, p))| match (g.id(), p.id()) {
            (Some(gid), Some(pid)) if gid != pid => {
                anyhow::bail!("Document {} has id {gid:?} in gold but {pid:?} in predictions", i + 1)
            }
            _ => Ok((g, p)),
        })
        .collect()
}

fn run_evaluate(extractor: &AspectExtractor, gold: &Path, pred: &Path, json: bool) -> Result<()> {
    let gold_docs = load_documents(gold)
        .with_context(|| format!("Failed to read gold documents from {}", gold.display()))?;
    let pred_docs = load_documents(pred)
        .with_context(|| format!("Failed to read predictions from {}", pred.display()))?;

    let mut evaluator = Evaluator::new(extractor.scheme());
    for (g, p) in pair_documents(&gold_docs, &pred_docs)? {
        let gold_mentions = extractor.extract_document(g).mentions();
        let pred_mentions = extractor.extract_document(p).mentions();
        evaluator.add_document(&gold_mentions, &pred_mentions);
    }
    let report = evaluator.report();
    debug!(documents = report.documents, "evaluation finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn run_tag(
    extractor: &AspectExtractor,
    model: &Path,
    text: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let tagger = NeuralTagger::load(model, extractor.scheme())
        .with_context(|| format!("Failed to load model from {}", model.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut tag_one = |line: &str| -> Result<()> {
        let doc = tagger.tag(line).context("Tagging failed")?;
        let extraction = extractor.extract_document(&doc);
        write_extraction(&mut out, extractor, &doc, &extraction, format)
    };

    match text {
        Some(text) => tag_one(text)?,
        None => {
            for line in io::stdin().lock().lines() {
                let line = line?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                tag_one(line)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let extractor = AspectExtractor::new(config).context("Invalid extractor configuration")?;

    match cli.command {
        Commands::Extract { input, format } => run_extract(&extractor, input.as_deref(), format),
        Commands::Evaluate { gold, pred, json } => run_evaluate(&extractor, &gold, &pred, json),
        Commands::Tag {
            model,
            text,
            format,
        } => run_tag(&extractor, &model, text.as_deref(), format),
    }
}
