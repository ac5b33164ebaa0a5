use anyhow::Result;
use clap::{Parser, Subcommand};
use idolex::config::PipelineConfig;
use idolex::models::ProvenanceTag;
use idolex::pipeline::{Paths, Pipeline};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "idolex", about = "Ido–Esperanto lexicon extraction pipeline")]
struct Cli {
    /// Data directory holding raw/, work/, out/, reports/
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the pipeline (resumes from persisted state)
    Run {
        /// Rerun every stage regardless of cached artifacts
        #[arg(long)]
        force: bool,

        /// Rerun this stage and everything downstream of it
        #[arg(long)]
        from_stage: Option<String>,

        /// Frequency-gate threshold for Wikipedia-only entries
        #[arg(long)]
        wiki_top_n: Option<usize>,

        /// Log progress every N pages
        #[arg(long)]
        progress_every: Option<u64>,

        /// Exclude a source (repeatable), e.g. en_wiktionary_via
        #[arg(long = "disable-source")]
        disabled_sources: Vec<String>,
    },
    /// Print the per-stage status table
    Status,
}

fn parse_tag(name: &str) -> Option<ProvenanceTag> {
    ProvenanceTag::ALL.iter().copied().find(|t| t.as_str() == name)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = Paths::new(&cli.data_dir);

    match cli.command {
        Command::Run {
            force,
            from_stage,
            wiki_top_n,
            progress_every,
            disabled_sources,
        } => {
            let mut cfg = PipelineConfig::default();
            cfg.force = force;
            cfg.from_stage = from_stage;
            if let Some(n) = wiki_top_n {
                cfg.wiki_top_n = n;
            }
            if let Some(n) = progress_every {
                cfg.progress_every = n.max(1);
            }
            for name in &disabled_sources {
                match parse_tag(name) {
                    Some(tag) => cfg.sources.set_enabled(tag, false),
                    None => anyhow::bail!("unknown source tag: {name}"),
                }
            }

            let start = Instant::now();
            Pipeline::new(paths, cfg).run()?;
            println!("Pipeline finished in {:.1}s", start.elapsed().as_secs_f64());
        }
        Command::Status => {
            let pipeline = Pipeline::new(paths, PipelineConfig::default());
            for (name, state) in pipeline.status()? {
                let mut line = format!("{:<24} {}", name, state.status.as_str());
                if let Some(err) = &state.error {
                    line.push_str(&format!("  ({err})"));
                }
                println!("{line}");
            }
        }
    }
    Ok(())
}
