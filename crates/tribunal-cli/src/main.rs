//! Tribunal CLI - Command-line interface for multi-judge dispute resolution

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tribunal_core::{
    mock_panel, verify_result, AggregatedResult, Ed25519Signer, JobStatus, ResultSigner, Tribunal,
    TribunalConfig,
};

#[derive(Parser)]
#[command(name = "tribunal")]
#[command(about = "Tribunal - Multi-judge AI dispute resolution with signed verdicts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Resolve a dispute and print the signed job
    Resolve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Dispute text file (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Use scripted judges instead of calling providers
        #[arg(long)]
        mock: bool,
    },
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "tribunal.json")]
        config: PathBuf,
    },
    /// Generate a signing seed and its public key
    Keygen,
    /// Verify the signature of a result or job JSON file
    Verify {
        /// Result or job JSON file
        file: PathBuf,
        /// Trusted public key (hex)
        #[arg(short = 'k', long)]
        public_key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Resolve { config, file, mock }) => resolve(config, file, mock).await,
        Some(Commands::Check { config }) => check(&config),
        Some(Commands::Keygen) => {
            let signer = Ed25519Signer::generate();
            println!("seed:       {}", signer.seed_hex());
            println!("public key: {}", signer.public_key_hex());
            Ok(())
        }
        Some(Commands::Verify { file, public_key }) => verify(&file, &public_key),
        None => {
            println!("Tribunal v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn resolve(config: Option<PathBuf>, file: Option<PathBuf>, mock: bool) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;
    let text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read dispute from {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("cannot read dispute from stdin")?;
            text
        }
    };

    let tribunal = if mock {
        info!("Mock mode: judges are scripted");
        let judges = mock_panel(&config.judges);
        Tribunal::with_judges(config, judges)?
    } else {
        Tribunal::new(config)?
    };

    let job = tribunal.resolve(text).await?;
    println!("{}", serde_json::to_string_pretty(&job)?);

    if job.status == JobStatus::Failed {
        match job.error {
            Some(failure) => bail!("job {} failed: {}", job.id, failure),
            None => bail!("job {} failed", job.id),
        }
    }
    info!("Verify with public key {}", tribunal.public_key());
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = TribunalConfig::from_file(path)?;
    config.validate()?;
    println!("Configuration {} is valid", path.display());
    for judge in &config.judges {
        let key = match judge.kind.wire_format() {
            None => "scripted".to_string(),
            Some(_) if judge.resolve_api_key().is_some() => "key found".to_string(),
            Some(_) => format!("MISSING {}", judge.key_env()),
        };
        println!(
            "  {:<12} {:<10} {:<28} weight {:<5} {}",
            judge.id,
            format!("{:?}", judge.kind),
            judge.model,
            judge.weight.unwrap_or(config.scoring.default_weight),
            key
        );
    }
    println!(
        "  quorum {}, margin {}, floor {}, per-call {} ms, deadline {} ms",
        config.scoring.quorum,
        config.scoring.winning_margin,
        config.scoring.confidence_floor,
        config.timeouts.per_call_ms,
        config.timeouts.job_deadline_ms
    );
    Ok(())
}

fn verify(path: &Path, public_key: &str) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let result = parse_result(&json)?;
    verify_result(&result, public_key)?;
    println!(
        "Signature valid: job {} decided {} ({:.1}%)",
        result.job_id,
        result.final_decision,
        result.final_confidence * 100.0
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TribunalConfig> {
    match path {
        Some(path) => Ok(TribunalConfig::from_file(path)?),
        None => Ok(TribunalConfig::default()),
    }
}

/// Accepts a bare result or a job wrapping one.
fn parse_result(json: &str) -> anyhow::Result<AggregatedResult> {
    let mut value: serde_json::Value = serde_json::from_str(json).context("not valid JSON")?;
    if value.get("status").is_some() {
        value = match value.get_mut("result").map(serde_json::Value::take) {
            Some(result) if !result.is_null() => result,
            _ => bail!("job has no result"),
        };
    }
    serde_json::from_value(value).context("not a tribunal result")
}
