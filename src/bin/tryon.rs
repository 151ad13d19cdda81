//! CLI for tryon - scene variations of a reference portrait.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tryon::image::providers::DEFAULT_BASE_URL;
use tryon::{
    CredentialOptions, FailurePolicy, GeminiModel, GeminiProvider, Preset, ReferenceImage,
    ResolvedKey, Retrying, RunEvent, RunnerConfig, ScenarioRunner, ScenarioSet, TryOnError,
};

#[derive(Parser)]
#[command(name = "tryon")]
#[command(about = "Generate try-on scene variations of a reference portrait via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one image per scenario from a reference portrait
    Generate(GenerateArgs),

    /// List the built-in scenarios
    Scenarios(ScenariosArgs),

    /// Check that an API key is configured
    CheckKey(CheckKeyArgs),
}

#[derive(Args)]
struct KeyArgs {
    /// API key (overrides GOOGLE_API_KEY / GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Dotenv file to read (default: nearest .env from the working directory up)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Let .env values replace variables already set in the environment
    #[arg(long)]
    env_override: bool,
}

impl KeyArgs {
    fn options(&self) -> CredentialOptions {
        CredentialOptions {
            explicit: self.api_key.clone(),
            env_file: self.env_file.clone(),
            env_override: self.env_override,
        }
    }

    fn resolve(&self) -> tryon::Result<ResolvedKey> {
        self.options().resolve()
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Reference portrait
    #[arg(short, long)]
    image: PathBuf,

    /// Output prefix; files are written as <OUTPUT>_<label>.<ext>
    #[arg(short, long, default_value = "output/generated_image")]
    output: PathBuf,

    /// Gemini model name
    #[arg(short, long, default_value = GeminiModel::NanoBanana.as_str())]
    model: String,

    /// Built-in scenario list
    #[arg(long, value_enum, default_value = "streetwear")]
    preset: PresetArg,

    /// Run only these scenarios from the preset
    #[arg(long, num_args = 1.., conflicts_with = "prompt")]
    only: Vec<String>,

    /// Custom prompt; generates a single image instead of the preset
    #[arg(short, long)]
    prompt: Option<String>,

    /// Label for the custom prompt
    #[arg(long, requires = "prompt")]
    label: Option<String>,

    /// Stop at the first failed scenario
    #[arg(long)]
    fail_fast: bool,

    /// Scenarios generated at the same time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=8))]
    concurrency: u16,

    /// Retries for rate-limited or failed requests
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Use the single-response endpoint instead of streaming
    #[arg(long)]
    no_stream: bool,

    /// API endpoint (e.g. a proxy)
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(flatten)]
    key: KeyArgs,
}

#[derive(Args)]
struct ScenariosArgs {
    /// Only list this preset
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
}

#[derive(Args)]
struct CheckKeyArgs {
    /// Also call the API to confirm the key is accepted
    #[arg(long)]
    verify: bool,

    /// Model used for --verify
    #[arg(short, long, default_value = GeminiModel::NanoBanana.as_str())]
    model: String,

    #[command(flatten)]
    key: KeyArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Streetwear,
    Travel,
    Lifestyle,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Streetwear => Preset::Streetwear,
            PresetArg::Travel => Preset::Travel,
            PresetArg::Lifestyle => Preset::Lifestyle,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            let cwd = std::env::current_dir()?;
            generate(args, cli.json, &cwd, |name| std::env::var(name).ok()).await?;
        }
        Commands::Scenarios(args) => {
            list_scenarios(args, cli.json)?;
        }
        Commands::CheckKey(args) => {
            check_key(args, cli.json).await?;
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let default = if verbose { "tryon=debug,info" } else { "tryon=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn build_scenarios(args: &GenerateArgs) -> tryon::Result<ScenarioSet> {
    match args.prompt {
        Some(ref prompt) => ScenarioSet::custom(args.label.as_deref(), prompt.as_str()),
        None => ScenarioSet::from_preset(args.preset.into()).only(args.only.as_slice()),
    }
}

async fn generate<F>(
    args: GenerateArgs,
    json_output: bool,
    cwd: &Path,
    env_lookup: F,
) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Everything fatal is checked before the first request or file write.
    let resolved = args.key.options().resolve_with(cwd, env_lookup)?;
    let reference = ReferenceImage::load(&args.image)?;
    let scenarios = build_scenarios(&args)?;

    let mut builder = GeminiProvider::builder()
        .api_key(resolved.key)
        .model(args.model.as_str())
        .base_url(args.base_url.as_str())
        .streaming(!args.no_stream);
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let provider = Retrying::new(builder.build()?, args.retries);

    let policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::Continue
    };
    let config = RunnerConfig::default()
        .with_policy(policy)
        .with_concurrency(usize::from(args.concurrency));

    let mut runner = ScenarioRunner::new(provider, config);
    if !json_output {
        runner = runner.with_observer(Arc::new(print_event));
        println!(
            "Generating {} scenario(s) from {} ({} bytes) via {}",
            scenarios.len(),
            args.image.display(),
            reference.size(),
            args.model
        );
    }

    let report = match runner.run(&reference, &scenarios, &args.output).await {
        Ok(report) => report,
        Err(e @ TryOnError::ScenarioFailed { .. }) => {
            if json_output {
                let result = serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let failed = report.failed().count();

    if json_output {
        let result = serde_json::json!({
            "success": failed == 0,
            "model": args.model,
            "output_base": args.output.display().to_string(),
            "scenarios": &report.outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "\nDone: {} saved, {} failed",
            report.succeeded().count(),
            failed
        );
    }

    if failed > 0 {
        let labels: Vec<&str> = report.failed().map(|o| o.label.as_str()).collect();
        anyhow::bail!(
            "{failed} of {} scenario(s) failed: {}",
            report.outcomes.len(),
            labels.join(", ")
        );
    }

    Ok(())
}

fn print_event(event: &RunEvent<'_>) {
    match event {
        RunEvent::Started {
            label,
            index,
            total,
        } => println!("[{}/{}] Generating {} ...", index + 1, total, label),
        RunEvent::Text { text, .. } => println!("    {}", text.trim()),
        RunEvent::Saved {
            path, size_bytes, ..
        } => println!("    saved -> {} ({} bytes)", display(path), size_bytes),
        RunEvent::Failed { label, reason } => println!("    {} failed: {}", label, reason),
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn list_scenarios(args: ScenariosArgs, json_output: bool) -> anyhow::Result<()> {
    let presets: Vec<Preset> = match args.preset {
        Some(p) => vec![p.into()],
        None => Preset::ALL.to_vec(),
    };

    if json_output {
        let listing: Vec<_> = presets
            .iter()
            .map(|p| {
                serde_json::json!({
                    "preset": p,
                    "scenarios": p.scenarios(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for preset in presets {
            println!("{}:", preset.as_str().to_uppercase());
            for scenario in preset.scenarios() {
                println!("  {}", scenario.label);
                println!("    {}", scenario.prompt);
            }
            println!();
        }
    }

    Ok(())
}

async fn check_key(args: CheckKeyArgs, json_output: bool) -> anyhow::Result<()> {
    let resolved = args.key.resolve()?;

    let verified = if args.verify {
        let provider = GeminiProvider::builder()
            .api_key(resolved.key.clone())
            .model(args.model.as_str())
            .build()?;
        provider.health_check().await?;
        Some(true)
    } else {
        None
    };

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "source": resolved.source.to_string(),
            "key": resolved.key.masked(),
            "verified": verified,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "API key loaded from {}: {}",
            resolved.source,
            resolved.key.masked()
        );
        if verified.is_some() {
            println!("Key accepted for model {}", args.model);
        }
    }

    Ok(())
}
