use anyhow::{Context, Result};
use cipher_speed_bench::dataset::{self, CorpusConfig, DEFAULT_CORPUS_FILE};
use cipher_speed_bench::harness::{ArtifactRetention, RunnerConfig};
use cipher_speed_bench::runner::{self, Progress};
use cipher_speed_bench::schema::SpeedTestReport;
use cipher_speed_bench::tool::ProcessInvoker;
use cipher_speed_bench::CipherMode;
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Size of the generated hex text in megabytes.
    #[arg(long, default_value_t = 5)]
    size_mb: u64,

    /// Corpus file to write (overwritten if present).
    #[arg(long, short = 'o', value_name = "FILE", default_value = DEFAULT_CORPUS_FILE)]
    output: PathBuf,

    /// Seed for a reproducible corpus. Omit to use the OS random source.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// External cipher executable.
    #[arg(long, value_name = "PATH", env = "CIPHER_BENCH_TOOL", default_value = "../../e1des")]
    tool: PathBuf,

    /// Corpus file to encrypt.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CORPUS_FILE)]
    corpus: PathBuf,

    /// Key file, passed through to the tool untouched.
    #[arg(long, value_name = "FILE", default_value = "../../key.txt")]
    key: PathBuf,

    /// IV file, passed through to the tool untouched.
    #[arg(long, value_name = "FILE", default_value = "../../iv.txt")]
    iv: PathBuf,

    /// Mode to benchmark. Repeat to select several; defaults to all four in
    /// ECB, CBC, CFB, OFB order.
    #[arg(long = "mode", short = 'm', value_enum, ignore_case = true)]
    modes: Vec<CipherMode>,

    /// Tool invocations per batch.
    #[arg(long, short = 'n', default_value_t = 20)]
    repetitions: u32,

    /// What to do with the tool's output files.
    #[arg(long, value_enum, default_value_t = ArtifactRetention::None)]
    retain_artifacts: ArtifactRetention,

    /// Directory for artifacts and the report.
    #[arg(long, value_name = "DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Skip the existence checks on the tool and input files.
    #[arg(long, default_value_t = false)]
    no_preflight: bool,

    /// Also write a JSON summary here.
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

impl RunArgs {
    fn to_config(&self) -> RunnerConfig {
        let modes = if self.modes.is_empty() {
            CipherMode::ALL.to_vec()
        } else {
            self.modes.clone()
        };
        RunnerConfig {
            tool: self.tool.clone(),
            corpus: self.corpus.clone(),
            key: self.key.clone(),
            iv: self.iv.clone(),
            modes,
            repetitions: self.repetitions,
            retention: self.retain_artifacts,
            work_dir: self.work_dir.clone(),
            preflight: !self.no_preflight,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a file of random hexadecimal text to use as benchmark input.
    Generate(GenerateArgs),

    /// Time encrypt and decrypt batches for each mode and write a report.
    Run(RunArgs),

    /// Generate a fresh corpus at `--corpus`, then run the benchmark on it.
    Suite {
        #[arg(long, default_value_t = 5)]
        size_mb: u64,

        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Parser, Debug)]
#[command(name = "cipher-speed-bench", version)]
#[command(about = "Throughput benchmarks for an external block-cipher executable")]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors; no progress bar.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}

fn generate(cfg: &CorpusConfig) -> Result<()> {
    let meta = dataset::write_corpus(cfg)
        .with_context(|| format!("writing corpus to {}", cfg.path.display()))?;
    info!(
        "created {} with {:.2} MB of random hexadecimal data (sha256 {})",
        meta.path.display(),
        meta.size_mb,
        meta.sha256
    );
    Ok(())
}

fn run(args: &RunArgs, quiet: bool) -> Result<()> {
    let config = args.to_config();
    let progress = if quiet {
        Progress::hidden()
    } else {
        Progress::stderr()
    };

    let summary = runner::run(&config, &ProcessInvoker, &progress).context("benchmark run failed")?;

    if let Some(json) = &args.json {
        SpeedTestReport::from_summary(&config, &summary)
            .write_json(json)
            .with_context(|| format!("writing JSON summary to {}", json.display()))?;
    }

    println!("Report written to {}", summary.report_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    match &cli.cmd {
        Command::Generate(args) => generate(&CorpusConfig {
            size_mb: args.size_mb,
            path: args.output.clone(),
            seed: args.seed,
        }),
        Command::Run(args) => run(args, cli.quiet),
        Command::Suite { size_mb, seed, run: args } => {
            generate(&CorpusConfig {
                size_mb: *size_mb,
                path: args.corpus.clone(),
                seed: *seed,
            })?;
            run(args, cli.quiet)
        }
    }
}
