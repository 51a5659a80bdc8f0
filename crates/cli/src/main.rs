//! diffmerge command-line tool.
//!
//! Provides subcommands for two-way diffs at line, word and character
//! granularity, three-way merges with conflict markers, ad-hoc merge bases,
//! policy-aware equality checks, and generating / validating configuration
//! files.

mod style;

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use diffmerge_core::cancellation::{CancellationChecker, Deadline, NeverCancelled};
use diffmerge_core::comparison::{ComparisonManager, ComparisonPolicy};
use diffmerge_core::config::{ComparisonConfig, DEFAULT_CONFIG_TOML};
use diffmerge_core::errors::ComparisonError;
use diffmerge_core::merger::Merger;
use diffmerge_core::models::{DiffFragment, LineFragment, MergeKind, MergeLineFragment};

const DEFAULT_CONFIG_PATH: &str = "./diffmerge.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// diffmerge command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "diffmerge",
    version,
    about = "Compare texts and merge three-way edits"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Abort comparisons that run longer than this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two files.
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Comparison granularity.
        #[arg(short, long, value_enum)]
        granularity: Option<Granularity>,

        /// Comparison policy: default, trim_whitespace, ignore_whitespace.
        #[arg(short, long)]
        policy: Option<ComparisonPolicy>,

        /// Squash touching line fragments.
        #[arg(long)]
        squash: bool,

        /// Trim equal lines from fragment edges.
        #[arg(long)]
        trim: bool,

        /// Print fragments as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Three-way merge of LEFT and RIGHT against BASE.
    Merge {
        left: PathBuf,
        base: PathBuf,
        right: PathBuf,

        /// Comparison policy: default, trim_whitespace, ignore_whitespace.
        #[arg(short, long)]
        policy: Option<ComparisonPolicy>,

        /// Print merge windows instead of merged text.
        #[arg(long)]
        fragments: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Write merged text to this path instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the lines two files share, usable as a merge base.
    Base {
        left: PathBuf,
        right: PathBuf,

        /// Comparison policy: default, trim_whitespace, ignore_whitespace.
        #[arg(short, long)]
        policy: Option<ComparisonPolicy>,
    },

    /// Exit 0 if two files are equal under the policy, 1 otherwise.
    Equals {
        a: PathBuf,
        b: PathBuf,

        /// Comparison policy: default, trim_whitespace, ignore_whitespace.
        #[arg(short, long)]
        policy: Option<ComparisonPolicy>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Granularity {
    Lines,
    Inner,
    Words,
    Chars,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) if !matches!(cli.command, Commands::Validate) => load_config(path)?,
        _ => ComparisonConfig::default(),
    };
    init_logging(&config, cli.verbose);

    let checker: Box<dyn CancellationChecker> = match cli.timeout_ms {
        Some(ms) => Box::new(Deadline::after(Duration::from_millis(ms))),
        None => Box::new(NeverCancelled),
    };
    let ctx = Session {
        manager: ComparisonManager::from_config(&config),
        checker: checker.as_ref(),
    };

    match cli.command {
        Commands::Diff {
            old,
            new,
            granularity,
            policy,
            squash,
            trim,
            json,
        } => {
            let opts = DiffOptions {
                granularity: granularity.unwrap_or(if config.comparison.inner {
                    Granularity::Inner
                } else {
                    Granularity::Lines
                }),
                policy: policy.unwrap_or(config.comparison.policy),
                squash: squash || config.post_process.squash,
                trim: trim || config.post_process.trim,
                json,
            };
            cmd_diff(&ctx, &old, &new, &opts)
        }
        Commands::Merge {
            left,
            base,
            right,
            policy,
            fragments,
            json,
            output,
        } => {
            let policy = policy.unwrap_or(config.comparison.policy);
            cmd_merge(
                &ctx,
                [&left, &base, &right],
                policy,
                fragments,
                json,
                output.as_deref(),
            )
        }
        Commands::Base {
            left,
            right,
            policy,
        } => cmd_base(
            &ctx,
            &left,
            &right,
            policy.unwrap_or(config.comparison.policy),
        ),
        Commands::Equals { a, b, policy } => cmd_equals(
            &ctx,
            &a,
            &b,
            policy.unwrap_or(config.comparison.policy),
        ),
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            cmd_validate(&path)
        }
    }
}

/// Engine and checker shared by the subcommands.
struct Session<'a> {
    manager: ComparisonManager,
    checker: &'a dyn CancellationChecker,
}

// ---------------------------------------------------------------------------
// Config & input helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<ComparisonConfig> {
    ComparisonConfig::load_and_validate(path).context("failed to load configuration file")
}

fn init_logging(config: &ComparisonConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Read a file and normalize `\r\n` and `\r` line separators to `\n`.
fn read_text(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if !raw.contains('\r') {
        return Ok(raw);
    }
    Ok(raw.replace("\r\n", "\n").replace('\r', "\n"))
}

fn log_timeout(err: ComparisonError) -> ComparisonError {
    if err.is_cancelled() {
        warn!("comparison timed out");
    }
    err
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

struct DiffOptions {
    granularity: Granularity,
    policy: ComparisonPolicy,
    squash: bool,
    trim: bool,
    json: bool,
}

fn cmd_diff(
    ctx: &Session<'_>,
    old_path: &Path,
    new_path: &Path,
    opts: &DiffOptions,
) -> Result<ExitCode> {
    let old = read_text(old_path)?;
    let new = read_text(new_path)?;
    let manager = &ctx.manager;

    match opts.granularity {
        Granularity::Lines | Granularity::Inner => {
            let fragments = if opts.granularity == Granularity::Inner {
                manager.compare_lines_inner(&old, &new, opts.policy, ctx.checker)
            } else {
                manager.compare_lines(&old, &new, opts.policy, ctx.checker)
            }
            .map_err(log_timeout)
            .context("line comparison failed")?;
            let fragments = manager.process_blocks(
                fragments,
                &old,
                &new,
                opts.policy,
                opts.squash,
                opts.trim,
            );

            if opts.json {
                println!("{}", serde_json::to_string_pretty(&fragments)?);
            } else {
                print_line_fragments(&fragments, &old, &new);
            }
        }
        Granularity::Words | Granularity::Chars => {
            let fragments = if opts.granularity == Granularity::Words {
                manager.compare_words(&old, &new, opts.policy, ctx.checker)
            } else {
                manager.compare_chars(&old, &new, opts.policy, ctx.checker)
            }
            .map_err(log_timeout)
            .context("comparison failed")?;

            if opts.json {
                println!("{}", serde_json::to_string_pretty(&fragments)?);
            } else {
                print_fragments(&fragments, &old, &new);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_line_fragments(fragments: &[LineFragment], old: &str, new: &str) {
    if fragments.is_empty() {
        println!("{}", style::success("No differences"));
        return;
    }
    for f in fragments {
        println!(
            "{}",
            style::dim(&format!(
                "@@ -{},{} +{},{} @@",
                f.lines1.start + 1,
                f.lines1.len(),
                f.lines2.start + 1,
                f.lines2.len()
            ))
        );
        let block1 = &old[f.offsets1.clone()];
        let block2 = &new[f.offsets2.clone()];
        let inner = f.inner.as_deref().unwrap_or_default();
        let ranges1: Vec<_> = inner.iter().map(|d| d.range1.clone()).collect();
        let ranges2: Vec<_> = inner.iter().map(|d| d.range2.clone()).collect();
        let lines1 = emphasize(block1, &ranges1, style::removed, style::removed_emphasis);
        let lines2 = emphasize(block2, &ranges2, style::added, style::added_emphasis);
        for line in lines1 {
            println!("{}{}", style::removed("-"), line);
        }
        for line in lines2 {
            println!("{}{}", style::added("+"), line);
        }
    }
    println!();
    println!("{} changed block(s)", fragments.len());
}

/// Split `block` into styled display lines, applying `strong` to `ranges`
/// and `plain` to everything else.
fn emphasize(
    block: &str,
    ranges: &[Range<usize>],
    plain: fn(&str) -> String,
    strong: fn(&str) -> String,
) -> Vec<String> {
    let mut segments: Vec<(Range<usize>, bool)> = Vec::new();
    let mut pos = 0;
    for range in ranges {
        if range.start > pos {
            segments.push((pos..range.start, false));
        }
        if !range.is_empty() {
            segments.push((range.clone(), true));
        }
        pos = range.end;
    }
    if pos < block.len() {
        segments.push((pos..block.len(), false));
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for (range, is_strong) in segments {
        for (i, piece) in block[range].split('\n').enumerate() {
            if i > 0 {
                lines.push(std::mem::take(&mut current));
            }
            if !piece.is_empty() {
                let paint = if is_strong { strong } else { plain };
                current.push_str(&paint(piece));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn print_fragments(fragments: &[DiffFragment], old: &str, new: &str) {
    if fragments.is_empty() {
        println!("{}", style::success("No differences"));
        return;
    }
    for f in fragments {
        println!(
            "{} {:?} {} {:?}",
            style::dim(&format!("{:>6}..{:<6}", f.range1.start, f.range1.end)),
            &old[f.range1.clone()],
            style::dim("->"),
            &new[f.range2.clone()],
        );
    }
    println!();
    println!("{} fragment(s)", fragments.len());
}

// ---------------------------------------------------------------------------
// merge / base / equals
// ---------------------------------------------------------------------------

fn cmd_merge(
    ctx: &Session<'_>,
    [left_path, base_path, right_path]: [&PathBuf; 3],
    policy: ComparisonPolicy,
    fragments_only: bool,
    json: bool,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let left = read_text(left_path)?;
    let base = read_text(base_path)?;
    let right = read_text(right_path)?;

    if fragments_only {
        let fragments = ctx
            .manager
            .merge_lines(&left, &base, &right, policy, ctx.checker)
            .map_err(log_timeout)
            .context("merge failed")?;
        if json {
            println!("{}", serde_json::to_string_pretty(&fragments)?);
        } else {
            print_merge_fragments(&fragments);
        }
        let conflicted = fragments.iter().any(|f| f.kind == MergeKind::Conflict);
        return Ok(if conflicted {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let result = Merger::new(ctx.manager)
        .three_way_merge(&base, &left, &right, policy, ctx.checker)
        .map_err(log_timeout)
        .context("merge failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(path) = output {
        std::fs::write(path, &result.merged_content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Merged content written to {}", path.display());
    } else {
        print!("{}", result.merged_content);
    }

    if result.has_conflicts {
        warn!(conflicts = result.conflict_markers.len(), "merge has conflicts");
        for marker in &result.conflict_markers {
            eprintln!(
                "{}",
                style::warn(&format!(
                    "conflict at lines {}-{}",
                    marker.start_line, marker.end_line
                ))
            );
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_merge_fragments(fragments: &[MergeLineFragment]) {
    println!(
        "{:<12} {:<12} {:<12} {:<12} IGNORED",
        "KIND", "LEFT", "BASE", "RIGHT"
    );
    println!("{}", "-".repeat(60));
    for f in fragments {
        println!(
            "{} {:<12} {:<12} {:<12} {}",
            style::kind(&format!("{:<12}", f.kind.to_string())),
            format!("{}..{}", f.left.start, f.left.end),
            format!("{}..{}", f.base.start, f.base.end),
            format!("{}..{}", f.right.start, f.right.end),
            if f.ignored { "yes" } else { "" },
        );
    }
}

fn cmd_base(
    ctx: &Session<'_>,
    left_path: &Path,
    right_path: &Path,
    policy: ComparisonPolicy,
) -> Result<ExitCode> {
    let left = read_text(left_path)?;
    let right = read_text(right_path)?;
    let base = ctx
        .manager
        .merge_lines_additions(&left, &right, policy, ctx.checker)
        .map_err(log_timeout)
        .context("failed to build merge base")?;
    print!("{}", base);
    Ok(ExitCode::SUCCESS)
}

fn cmd_equals(
    ctx: &Session<'_>,
    a_path: &Path,
    b_path: &Path,
    policy: ComparisonPolicy,
) -> Result<ExitCode> {
    let a = read_text(a_path)?;
    let b = read_text(b_path)?;
    if ctx.manager.is_equals(&a, &b, policy) {
        println!("{}", style::success(&format!("equal under {policy}")));
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", style::error(&format!("different under {policy}")));
        Ok(ExitCode::FAILURE)
    }
}

// ---------------------------------------------------------------------------
// init / validate
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<ExitCode> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG_TOML).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Pick a comparison policy and limits in the config file");
    println!(
        "  2. Validate with: diffmerge validate --config {}",
        output.display()
    );

    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(config_path: &Path) -> Result<ExitCode> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        ComparisonConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    match config.validate() {
        Ok(()) => println!("  {}", style::success("All values are valid")),
        Err(e) => {
            println!("  {}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  Policy          : {}", config.comparison.policy);
    println!("  Inner           : {}", config.comparison.inner);
    println!(
        "  Trailing line   : {}",
        if config.comparison.keep_trailing_empty_line {
            "kept"
        } else {
            "dropped"
        }
    );
    println!("  Unit product    : {}", config.limits.max_unit_product);
    println!("  Work limit      : {}", config.limits.max_work);
    println!("  Check interval  : {}", config.limits.check_interval);
    println!(
        "  Post-process    : squash={} trim={}",
        config.post_process.squash, config.post_process.trim
    );
    println!("  Log level       : {}", config.logging.level);
    println!();
    println!("Configuration is valid.");

    Ok(ExitCode::SUCCESS)
}
