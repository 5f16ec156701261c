use anyhow::{Context, Result};
use buckify_graph::BuckCli;
use buckify_indexer::ClassIndexBuild;
use buckify_protocol::BuildTarget;
use clap::{Args, Parser, Subcommand};
use config::SynthesizerConfig;
use pipeline::{IndexSummary, Pipeline, RunSummary};
use std::env;
use std::path::PathBuf;

mod config;
mod pipeline;
mod report;

/// Exit status when a dependency cycle needs manual repair
const CYCLE_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(name = "buckify")]
#[command(about = "Synthesize Buck build files for Java and Android projects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Config file (default: buckify.toml in the project root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Buck executable
    #[arg(long, global = true)]
    buck: Option<PathBuf>,

    /// Emit a separate rule for interface sources
    #[arg(long, global = true)]
    split_interfaces: bool,

    /// Print the summary as JSON (implies --quiet)
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the project, generate rules and repair them until they build (default)
    Run(RunArgs),

    /// Generate build files for source directories without one
    Generate(GenerateArgs),

    /// Build targets and add the dependencies the build tool asks for
    Converge(ConvergeArgs),

    /// Analyze the dependency cycle reported by the build tool
    Cycle,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Stop repairing after this many passes
    #[arg(long)]
    max_passes: Option<usize>,

    /// Gradle cache holding resolved artifacts
    #[arg(long)]
    gradle_cache: Option<PathBuf>,

    /// Build file receiving third-party rules
    #[arg(long, alias = "third_party_buck")]
    third_party_build_file: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    /// Do not call the build tool; imports resolve against local sources only
    #[arg(long)]
    offline: bool,
}

#[derive(Args)]
struct ConvergeArgs {
    /// Targets to repair (default: every java_library and android_library)
    targets: Vec<String>,

    /// Stop repairing after this many passes
    #[arg(long)]
    max_passes: Option<usize>,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = SynthesizerConfig::load(&cli.project, cli.config.as_deref())?;
    config.apply_env(|key| env::var(key).ok());
    if let Some(buck) = cli.buck.take() {
        config.buck = buck;
    }
    if cli.split_interfaces {
        config.split_interfaces = true;
    }

    let tool = BuckCli::new(&config.buck, &config.project_root);
    let summary = match cli.command.take().unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            if args.max_passes.is_some() {
                config.max_passes = args.max_passes;
            }
            if args.gradle_cache.is_some() {
                config.gradle_cache = args.gradle_cache;
            }
            if let Some(path) = args.third_party_build_file {
                config.third_party_build_file = path;
            }
            run_all(&Pipeline::new(&config, &tool))?
        }
        Commands::Generate(args) => run_generate(&Pipeline::new(&config, &tool), args.offline)?,
        Commands::Converge(args) => {
            if args.max_passes.is_some() {
                config.max_passes = args.max_passes;
            }
            run_converge(&Pipeline::new(&config, &tool), &args.targets)?
        }
        Commands::Cycle => run_cycle(&Pipeline::new(&config, &tool))?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::render_summary(&summary));
    }

    if summary.has_cycles() {
        std::process::exit(CYCLE_EXIT_CODE);
    }
    Ok(())
}

fn run_all(pipeline: &Pipeline<'_>) -> Result<RunSummary> {
    let mut summary = RunSummary {
        project: Some(pipeline.prepare_project()?),
        ..RunSummary::default()
    };

    let source_roots = pipeline.source_roots()?;
    let index = pipeline.class_index()?;
    summary.class_index = Some(IndexSummary::of(&index));

    let mut platform = index.platform.clone();
    let generation = pipeline.generate(&index, &source_roots, &mut platform)?;
    summary.suspected_cycles = pipeline.suspected_cycles(&generation.targets)?;

    let convergence = pipeline.converge(&generation.targets, &mut platform)?;
    if convergence.cycles.is_empty() {
        summary.compile = Some(pipeline.compile_report(&generation.targets)?);
    } else {
        summary.cycles = pipeline.analyze_cycles(&convergence.cycles)?;
    }

    summary.generation = Some(generation.stats);
    summary.rules = generation.rules;
    summary.convergence = Some(convergence);
    Ok(summary)
}

fn run_generate(pipeline: &Pipeline<'_>, offline: bool) -> Result<RunSummary> {
    let source_roots = pipeline.source_roots()?;
    let index = if offline {
        ClassIndexBuild::default()
    } else {
        pipeline.class_index()?
    };

    let mut platform = index.platform.clone();
    let generation = pipeline.generate(&index, &source_roots, &mut platform)?;
    let suspected_cycles = pipeline.suspected_cycles(&generation.targets)?;
    Ok(RunSummary {
        class_index: (!offline).then(|| IndexSummary::of(&index)),
        generation: Some(generation.stats),
        rules: generation.rules,
        suspected_cycles,
        ..RunSummary::default()
    })
}

fn run_converge(pipeline: &Pipeline<'_>, raw_targets: &[String]) -> Result<RunSummary> {
    let targets = if raw_targets.is_empty() {
        pipeline.declared_libraries()?
    } else {
        raw_targets
            .iter()
            .map(|raw| BuildTarget::parse(raw).with_context(|| format!("Invalid target {raw}")))
            .collect::<Result<Vec<_>>>()?
    };

    let index = pipeline.class_index()?;
    let mut platform = pipeline.existing_platform_libraries(&index)?;
    let convergence = pipeline.converge(&targets, &mut platform)?;
    let cycles = if convergence.cycles.is_empty() {
        Vec::new()
    } else {
        pipeline.analyze_cycles(&convergence.cycles)?
    };
    Ok(RunSummary {
        class_index: Some(IndexSummary::of(&index)),
        convergence: Some(convergence),
        cycles,
        ..RunSummary::default()
    })
}

fn run_cycle(pipeline: &Pipeline<'_>) -> Result<RunSummary> {
    let cycles = pipeline.analyze_cycles(&[])?;
    if cycles.is_empty() {
        log::info!("No dependency cycle reported");
    }
    Ok(RunSummary {
        cycles,
        ..RunSummary::default()
    })
}
