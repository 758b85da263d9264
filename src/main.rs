mod approval;
mod model;
mod mutation;
mod oracle;
mod patterns;
mod session;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use simplelog::{Config, LevelFilter, WriteLogger};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::approval::ApprovalController;
use crate::mutation::Composer;
use crate::oracle::{BuildOracle, Preview};
use crate::session::DiscoverySession;
use crate::store::DesignStore;

/// Explore animation designs through rapid mutate/validate/preview rounds.
#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Design discovery - explore animation designs through rapid iteration")]
struct Cli {
    /// Agent character to use
    #[arg(long, default_value = "ga")]
    agent: String,

    /// State to explore
    #[arg(long, default_value = "search")]
    state: String,

    /// Number of iterations
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Demo mode: automatic approve/decline decisions
    #[arg(long)]
    demo: bool,

    /// Project root containing the build target and state files
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Directory holding the state JSON files
    /// (default: <project-root>/pkg/characters/stateregistry/states)
    #[arg(long)]
    states_dir: Option<PathBuf>,

    /// Seed for the mutation/decision random source (default: entropy)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(file) = File::create("discover.log") {
        let _ = WriteLogger::init(LevelFilter::Info, Config::default(), file);
    }

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let states_dir = cli.states_dir.clone().unwrap_or_else(|| {
        cli.project_root
            .join("pkg")
            .join("characters")
            .join("stateregistry")
            .join("states")
    });
    let canonical = states_dir.join(format!("{}.json", cli.state));

    if !canonical.exists() {
        eprintln!("Error: State file not found: {}", canonical.display());
        eprintln!("\nAvailable states:");
        for name in list_states(&states_dir) {
            eprintln!("  - {}", name);
        }
        return Ok(ExitCode::FAILURE);
    }

    let backup = canonical.with_extension("backup");
    let output_dir = cli.project_root.join("testing").join("discovery");

    // An interrupt during any blocking step (build, preview, input) must
    // leave the canonical file in the pristine state before the process
    // dies. The handler runs on its own thread; it only touches this pair
    // of paths and then exits.
    install_interrupt_restore(canonical.clone(), backup.clone());

    let store = DesignStore::new(canonical, backup, output_dir);
    let oracle = BuildOracle::make_build(cli.project_root.clone());
    let preview = Preview::new(
        cli.project_root.join("tangent-cli"),
        cli.project_root.clone(),
        cli.agent.clone(),
        cli.state.clone(),
    );
    let controller = if cli.demo {
        println!("Mode: DEMO (automatic decisions)");
        ApprovalController::Demo
    } else {
        ApprovalController::Interactive {
            input: std::io::stdin().lock(),
        }
    };
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = DiscoverySession::new(
        cli.agent,
        cli.state,
        store,
        oracle,
        preview,
        Composer::random(),
        controller,
    );
    session.run(cli.iterations, &mut rng)?;
    Ok(ExitCode::SUCCESS)
}

/// Lists selectable state names in the states directory, hiding legacy files.
fn list_states(states_dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(states_dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_suffix(".json")
                .filter(|stem| !stem.ends_with("-legacy"))
                .map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

fn install_interrupt_restore(canonical: PathBuf, backup: PathBuf) {
    let result = ctrlc::set_handler(move || {
        eprintln!("\n\nInterrupted. Restoring original state...");
        if backup.exists() {
            match fs::copy(&backup, &canonical) {
                Ok(_) => eprintln!("Original state restored."),
                Err(err) => eprintln!(
                    "Restore from backup {} failed: {}",
                    backup.display(),
                    err
                ),
            }
        }
        std::process::exit(130);
    });
    if let Err(err) = result.context("failed to install interrupt handler") {
        error!("{:#}", err);
    }
}
