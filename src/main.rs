use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crud_grader::assign::{self, Participant, Subject};
use crud_grader::config::{self, Settings};
use crud_grader::discovery::{self, ModuleTarget};
use crud_grader::harness::{self, HttpTransport, Transport};
use crud_grader::output;
use crud_grader::reference::Registry;
use crud_grader::scoring::{Category, Check};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURES: i32 = 1;
const EXIT_IO: i32 = 2;
const EXIT_INPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

/// Modules served by the in-process reference during `selftest`.
const SELFTEST_MODULES: [(Category, &str); 2] =
    [(Category::Fruits, "apple"), (Category::Vegetables, "carrot")];

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover modules, grade them and write the CSV leaderboard (default if no subcommand)
    Run {
        /// Exit with status 1 if any module scored 0 or could not be graded
        #[arg(long)]
        strict: bool,
    },
    /// Grade the built-in reference resource; every module should score 100
    Selftest,
    /// Print the ranked leaderboard from the last results file
    Report {
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Print the secret marker of every graded module
    Reveal,
    /// Randomly assign subjects to participants for a blind test
    Assign {
        /// fruits or vegetables
        #[arg(long)]
        category: Category,
        /// JSON array of {name, emoji?}
        #[arg(long)]
        subjects: PathBuf,
        /// JSON array of {name}
        #[arg(long)]
        participants: PathBuf,
        /// Where to save the assignment (must not exist)
        #[arg(long)]
        out: PathBuf,
        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "crud-grader")]
#[command(about = "Blind grading harness for CRUD resource modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ./grader.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    crud_grader::logging::init(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Run { strict: false });
    let config_path = cli.config.map(PathBuf::from);

    let code = match command {
        Commands::Run { strict } => run_grading(config_path, strict, cli.verbose).await,
        Commands::Selftest => run_selftest(config_path, cli.verbose).await,
        Commands::Report { tsv } => run_report(config_path, tsv, cli.verbose),
        Commands::Reveal => run_reveal(config_path),
        Commands::Assign {
            category,
            subjects,
            participants,
            out,
            seed,
        } => run_assign(category, &subjects, &participants, &out, seed),
    };

    std::process::exit(code);
}

/// Load, validate and resolve the config. On failure the error is printed and
/// the exit code returned.
fn load_settings(path: Option<PathBuf>) -> Result<Settings, i32> {
    let config = match config::load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return Err(EXIT_CONFIG);
        }
    };

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(EXIT_CONFIG);
    }

    Settings::resolve(&config).map_err(|e| {
        eprintln!("Config error: {:#}", e);
        EXIT_CONFIG
    })
}

async fn run_grading(config_path: Option<PathBuf>, strict: bool, verbose: bool) -> i32 {
    let start_time = Instant::now();
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let targets = discovery::discover_all(&settings.modules_root, &settings.config_artifact);

    if targets.is_empty() {
        eprintln!(
            "No modules found under {} (each module needs a {})",
            settings.modules_root.display(),
            settings.config_artifact
        );
    }

    let transport = match HttpTransport::new(settings.base_url.clone(), settings.probe_timeout) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let settings = Arc::new(settings);
    let report = harness::run_all(Arc::new(transport), settings.clone(), targets).await;

    if let Err(e) = output::write_csv(&settings.output, &report.results) {
        eprintln!("Failed to write results: {:#}", e);
        return EXIT_IO;
    }

    print_summary(&report.results, verbose);
    println!();
    println!("Results written to {}", settings.output.display());

    if verbose {
        eprintln!();
        eprintln!(
            "Total: {} modules in {:?}",
            report.results.len(),
            start_time.elapsed()
        );
    }

    for key in &report.module_failures {
        eprintln!("Could not finish grading {}", key);
    }

    if strict && report.has_failures() {
        EXIT_FAILURES
    } else {
        EXIT_SUCCESS
    }
}

async fn run_selftest(config_path: Option<PathBuf>, verbose: bool) -> i32 {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let registry = match Registry::with_inventory_modules(&SELFTEST_MODULES) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to build reference registry: {}", e);
            return EXIT_FAILURES;
        }
    };

    // The reference has no TypeScript sources to scan
    let settings = Settings {
        strictness_files: Vec::new(),
        ..settings
    };

    let targets: Vec<ModuleTarget> = registry
        .modules()
        .map(|(category, name)| ModuleTarget::new(category, name))
        .collect();
    let transport: Arc<dyn Transport> = Arc::new(registry);
    let report = harness::run_all(transport, Arc::new(settings), targets).await;

    print_summary(&report.results, verbose);

    if report.results.iter().all(|r| r.total_score() == Check::MAX_SCORE) {
        println!();
        println!("Self-test passed");
        EXIT_SUCCESS
    } else {
        eprintln!("Self-test failed: the reference resource did not score full marks");
        EXIT_FAILURES
    }
}

fn run_report(config_path: Option<PathBuf>, tsv: bool, verbose: bool) -> i32 {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let results = match output::read_csv(&settings.output) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_INPUT;
        }
    };

    if tsv {
        println!("{}", output::format_tsv(&results));
    } else {
        print_summary(&results, verbose);
    }
    EXIT_SUCCESS
}

fn run_reveal(config_path: Option<PathBuf>) -> i32 {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let results = match output::read_csv(&settings.output) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_INPUT;
        }
    };

    for result in &results {
        let dir = discovery::module_dir(&settings.modules_root, result.category, &result.module);
        let secret = discovery::reveal_secret(&dir, &settings.secret_file)
            .unwrap_or_else(|| "(no secret file)".to_string());
        println!("{}: {}", result.key(), secret);
    }
    EXIT_SUCCESS
}

fn run_assign(
    category: Category,
    subjects_path: &std::path::Path,
    participants_path: &std::path::Path,
    out: &std::path::Path,
    seed: Option<u64>,
) -> i32 {
    if out.exists() {
        match assign::storage::load_assignment(out) {
            Ok(existing) => {
                eprintln!(
                    "{} already holds a {} draw; remove it to draw again",
                    out.display(),
                    existing.category
                );
            }
            Err(e) => eprintln!("{} already exists: {:#}", out.display(), e),
        }
        return EXIT_IO;
    }

    let subjects: Vec<Subject> = match assign::load_json_list(subjects_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_INPUT;
        }
    };
    let participants: Vec<Participant> = match assign::load_json_list(participants_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_INPUT;
        }
    };

    let outcome = match seed {
        Some(seed) => {
            use rand::SeedableRng;
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            assign::assign_subjects(category, &subjects, &participants, &mut rng)
        }
        None => assign::assign_subjects(category, &subjects, &participants, &mut rand::rng()),
    };
    let assignment = match outcome {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Assignment failed: {}", e);
            return EXIT_INPUT;
        }
    };

    if let Err(e) = assign::save_assignment(out, &assignment) {
        eprintln!("{:#}", e);
        return EXIT_IO;
    }

    for pairing in &assignment.pairings {
        let emoji = pairing.emoji.as_deref().unwrap_or(" ");
        println!("{}  {:<12} -> {}", emoji, pairing.subject, pairing.participant);
    }
    println!();
    println!("Saved to {}", out.display());
    EXIT_SUCCESS
}

fn print_summary(results: &[crud_grader::scoring::TestResult], verbose: bool) {
    let use_colors = output::should_use_colors();
    println!("{}", output::format_summary_table(results, use_colors));

    if verbose && !results.is_empty() {
        println!();
        println!("{}", output::format_check_breakdown(results, use_colors));
    }
}
