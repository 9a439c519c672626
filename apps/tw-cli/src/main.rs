use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tw_app::{
    AppResult, RunOverrides, RunProgressEvent, RunStage, project_service, run_service,
};
use tw_sim::PortSide;

#[derive(Parser)]
#[command(name = "tw-cli")]
#[command(about = "twinflow CLI - component-graph building simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Print the execution order of the compiled model
    Order {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show which components the semantic description produces
    Match {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Run a simulation
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Time step in seconds (overrides the project)
        #[arg(long)]
        dt: Option<f64>,
        /// Directory for per-component CSV histories
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print one component's outputs as CSV
        #[arg(long)]
        component: Option<String>,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Order { project_path } => cmd_order(&project_path),
        Commands::Match { project_path } => cmd_match(&project_path),
        Commands::Run {
            project_path,
            dt,
            output,
            component,
        } => cmd_run(&project_path, dt, output.as_deref(), component.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_order(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut compiled = project_service::compile_model(&project)?;
    let order = project_service::execution_order(&mut compiled.model)?;

    println!("Execution order ({} components):", order.len());
    for (i, id) in order.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, id);
    }
    Ok(())
}

fn cmd_match(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let compiled = project_service::compile_model(&project)?;

    let Some(report) = compiled.report else {
        println!("Project has no semantic description");
        return Ok(());
    };

    println!("Matched components:");
    for c in &report.components {
        println!("  {} ({}) models {}", c.id, c.component_type, c.modeled.join(", "));
    }
    println!("Connections created: {}", report.connections.len());
    if !report.unmodeled.is_empty() {
        println!("Unmodeled nodes:");
        for node in &report.unmodeled {
            println!("  {}", node);
        }
    }
    if !report.unresolved.is_empty() {
        println!("Unresolved inputs:");
        for u in &report.unresolved {
            println!("  {}.{} <- {}", u.component, u.port, u.node);
        }
    }
    Ok(())
}

fn cmd_run(
    project_path: &Path,
    dt: Option<f64>,
    output: Option<&Path>,
    component: Option<&str>,
) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let overrides = RunOverrides {
        step_size_s: dt,
        ..RunOverrides::default()
    };

    let mut last_emit = Instant::now();
    let response = run_service::run_with_progress(
        &project,
        &overrides,
        Some(&mut |event| {
            if event.sim.is_none() || last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&event);
                last_emit = Instant::now();
            }
        }),
        None,
    )?;
    clear_progress_line();

    println!(
        "✓ Simulated {} steps of {} components in {:.3}s",
        response.timing.steps,
        response.order.len(),
        response.timing.total_time_s
    );

    if let Some(dir) = output {
        let written = tw_app::write_history(dir, &response.history)?;
        println!("✓ Wrote {} CSV files to {}", written.len(), dir.display());
    }
    if let Some(id) = component {
        print!("{}", tw_app::history_csv(&response.history, id, PortSide::Output)?);
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, event.sim) {
        (RunStage::Simulating, Some(p)) => {
            let width = 28usize;
            let filled = ((p.fraction_complete() * width as f64).round() as usize).min(width);
            print!(
                "\r[{}{}] {:>6.2}%  step={}/{}  t={:.0}s  elapsed={:.1}s",
                "#".repeat(filled),
                "-".repeat(width - filled),
                p.fraction_complete() * 100.0,
                p.step,
                p.total_steps,
                p.time_s,
                event.elapsed_wall_s
            );
        }
        _ => {
            print!("\r{:<100}", format!("phase={}", event.stage.label()));
        }
    }
    let _ = io::stdout().flush();
}
