use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use colored::Colorize;
use odex::{
    ConfigErrors, OdeErrors, OdeKind, OdeSolver, OdeSystem, ProblemConfig, SharedObserver,
    Solution, StepMethods,
};
use plotting::{Plot, Plot2d, Plot3d, PlotErrors, PlotObserver, PlotStyle};
use thiserror::Error;
use tolerance::{ToleranceErrors, Tolerances};
use tracing::{Level, info};

#[derive(Debug, Parser)]
#[command(name = "odex", version, about = "Solve and plot ordinary differential equations", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Solve a problem file and report, save or plot the solution
    Solve {
        problem: PathBuf,
        /// Write the solution as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Draw the solution to a PNG file
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Series for the horizontal axis (2d) or x axis (3d)
        #[arg(long)]
        x: Option<String>,
        /// Series for the vertical axis (2d) or y axis (3d)
        #[arg(long)]
        y: Option<String>,
        /// Series for the z axis of a 3d plot
        #[arg(long)]
        z: Option<String>,
        /// Series that colors a 3d plot
        #[arg(long)]
        color: Option<String>,
        /// Draw a 3d trajectory instead of a 2d line
        #[arg(long)]
        three_d: bool,
        /// Override the relative tolerance of an adaptive integrator
        #[arg(long)]
        rtol: Option<f64>,
        /// Override the absolute tolerance of an adaptive integrator
        #[arg(long)]
        atol: Option<f64>,
    },
    /// Print the derivative at the initial state of a problem file
    Eval {
        problem: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        t: f64,
    },
    /// Print a problem file for every built-in ode
    Presets,
}

#[derive(Debug, Error)]
enum CliErrors {
    #[error("{0}")]
    Config(#[from] ConfigErrors),
    #[error("could not write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Ode(#[from] OdeErrors),
    #[error("{0}")]
    Plot(#[from] PlotErrors),
    #[error("solving failed: {0}")]
    SolveFailed(String),
    #[error("{0}")]
    Tolerance(#[from] ToleranceErrors),
    #[error("tolerances only apply to adaptive step control")]
    NotAdaptive,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Solve {
            problem,
            csv,
            plot,
            x,
            y,
            z,
            color,
            three_d,
            rtol,
            atol,
        } => solve(SolveArgs {
            problem,
            csv,
            plot,
            selection: Selection {
                x,
                y,
                z,
                color,
                three_d,
            },
            rtol,
            atol,
        }),
        Commands::Eval { problem, t } => eval(problem, t),
        Commands::Presets => presets(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

struct Selection {
    x: Option<String>,
    y: Option<String>,
    z: Option<String>,
    color: Option<String>,
    three_d: bool,
}

impl Selection {
    /// Fills whatever was not given on the command line from the plot defaults.
    fn plot(self, names: &[String]) -> Plot {
        if self.three_d {
            let defaults = Plot3d::defaults(names);
            Plot3d::new(
                self.x.unwrap_or(defaults.x),
                self.y.unwrap_or(defaults.y),
                self.z.unwrap_or(defaults.z),
                self.color.unwrap_or(defaults.s),
            )
            .into()
        } else {
            let defaults = Plot2d::defaults(names);
            Plot2d::new(
                self.x.unwrap_or(defaults.index),
                self.y.unwrap_or(defaults.value),
            )
            .into()
        }
    }
}

struct SolveArgs {
    problem: PathBuf,
    csv: Option<PathBuf>,
    plot: Option<PathBuf>,
    selection: Selection,
    rtol: Option<f64>,
    atol: Option<f64>,
}

fn override_tolerances(
    config: &mut ProblemConfig,
    rtol: Option<f64>,
    atol: Option<f64>,
) -> Result<(), CliErrors> {
    if rtol.is_none() && atol.is_none() {
        return Ok(());
    }
    let StepMethods::Adaptive(control) = &mut config.solver.step else {
        return Err(CliErrors::NotAdaptive);
    };
    control.tolerances = Tolerances::new(
        rtol.unwrap_or(control.tolerances.rel_tol),
        atol.unwrap_or(control.tolerances.abs_tol),
    )?;
    Ok(())
}

fn solve(args: SolveArgs) -> Result<(), CliErrors> {
    let mut config = ProblemConfig::load(&args.problem)?;
    override_tolerances(&mut config, args.rtol, args.atol)?;
    let mut solver = config.into_solver()?;
    info!(
        "loaded {} with {} variables",
        solver.ode().name(),
        solver.ode().num_vars()
    );

    let plot_observer = match &args.plot {
        Some(path) => {
            let names: Vec<String> = std::iter::once("time".to_string())
                .chain(solver.ode().variables().iter().cloned())
                .collect();
            let style = PlotStyle::default().with_title(solver.ode().name());
            let observer = PlotObserver::new(args.selection.plot(&names), style, path);
            let (shared, handle) = SharedObserver::new(observer);
            solver.add_observer(shared);
            Some(handle)
        }
        None => None,
    };

    let solution = match solver.solution() {
        Some(solution) => solution,
        None => {
            let message = solver
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(CliErrors::SolveFailed(message));
        }
    };

    if let Some(observer) = plot_observer {
        if let Some(e) = observer.borrow().last_error() {
            return Err(e.clone().into());
        }
    }

    match &args.csv {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliErrors::Io {
                path: path.clone(),
                source,
            })?;
            solution.write_csv(BufWriter::new(file))?;
        }
        None => print_summary(solution),
    }
    Ok(())
}

fn print_summary(solution: &Solution) {
    let stats = solution.stats;
    println!(
        "{} samples, {} accepted steps, {} rejected, {} evaluations",
        solution.len(),
        stats.accepted,
        stats.rejected,
        stats.evaluations
    );
    if let (Some(t), Some(state)) = (solution.t.last(), solution.final_state()) {
        println!("state at t = {t}:");
        for (name, value) in solution.variables.iter().zip(state) {
            println!("  {name} = {value}");
        }
    }
}

fn eval(problem: PathBuf, t: f64) -> Result<(), CliErrors> {
    let solver = ProblemConfig::load(&problem)?.into_solver()?;
    let derivative = solver.ode().try_evaluate(solver.initial_state(), t)?;
    for (name, value) in solver.ode().variables().iter().zip(derivative.iter()) {
        println!("d{name}/dt = {value}");
    }
    Ok(())
}

fn presets() -> Result<(), CliErrors> {
    for ode in OdeKind::presets() {
        println!("// {}", ode.name());
        println!("{}\n", preset_problem(ode)?);
    }
    Ok(())
}

fn preset_problem(ode: OdeKind) -> Result<String, CliErrors> {
    let solver = OdeSolver::new(ode);
    Ok(ProblemConfig::from_solver(&solver).to_ron_string()?)
}
