use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use plastics::{BaselineSource, LeverDefinition, LeverRegistry, LeverStatus, State, render_error};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod job;

/// Plastics - policy lever projections for regional plastics flows
#[derive(Parser, Debug)]
#[command(name = "plastics")]
#[command(about = "Run projection jobs and check lever scripts", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a job file and write the projection set as JSON
    Run {
        /// Job description (JSON)
        job: PathBuf,

        /// Where to write the projection set (stdout if not given)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the failure message if the run fails
        #[arg(long)]
        error_file: Option<PathBuf>,
    },

    /// Compile a lever script and report its errors
    Check {
        /// Script file (if not provided, reads from stdin)
        script: Option<PathBuf>,

        /// Run the script against this year's frame
        #[arg(long)]
        year: Option<i32>,

        /// Baseline CSV used to fill the frame's ledger
        #[arg(long, requires = "year")]
        baseline: Option<PathBuf>,

        /// Lever input as NAME=VALUE (repeatable)
        #[arg(long = "input", value_parser = parse_input)]
        inputs: Vec<(String, f64)>,
    },
}

fn parse_input(text: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {text:?}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("{name}: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn run(path: &Path, output: Option<PathBuf>, error_file: Option<PathBuf>) -> Result<()> {
    let job = job::Job::load(path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    match job::run(&job, &base_dir) {
        Ok(projection) => {
            let json = serde_json::to_string_pretty(&projection).into_diagnostic()?;
            match output {
                Some(output) => fs::write(output, json).into_diagnostic()?,
                None => println!("{json}"),
            }
            Ok(())
        }
        Err(err) => {
            if let Some(error_file) = error_file {
                fs::write(error_file, err.to_string()).into_diagnostic()?;
            }
            Err(err.into())
        }
    }
}

fn check(
    script: Option<PathBuf>,
    year: Option<i32>,
    baseline: Option<PathBuf>,
    inputs: Vec<(String, f64)>,
) -> Result<()> {
    let source = match &script {
        Some(path) => fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .into_diagnostic()?;
            source
        }
    };

    let mut registry = LeverRegistry::default();
    let compiled = registry.register(LeverDefinition {
        variable: "script".to_string(),
        priority: 0,
        units: String::new(),
        script: source.clone(),
        default_value: 0.0,
    });
    if !compiled.is_ok() {
        for error in &compiled.errors {
            render_error(error, &source);
        }
        return Err(miette!("{} error(s) in script", compiled.errors.len()));
    }

    let Some(year) = year else {
        println!("ok");
        return Ok(());
    };

    let mut state = State::for_year(year);
    if let Some(path) = baseline {
        let file = File::open(&path).into_diagnostic()?;
        let data = job::read_baseline(file)?;
        let regions = data
            .regions(year)
            .ok_or_else(|| miette!("Baseline has no data for {year}"))?;
        for (region, attributes) in regions {
            state.set_region(region, attributes.clone());
        }
    }
    state.inputs.extend(inputs);

    let mut rng = ChaCha8Rng::from_entropy();
    match registry.check("script", &state, &mut rng).into_diagnostic()? {
        LeverStatus::Blank => println!("blank script"),
        LeverStatus::Ok { inspect } => {
            for record in inspect {
                println!("{} = {}", record.name, record.value);
            }
            println!("ok");
        }
        LeverStatus::Failed { message } => return Err(miette!("{message}")),
        LeverStatus::Invalid { errors } => return Err(miette!("{}", errors.join("\n"))),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the log level; default to WARN if not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match args.command {
        Command::Run {
            job,
            output,
            error_file,
        } => run(&job, output, error_file),
        Command::Check {
            script,
            year,
            baseline,
            inputs,
        } => check(script, year, baseline, inputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input("recyclingBoost = 2.5"),
            Ok(("recyclingBoost".to_string(), 2.5))
        );
        assert!(parse_input("recyclingBoost").is_err());
        assert!(parse_input("recyclingBoost=lots").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "plastics", "check", "lever.txt", "--year", "2030", "--input", "a=1", "--input",
            "b=2",
        ])
        .unwrap();
        match args.command {
            Command::Check { year, inputs, .. } => {
                assert_eq!(year, Some(2030));
                assert_eq!(inputs.len(), 2);
            }
            other => panic!("expected check, got {:?}", other),
        }
    }
}
