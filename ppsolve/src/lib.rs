use clap::Parser;
use pps_core::models::Status;
use pps_solver::PricingModel;
use std::{io::Write as _, path::PathBuf};

mod config;
pub use config::*;

mod io;
pub use io::*;

mod commands;
pub use commands::*;

// Shared options, then the subcommand to execute
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct BaseArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "PPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum price gap between successive plans (overrides the configuration)
    #[arg(short, long, global = true)]
    pub margin: Option<f64>,

    /// Forward the QP backend's own output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl BaseArgs {
    /// The loaded configuration with the command-line overrides applied
    pub fn config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(margin) = self.margin {
            config.pricing.margin = margin;
        }
        if self.verbose {
            config.pricing.verbose = true;
        }
        Ok(config)
    }

    /// Run the subcommand, returning the process exit code
    pub fn evaluate(self) -> anyhow::Result<i32> {
        let AppConfig { pricing, engine } = self.config()?;

        match self.command {
            Commands::Solve { io, lib } => {
                let scenario = io.scenario()?;
                let result = lib.optimize(&scenario, &pricing, &engine)?;
                let mut output = io.writer()?;
                serde_json::to_writer_pretty(&mut output, &result)?;
                writeln!(output)?;
                output.flush()?;
                if result.status == Status::Error {
                    return Ok(2);
                }
            }
            Commands::Export { io, format } => {
                let scenario = io.scenario()?;

                let format = if let Some(format) = format {
                    format
                } else if let Some(ext) = io.extension() {
                    ext.parse()?
                } else {
                    return Err(CliError::ExportInference)?;
                };

                let model = PricingModel::build(&scenario, &pricing)?;
                let mut output = io.writer()?;
                format.export(&model, &mut output)?;
            }
            Commands::Probe { lib } => {
                let (available, message) = probe(lib, &engine);
                println!("{message}");
                if !available {
                    return Ok(1);
                }
            }
            Commands::Schema { document, output } => {
                let mut output = output.writer()?;
                serde_json::to_writer_pretty(&mut output, &document.schema())?;
                writeln!(output)?;
                output.flush()?;
            }
        }

        Ok(0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Unable to infer export format, please specify a valid format")]
    ExportInference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_args() {
        let args = BaseArgs::try_parse_from([
            "ppsolve", "solve", "scenario.json", "-o", "-", "--lib", "osqp", "--margin", "2.5",
        ])
        .unwrap();
        assert_eq!(args.margin, Some(2.5));
        let Commands::Solve { io, lib } = args.command else {
            panic!("expected solve");
        };
        assert_eq!(io.input, PathOrStd::Path("scenario.json".into()));
        assert_eq!(io.output, PathOrStd::Std);
        assert_eq!(lib, EngineLib::Osqp);
    }

    #[test]
    fn test_export_infers_format() {
        let args =
            BaseArgs::try_parse_from(["ppsolve", "export", "-", "--output", "model.lp"]).unwrap();
        let Commands::Export { io, format } = args.command else {
            panic!("expected export");
        };
        assert_eq!(format, None);
        assert_eq!(io.extension(), Some("lp"));
    }

    #[test]
    fn test_overrides() {
        let args = BaseArgs::try_parse_from(["ppsolve", "probe", "--verbose", "-m", "1"]).unwrap();
        let config = args.config().unwrap();
        assert_eq!(config.pricing.margin, 1.0);
        assert!(config.pricing.verbose);
    }
}
