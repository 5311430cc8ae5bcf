use super::{IOArgs, PathOrStd};
use clap::Subcommand;

mod export;
mod probe;
mod schema;
mod solve;

pub use export::{ExportFormat, ExportFormatError};
pub use probe::probe;
pub use schema::Document;
pub use solve::EngineLib;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize the scenario and report prices and assignments as JSON
    Solve {
        #[command(flatten)]
        io: IOArgs,

        /// Request a specific QP backend
        #[arg(short, long, default_value = "clarabel")]
        lib: EngineLib,
    },

    /// Build the pricing program and export it to a standard format
    Export {
        #[command(flatten)]
        io: IOArgs,

        /// The file format to use (if omitted, will infer based on filename)
        #[arg(short, long)]
        format: Option<ExportFormat>,
    },

    /// Report whether an engine is usable; exits with 1 if it is not
    Probe {
        /// The QP backend to check
        #[arg(short, long, default_value = "clarabel")]
        lib: EngineLib,
    },

    /// Write the JSON schema of an input or output document
    Schema {
        /// Which document to describe
        #[arg(default_value = "scenario")]
        document: Document,

        /// The output file ("-" implies stdout)
        #[arg(short, long, default_value = "-", value_parser = clap::value_parser!(PathOrStd))]
        output: PathOrStd,
    },
}
