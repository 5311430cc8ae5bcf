use anyhow::Context as _;
use clap::Args;
use pps_core::models::Scenario;
use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Read, Write, stdin, stdout},
    path::PathBuf,
    str::FromStr,
};

// Commands that turn a scenario into a document share these two arguments.
#[derive(Args, Debug)]
pub struct IOArgs {
    /// The scenario JSON file ("-" implies stdin)
    #[arg(value_parser = clap::value_parser!(PathOrStd))]
    pub input: PathOrStd,

    /// The output file ("-" implies stdout)
    #[arg(short, long, default_value = "-", value_parser = clap::value_parser!(PathOrStd))]
    pub output: PathOrStd,
}

impl IOArgs {
    /// Read and deserialize the scenario. Validation is left to the optimizer.
    pub fn scenario(&self) -> anyhow::Result<Scenario> {
        serde_json::from_reader(self.input.reader()?)
            .with_context(|| format!("unable to parse a scenario from {}", self.input))
    }

    pub fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        self.output.writer()
    }

    /// The extension of the output file, if it is a file
    pub fn extension(&self) -> Option<&str> {
        match &self.output {
            PathOrStd::Path(path) => path.extension().and_then(|ext| ext.to_str()),
            PathOrStd::Std => None,
        }
    }
}

/// A file path, or "-" for the standard stream
#[derive(Clone, Debug, PartialEq)]
pub enum PathOrStd {
    Path(PathBuf),
    Std,
}

impl PathOrStd {
    pub fn reader(&self) -> anyhow::Result<Box<dyn Read>> {
        match self {
            Self::Path(path) => {
                let file = File::open(path)
                    .with_context(|| format!("unable to open {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
            Self::Std => Ok(Box::new(stdin().lock())),
        }
    }

    pub fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        match self {
            Self::Path(path) => {
                let file = File::create(path)
                    .with_context(|| format!("unable to create {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            Self::Std => Ok(Box::new(stdout().lock())),
        }
    }
}

impl FromStr for PathOrStd {
    type Err = <PathBuf as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            Ok(Self::Std)
        } else {
            Ok(Self::Path(s.parse()?))
        }
    }
}

impl fmt::Display for PathOrStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Std => f.write_str("stdin"),
        }
    }
}
