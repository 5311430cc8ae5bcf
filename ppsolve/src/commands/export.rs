use clap::ValueEnum;
use pps_solver::{
    PricingModel,
    export::{export_lp, export_mps},
};
use std::{io::Write, str::FromStr};

// The model file formats the `export` subcommand can write
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Mps,
    Lp,
}

impl ExportFormat {
    pub fn export<W: Write>(&self, model: &PricingModel, buffer: &mut W) -> anyhow::Result<()> {
        match self {
            Self::Mps => export_mps(model.program(), buffer)?,
            Self::Lp => export_lp(model.program(), buffer)?,
        };
        buffer.flush()?;
        Ok(())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mps" | "MPS" => Ok(Self::Mps),
            "lp" | "LP" => Ok(Self::Lp),
            _ => Err(Self::Err::ExportExtension(s.to_owned())),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExportFormatError {
    #[error("Unknown export format: {0}")]
    ExportExtension(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("mps", ExportFormat::Mps)]
    #[case("MPS", ExportFormat::Mps)]
    #[case("lp", ExportFormat::Lp)]
    fn test_extension(#[case] ext: &str, #[case] format: ExportFormat) {
        assert_eq!(ext.parse::<ExportFormat>().unwrap(), format);
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            "json".parse::<ExportFormat>(),
            Err(ExportFormatError::ExportExtension(ext)) if ext == "json"
        ));
    }
}
