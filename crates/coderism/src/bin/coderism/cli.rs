//! coderism cli interface

use clap::{Parser, ValueEnum};
use coderism::extract::ParameterValueInput;
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; coderism ... }
    #[clap(short = 'C', long = "directory")]
    pub directory: Vec<PathBuf>,

    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load a terraform module from given directory
    ///
    /// Can be specified multiple times, each directory is one module.
    #[clap(short = 'd', long = "dir", default_value = ".")]
    pub directories: Vec<PathBuf>,

    /// Supply a parameter value (name=value)
    #[clap(short = 'p', long = "param")]
    pub parameters: Vec<ParameterValueInput>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
