use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Consolidate the CSV files of a zip archive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge every CSV entry of an archive into one CSV with a canonical header
    Consolidate(ConsolidateArgs),
    /// Preview the first rows of a consolidated CSV inside an output directory
    Preview(PreviewArgs),
    /// Print the default configuration as YAML
    Config,
}

#[derive(Debug, Args)]
pub struct ConsolidateArgs {
    /// Zip archive containing the CSV files
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination of the consolidated CSV
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// YAML configuration file (drop columns, caps, aliases)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Column to exclude from the output (repeatable, added to the configured list)
    #[arg(long = "drop-column", action = clap::ArgAction::Append)]
    pub drop_columns: Vec<String>,
    /// Maximum number of rows included in the preview
    #[arg(long = "preview-rows")]
    pub preview_rows: Option<usize>,
    /// Maximum number of distinct values reported per field
    #[arg(long = "distinct-cap")]
    pub distinct_cap: Option<usize>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the archived CSV files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Delete the archive once the job has finished, successfully or not
    #[arg(long = "remove-archive")]
    pub remove_archive: bool,
    /// Write the job result JSON to this file instead of stdout
    #[arg(long = "result")]
    pub result: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Directory holding consolidated outputs
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,
    /// File name inside the directory
    #[arg(short = 'f', long = "file")]
    pub file: String,
    /// Number of rows to return
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Render an aligned text table instead of JSON
    #[arg(long = "table")]
    pub table: bool,
    /// Truncate table cells to this many characters (0 = no limit)
    #[arg(long = "max-width", default_value_t = 40)]
    pub max_width: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            if first == '"' {
                return Err("Delimiter cannot be the quote character".to_string());
            }
            Ok(first as u8)
        }
    }
}
