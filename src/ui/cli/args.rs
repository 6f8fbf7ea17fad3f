// Wed Jan 15 2026 - Alex

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "avm-inspector")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Masked memory scanning and AVM2 trait inspection for Linux processes", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Overrides `general.log_level` from the config file.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the memory mappings of a process
    Regions(RegionsArgs),
    /// Scan a process for one or more masked patterns
    Scan(ScanArgs),
    /// Write raw bytes into a process
    Write(WriteArgs),
    /// Scan a file on disk for a masked pattern
    SearchFile(SearchFileArgs),
    /// Dump the classes and traits of a bytecode file
    Abc(AbcArgs),
    /// Find processes by command line
    Ps(PsArgs),
}

#[derive(Parser, Debug)]
pub struct RegionsArgs {
    pub pid: i32,

    /// Include mappings the scanner would skip
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    pub pid: i32,

    /// IDA-style patterns, e.g. "48 8B ?? ?? C3"
    #[arg(required = true)]
    pub patterns: Vec<String>,

    #[arg(short, long)]
    pub max: Option<usize>,

    #[arg(short = 'A', long)]
    pub align: Option<usize>,

    /// Only scan mappings whose name contains this text
    #[arg(short, long)]
    pub segment: Option<String>,

    /// Stop at the first hit of each pattern
    #[arg(long)]
    pub first: bool,

    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.align == Some(0) {
            return Err("--align must be greater than 0".to_string());
        }
        if self.max == Some(0) {
            return Err("--max must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct WriteArgs {
    pub pid: i32,

    /// Target address, hex (0x optional) or #decimal
    pub address: String,

    /// Bytes to write, e.g. "90 90 c3"
    pub bytes: String,
}

#[derive(Parser, Debug)]
pub struct SearchFileArgs {
    pub file: PathBuf,

    pub pattern: String,

    #[arg(short, long)]
    pub max: Option<usize>,

    #[arg(short = 'A', long)]
    pub align: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct AbcArgs {
    pub file: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PsArgs {
    pub name: String,
}
