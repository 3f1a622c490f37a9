use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "minat", about = "Tokenize, shunt, parse and compile Minat programs")]
pub struct CommandLine {
    /// Displays the AST of the input
    #[clap(short, long)]
    pub ast: bool,
    /// Displays the compiled output
    #[clap(short, long)]
    pub compile: bool,
    /// Displays the result of shunting the input
    #[clap(short, long)]
    pub shunt: bool,
    /// Displays the result of tokenizing the input
    #[clap(short, long)]
    pub tokenize: bool,
    /// Runs the program
    #[clap(short, long)]
    pub run: bool,
    /// Reads the program from STDIN, until DELIM if given
    #[clap(short = 'i', long = "stdin", value_name = "DELIM", num_args = 0..=1)]
    pub stdin: Option<Option<String>>,
    /// Program text given inline
    #[clap(short = 'e', long = "execute", value_name = "CODE")]
    pub execute: Option<String>,
    /// Dump stages as JSON
    #[clap(long, action)]
    pub json: bool,
    /// Compile target
    #[clap(short, long)]
    pub backend: Option<String>,
    /// Source prepended to the program for --run
    #[clap(long)]
    pub prelude: Option<PathBuf>,
    /// Command the compiled program is piped into for --run
    #[clap(long)]
    pub runtime: Option<String>,
    /// Program files, each compiled on its own
    pub files: Vec<PathBuf>,
}

impl CommandLine {
    pub fn has_program(&self) -> bool {
        self.stdin.is_some() || self.execute.is_some() || !self.files.is_empty()
    }

    pub fn has_stage(&self) -> bool {
        self.ast || self.compile || self.shunt || self.tokenize || self.run
    }
}
