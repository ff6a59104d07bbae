//! Command-line surface (SPEC_FULL.md §10.4). Out of the compilation
//! core per spec.md §1, but still part of a complete crate, split the
//! way the teacher splits it: this module owns argument parsing,
//! `main.rs` owns dispatch, `compile.rs` owns the pipeline itself.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Target;

/// The doof Compiler
#[derive(Parser)]
#[command(name = "doofc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-target compiler for the doof language", long_about = None)]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print this message.
    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// Print the compiler's version.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Initialize a project and write a default doofconfig.json.
    #[arg(long = "init")]
    pub init: bool,

    /// Compile the project given the path to its doofconfig.json, or
    /// to a folder containing one.
    #[arg(short = 'p', long = "project")]
    pub project: Option<PathBuf>,

    /// Print the resolved configuration instead of compiling.
    #[arg(long = "show-config")]
    pub show_config: bool,

    /// Compilation target.
    #[arg(long = "target", value_enum)]
    pub target: Option<Target>,

    /// Suppress emitting the header half of a C++ pair.
    #[arg(long = "no-emit-header")]
    pub no_emit_header: bool,

    /// Suppress emitting the source/translation-unit half.
    #[arg(long = "no-emit-source")]
    pub no_emit_source: bool,

    /// Override the filename-derived namespace/module qualifier.
    #[arg(long = "namespace")]
    pub namespace: Option<String>,

    /// Allow top-level statements (REPL-style files).
    #[arg(long = "allow-top-level-statements")]
    pub allow_top_level_statements: bool,

    /// Directory to write emitted files into.
    #[arg(long = "out-dir")]
    pub out_dir: Option<PathBuf>,

    /// Colorize diagnostic output.
    #[arg(long = "pretty", default_value_t = true)]
    pub pretty: bool,

    /// Source files to compile, ignoring any doofconfig.json.
    pub files: Vec<String>,
}

impl clap::ValueEnum for Target {
    fn value_variants<'a>() -> &'a [Self] {
        &[Target::Cpp, Target::Js, Target::Ts, Target::Vm]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let name = match self {
            Target::Cpp => "cpp",
            Target::Js => "js",
            Target::Ts => "ts",
            Target::Vm => "vm",
        };
        Some(clap::builder::PossibleValue::new(name))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_possible_value().expect("all variants have a value").get_name())
    }
}

impl Cli {
    /// Build single-file-mode compile options from the parsed flags.
    pub fn compile_options(&self) -> crate::compile::CompileOptions {
        crate::compile::CompileOptions {
            target: self.target.unwrap_or_default(),
            emit_header: !self.no_emit_header,
            emit_source: !self.no_emit_source,
            namespace: self.namespace.clone(),
            allow_top_level_statements: self.allow_top_level_statements,
        }
    }
}

pub fn print_help() {
    println!("doofc: the doof compiler");
    println!();
    println!("COMMON COMMANDS");
    println!();
    println!("  doofc");
    println!("  Compiles the current project (doofconfig.json in the working directory.)");
    println!();
    println!("  doofc a.doof b.doof");
    println!("  Ignoring doofconfig.json, compiles the given files with default options.");
    println!();
    println!("  doofc --init");
    println!("  Creates a doofconfig.json with the recommended settings.");
    println!();
    println!("  doofc -p ./path/to/doofconfig.json");
    println!("  Compiles the project located at the specified path.");
    println!();
    println!("  doofc --target vm a.doof");
    println!("  Compiles to register-based VM bytecode instead of the default C++ pair.");
    println!();
    println!("  doofc --show-config");
    println!("  Prints the resolved configuration instead of compiling.");
}

pub fn print_version() {
    println!("Version {}", env!("CARGO_PKG_VERSION"));
}
