use clap::Parser;

use doofc::cli::{self, Cli};
use doofc::compile::{self, CompilerHost, FileSystemCompilerHost};
use doofc::config::ProjectConfig;

fn main() {
    env_logger::init();
    let args = Cli::parse();

    if args.help {
        cli::print_help();
    } else if args.version {
        cli::print_version();
    } else if args.init {
        init_project();
    } else if args.show_config {
        show_config(&args);
    } else if !args.files.is_empty() {
        compile_files(&args);
    } else {
        compile_current_project(&args);
    }
}

fn init_project() {
    let path = std::path::Path::new("doofconfig.json");
    match ProjectConfig::write_default(path) {
        Ok(()) => println!("Created doofconfig.json"),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn load_config(args: &Cli) -> ProjectConfig {
    let path = args
        .project
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("doofconfig.json"));
    let path = if path.is_dir() { path.join("doofconfig.json") } else { path };
    ProjectConfig::load(&path).unwrap_or_default()
}

fn show_config(args: &Cli) {
    let config = load_config(args);
    match serde_json::to_string_pretty(&config) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("error: failed to render configuration: {err}"),
    }
}

fn compile_files(args: &Cli) {
    let host = FileSystemCompilerHost;
    let options = args.compile_options();
    let mut all_errors = Vec::new();

    for file in &args.files {
        let text = match host.read_file(std::path::Path::new(file)) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error: {err}");
                continue;
            }
        };
        let record = compile::compile_source(&text, file, &options);
        all_errors.extend(record.errors.clone());

        if let Some(out_dir) = &args.out_dir {
            let module_name = file.trim_end_matches(".doof");
            if let Err(err) = compile::write_record(&host, out_dir, module_name, options.target, &record) {
                eprintln!("error: {err}");
            }
        }
    }

    compile::report_diagnostics(&all_errors, args.pretty);
}

fn compile_current_project(args: &Cli) {
    let config = load_config(args);
    let host = FileSystemCompilerHost;
    match compile::compile_project(&config, &host) {
        Ok((records, errors)) => {
            if let Some(out_dir) = &config.out_dir {
                for (filename, record) in &records {
                    let module_name = config.module_name_for(std::path::Path::new(filename));
                    if let Err(err) = compile::write_record(&host, out_dir, &module_name, config.target, record) {
                        eprintln!("error: {err}");
                    }
                }
            }
            compile::report_diagnostics(&errors, args.pretty);
        }
        Err(err) => eprintln!("error: {err}"),
    }
}
