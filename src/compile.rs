//! Pipeline glue: wires validation, monomorphization, and codegen
//! into the external interface spec.md §6 describes, generalized from
//! the teacher's `SourceFile`/`CompilerHost`/`report_diagnostics` idiom.
//!
//! Lexing and parsing stay out of scope (spec.md §1 treats the parser
//! as an external collaborator that hands this crate an already-built
//! `ast::Program`). [`compile_program`] is the real, fully in-scope
//! entry point and is what the integration tests drive directly.
//! [`compile_source`]/[`compile_project`] are the CLI-facing wrappers;
//! their `parse_source` step is a stub for the same reason the
//! teacher's own `create_program`/`type_check`/`emit_files` never did
//! real work either.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::Program;
use crate::codegen;
use crate::config::{ProjectConfig, Target};
use crate::context::{GlobalContext, ValidationContext};
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::error::{CompilerError, CompilerResult};
use crate::monomorphize;
use crate::validate;

/// Per-compile-call knobs (spec §6: "Options configure: target,
/// whether to emit header, whether to emit source, namespace,
/// whether top-level statements are allowed").
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target: Target,
    pub emit_header: bool,
    pub emit_source: bool,
    pub namespace: Option<String>,
    pub allow_top_level_statements: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::default(),
            emit_header: true,
            emit_source: true,
            namespace: None,
            allow_top_level_statements: false,
        }
    }
}

impl From<&ProjectConfig> for CompileOptions {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            target: config.target,
            emit_header: config.emit_header,
            emit_source: config.emit_source,
            namespace: config.namespace.clone(),
            allow_top_level_statements: config.allow_top_level_statements,
        }
    }
}

/// `{ header?, source?, errors }` from spec §6.
#[derive(Debug, Clone, Default)]
pub struct CompileRecord {
    pub header: Option<String>,
    pub source: Option<String>,
    pub errors: Vec<ValidationError>,
}

/// Run the in-scope core of the pipeline against an already-parsed
/// program: validate, link against `global`, monomorphize, then emit.
/// This is the function every `tests/` scenario calls directly with a
/// hand-built AST.
pub fn compile_program(
    ctx: &mut ValidationContext,
    global: &mut GlobalContext,
    module_name: &str,
    program: &mut Program,
    options: &CompileOptions,
) -> CompileRecord {
    log::debug!("validating module `{module_name}`");
    ctx.allow_top_level_statements = options.allow_top_level_statements;
    validate::validate_program(ctx, program);

    let imports: Vec<_> = program
        .decls
        .iter()
        .filter_map(|d| match d {
            crate::ast::Decl::Import(i) => Some(i.clone()),
            _ => None,
        })
        .collect();
    validate::imports::register_exports(ctx, global, module_name, program);
    validate::imports::resolve_imports(ctx, global, &imports);

    log::debug!("monomorphizing module `{module_name}`");
    monomorphize::monomorphize_program(ctx, program);

    if !ctx.errors.is_empty() {
        log::debug!("{} validation error(s) in `{module_name}`, skipping codegen", ctx.errors.len());
        return CompileRecord { header: None, source: None, errors: ctx.errors.clone() };
    }

    let namespace = options.namespace.clone().unwrap_or_else(|| module_name.to_string());
    log::debug!("emitting `{module_name}` for target {:?}", options.target);
    match codegen::emit(
        options.target,
        ctx,
        global,
        module_name,
        program,
        &namespace,
        options.emit_header,
        options.emit_source,
    ) {
        Ok(result) => CompileRecord {
            header: result.header,
            source: result.source,
            errors: ctx.errors.clone(),
        },
        Err(err) => {
            ctx.error(err.clone());
            CompileRecord { header: None, source: None, errors: ctx.errors.clone() }
        }
    }
}

/// Lexing/parsing stub (spec.md §1, out of scope for this crate).
/// Always reports a *Parse Error* rather than fabricating an AST.
fn parse_source(_text: &str, filename: &str) -> Result<Program, ValidationError> {
    Err(ValidationError::new(
        ErrorKind::ParseError,
        "lexing/parsing is not implemented in this crate; construct an ast::Program \
         and call compile_program directly",
    )
    .at(filename, 1, 1))
}

/// Single-file entry point (spec §6): "A single-file call takes
/// source text and a filename and returns a record".
pub fn compile_source(text: &str, filename: &str, options: &CompileOptions) -> CompileRecord {
    let mut ctx = ValidationContext::new(filename);
    let mut global = GlobalContext::new();
    match parse_source(text, filename) {
        Ok(mut program) => {
            let module_name = filename.trim_end_matches(".doof").to_string();
            compile_program(&mut ctx, &mut global, &module_name, &mut program, options)
        }
        Err(err) => CompileRecord { header: None, source: None, errors: vec![err] },
    }
}

/// Abstracts file I/O (spec §6, project mode) the way the teacher's
/// `CompilerHost` trait abstracts reading/writing `.ts` files.
pub trait CompilerHost {
    fn read_file(&self, path: &Path) -> CompilerResult<String>;
    fn write_file(&self, path: &Path, contents: &str) -> CompilerResult<()>;
    fn discover_source_files(&self, root: &Path) -> CompilerResult<Vec<PathBuf>>;
}

pub struct FileSystemCompilerHost;

impl CompilerHost for FileSystemCompilerHost {
    fn read_file(&self, path: &Path) -> CompilerResult<String> {
        std::fs::read_to_string(path).map_err(|source| CompilerError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn write_file(&self, path: &Path, contents: &str) -> CompilerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CompilerError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, contents).map_err(|source| CompilerError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn discover_source_files(&self, root: &Path) -> CompilerResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        visit_dir(root, &mut out).map_err(|source| CompilerError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(out)
    }
}

fn visit_dir(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !dir.is_dir() {
        if dir.extension().and_then(|e| e.to_str()) == Some("doof") {
            out.push(dir.to_path_buf());
        }
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            visit_dir(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("doof") {
            out.push(path);
        }
    }
    Ok(())
}

/// Project entry point (spec §6): "A project call takes an entry
/// file plus the configured source roots and returns a map from
/// filename to the same record, plus a merged error list."
pub fn compile_project(
    config: &ProjectConfig,
    host: &dyn CompilerHost,
) -> CompilerResult<(HashMap<String, CompileRecord>, Vec<ValidationError>)> {
    let options = CompileOptions::from(config);

    let mut files = Vec::new();
    for root in &config.source_roots {
        files.extend(host.discover_source_files(root)?);
    }
    log::debug!("discovered {} source file(s)", files.len());

    let mut global = GlobalContext::new();
    let mut module_names = HashMap::new();
    for file in &files {
        let name = file.display().to_string();
        module_names.insert(name, config.module_name_for(file));
    }
    validate::imports::build_module_map(&mut global, &module_names);

    let mut records = HashMap::new();
    for file in &files {
        let filename = file.display().to_string();
        let text = host.read_file(file)?;
        let module_name = module_names.get(&filename).cloned().unwrap_or_else(|| filename.clone());
        let mut ctx = ValidationContext::new(filename.clone());
        let record = match parse_source(&text, &filename) {
            Ok(mut program) => {
                compile_program(&mut ctx, &mut global, &module_name, &mut program, &options)
            }
            Err(err) => CompileRecord { header: None, source: None, errors: vec![err] },
        };
        global.files.insert(filename.clone(), ctx);
        records.insert(filename, record);
    }

    let merged_errors = global.all_errors();
    Ok((records, merged_errors))
}

/// Writes `{out_dir}/{module}.{h,cpp|js|ts|json}` per the configured
/// target, mirroring the teacher's `emit_files`.
pub fn write_record(
    host: &dyn CompilerHost,
    out_dir: &Path,
    module_name: &str,
    target: Target,
    record: &CompileRecord,
) -> CompilerResult<()> {
    let source_ext = match target {
        Target::Cpp => "cpp",
        Target::Js => "js",
        Target::Ts => "ts",
        Target::Vm => "json",
    };
    if let Some(header) = &record.header {
        host.write_file(&out_dir.join(format!("{module_name}.h")), header)?;
    }
    if let Some(source) = &record.source {
        host.write_file(&out_dir.join(format!("{module_name}.{source_ext}")), source)?;
    }
    Ok(())
}

/// Sorts by `(filename, line, column)` and prints, colorizing errors
/// when `pretty` (SPEC_FULL.md §11.2), generalized from the teacher's
/// `report_diagnostics`/`print_diagnostic`.
pub fn report_diagnostics(errors: &[ValidationError], pretty: bool) {
    if errors.is_empty() {
        println!("Compilation completed successfully.");
        return;
    }
    let mut sorted = errors.to_vec();
    sorted.sort_by(|a, b| (a.filename.clone(), a.line, a.column).cmp(&(b.filename.clone(), b.line, b.column)));
    for err in &sorted {
        print_diagnostic(err, pretty);
    }
    println!("Found {} error(s)", sorted.len());
}

fn print_diagnostic(err: &ValidationError, pretty: bool) {
    if pretty {
        println!("\x1b[31merror\x1b[0m: {err}");
    } else {
        println!("error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_reports_parse_error_without_panicking() {
        let record = compile_source("class Foo {}", "foo.doof", &CompileOptions::default());
        assert_eq!(record.errors.len(), 1);
        assert_eq!(record.errors[0].kind, ErrorKind::ParseError);
        assert!(record.header.is_none());
        assert!(record.source.is_none());
    }

    #[test]
    fn compile_program_skips_codegen_when_validation_errors_exist() {
        use crate::ast::{Block, Decl, FunctionDecl, ModifierFlags, NodeIdGen, Program, TextRange, TypeAnnotation};

        let mut ctx = ValidationContext::new("a.doof");
        let mut global = GlobalContext::new();
        let gen = NodeIdGen::new();
        let mut program = Program {
            decls: vec![Decl::Function(FunctionDecl {
                id: gen.fresh(),
                name: "f".into(),
                type_params: vec![],
                params: vec![],
                return_ty: TypeAnnotation::Name { name: "unknown_type".into(), type_args: None },
                body: Block { stmts: vec![], range: TextRange::default() },
                modifiers: ModifierFlags::default(),
                range: TextRange::default(),
            })],
        };
        let record = compile_program(&mut ctx, &mut global, "a", &mut program, &CompileOptions::default());
        assert!(!record.errors.is_empty());
        assert!(record.source.is_none());
    }
}
