//! Import/export resolution and module-graph construction (spec
//! §4.4). Monomorphization (spec §4.4, §3.4) lives in
//! `crate::monomorphize` since it runs as its own global pass after
//! every file has been validated, not as part of per-file validation.

use std::collections::{HashMap, HashSet};

use crate::ast::{Decl, ImportDecl, Program};
use crate::context::{GlobalContext, ImportedSymbol, ValidationContext};
use crate::diagnostics::{ErrorKind, ValidationError};

/// Register a file's exports into the global exported-symbol table,
/// erroring on duplicates within the file (spec §4.4).
pub fn register_exports(ctx: &mut ValidationContext, global: &mut GlobalContext, module_name: &str, program: &Program) {
    let mut seen = HashSet::new();
    for decl in &program.decls {
        if let Decl::Export(export) = decl {
            if !seen.insert(export.name.clone()) {
                ctx.error(ValidationError::new(
                    ErrorKind::ImportExportViolation,
                    format!("duplicate export `{}`", export.name),
                ));
                continue;
            }
            let key = format!("{module_name}::{}", export.name);
            if global.exported_symbols.contains_key(&key) {
                ctx.error(ValidationError::new(
                    ErrorKind::ImportExportViolation,
                    format!("duplicate export `{}` in module `{module_name}`", export.name),
                ));
            } else {
                global.exported_symbols.insert(key, module_name.to_string());
            }
        }
    }
}

/// Resolve a file's `import` declarations against the global module
/// map, erroring on unresolved paths or duplicate imported names
/// (spec §4.4). Cyclic imports are not rejected here — the spec
/// explicitly permits them, resolved by this single global pass over
/// every file rather than a per-file topological walk.
pub fn resolve_imports(
    ctx: &mut ValidationContext,
    global: &GlobalContext,
    imports: &[ImportDecl],
) {
    let mut local_names = HashSet::new();
    for import in imports {
        let module_exists = global.module_names.values().any(|m| m == &import.module_path)
            || global.files.contains_key(&import.module_path);
        if !module_exists {
            ctx.error(ValidationError::new(
                ErrorKind::ImportExportViolation,
                format!("unresolved module `{}`", import.module_path),
            ));
            continue;
        }
        for spec in &import.specifiers {
            if !local_names.insert(spec.local_name.clone()) {
                ctx.error(ValidationError::new(
                    ErrorKind::ImportExportViolation,
                    format!("duplicate imported name `{}`", spec.local_name),
                ));
                continue;
            }
            let key = format!("{}::{}", import.module_path, spec.imported_name);
            if !global.exported_symbols.contains_key(&key) {
                ctx.error(ValidationError::new(
                    ErrorKind::ImportExportViolation,
                    format!(
                        "`{}` is not exported by module `{}`",
                        spec.imported_name, import.module_path
                    ),
                ));
                continue;
            }
            ctx.imported_symbols.insert(
                spec.local_name.clone(),
                ImportedSymbol {
                    module_path: import.module_path.clone(),
                    imported_name: spec.imported_name.clone(),
                },
            );
        }
    }
}

/// Build the `GlobalContext`'s module-name map from a set of
/// `(filename, module_name)` pairs already computed by
/// `config::ProjectConfig::module_name_for`.
pub fn build_module_map(global: &mut GlobalContext, files: &HashMap<String, String>) {
    for (filename, module_name) in files {
        global.module_names.insert(filename.clone(), module_name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExportDecl, TextRange};

    #[test]
    fn duplicate_export_in_same_file_is_rejected() {
        let mut ctx = ValidationContext::new("a.doof");
        let mut global = GlobalContext::new();
        let program = Program {
            decls: vec![
                Decl::Export(ExportDecl { id: crate::ast::NodeIdGen::new().fresh(), name: "Foo".into(), range: TextRange::default() }),
                Decl::Export(ExportDecl { id: crate::ast::NodeIdGen::new().fresh(), name: "Foo".into(), range: TextRange::default() }),
            ],
        };
        register_exports(&mut ctx, &mut global, "a", &program);
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].kind, ErrorKind::ImportExportViolation);
    }

    #[test]
    fn unresolved_import_path_is_an_error() {
        let mut ctx = ValidationContext::new("a.doof");
        let global = GlobalContext::new();
        let imports = vec![ImportDecl {
            id: crate::ast::NodeIdGen::new().fresh(),
            module_path: "missing".into(),
            specifiers: vec![],
            range: TextRange::default(),
        }];
        resolve_imports(&mut ctx, &global, &imports);
        assert_eq!(ctx.errors.len(), 1);
    }
}
