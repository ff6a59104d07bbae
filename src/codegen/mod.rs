//! Backend dispatch by configured target (spec §6 "Compiler entry
//! point": target is one of `cpp | js | ts | vm`).

pub mod cpp;
pub mod js;
pub mod vm;

use crate::ast::Program;
use crate::config::Target;
use crate::context::{GlobalContext, ValidationContext};
use crate::diagnostics::ValidationError;

#[derive(Debug, Default)]
pub struct EmitResult {
    pub header: Option<String>,
    pub source: Option<String>,
}

pub fn emit(
    target: Target,
    ctx: &ValidationContext,
    global: &GlobalContext,
    module_name: &str,
    program: &Program,
    namespace: &str,
    emit_header: bool,
    emit_source: bool,
) -> Result<EmitResult, ValidationError> {
    match target {
        Target::Cpp => {
            let out = cpp::emit_module(ctx, global, module_name, program, namespace);
            let json = cpp::emit_json_serializers(ctx);
            Ok(EmitResult {
                header: emit_header.then(|| out.header),
                source: emit_source.then(|| format!("{}{json}", out.source)),
            })
        }
        Target::Js | Target::Ts => {
            let src = js::emit_module(ctx, module_name, program);
            Ok(EmitResult { header: None, source: emit_source.then_some(src) })
        }
        Target::Vm => {
            let mut bc = vm::BytecodeProgram::default();
            for decl in &program.decls {
                if let crate::ast::Decl::Function(func) = decl {
                    let (instructions, constants, param_count, total_registers) = vm::emit_function(ctx, func)?;
                    let entry_pc = bc.instructions.len();
                    bc.instructions.extend(instructions);
                    bc.constants.extend(constants);
                    bc.functions.push(vm::FunctionEntry {
                        name: func.name.clone(),
                        entry_pc,
                        param_count,
                        local_count: 0,
                        total_registers,
                    });
                }
                if let crate::ast::Decl::ExternClass(extern_class) = decl {
                    let glue = vm::extern_glue::generate_glue(extern_class)?;
                    bc.extern_classes.push(glue.class_name);
                }
            }
            Ok(EmitResult { header: None, source: emit_source.then(|| bc.to_json()) })
        }
    }
}
