//! Extern-class glue generation for the VM backend (spec §4.7): each
//! extern declaration registers its class with the VM's class table
//! and dispatches static methods through named entries.

use crate::ast::ExternClassDecl;
use crate::diagnostics::{ErrorKind, ValidationError};

#[derive(Debug, Clone)]
pub struct ExternGlue {
    pub class_name: String,
    pub registration_source: String,
}

/// Generate the glue that registers `extern_class` with the VM's
/// class table, dispatching each static method through a named entry
/// and marshaling arguments via the runtime's handle-validation
/// primitives (spec §4.7). Unsupported parameter types (container
/// types) are rejected at glue-generation time, not deferred to
/// runtime — validation already flagged these (spec §7 Extern
/// Violation), so this function re-checks defensively and records an
/// internal error if one slipped through.
pub fn generate_glue(extern_class: &ExternClassDecl) -> Result<ExternGlue, ValidationError> {
    let mut src = String::new();
    src.push_str(&format!(
        "vm_register_extern_class(\"{}\", {});\n",
        extern_class.name,
        extern_class.fields.len()
    ));
    for method in &extern_class.methods {
        for param in &method.params {
            if is_unsupported_glue_type(&param.ty) {
                return Err(ValidationError::new(
                    ErrorKind::ExternViolation,
                    format!(
                        "extern method `{}.{}` glue cannot marshal container parameter `{}`",
                        extern_class.name, method.name, param.name
                    ),
                ));
            }
        }
        src.push_str(&format!(
            "vm_register_extern_method(\"{}\", \"{}\", &{}_{});\n",
            extern_class.name, method.name, extern_class.name, method.name
        ));
    }
    Ok(ExternGlue {
        class_name: extern_class.name.clone(),
        registration_source: src,
    })
}

fn is_unsupported_glue_type(ty: &crate::ast::TypeAnnotation) -> bool {
    use crate::ast::TypeAnnotation;
    matches!(ty, TypeAnnotation::Array { .. } | TypeAnnotation::Map { .. } | TypeAnnotation::Set(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExternMethodSig, NodeIdGen, Param, TextRange, TypeAnnotation};

    #[test]
    fn glue_registers_class_and_methods() {
        let extern_class = ExternClassDecl {
            id: NodeIdGen::new().fresh(),
            name: "NativeMath".into(),
            fields: vec![],
            methods: vec![ExternMethodSig {
                name: "sqrt".into(),
                params: vec![Param {
                    id: NodeIdGen::new().fresh(),
                    name: "x".into(),
                    ty: TypeAnnotation::Name { name: "double".into(), type_args: None },
                    default: None,
                    range: TextRange::default(),
                }],
                return_ty: TypeAnnotation::Name { name: "double".into(), type_args: None },
                is_static: true,
            }],
            range: TextRange::default(),
        };
        let glue = generate_glue(&extern_class).unwrap();
        assert!(glue.registration_source.contains("NativeMath"));
        assert!(glue.registration_source.contains("sqrt"));
    }

    #[test]
    fn container_parameter_is_rejected_at_glue_generation() {
        let extern_class = ExternClassDecl {
            id: NodeIdGen::new().fresh(),
            name: "NativeList".into(),
            fields: vec![],
            methods: vec![ExternMethodSig {
                name: "sum".into(),
                params: vec![Param {
                    id: NodeIdGen::new().fresh(),
                    name: "items".into(),
                    ty: TypeAnnotation::Array {
                        element: Box::new(TypeAnnotation::Name { name: "int".into(), type_args: None }),
                        length: None,
                    },
                    default: None,
                    range: TextRange::default(),
                }],
                return_ty: TypeAnnotation::Name { name: "int".into(), type_args: None },
                is_static: true,
            }],
            range: TextRange::default(),
        };
        assert!(generate_glue(&extern_class).is_err());
    }
}
