//! Binding Code Generation via Text
//!
//! Generates C glue that exposes each bindable prototype to a script host.
//! Three hosts are supported, each with its own calling convention:
//!
//! - `lua`: stack based. Arguments are read from stack positions `1..N`,
//!   results are returned as one associative table.
//! - `wren`: slot based. Arguments are read from slots, results are written
//!   into a fresh list. Also emits the `foreign static` class source and a
//!   signature dispatch callback.
//! - `uscript`: a line protocol dispatcher. One function body handles every
//!   command, so argument temporaries are shared across branches (see
//!   [`EmissionContext`]).
//!
//! # Generation Strategy
//!
//! 1. Validate every prototype against the backend's marshal rules. Any
//!    unrecognized type aborts the whole run.
//! 2. Bind each prototype: generated ones get a body, hardcoded ones only a
//!    disabled stub.
//! 3. Emit bodies, then the registration table (which lists both kinds).
//!
//! Output is accumulated in a `String` and only handed back once the run
//! has fully succeeded.

// Submodules
mod lua;
mod state;
mod uscript;
mod wren;

// Re-exports
pub use lua::LuaRules;
pub use state::EmissionContext;
pub use uscript::TextRules;
pub use wren::WrenRules;

use crate::error::BindgenError;
use crate::prototype::{Parameter, Prototype, Role};
use crate::types::{CType, PointerAllowList, TypeCategory};
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::debug;

/// A target embedding or protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Stack-based VM (Lua C API)
    Lua,
    /// Slot-based VM (Wren C API)
    Wren,
    /// Text line protocol dispatcher
    Uscript,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Lua, Backend::Wren, Backend::Uscript];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Lua => "lua",
            Backend::Wren => "wren",
            Backend::Uscript => "uscript",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = BindgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lua" => Ok(Backend::Lua),
            "wren" => Ok(Backend::Wren),
            "uscript" => Ok(Backend::Uscript),
            _ => Err(BindgenError::Config(format!(
                "unknown backend '{}' (expected lua, wren or uscript)",
                s
            ))),
        }
    }
}

/// Per-backend naming and type options
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOptions {
    /// Pointer base types passed through as opaque handles
    pub pointer_types: PointerAllowList,
    /// Name of the registration table
    pub table_name: String,
    /// Prefix of generated function names (`_uscript_func_` + name)
    pub function_prefix: String,
    /// Script-side class exposing the bindings (wren)
    pub class_name: String,
    /// Name prefix of the functions served by the dispatcher (uscript)
    pub family: String,
    /// Name of the generated dispatcher function (uscript)
    pub dispatch_name: String,
}

impl BackendOptions {
    pub fn defaults(backend: Backend) -> Self {
        let (table_name, function_prefix) = match backend {
            Backend::Lua => ("mle_lib", "_uscript_func_"),
            Backend::Wren => ("mle_wren_lib", "_wren_func_"),
            Backend::Uscript => ("uscript_func_names", "_uscript_cmd_"),
        };
        BackendOptions {
            pointer_types: PointerAllowList::default(),
            table_name: table_name.to_string(),
            function_prefix: function_prefix.to_string(),
            class_name: "Mle".to_string(),
            family: "mark_".to_string(),
            dispatch_name: "_uscript_dispatch".to_string(),
        }
    }

    /// Generated function name for a prototype
    pub fn c_func(&self, proto: &Prototype) -> String {
        format!("{}{}", self.function_prefix, proto.name)
    }
}

/// Where a constructed value goes: a position and a name.
///
/// Each backend uses the part its convention needs (table key, list slot,
/// response field).
#[derive(Debug, Clone, Copy)]
pub struct Destination<'a> {
    pub index: usize,
    pub key: &'a str,
}

/// Per-backend marshal templates
pub trait MarshalRules {
    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;

    fn pointer_types(&self) -> &PointerAllowList;

    /// Expression reading input `param` from source location `index`
    fn extract(
        &self,
        param: &Parameter,
        category: TypeCategory,
        index: usize,
    ) -> Result<String, BindgenError>;

    /// Statements writing `value` of type `ty` to `dest`
    fn construct(
        &self,
        value: &str,
        ty: &CType,
        category: TypeCategory,
        dest: Destination<'_>,
    ) -> Result<Vec<String>, BindgenError>;

    /// Classify a type, failing on anything the backend cannot marshal
    fn category(&self, ty: &CType, function: &str) -> Result<TypeCategory, BindgenError> {
        match TypeCategory::classify(ty, self.pointer_types()) {
            TypeCategory::Unrecognized => Err(self.unrecognized(ty, function)),
            category => Ok(category),
        }
    }

    fn unrecognized(&self, ty: &CType, function: &str) -> BindgenError {
        BindgenError::UnrecognizedType {
            type_name: ty.to_string(),
            function: function.to_string(),
            backend: self.backend(),
        }
    }

    /// A category validation should already have rejected for `what`
    fn no_marshal_rule(&self, ty: &CType, what: &str) -> BindgenError {
        BindgenError::Logic(format!(
            "{}: no marshal rule for '{}' ({}) after validation",
            self.backend(),
            ty,
            what
        ))
    }
}

/// Check that every value a prototype moves across the boundary has a
/// marshal rule. Hardcoded prototypes are exempt: nothing is generated for
/// them.
pub fn validate_prototype(
    proto: &Prototype,
    rules: &dyn MarshalRules,
) -> Result<(), BindgenError> {
    if proto.is_hardcoded {
        return Ok(());
    }
    rules.category(&proto.return_type, &proto.name)?;
    for param in &proto.parameters {
        if param.role == Role::Callback {
            return Err(BindgenError::CallbackParameter {
                function: proto.name.clone(),
                param: param.name.clone(),
            });
        }
        let ty = param.logical_type();
        if rules.category(&ty, &proto.name)? == TypeCategory::Void {
            return Err(rules.unrecognized(&ty, &proto.name));
        }
    }
    Ok(())
}

/// How a prototype is bound in the generated output
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// Marshaling code generated from the declaration
    Generated { body: String },
    /// Implemented by hand; only a disabled stub is emitted
    Hardcoded,
}

/// A prototype together with its binding
#[derive(Debug, Clone)]
pub struct BoundFunction<'a> {
    pub prototype: &'a Prototype,
    pub kind: BindingKind,
}

/// Code generator for one backend
pub struct CodeGen {
    backend: Backend,
    options: BackendOptions,
    output: String,
}

impl CodeGen {
    pub fn new(backend: Backend) -> Self {
        CodeGen::with_options(backend, BackendOptions::defaults(backend))
    }

    pub fn with_options(backend: Backend, options: BackendOptions) -> Self {
        CodeGen {
            backend,
            options,
            output: String::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Generate the complete output for `prototypes`.
    ///
    /// Prototypes are emitted in name order regardless of input order.
    pub fn generate(&mut self, prototypes: &[Prototype]) -> Result<String, BindgenError> {
        let mut sorted: Vec<&Prototype> = prototypes.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in sorted.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(BindgenError::DuplicatePrototype(pair[0].name.clone()));
            }
        }

        self.output.clear();
        writeln!(
            &mut self.output,
            "// Generated by mle-bindgen ({} backend). Do not edit.",
            self.backend
        )?;
        writeln!(&mut self.output)?;

        let result = match self.backend {
            Backend::Lua => self.emit_lua(&sorted),
            Backend::Wren => self.emit_wren(&sorted),
            Backend::Uscript => self.emit_uscript(&sorted),
        };
        if let Err(e) = result {
            self.output.clear();
            return Err(e);
        }

        debug!(
            "{} backend: {} prototypes, {} bytes",
            self.backend,
            sorted.len(),
            self.output.len()
        );
        Ok(std::mem::take(&mut self.output))
    }

    /// Validate all prototypes, then bind each one with `emit_body`
    fn bind_all<'p>(
        prototypes: &[&'p Prototype],
        rules: &dyn MarshalRules,
        mut emit_body: impl FnMut(&'p Prototype) -> Result<String, BindgenError>,
    ) -> Result<Vec<BoundFunction<'p>>, BindgenError> {
        for proto in prototypes {
            validate_prototype(proto, rules)?;
        }
        prototypes
            .iter()
            .map(|&proto| {
                let kind = if proto.is_hardcoded {
                    BindingKind::Hardcoded
                } else {
                    BindingKind::Generated {
                        body: emit_body(proto)?,
                    }
                };
                Ok(BoundFunction {
                    prototype: proto,
                    kind,
                })
            })
            .collect()
    }
}

/// Escape text for use inside a C string literal
pub(crate) fn c_string_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Cast prefix for a type, e.g. `(char *)`
pub(crate) fn cast(ty: &CType) -> String {
    format!("({})", ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_prototype;

    pub(crate) fn protos(lines: &[&str]) -> Vec<Prototype> {
        lines.iter().map(|l| parse_prototype(l).unwrap()).collect()
    }

    #[test]
    fn test_backend_names() {
        for backend in Backend::ALL {
            assert_eq!(backend.name().parse::<Backend>().unwrap(), backend);
        }
        assert!("python".parse::<Backend>().is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(c_string_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    }

    #[test]
    fn test_unknown_type_aborts_every_backend() {
        let input = protos(&[
            "int buffer_undo(buffer_t *self);",
            "int buffer_write_to_file(buffer_t *self, FILE *fp, size_t *optret_nbytes);",
            "int mark_write(mark_t *self, FILE *fp);",
        ]);
        for backend in Backend::ALL {
            let mut codegen = CodeGen::new(backend);
            let err = codegen.generate(&input).unwrap_err();
            assert!(
                matches!(
                    err,
                    BindgenError::UnrecognizedType { ref type_name, .. } if type_name == "FILE *"
                ),
                "{}: {:?}",
                backend,
                err
            );
        }
    }

    #[test]
    fn test_callback_requires_hardcode() {
        let input = protos(&[
            "int editor_register_observer(editor_t *editor, char *event_patt, void *udata, observer_func_t fn_callback, observer_t **optret_observer);",
        ]);
        let err = CodeGen::new(Backend::Lua).generate(&input).unwrap_err();
        assert!(matches!(err, BindgenError::CallbackParameter { .. }));

        let mut hardcoded = input.clone();
        hardcoded[0].is_hardcoded = true;
        assert!(CodeGen::new(Backend::Lua).generate(&hardcoded).is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let input = protos(&["int mark_a(mark_t *self);", "int mark_a(mark_t *other);"]);
        assert!(matches!(
            CodeGen::new(Backend::Wren).generate(&input),
            Err(BindgenError::DuplicatePrototype(_))
        ));
    }

    #[test]
    fn test_unvalidated_category_is_logic_error() {
        let proto = &protos(&["int mark_write(mark_t *self, FILE *fp);"])[0];
        let fp = &proto.parameters[1];
        let ty = fp.logical_type();
        let pointers = PointerAllowList::default();
        let rules: [Box<dyn MarshalRules>; 3] = [
            Box::new(LuaRules::new(pointers.clone())),
            Box::new(WrenRules::new(pointers.clone())),
            Box::new(TextRules::new(pointers)),
        ];
        let dest = Destination { index: 0, key: "rv" };
        for rules in &rules {
            let err = rules.extract(fp, TypeCategory::Unrecognized, 1).unwrap_err();
            assert!(
                matches!(err, BindgenError::Logic(ref m) if m.contains("fp")),
                "{:?}",
                err
            );
            let err = rules
                .construct("rv", &ty, TypeCategory::Unrecognized, dest)
                .unwrap_err();
            assert!(
                matches!(err, BindgenError::Logic(ref m) if m.contains("FILE *")),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_void_parameter_rejected() {
        let input = protos(&["int mark_a(mark_t *self, void nothing);"]);
        assert!(matches!(
            CodeGen::new(Backend::Lua).generate(&input),
            Err(BindgenError::UnrecognizedType { .. })
        ));
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = protos(&[
            "int mark_move_eol(mark_t *self);",
            "int buffer_undo(buffer_t *self);",
        ]);
        let mut b = a.clone();
        b.reverse();
        for backend in Backend::ALL {
            let first = CodeGen::new(backend).generate(&a).unwrap();
            let second = CodeGen::new(backend).generate(&b).unwrap();
            assert_eq!(first, second);
        }
    }
}
