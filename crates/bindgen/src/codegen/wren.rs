//! Wren binding generation
//!
//! Wren passes foreign method arguments in numbered slots: slot 0 holds the
//! receiver (the class, for static methods) and arguments follow from slot 1.
//! Results go back as a single list in slot 0, primary return first and then
//! each output parameter in declared order. The contract is positional only.
//!
//! Besides the functions and the registration table this backend emits:
//! - the Wren source of the class declaring every binding as
//!   `foreign static`, with input parameters only
//! - a `bindForeignMethodFn` callback resolving a method signature to its
//!   generated function
//!
//! Numbers travel as doubles. Pointers use `uscript_wren_get_pointer` and
//! `uscript_wren_set_pointer`, provided by the embedding.

use super::{BindingKind, CodeGen, Destination, MarshalRules, c_string_escape, cast};
use crate::error::BindgenError;
use crate::prototype::{PRIMARY_RESULT_KEY, Parameter, Prototype, Role};
use crate::types::{CType, PointerAllowList, TypeCategory};
use std::fmt::Write as _;

/// Words that cannot be used as Wren parameter names
const WREN_RESERVED: &[&str] = &[
    "as", "break", "class", "construct", "continue", "else", "false", "for", "foreign", "if",
    "import", "in", "is", "null", "return", "static", "super", "this", "true", "var", "while",
];

/// Marshal templates for the Wren slot API
pub struct WrenRules {
    pointer_types: PointerAllowList,
}

impl WrenRules {
    pub fn new(pointer_types: PointerAllowList) -> Self {
        WrenRules { pointer_types }
    }
}

impl MarshalRules for WrenRules {
    fn backend(&self) -> &'static str {
        "wren"
    }

    fn pointer_types(&self) -> &PointerAllowList {
        &self.pointer_types
    }

    fn extract(
        &self,
        param: &Parameter,
        category: TypeCategory,
        index: usize,
    ) -> Result<String, BindgenError> {
        let ty = param.logical_type();
        let (read, default) = match category {
            TypeCategory::SignedInteger
            | TypeCategory::UnsignedInteger
            | TypeCategory::Float => (format!("wrenGetSlotDouble(vm, {})", index), "0"),
            TypeCategory::CString => (format!("wrenGetSlotString(vm, {})", index), "NULL"),
            TypeCategory::OpaquePointer => {
                (format!("uscript_wren_get_pointer(vm, {})", index), "NULL")
            }
            TypeCategory::Void | TypeCategory::Unrecognized => {
                return Err(self.no_marshal_rule(&ty, &param.name));
            }
        };
        if param.role == Role::OptionalInput {
            Ok(format!(
                "(wrenGetSlotType(vm, {}) == WREN_TYPE_NULL ? {} : {}{})",
                index,
                default,
                cast(&ty),
                read
            ))
        } else {
            Ok(format!("{}{}", cast(&ty), read))
        }
    }

    fn construct(
        &self,
        value: &str,
        ty: &CType,
        category: TypeCategory,
        dest: Destination<'_>,
    ) -> Result<Vec<String>, BindgenError> {
        let slot = dest.index;
        let set = match category {
            TypeCategory::SignedInteger
            | TypeCategory::UnsignedInteger
            | TypeCategory::Float => format!("wrenSetSlotDouble(vm, {}, (double){});", slot, value),
            TypeCategory::CString => format!(
                "if ({v}) wrenSetSlotString(vm, {s}, (const char *){v}); else wrenSetSlotNull(vm, {s});",
                v = value,
                s = slot
            ),
            TypeCategory::OpaquePointer => {
                format!("uscript_wren_set_pointer(vm, {}, (void *){});", slot, value)
            }
            TypeCategory::Void => format!("wrenSetSlotNull(vm, {});", slot),
            TypeCategory::Unrecognized => return Err(self.no_marshal_rule(ty, value)),
        };
        Ok(vec![set, format!("wrenInsertInList(vm, 0, -1, {});", slot)])
    }
}

impl CodeGen {
    pub(super) fn emit_wren(&mut self, prototypes: &[&Prototype]) -> Result<(), BindgenError> {
        let rules = WrenRules::new(self.options.pointer_types.clone());
        let bound = Self::bind_all(prototypes, &rules, |proto| self.wren_body(proto, &rules))?;

        for func in &bound {
            let c_func = self.options.c_func(func.prototype);
            match &func.kind {
                BindingKind::Generated { body } => {
                    writeln!(&mut self.output, "static void {}(WrenVM *vm) {{", c_func)?;
                    self.output.push_str(body);
                    writeln!(&mut self.output, "}}")?;
                }
                BindingKind::Hardcoded => {
                    writeln!(&mut self.output, "// static void {}(WrenVM *vm) {{", c_func)?;
                    writeln!(&mut self.output, "// }}")?;
                }
            }
            writeln!(&mut self.output)?;
        }

        // Registration table
        let table = &self.options.table_name;
        writeln!(
            &mut self.output,
            "static const struct {{ const char *name; WrenForeignMethodFn fn; }} {}[] = {{",
            table
        )?;
        for func in &bound {
            writeln!(
                &mut self.output,
                "    {{ \"{}\", {} }},",
                func.prototype.name,
                self.options.c_func(func.prototype)
            )?;
        }
        writeln!(&mut self.output, "    {{ NULL, NULL }}")?;
        writeln!(&mut self.output, "}};")?;
        writeln!(&mut self.output)?;

        self.emit_wren_class_source(&bound.iter().map(|f| f.prototype).collect::<Vec<_>>())?;
        self.emit_wren_bind_method(&bound.iter().map(|f| f.prototype).collect::<Vec<_>>())?;
        Ok(())
    }

    /// Wren source declaring the foreign class
    fn emit_wren_class_source(&mut self, prototypes: &[&Prototype]) -> Result<(), BindgenError> {
        let class_name = c_string_escape(&self.options.class_name);
        let stem = self.symbol_stem().to_string();
        writeln!(&mut self.output, "static const char *{}_source =", stem)?;
        writeln!(&mut self.output, "    \"class {} {{\\n\"", class_name)?;
        for proto in prototypes {
            let params: Vec<String> = proto.inputs().map(|p| wren_param_name(&p.name)).collect();
            writeln!(
                &mut self.output,
                "    \"    foreign static {}({})\\n\"",
                proto.name,
                params.join(", ")
            )?;
        }
        writeln!(&mut self.output, "    \"}}\\n\";")?;
        writeln!(&mut self.output)?;
        Ok(())
    }

    /// Signature dispatch: static methods of the one class only
    fn emit_wren_bind_method(&mut self, prototypes: &[&Prototype]) -> Result<(), BindgenError> {
        let stem = self.symbol_stem().to_string();
        writeln!(
            &mut self.output,
            "static WrenForeignMethodFn {}_bind_method(WrenVM *vm, const char *module, const char *class_name, bool is_static, const char *signature) {{",
            stem
        )?;
        writeln!(&mut self.output, "    (void)vm;")?;
        writeln!(&mut self.output, "    (void)module;")?;
        writeln!(
            &mut self.output,
            "    if (!is_static || strcmp(class_name, \"{}\") != 0) return NULL;",
            c_string_escape(&self.options.class_name)
        )?;
        for proto in prototypes {
            let prefix = format!("{}(", proto.name);
            writeln!(
                &mut self.output,
                "    if (strncmp(signature, \"{}\", {}) == 0) return {};",
                prefix,
                prefix.len(),
                self.options.c_func(proto)
            )?;
        }
        writeln!(&mut self.output, "    return NULL;")?;
        writeln!(&mut self.output, "}}")?;
        Ok(())
    }

    /// Prefix for the class source and dispatch symbols: the table name
    /// without its `_lib` suffix
    fn symbol_stem(&self) -> &str {
        let table = self.options.table_name.as_str();
        table.strip_suffix("_lib").unwrap_or(table)
    }

    /// Body of one generated Wren binding, without the enclosing braces
    fn wren_body(&self, proto: &Prototype, rules: &WrenRules) -> Result<String, BindgenError> {
        let mut body = String::new();
        let has_rv = !proto.return_type.is_void();

        if has_rv {
            writeln!(&mut body, "    {};", proto.return_type.declare("rv"))?;
        }
        for param in &proto.parameters {
            if param.role.is_output() {
                writeln!(
                    &mut body,
                    "    {} = {};",
                    param.logical_type().declare(&param.name),
                    param.zero_value()
                )?;
            } else {
                writeln!(&mut body, "    {};", param.declared_type.declare(&param.name))?;
            }
        }

        for (i, param) in proto.inputs().enumerate() {
            let category = rules.category(&param.logical_type(), &proto.name)?;
            writeln!(
                &mut body,
                "    {} = {};",
                param.name,
                rules.extract(param, category, i + 1)?
            )?;
        }

        if has_rv {
            writeln!(&mut body, "    rv = {};", proto.call())?;
        } else {
            writeln!(&mut body, "    {};", proto.call())?;
        }

        // Slots 1..=count hold results on their way into the list in slot 0
        let count = proto.return_slot_count();
        writeln!(&mut body, "    wrenEnsureSlots(vm, {});", count + 1)?;
        writeln!(&mut body, "    wrenSetSlotNewList(vm, 0);")?;
        let category = rules.category(&proto.return_type, &proto.name)?;
        let dest = Destination {
            index: 1,
            key: PRIMARY_RESULT_KEY,
        };
        for line in rules.construct("rv", &proto.return_type, category, dest)? {
            writeln!(&mut body, "    {}", line)?;
        }
        for (i, param) in proto.outputs().enumerate() {
            let ty = param.logical_type();
            let category = rules.category(&ty, &proto.name)?;
            let dest = Destination {
                index: i + 2,
                key: param.result_key(),
            };
            for line in rules.construct(&param.name, &ty, category, dest)? {
                writeln!(&mut body, "    {}", line)?;
            }
        }
        Ok(body)
    }
}

fn wren_param_name(name: &str) -> String {
    if WREN_RESERVED.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::protos;
    use super::*;
    use crate::codegen::Backend;

    fn generate(lines: &[&str]) -> String {
        CodeGen::new(Backend::Wren).generate(&protos(lines)).unwrap()
    }

    #[test]
    fn test_generated_function() {
        let out = generate(&["int mark_get_offset(mark_t *self, bint_t *ret_offset);"]);
        assert!(out.contains("static void _wren_func_mark_get_offset(WrenVM *vm) {"));
        assert!(out.contains("    self = (mark_t *)uscript_wren_get_pointer(vm, 1);\n"));
        assert!(out.contains("    bint_t ret_offset = 0;\n"));
        assert!(out.contains("    rv = mark_get_offset(self, &ret_offset);\n"));
        assert!(out.contains("    wrenEnsureSlots(vm, 3);\n    wrenSetSlotNewList(vm, 0);\n"));
        assert!(out.contains("    wrenSetSlotDouble(vm, 1, (double)rv);\n    wrenInsertInList(vm, 0, -1, 1);\n"));
        assert!(out.contains("    wrenSetSlotDouble(vm, 2, (double)ret_offset);\n    wrenInsertInList(vm, 0, -1, 2);\n"));
    }

    #[test]
    fn test_optional_input() {
        let out = generate(&["int bview_set_syntax(bview_t *self, char *opt_syntax);"]);
        assert!(out.contains(
            "    opt_syntax = (wrenGetSlotType(vm, 2) == WREN_TYPE_NULL ? NULL : (char *)wrenGetSlotString(vm, 2));\n"
        ));
    }

    #[test]
    fn test_class_source_lists_inputs_only() {
        let out = generate(&[
            "int buffer_get(buffer_t *self, char **ret_data, bint_t *ret_data_len);",
            "int mark_is_at_word_bound(mark_t *self, int side);",
        ]);
        assert!(out.contains("static const char *mle_wren_source =\n    \"class Mle {\\n\"\n"));
        assert!(out.contains("    \"    foreign static buffer_get(self)\\n\"\n"));
        assert!(out.contains("    \"    foreign static mark_is_at_word_bound(self, side)\\n\"\n"));
    }

    #[test]
    fn test_bind_method_dispatch() {
        let out = generate(&[
            "int buffer_get(buffer_t *self, char **ret_data, bint_t *ret_data_len);",
            "int buffer_get_bline(buffer_t *self, bint_t line_index, bline_t **ret_bline);",
        ]);
        assert!(out.contains("static WrenForeignMethodFn mle_wren_bind_method(WrenVM *vm, "));
        assert!(out.contains("if (!is_static || strcmp(class_name, \"Mle\") != 0) return NULL;"));
        assert!(out.contains(
            "    if (strncmp(signature, \"buffer_get(\", 11) == 0) return _wren_func_buffer_get;\n"
        ));
        assert!(out.contains(
            "    if (strncmp(signature, \"buffer_get_bline(\", 17) == 0) return _wren_func_buffer_get_bline;\n"
        ));
        assert!(out.trim_end().ends_with("    return NULL;\n}"));
    }

    #[test]
    fn test_registration_and_hardcoded() {
        let mut input = protos(&[
            "int mark_move_bol(mark_t *self);",
            "int editor_register_cmd(editor_t *editor, cmd_t *cmd);",
        ]);
        input[1].is_hardcoded = true;
        let out = CodeGen::new(Backend::Wren).generate(&input).unwrap();
        assert!(out.contains("// static void _wren_func_editor_register_cmd(WrenVM *vm) {\n// }\n"));
        let table = out.find("mle_wren_lib[] = {").unwrap();
        let editor = out
            .find("{ \"editor_register_cmd\", _wren_func_editor_register_cmd },")
            .unwrap();
        let mark = out.find("{ \"mark_move_bol\", _wren_func_mark_move_bol },").unwrap();
        assert!(table < editor && editor < mark);
        // Hardcoded bindings remain reachable through dispatch
        assert!(out.contains("return _wren_func_editor_register_cmd;"));
    }

    #[test]
    fn test_reserved_param_names() {
        assert_eq!(wren_param_name("in"), "in_");
        assert_eq!(wren_param_name("self"), "self");
    }
}
