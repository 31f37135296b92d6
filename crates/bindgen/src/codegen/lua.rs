//! Lua binding generation
//!
//! Each generated function pulls its inputs off the Lua stack at positions
//! `1..N`, calls the native function, and returns a single table keyed by
//! `rv` plus one key per output parameter (`ret_mark` -> `mark`).
//!
//! Pointers cross the boundary through `luaL_checkpointer`,
//! `luaL_optpointer` and `lua_pushpointer`, which the embedding provides.

use super::{BindingKind, CodeGen, Destination, MarshalRules, c_string_escape, cast};
use crate::error::BindgenError;
use crate::prototype::{PRIMARY_RESULT_KEY, Parameter, Prototype, Role};
use crate::types::{CType, PointerAllowList, TypeCategory};
use std::fmt::Write as _;

/// Marshal templates for the Lua C API
pub struct LuaRules {
    pointer_types: PointerAllowList,
}

impl LuaRules {
    pub fn new(pointer_types: PointerAllowList) -> Self {
        LuaRules { pointer_types }
    }
}

impl MarshalRules for LuaRules {
    fn backend(&self) -> &'static str {
        "lua"
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
        let optional = param.role == Role::OptionalInput;
        let call = match (category, optional) {
            (TypeCategory::SignedInteger | TypeCategory::UnsignedInteger, false) => {
                format!("luaL_checkinteger(L, {})", index)
            }
            (TypeCategory::SignedInteger | TypeCategory::UnsignedInteger, true) => {
                format!("luaL_optinteger(L, {}, 0)", index)
            }
            (TypeCategory::Float, false) => format!("luaL_checknumber(L, {})", index),
            (TypeCategory::Float, true) => format!("luaL_optnumber(L, {}, 0)", index),
            (TypeCategory::CString, false) => format!("luaL_checkstring(L, {})", index),
            (TypeCategory::CString, true) => format!("luaL_optstring(L, {}, NULL)", index),
            (TypeCategory::OpaquePointer, false) => format!("luaL_checkpointer(L, {})", index),
            (TypeCategory::OpaquePointer, true) => {
                format!("luaL_optpointer(L, {}, NULL)", index)
            }
            (TypeCategory::Void | TypeCategory::Unrecognized, _) => {
                return Err(self.no_marshal_rule(&ty, &param.name));
            }
        };
        Ok(format!("{}{}", cast(&ty), call))
    }

    fn construct(
        &self,
        value: &str,
        ty: &CType,
        category: TypeCategory,
        dest: Destination<'_>,
    ) -> Result<Vec<String>, BindgenError> {
        let push = match category {
            TypeCategory::SignedInteger | TypeCategory::UnsignedInteger => {
                format!("lua_pushinteger(L, (lua_Integer){});", value)
            }
            TypeCategory::Float => format!("lua_pushnumber(L, (lua_Number){});", value),
            TypeCategory::CString => format!("lua_pushstring(L, (const char *){});", value),
            TypeCategory::OpaquePointer => format!("lua_pushpointer(L, (void *){});", value),
            TypeCategory::Void => "lua_pushnil(L);".to_string(),
            TypeCategory::Unrecognized => return Err(self.no_marshal_rule(ty, value)),
        };
        Ok(vec![
            format!("lua_pushstring(L, \"{}\");", c_string_escape(dest.key)),
            push,
            "lua_settable(L, -3);".to_string(),
        ])
    }
}

impl CodeGen {
    pub(super) fn emit_lua(&mut self, prototypes: &[&Prototype]) -> Result<(), BindgenError> {
        let rules = LuaRules::new(self.options.pointer_types.clone());
        let bound = Self::bind_all(prototypes, &rules, |proto| self.lua_body(proto, &rules))?;

        for func in &bound {
            let c_func = self.options.c_func(func.prototype);
            match &func.kind {
                BindingKind::Generated { body } => {
                    writeln!(&mut self.output, "static int {}(lua_State *L) {{", c_func)?;
                    self.output.push_str(body);
                    writeln!(&mut self.output, "}}")?;
                }
                BindingKind::Hardcoded => {
                    writeln!(&mut self.output, "// static int {}(lua_State *L) {{", c_func)?;
                    writeln!(&mut self.output, "// }}")?;
                }
            }
            writeln!(&mut self.output)?;
        }

        writeln!(
            &mut self.output,
            "static const struct luaL_Reg {}[] = {{",
            self.options.table_name
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
        Ok(())
    }

    /// Body of one generated Lua binding, without the enclosing braces
    fn lua_body(&self, proto: &Prototype, rules: &LuaRules) -> Result<String, BindgenError> {
        let mut body = String::new();
        let has_rv = !proto.return_type.is_void();

        // Locals: return value, inputs, zeroed outputs
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

        // Inputs from stack positions 1..N
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

        // Result table: rv first, then outputs in declared order
        writeln!(
            &mut body,
            "    lua_createtable(L, 0, {});",
            proto.return_slot_count()
        )?;
        let category = rules.category(&proto.return_type, &proto.name)?;
        let dest = Destination {
            index: 0,
            key: PRIMARY_RESULT_KEY,
        };
        for line in rules.construct("rv", &proto.return_type, category, dest)? {
            writeln!(&mut body, "    {}", line)?;
        }
        for (i, param) in proto.outputs().enumerate() {
            let ty = param.logical_type();
            let category = rules.category(&ty, &proto.name)?;
            let dest = Destination {
                index: i + 1,
                key: param.result_key(),
            };
            for line in rules.construct(&param.name, &ty, category, dest)? {
                writeln!(&mut body, "    {}", line)?;
            }
        }
        writeln!(&mut body, "    return 1;")?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::protos;
    use super::*;
    use crate::codegen::Backend;

    fn generate(lines: &[&str]) -> String {
        CodeGen::new(Backend::Lua).generate(&protos(lines)).unwrap()
    }

    #[test]
    fn test_generated_function() {
        let out = generate(&[
            "int buffer_insert(buffer_t *self, bint_t offset, char *data, bint_t data_len, bint_t *optret_num_chars);",
        ]);
        assert!(out.contains("static int _uscript_func_buffer_insert(lua_State *L) {"));
        assert!(out.contains("    int rv;\n"));
        assert!(out.contains("    bint_t optret_num_chars = 0;\n"));
        assert!(out.contains("    self = (buffer_t *)luaL_checkpointer(L, 1);\n"));
        assert!(out.contains("    offset = (bint_t)luaL_checkinteger(L, 2);\n"));
        assert!(out.contains("    data = (char *)luaL_checkstring(L, 3);\n"));
        assert!(out.contains("    data_len = (bint_t)luaL_checkinteger(L, 4);\n"));
        assert!(out.contains(
            "    rv = buffer_insert(self, offset, data, data_len, &optret_num_chars);\n"
        ));
        assert!(out.contains("    lua_createtable(L, 0, 2);\n"));
        assert!(out.contains("    lua_pushstring(L, \"rv\");\n    lua_pushinteger(L, (lua_Integer)rv);\n    lua_settable(L, -3);\n"));
        assert!(out.contains("    lua_pushstring(L, \"num_chars\");\n    lua_pushinteger(L, (lua_Integer)optret_num_chars);\n"));
        assert!(out.contains("    return 1;\n}"));
    }

    #[test]
    fn test_optional_inputs_and_pointer_outputs() {
        let out = generate(&[
            "int bview_add_cursor(bview_t *self, bline_t *opt_bline, bint_t opt_col, cursor_t **optret_cursor);",
        ]);
        assert!(out.contains("    opt_bline = (bline_t *)luaL_optpointer(L, 2, NULL);\n"));
        assert!(out.contains("    opt_col = (bint_t)luaL_optinteger(L, 3, 0);\n"));
        assert!(out.contains("    cursor_t *optret_cursor = NULL;\n"));
        assert!(out.contains("lua_pushpointer(L, (void *)optret_cursor);"));
    }

    #[test]
    fn test_output_strings_and_floats() {
        let out = generate(&[
            "int buffer_get(buffer_t *self, char **ret_data, bint_t *ret_data_len);",
            "int bview_split(bview_t *self, int is_vertical, float factor, bview_t **optret_bview);",
        ]);
        assert!(out.contains("lua_pushstring(L, \"data\");\n    lua_pushstring(L, (const char *)ret_data);"));
        assert!(out.contains("    factor = (float)luaL_checknumber(L, 3);\n"));
    }

    #[test]
    fn test_registration_table_sorted() {
        let out = generate(&[
            "int zeta(mark_t *self);",
            "int alpha(mark_t *self);",
            "int mid(mark_t *self);",
        ]);
        let alpha = out.find("{ \"alpha\", _uscript_func_alpha },").unwrap();
        let mid = out.find("{ \"mid\", _uscript_func_mid },").unwrap();
        let zeta = out.find("{ \"zeta\", _uscript_func_zeta },").unwrap();
        assert!(alpha < mid && mid < zeta);
        assert!(out.contains("static const struct luaL_Reg mle_lib[] = {"));
        assert!(out.trim_end().ends_with("    { NULL, NULL }\n};"));
    }

    #[test]
    fn test_hardcoded_stub() {
        let mut input = protos(&[
            "int editor_menu(editor_t *editor, cmd_func_t fn_callback, char *opt_buf_data, int opt_buf_data_len, aproc_t *opt_aproc, bview_t **optret_menu);",
        ]);
        input[0].is_hardcoded = true;
        let out = CodeGen::new(Backend::Lua).generate(&input).unwrap();
        assert!(out.contains("// static int _uscript_func_editor_menu(lua_State *L) {\n// }\n"));
        assert!(!out.contains("luaL_check"));
        assert_eq!(out.matches("{ \"editor_menu\", _uscript_func_editor_menu },").count(), 1);
    }

    #[test]
    fn test_void_return() {
        let out = generate(&["void mark_reset(mark_t *self);"]);
        assert!(out.contains("    mark_reset(self);\n"));
        assert!(!out.contains("rv = "));
        assert!(out.contains("lua_pushnil(L);"));
    }
}
