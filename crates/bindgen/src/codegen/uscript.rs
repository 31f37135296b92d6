//! Line protocol dispatcher generation
//!
//! The text protocol backend emits a single dispatcher function for one
//! family of functions (`mark_` by default). A request names a command and
//! carries its arguments as text; the dispatcher picks the matching branch,
//! converts the fields, calls the native function, and renders every result
//! back to text for `_uscript_write_response`.
//!
//! Because all branches live in one function body, argument and result
//! variables are temporaries declared once up front and shared between
//! branches. [`EmissionContext`] sizes that block.
//!
//! Wire conventions:
//! - strings are passed through unchanged
//! - integers are base 10, floats use `%.17g`
//! - pointers are 16 lowercase hex digits (`%016llx`)
//!
//! Each response value carries a name and an "is numeric" flag.

use super::{
    BindingKind, CodeGen, Destination, EmissionContext, MarshalRules, c_string_escape, cast,
};
use crate::error::BindgenError;
use crate::prototype::{PRIMARY_RESULT_KEY, Parameter, Prototype, Role};
use crate::types::{CType, PointerAllowList, TypeCategory, is_narrow_integer};
use std::fmt::Write as _;
use tracing::debug;

/// Marshal templates for the text line protocol
pub struct TextRules {
    pointer_types: PointerAllowList,
}

impl TextRules {
    pub fn new(pointer_types: PointerAllowList) -> Self {
        TextRules { pointer_types }
    }
}

impl MarshalRules for TextRules {
    fn backend(&self) -> &'static str {
        "uscript"
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
        let field = format!("msg->params[{}]", index);
        let narrow = is_narrow_integer(ty.bare_base());
        let expr = match category {
            TypeCategory::SignedInteger if narrow => format!("strtol({}, NULL, 10)", field),
            TypeCategory::SignedInteger => format!("strtoll({}, NULL, 10)", field),
            TypeCategory::UnsignedInteger if narrow => format!("strtoul({}, NULL, 10)", field),
            TypeCategory::UnsignedInteger => format!("strtoull({}, NULL, 10)", field),
            TypeCategory::Float => format!("strtod({}, NULL)", field),
            TypeCategory::CString => field,
            TypeCategory::OpaquePointer => format!("(uintptr_t)strtoull({}, NULL, 16)", field),
            TypeCategory::Void | TypeCategory::Unrecognized => {
                return Err(self.no_marshal_rule(&ty, &param.name));
            }
        };
        Ok(format!("{}{}", cast(&ty), expr))
    }

    fn construct(
        &self,
        value: &str,
        ty: &CType,
        category: TypeCategory,
        dest: Destination<'_>,
    ) -> Result<Vec<String>, BindgenError> {
        let k = dest.index;
        let render = match category {
            TypeCategory::SignedInteger => {
                format!("asprintf(&retvar[{}], \"%lld\", (long long){});", k, value)
            }
            TypeCategory::UnsignedInteger => format!(
                "asprintf(&retvar[{}], \"%llu\", (unsigned long long){});",
                k, value
            ),
            TypeCategory::Float => {
                format!("asprintf(&retvar[{}], \"%.17g\", (double){});", k, value)
            }
            TypeCategory::CString => {
                format!("retvar[{}] = strdup({v} ? {v} : \"\");", k, v = value)
            }
            TypeCategory::OpaquePointer => format!(
                "asprintf(&retvar[{}], \"%016llx\", (unsigned long long)(uintptr_t){});",
                k, value
            ),
            TypeCategory::Void => format!("retvar[{}] = strdup(\"\");", k),
            TypeCategory::Unrecognized => return Err(self.no_marshal_rule(ty, value)),
        };
        let is_num = i32::from(category.is_numeric());
        Ok(vec![
            render,
            format!("retvar_name[{}] = \"{}\";", k, c_string_escape(dest.key)),
            format!("retvar_is_num[{}] = {};", k, is_num),
        ])
    }
}

impl CodeGen {
    pub(super) fn emit_uscript(&mut self, prototypes: &[&Prototype]) -> Result<(), BindgenError> {
        let family: Vec<&Prototype> = prototypes
            .iter()
            .copied()
            .filter(|p| p.name.starts_with(&self.options.family))
            .collect();
        debug!(
            "uscript family '{}': {} of {} prototypes",
            self.options.family,
            family.len(),
            prototypes.len()
        );

        let rules = TextRules::new(self.options.pointer_types.clone());
        let mut ctx = EmissionContext::new();
        let bound = Self::bind_all(&family, &rules, |proto| {
            Self::uscript_branch(proto, &rules, &mut ctx)
        })?;

        self.emit_uscript_interface(&family)?;

        // Command names
        writeln!(
            &mut self.output,
            "static const char *{}[] = {{",
            self.options.table_name
        )?;
        for func in &bound {
            writeln!(&mut self.output, "    \"{}\",", func.prototype.name)?;
        }
        writeln!(&mut self.output, "    NULL")?;
        writeln!(&mut self.output, "}};")?;
        writeln!(&mut self.output)?;

        // Dispatcher
        let max_results = ctx.max_results();
        writeln!(
            &mut self.output,
            "static int {}(uscript_t *uscript, uscript_msg_t *msg) {{",
            self.options.dispatch_name
        )?;
        writeln!(&mut self.output, "    int rc = MLE_ERR;")?;
        writeln!(&mut self.output, "    int i;")?;
        writeln!(&mut self.output, "    int retvar_count = 0;")?;
        writeln!(&mut self.output, "    char *retvar[{}] = {{ NULL }};", max_results)?;
        writeln!(
            &mut self.output,
            "    char *retvar_name[{}] = {{ NULL }};",
            max_results
        )?;
        writeln!(&mut self.output, "    int retvar_is_num[{}] = {{ 0 }};", max_results)?;
        for decl in ctx.declarations() {
            writeln!(&mut self.output, "    {}", decl)?;
        }
        writeln!(&mut self.output, "    do {{")?;
        let mut first = true;
        for func in &bound {
            let BindingKind::Generated { body } = &func.kind else {
                continue;
            };
            let keyword = if first { "if" } else { "} else if" };
            first = false;
            writeln!(
                &mut self.output,
                "        {} (strcmp(msg->cmd_name, \"{}\") == 0) {{",
                keyword, func.prototype.name
            )?;
            self.output.push_str(body);
        }
        if !first {
            writeln!(&mut self.output, "        }}")?;
        }
        writeln!(&mut self.output, "    }} while (0);")?;
        writeln!(
            &mut self.output,
            "    _uscript_write_response(uscript, msg, rc, retvar, retvar_name, retvar_is_num, retvar_count);"
        )?;
        writeln!(&mut self.output, "    for (i = 0; i < retvar_count; i++) free(retvar[i]);")?;
        writeln!(&mut self.output, "    return rc;")?;
        writeln!(&mut self.output, "}}")?;
        Ok(())
    }

    /// Comment block documenting each command: inputs in, named results out
    fn emit_uscript_interface(&mut self, family: &[&Prototype]) -> Result<(), BindgenError> {
        writeln!(
            &mut self.output,
            "// uscript commands ({} family)",
            self.options.family
        )?;
        for proto in family {
            let inputs: Vec<&str> = proto.mandatory_inputs().map(|p| p.name.as_str()).collect();
            let mut results = vec![PRIMARY_RESULT_KEY];
            results.extend(proto.outputs().map(Parameter::result_key));
            write!(
                &mut self.output,
                "//   {}({}) -> {}",
                proto.name,
                inputs.join(", "),
                results.join(", ")
            )?;
            if proto.is_hardcoded {
                write!(&mut self.output, " [hardcoded]")?;
            }
            writeln!(&mut self.output)?;
        }
        writeln!(&mut self.output)?;
        Ok(())
    }

    /// One dispatcher branch body. Temporaries come from `ctx`, which
    /// remembers the largest allocation per type across all branches.
    fn uscript_branch(
        proto: &Prototype,
        rules: &TextRules,
        ctx: &mut EmissionContext,
    ) -> Result<String, BindgenError> {
        let mut body = String::new();
        ctx.begin_prototype();

        let rv = if proto.return_type.is_void() {
            None
        } else {
            Some(ctx.alloc(&proto.return_type))
        };
        let temps: Vec<String> = proto
            .parameters
            .iter()
            .map(|p| ctx.alloc(&p.logical_type()))
            .collect();

        let mandatory = proto.mandatory_inputs().count();
        writeln!(&mut body, "            if (msg->params_len != {}) break;", mandatory)?;

        // Mandatory inputs take consecutive wire fields; the rest start zeroed
        let mut field = 0;
        for (param, temp) in proto.parameters.iter().zip(&temps) {
            if param.role == Role::Input {
                let category = rules.category(&param.logical_type(), &proto.name)?;
                writeln!(
                    &mut body,
                    "            {} = {};",
                    temp,
                    rules.extract(param, category, field)?
                )?;
                field += 1;
            } else {
                writeln!(&mut body, "            {} = {};", temp, param.zero_value())?;
            }
        }

        let args: Vec<String> = proto
            .parameters
            .iter()
            .zip(&temps)
            .map(|(p, t)| if p.role.is_output() { format!("&{}", t) } else { t.clone() })
            .collect();
        let call = format!("{}({})", proto.name, args.join(", "));
        match &rv {
            Some(rv) => writeln!(&mut body, "            {} = {};", rv, call)?,
            None => writeln!(&mut body, "            {};", call)?,
        }

        let category = rules.category(&proto.return_type, &proto.name)?;
        let dest = Destination {
            index: 0,
            key: PRIMARY_RESULT_KEY,
        };
        let value = rv.as_deref().unwrap_or("");
        for line in rules.construct(value, &proto.return_type, category, dest)? {
            writeln!(&mut body, "            {}", line)?;
        }
        let outputs = proto
            .parameters
            .iter()
            .zip(&temps)
            .filter(|(p, _)| p.role.is_output());
        for (k, (param, temp)) in outputs.enumerate() {
            let ty = param.logical_type();
            let category = rules.category(&ty, &proto.name)?;
            let dest = Destination {
                index: k + 1,
                key: param.result_key(),
            };
            for line in rules.construct(temp, &ty, category, dest)? {
                writeln!(&mut body, "            {}", line)?;
            }
        }

        let count = proto.return_slot_count();
        ctx.record_results(count);
        writeln!(&mut body, "            retvar_count = {};", count)?;
        writeln!(&mut body, "            rc = MLE_OK;")?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::protos;
    use super::*;
    use crate::codegen::Backend;

    fn generate(lines: &[&str]) -> String {
        CodeGen::new(Backend::Uscript).generate(&protos(lines)).unwrap()
    }

    #[test]
    fn test_temporaries_sized_to_maximum() {
        let out = generate(&[
            "int mark_replace(mark_t *self, char *find, char *repl);",
            "int mark_find_next_re(mark_t *self, char *re);",
        ]);
        assert!(out.contains("    char *tmp_char_p_0;\n"));
        assert!(out.contains("    char *tmp_char_p_1;\n"));
        assert!(!out.contains("tmp_char_p_2"));
        assert_eq!(out.matches("    mark_t *tmp_mark_t_p_0;\n").count(), 1);
    }

    #[test]
    fn test_branch_conversions() {
        let out = generate(&[
            "int mark_insert_before(mark_t *self, char *data, bint_t data_len);",
        ]);
        assert!(out.contains("        if (strcmp(msg->cmd_name, \"mark_insert_before\") == 0) {\n"));
        assert!(out.contains("            if (msg->params_len != 3) break;\n"));
        assert!(out.contains(
            "            tmp_mark_t_p_0 = (mark_t *)(uintptr_t)strtoull(msg->params[0], NULL, 16);\n"
        ));
        assert!(out.contains("            tmp_char_p_0 = (char *)msg->params[1];\n"));
        assert!(out.contains(
            "            tmp_bint_t_0 = (bint_t)strtoll(msg->params[2], NULL, 10);\n"
        ));
        assert!(out.contains(
            "            tmp_int_0 = mark_insert_before(tmp_mark_t_p_0, tmp_char_p_0, tmp_bint_t_0);\n"
        ));
        assert!(out.contains("asprintf(&retvar[0], \"%lld\", (long long)tmp_int_0);"));
        assert!(out.contains("retvar_name[0] = \"rv\";"));
        assert!(out.contains("retvar_is_num[0] = 1;"));
        assert!(out.contains("            retvar_count = 1;\n            rc = MLE_OK;\n"));
    }

    #[test]
    fn test_outputs_and_pointer_encoding() {
        let out = generate(&[
            "int mark_clone(mark_t *self, mark_t **ret_mark);",
            "int mark_get_offset(mark_t *self, bint_t *ret_offset);",
        ]);
        assert!(out.contains("            tmp_mark_t_p_1 = NULL;\n"));
        assert!(out.contains("tmp_int_0 = mark_clone(tmp_mark_t_p_0, &tmp_mark_t_p_1);"));
        assert!(out.contains(
            "asprintf(&retvar[1], \"%016llx\", (unsigned long long)(uintptr_t)tmp_mark_t_p_1);"
        ));
        assert!(out.contains("retvar_name[1] = \"mark\";"));
        assert!(out.contains("retvar_name[1] = \"offset\";"));
        assert!(out.contains("    char *retvar[2] = { NULL };\n"));
        assert!(out.contains("        } else if (strcmp(msg->cmd_name, \"mark_get_offset\") == 0) {\n"));
    }

    #[test]
    fn test_family_filter_and_names_table() {
        let out = generate(&[
            "int buffer_undo(buffer_t *self);",
            "int mark_move_bol(mark_t *self);",
            "int mark_move_eol(mark_t *self);",
        ]);
        assert!(!out.contains("buffer_undo"));
        assert!(out.contains(
            "static const char *uscript_func_names[] = {\n    \"mark_move_bol\",\n    \"mark_move_eol\",\n    NULL\n};\n"
        ));
        assert!(out.contains("//   mark_move_bol(self) -> rv\n"));
    }

    #[test]
    fn test_family_bounds_validation() {
        // FILE * outside the family does not matter to this backend
        let out = generate(&[
            "int buffer_write_to_file(buffer_t *self, FILE *fp, size_t *optret_nbytes);",
            "int mark_move_bol(mark_t *self);",
        ]);
        assert!(out.contains("mark_move_bol"));
    }

    #[test]
    fn test_hardcoded_member_listed_without_branch() {
        let mut input = protos(&[
            "int mark_move_bol(mark_t *self);",
            "int mark_set_callback(mark_t *self, mark_cb_t fn_cb);",
        ]);
        input[1].is_hardcoded = true;
        let out = CodeGen::new(Backend::Uscript).generate(&input).unwrap();
        assert!(out.contains("    \"mark_set_callback\",\n"));
        assert!(out.contains("//   mark_set_callback(self, fn_cb) -> rv [hardcoded]\n"));
        assert!(!out.contains("\"mark_set_callback\") == 0"));
    }

    #[test]
    fn test_response_always_written() {
        let out = generate(&["void mark_reset(mark_t *self);"]);
        assert!(out.contains("            mark_reset(tmp_mark_t_p_0);\n"));
        assert!(out.contains("retvar[0] = strdup(\"\");"));
        let ladder_end = out.find("    } while (0);\n").unwrap();
        let respond = out
            .find("_uscript_write_response(uscript, msg, rc, retvar, retvar_name, retvar_is_num")
            .unwrap();
        assert!(ladder_end < respond);
        let cleanup = "    for (i = 0; i < retvar_count; i++) free(retvar[i]);\n    return rc;\n}";
        assert!(out.contains(cleanup));
    }

    #[test]
    fn test_optional_inputs_stay_zero() {
        let out = generate(&["int mark_move_to(mark_t *self, bint_t line, bint_t opt_col);"]);
        assert!(out.contains("            if (msg->params_len != 2) break;\n"));
        assert!(out.contains("            tmp_bint_t_1 = 0;\n"));
    }

    #[test]
    fn test_empty_family() {
        let out = generate(&["int buffer_undo(buffer_t *self);"]);
        assert!(out.contains("    do {\n    } while (0);\n"));
        assert!(out.contains("    char *retvar[1] = { NULL };\n"));
    }
}
