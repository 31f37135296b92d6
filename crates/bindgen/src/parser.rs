//! Declaration parser
//!
//! Grammar (one declaration per line, already terminated):
//! ```text
//! <return_type> <*>*<name>(<param_list>);
//! <param_list> := "" | "void" | <param> ("," <param>)*
//! <param>      := <type words> <*>*<name>
//! ```
//!
//! Pointer stars may be attached to the type words or to the name; both
//! spellings normalize to the same [`CType`]. Function pointer parameters,
//! arrays and bitfields are not part of the grammar.

use crate::error::BindgenError;
use crate::prototype::{Parameter, Prototype};
use crate::types::CType;

/// Parse one raw declaration line into a prototype
pub fn parse_prototype(line: &str) -> Result<Prototype, BindgenError> {
    let fail = |reason: &str| BindgenError::Parse {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let text = line.trim();
    let text = text
        .strip_suffix(';')
        .ok_or_else(|| fail("missing trailing ';'"))?
        .trim_end();
    let text = text
        .strip_suffix(')')
        .ok_or_else(|| fail("expected ')' before ';'"))?;
    let (head, params_text) = text
        .split_once('(')
        .ok_or_else(|| fail("expected '(' after function name"))?;
    if params_text.contains('(') || params_text.contains(')') {
        return Err(fail("nested parentheses are not supported"));
    }

    let (return_type, name) = parse_typed_name(head).map_err(|r| fail(&r))?;

    let mut parameters = Vec::new();
    let params_text = params_text.trim();
    if !params_text.is_empty() && params_text != "void" {
        for item in params_text.split(',') {
            let (ty, param_name) = parse_typed_name(item).map_err(|r| fail(&r))?;
            let param = Parameter::new(param_name, ty).map_err(|param| {
                BindgenError::OutputNotPointer {
                    line: line.to_string(),
                    param,
                }
            })?;
            parameters.push(param);
        }
    }

    Ok(Prototype {
        name,
        return_type,
        parameters,
        is_hardcoded: false,
    })
}

/// Split `<type words> <*>*<name>` into a type and a bare identifier
fn parse_typed_name(text: &str) -> Result<(CType, String), String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((name_token, type_tokens)) = tokens.split_last() else {
        return Err("empty type and name".to_string());
    };

    let name = name_token.trim_start_matches('*');
    let mut depth = name_token.len() - name.len();
    if !is_identifier(name) {
        return Err(format!("invalid identifier '{}'", name_token));
    }

    let mut words = Vec::new();
    for token in type_tokens {
        let word = token.trim_end_matches('*');
        depth += token.len() - word.len();
        if word.is_empty() {
            continue;
        }
        if !is_identifier(word) {
            return Err(format!("invalid type word '{}'", token));
        }
        words.push(word);
    }
    if words.is_empty() {
        return Err(format!("missing type for '{}'", name));
    }

    Ok((CType::new(words.join(" "), depth), name.to_string()))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
