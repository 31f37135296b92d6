//! Bindable function model
//!
//! A [`Prototype`] is one native function eligible for binding. Its
//! parameters carry a [`Role`] derived only from their name prefix:
//!
//! ```text
//! fn_     -> Callback
//! optret_ -> OptionalOutput
//! ret_    -> Output
//! opt_    -> OptionalInput
//! (none)  -> Input
//! ```
//!
//! Output parameters are passed by address to the native call and come back
//! to the script as extra results next to the primary return value.

use crate::types::CType;
use std::fmt;

/// Key used for the primary return value in result tables
pub const PRIMARY_RESULT_KEY: &str = "rv";

/// Calling role of a parameter, derived from its name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Input,
    OptionalInput,
    Output,
    OptionalOutput,
    Callback,
}

impl Role {
    /// Classify a parameter name. Prefixes are checked in a fixed order so a
    /// callback can never also be an output.
    pub fn from_name(name: &str) -> Role {
        if name.starts_with("fn_") {
            Role::Callback
        } else if name.starts_with("optret_") {
            Role::OptionalOutput
        } else if name.starts_with("ret_") {
            Role::Output
        } else if name.starts_with("opt_") {
            Role::OptionalInput
        } else {
            Role::Input
        }
    }

    pub fn is_output(self) -> bool {
        matches!(self, Role::Output | Role::OptionalOutput)
    }

    pub fn is_optional(self) -> bool {
        matches!(self, Role::OptionalInput | Role::OptionalOutput)
    }

    /// Inputs are read from the script side (callbacks included)
    pub fn is_input(self) -> bool {
        !self.is_output()
    }

    /// Prefix stripped from the name when used as a result key
    fn output_prefix(self) -> Option<&'static str> {
        match self {
            Role::Output => Some("ret_"),
            Role::OptionalOutput => Some("optret_"),
            _ => None,
        }
    }
}

/// One argument of a bindable function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Type as declared, pointer levels included
    pub declared_type: CType,
    pub role: Role,
}

impl Parameter {
    /// Build a parameter, classifying its role from the name.
    ///
    /// Fails with the parameter name if an output parameter is not declared
    /// as a pointer.
    pub fn new(name: impl Into<String>, declared_type: CType) -> Result<Self, String> {
        let name = name.into();
        let role = Role::from_name(&name);
        if role.is_output() && !declared_type.is_pointer() {
            return Err(name);
        }
        Ok(Parameter {
            name,
            declared_type,
            role,
        })
    }

    /// The value type the parameter actually carries: outputs lose one
    /// pointer level, everything else is the declared type.
    pub fn logical_type(&self) -> CType {
        if self.role.is_output() {
            self.declared_type
                .deref()
                .unwrap_or_else(|| self.declared_type.clone())
        } else {
            self.declared_type.clone()
        }
    }

    /// Literal used to initialize an output local before the call
    pub fn zero_value(&self) -> &'static str {
        if self.logical_type().is_pointer() {
            "NULL"
        } else {
            "0"
        }
    }

    /// Argument text at the native call site
    pub fn call_expression(&self) -> String {
        if self.role.is_output() {
            format!("&{}", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Name with its output prefix removed (`ret_data` -> `data`)
    pub fn result_key(&self) -> &str {
        self.role
            .output_prefix()
            .and_then(|p| self.name.strip_prefix(p))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&self.name)
    }
}

/// One bindable native function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub return_type: CType,
    /// In call order
    pub parameters: Vec<Parameter>,
    /// Registered, but implemented by hand rather than generated
    pub is_hardcoded: bool,
}

impl Prototype {
    /// Primary return plus one slot per output parameter
    pub fn return_slot_count(&self) -> usize {
        1 + self.outputs().count()
    }

    pub fn has_callback_params(&self) -> bool {
        self.parameters.iter().any(|p| p.role == Role::Callback)
    }

    /// Parameters supplied by the caller, in declared order
    pub fn inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.role.is_input())
    }

    pub fn mandatory_inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.inputs().filter(|p| p.role != Role::OptionalInput)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.role.is_output())
    }

    /// The native call expression, outputs passed by address
    pub fn call(&self) -> String {
        let args: Vec<String> = self
            .parameters
            .iter()
            .map(Parameter::call_expression)
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

impl fmt::Display for Prototype {
    /// Renders a declaration line that parses back to the same prototype
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.declared_type.declare(&p.name))
            .collect();
        write!(
            f,
            "{}({});",
            self.return_type.declare(&self.name),
            params.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, base: &str, depth: usize) -> Parameter {
        Parameter::new(name, CType::new(base, depth)).unwrap()
    }

    #[test]
    fn test_role_precedence() {
        assert_eq!(Role::from_name("fn_callback"), Role::Callback);
        assert_eq!(Role::from_name("optret_bview"), Role::OptionalOutput);
        assert_eq!(Role::from_name("ret_mark"), Role::Output);
        assert_eq!(Role::from_name("opt_path"), Role::OptionalInput);
        assert_eq!(Role::from_name("self"), Role::Input);
        // Prefix must be at the start of the name
        assert_eq!(Role::from_name("my_ret_value"), Role::Input);
    }

    #[test]
    fn test_output_requires_pointer() {
        assert_eq!(
            Parameter::new("ret_count", CType::new("int", 0)),
            Err("ret_count".to_string())
        );
        let p = param("ret_count", "int", 1);
        assert_eq!(p.logical_type(), CType::new("int", 0));
        assert_eq!(p.zero_value(), "0");
        assert_eq!(p.call_expression(), "&ret_count");
    }

    #[test]
    fn test_pointer_output_zero_value() {
        let p = param("optret_bview", "bview_t", 2);
        assert_eq!(p.logical_type(), CType::new("bview_t", 1));
        assert_eq!(p.zero_value(), "NULL");
        assert_eq!(p.result_key(), "bview");
    }

    #[test]
    fn test_input_call_expression() {
        let p = param("opt_path", "char", 1);
        assert_eq!(p.call_expression(), "opt_path");
        assert_eq!(p.logical_type(), CType::new("char", 1));
        assert_eq!(p.result_key(), "opt_path");
    }

    #[test]
    fn test_derived_counts() {
        let proto = Prototype {
            name: "buffer_get".to_string(),
            return_type: CType::new("int", 0),
            parameters: vec![
                param("self", "buffer_t", 1),
                param("ret_data", "char", 2),
                param("ret_data_len", "bint_t", 1),
            ],
            is_hardcoded: false,
        };
        assert_eq!(proto.return_slot_count(), 3);
        assert!(!proto.has_callback_params());
        assert_eq!(proto.inputs().count(), 1);
        assert_eq!(proto.call(), "buffer_get(self, &ret_data, &ret_data_len)");
        assert_eq!(
            proto.to_string(),
            "int buffer_get(buffer_t *self, char **ret_data, bint_t *ret_data_len);"
        );
    }

    #[test]
    fn test_mandatory_inputs_skip_optional() {
        let proto = Prototype {
            name: "bview_set_syntax".to_string(),
            return_type: CType::new("int", 0),
            parameters: vec![param("self", "bview_t", 1), param("opt_syntax", "char", 1)],
            is_hardcoded: false,
        };
        assert_eq!(proto.inputs().count(), 2);
        assert_eq!(proto.mandatory_inputs().count(), 1);
    }
}
