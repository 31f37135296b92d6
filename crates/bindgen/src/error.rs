//! Binding generation error types.

use std::path::PathBuf;

/// Error type for every stage of a generation run.
///
/// All variants are fatal: a run that hits any of them produces no output,
/// since a registration table with a missing entry silently breaks the
/// embedding.
#[derive(Debug)]
pub enum BindgenError {
    /// A declaration line that does not fit the prototype grammar
    Parse { line: String, reason: String },
    /// A `ret_`/`optret_` parameter whose declared type is not a pointer
    OutputNotPointer { line: String, param: String },
    /// A type string with no marshal rule in the given backend
    UnrecognizedType {
        type_name: String,
        function: String,
        backend: &'static str,
    },
    /// A generated (non-hardcoded) binding that takes a callback argument
    CallbackParameter { function: String, param: String },
    /// Two auto-extracted declarations share a name
    DuplicatePrototype(String),
    /// A declaration source could not be read
    Source { path: PathBuf, message: String },
    /// Invalid configuration (bad regex, unknown backend, malformed TOML)
    Config(String),
    /// A logical error in code generation
    Logic(String),
    /// A formatting error when writing generated code
    Format(std::fmt::Error),
}

impl std::fmt::Display for BindgenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindgenError::Parse { line, reason } => {
                write!(f, "Could not parse prototype '{}': {}", line, reason)
            }
            BindgenError::OutputNotPointer { line, param } => write!(
                f,
                "Expected pointer type for output parameter '{}' in '{}'",
                param, line
            ),
            BindgenError::UnrecognizedType {
                type_name,
                function,
                backend,
            } => write!(
                f,
                "Unhandled type '{}' in {} ({} backend)",
                type_name, function, backend
            ),
            BindgenError::CallbackParameter { function, param } => write!(
                f,
                "Callback parameter '{}' in {} requires a hardcoded binding",
                param, function
            ),
            BindgenError::DuplicatePrototype(name) => {
                write!(f, "Prototype '{}' is declared more than once", name)
            }
            BindgenError::Source { path, message } => {
                write!(f, "Failed to read {}: {}", path.display(), message)
            }
            BindgenError::Config(s) => write!(f, "Invalid configuration: {}", s),
            BindgenError::Logic(s) => write!(f, "{}", s),
            BindgenError::Format(e) => write!(f, "Code generation error: {}", e),
        }
    }
}

impl std::error::Error for BindgenError {}

impl From<String> for BindgenError {
    fn from(s: String) -> Self {
        BindgenError::Logic(s)
    }
}

impl From<std::fmt::Error> for BindgenError {
    fn from(e: std::fmt::Error) -> Self {
        BindgenError::Format(e)
    }
}
