//! mle Binding Generator Library
//!
//! Reads C declarations of the editor's public API and generates the glue
//! that exposes them to a script host: Lua, Wren, or the uscript line
//! protocol.
//!
//! # Pipeline
//!
//! 1. A [`DeclarationSource`] yields declaration lines (normally a
//!    [`HeaderScan`] over the editor headers).
//! 2. Each line is parsed into a [`Prototype`].
//! 3. Hardcoded prototypes are merged in, replacing generated ones by name.
//! 4. [`CodeGen`] emits the backend's output, all or nothing.
//!
//! ```rust,ignore
//! use mlebind::{Backend, GeneratorConfig, generate};
//!
//! let config = GeneratorConfig::new().with_header("mle.h");
//! let code = generate(&config, Backend::Lua)?;
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod hardcoded;
pub mod parser;
pub mod prototype;
pub mod source;
pub mod types;

pub use codegen::{Backend, BackendOptions, CodeGen};
pub use config::{BackendSection, GeneratorConfig};
pub use error::BindgenError;
pub use hardcoded::{HardcodedEntry, merge_prototypes};
pub use parser::parse_prototype;
pub use prototype::{Parameter, Prototype, Role};
pub use source::{DeclarationFilter, DeclarationSource, HeaderScan, StaticDeclarations};
pub use types::{CType, PointerAllowList, TypeCategory};

use tracing::info;

/// Parse every line from `source` and merge in `hardcoded`
pub fn collect_from_source(
    source: &dyn DeclarationSource,
    hardcoded: Vec<Prototype>,
) -> Result<Vec<Prototype>, BindgenError> {
    let lines = source.declarations()?;
    let extracted = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| parse_prototype(l))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "{}: {} declarations, {} hardcoded",
        source.describe(),
        extracted.len(),
        hardcoded.len()
    );
    merge_prototypes(extracted, hardcoded)
}

/// The merged, name-sorted prototypes described by `config`
pub fn collect_prototypes(config: &GeneratorConfig) -> Result<Vec<Prototype>, BindgenError> {
    let source = config.declaration_source()?;
    collect_from_source(&source, config.hardcoded_prototypes()?)
}

/// Run the whole pipeline for one backend
pub fn generate(config: &GeneratorConfig, backend: Backend) -> Result<String, BindgenError> {
    let prototypes = collect_prototypes(config)?;
    let mut codegen = CodeGen::with_options(backend, config.backend_options(backend));
    let output = codegen.generate(&prototypes)?;
    info!("{} backend: {} prototypes bound", backend, prototypes.len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_from_static_source() {
        let source = StaticDeclarations::new([
            "int mark_move_eol(mark_t *self);",
            "",
            "int buffer_undo(buffer_t *self);",
        ]);
        let hardcoded = vec![hardcoded::hardcoded_prototype("editor_menu", &[]).unwrap()];
        let protos = collect_from_source(&source, hardcoded).unwrap();
        let names: Vec<&str> = protos.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["buffer_undo", "editor_menu", "mark_move_eol"]);
    }

    #[test]
    fn test_parse_error_aborts() {
        let source = StaticDeclarations::new(["int mark_broken(mark_t *self;"]);
        assert!(matches!(
            collect_from_source(&source, vec![]),
            Err(BindgenError::Parse { .. })
        ));
    }
}
