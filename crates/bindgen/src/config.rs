//! Generator configuration
//!
//! Everything the historical generator hardcoded (which headers to read,
//! which name families to bind, the denylist, hand-written bindings, the
//! pointer allow-list and the output names) can be set here, either from a
//! TOML file or through the builder methods.
//!
//! # Example
//!
//! ```toml
//! headers = ["mle.h"]
//! families = ["buffer", "mark"]
//! hardcoded_sources = ["uscript.c"]
//!
//! [[hardcoded]]
//! name = "editor_register_cmd"
//! params = ["editor", "cmd"]
//!
//! [uscript]
//! family = "buffer_"
//! ```
//!
//! Relative paths in a file are resolved against the file's directory.

use crate::codegen::{Backend, BackendOptions};
use crate::error::BindgenError;
use crate::hardcoded::{HardcodedEntry, HardcodedScan};
use crate::prototype::Prototype;
use crate::source::{DEFAULT_DENYLIST, DEFAULT_FAMILIES, DeclarationFilter, HeaderScan};
use crate::types::{DEFAULT_POINTER_TYPES, PointerAllowList};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stock configuration, built into the binary
pub static DEFAULT_CONFIG: &str = include_str!("../data/mle-bindgen.toml");

/// Per-backend overrides; unset fields keep the backend defaults
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    pub pointer_types: Option<Vec<String>>,
    pub table_name: Option<String>,
    pub function_prefix: Option<String>,
    pub class_name: Option<String>,
    pub family: Option<String>,
    pub dispatch_name: Option<String>,
}

/// Configuration for a generation run
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Headers scanned for declarations, in order
    pub headers: Vec<PathBuf>,
    /// Bindable name families (`mark` binds `mark_*`)
    pub families: Vec<String>,
    /// Declarations matching this pattern are dropped; empty disables it
    pub denylist: Option<String>,
    /// C sources scanned for `// foreign static` declarations
    pub hardcoded_sources: Vec<PathBuf>,
    /// Hand-written bindings declared inline
    pub hardcoded: Vec<HardcodedEntry>,
    /// Default pointer allow-list for every backend
    pub pointer_types: Vec<String>,
    pub lua: BackendSection,
    pub wren: BackendSection,
    pub uscript: BackendSection,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            headers: Vec::new(),
            families: DEFAULT_FAMILIES.iter().map(|f| f.to_string()).collect(),
            denylist: Some(DEFAULT_DENYLIST.to_string()),
            hardcoded_sources: Vec::new(),
            hardcoded: Vec::new(),
            pointer_types: DEFAULT_POINTER_TYPES.iter().map(|t| t.to_string()).collect(),
            lua: BackendSection::default(),
            wren: BackendSection::default(),
            uscript: BackendSection::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        GeneratorConfig::default()
    }

    /// The stock configuration: default families and denylist plus the
    /// hand-written bindings of the editor
    pub fn default_config() -> Result<Self, BindgenError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse a configuration from TOML text. Paths are left as written.
    pub fn from_toml(text: &str) -> Result<Self, BindgenError> {
        toml::from_str(text).map_err(|e| BindgenError::Config(e.to_string()))
    }

    /// Load a configuration file, resolving its paths against its directory
    pub fn load(path: &Path) -> Result<Self, BindgenError> {
        let text = fs::read_to_string(path).map_err(|e| BindgenError::Source {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml(&text).map_err(|e| match e {
            BindgenError::Config(msg) => {
                BindgenError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        debug!(
            "loaded {}: {} headers, {} hardcoded entries",
            path.display(),
            config.headers.len(),
            config.hardcoded.len()
        );
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in self.headers.iter_mut().chain(self.hardcoded_sources.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Add a header to scan
    pub fn with_header(mut self, path: impl Into<PathBuf>) -> Self {
        self.headers.push(path.into());
        self
    }

    /// Replace the header list
    pub fn with_headers(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.headers = paths.into_iter().collect();
        self
    }

    /// Replace the bindable families
    pub fn with_families(mut self, families: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_denylist(mut self, pattern: Option<String>) -> Self {
        self.denylist = pattern;
        self
    }

    pub fn with_hardcoded_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.hardcoded_sources.push(path.into());
        self
    }

    pub fn with_hardcoded(mut self, entry: HardcodedEntry) -> Self {
        self.hardcoded.push(entry);
        self
    }

    pub fn with_pointer_types(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.pointer_types = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the overrides for one backend
    pub fn with_backend_section(mut self, backend: Backend, section: BackendSection) -> Self {
        *self.section_mut(backend) = section;
        self
    }

    fn section(&self, backend: Backend) -> &BackendSection {
        match backend {
            Backend::Lua => &self.lua,
            Backend::Wren => &self.wren,
            Backend::Uscript => &self.uscript,
        }
    }

    fn section_mut(&mut self, backend: Backend) -> &mut BackendSection {
        match backend {
            Backend::Lua => &mut self.lua,
            Backend::Wren => &mut self.wren,
            Backend::Uscript => &mut self.uscript,
        }
    }

    /// Backend defaults with this configuration's overrides applied
    pub fn backend_options(&self, backend: Backend) -> BackendOptions {
        let section = self.section(backend);
        let mut options = BackendOptions::defaults(backend);
        options.pointer_types = PointerAllowList::new(
            section
                .pointer_types
                .as_ref()
                .unwrap_or(&self.pointer_types)
                .iter()
                .cloned(),
        );
        let overrides = [
            (&mut options.table_name, &section.table_name),
            (&mut options.function_prefix, &section.function_prefix),
            (&mut options.class_name, &section.class_name),
            (&mut options.family, &section.family),
            (&mut options.dispatch_name, &section.dispatch_name),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        options
    }

    pub fn filter(&self) -> Result<DeclarationFilter, BindgenError> {
        DeclarationFilter::new(&self.families, self.denylist.as_deref())
    }

    /// The header scan described by this configuration
    pub fn declaration_source(&self) -> Result<HeaderScan, BindgenError> {
        Ok(HeaderScan::new(self.headers.clone(), self.filter()?))
    }

    /// Hardcoded prototypes from scanned sources, then inline entries
    pub fn hardcoded_prototypes(&self) -> Result<Vec<Prototype>, BindgenError> {
        let mut protos = HardcodedScan::new(self.hardcoded_sources.clone()).prototypes()?;
        for entry in &self.hardcoded {
            protos.push(entry.to_prototype()?);
        }
        Ok(protos)
    }
}
