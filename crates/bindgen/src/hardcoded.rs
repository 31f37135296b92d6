//! Hardcoded prototypes
//!
//! Some functions cannot be bound automatically (they take callbacks or
//! control the VM), so their bindings are written by hand. They are still
//! listed here so every registration table stays complete.
//!
//! Two spellings are accepted:
//! ```text
//! // foreign static int _uscript_func_editor_register_cmd(editor, name, fn_callback)
//! ```
//! scanned from C sources, and `[[hardcoded]]` entries in the config file.

use crate::error::BindgenError;
use crate::parser::parse_prototype;
use crate::prototype::Prototype;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Marker that starts a hardcoded declaration comment
pub const FOREIGN_STATIC_MARKER: &str = "// foreign static";

static FOREIGN_STATIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^// foreign static (?<ret>\S+) _uscript_func_(?<name>[^(]+)\((?<params>[^)]*)\)$")
        .expect("foreign static pattern is valid")
});

/// A hardcoded binding declared in configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HardcodedEntry {
    /// Function name as registered
    pub name: String,
    /// Parameter names; each becomes an untyped `void *`
    #[serde(default)]
    pub params: Vec<String>,
    /// Full C declaration, when the real types should be kept
    pub declaration: Option<String>,
}

impl HardcodedEntry {
    pub fn to_prototype(&self) -> Result<Prototype, BindgenError> {
        match &self.declaration {
            Some(decl) => {
                let mut proto = parse_prototype(decl)?;
                if proto.name != self.name {
                    return Err(BindgenError::Config(format!(
                        "hardcoded entry '{}' declares function '{}'",
                        self.name, proto.name
                    )));
                }
                proto.is_hardcoded = true;
                Ok(proto)
            }
            None => hardcoded_prototype(&self.name, &self.params),
        }
    }
}

/// Build a hardcoded prototype with untyped pointer parameters
pub fn hardcoded_prototype(name: &str, params: &[String]) -> Result<Prototype, BindgenError> {
    let params: Vec<String> = params.iter().map(|p| format!("void *{}", p.trim())).collect();
    let mut proto = parse_prototype(&format!("void {}({});", name.trim(), params.join(", ")))?;
    proto.is_hardcoded = true;
    Ok(proto)
}

/// Parse one `// foreign static ...` comment line
pub fn parse_foreign_static(line: &str) -> Result<Prototype, BindgenError> {
    let caps = FOREIGN_STATIC_RE
        .captures(line.trim_end())
        .ok_or_else(|| BindgenError::Parse {
            line: line.to_string(),
            reason: "malformed hardcoded declaration".to_string(),
        })?;
    let params: Vec<String> = caps["params"]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    hardcoded_prototype(&caps["name"], &params)
}

/// Scans C sources for `// foreign static` hardcoded declarations
#[derive(Debug, Clone, Default)]
pub struct HardcodedScan {
    pub files: Vec<PathBuf>,
}

impl HardcodedScan {
    pub fn new(files: Vec<PathBuf>) -> Self {
        HardcodedScan { files }
    }

    pub fn prototypes(&self) -> Result<Vec<Prototype>, BindgenError> {
        let mut protos = Vec::new();
        for path in &self.files {
            let content = fs::read_to_string(path).map_err(|e| BindgenError::Source {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let before = protos.len();
            for line in content.lines() {
                if line.starts_with(FOREIGN_STATIC_MARKER) {
                    protos.push(parse_foreign_static(line)?);
                }
            }
            debug!(
                "{}: {} hardcoded declarations",
                path.display(),
                protos.len() - before
            );
        }
        Ok(protos)
    }
}

/// Merge auto-extracted and hardcoded prototypes, sorted by name.
///
/// An auto-extracted name may only repeat when a hardcoded prototype
/// overrides it. Hardcoded prototypes replace any auto-extracted one with
/// the same name, without checking that the signatures agree.
pub fn merge_prototypes(
    extracted: Vec<Prototype>,
    hardcoded: Vec<Prototype>,
) -> Result<Vec<Prototype>, BindgenError> {
    let overridden: BTreeSet<&str> = hardcoded.iter().map(|p| p.name.as_str()).collect();
    let mut by_name: BTreeMap<String, Prototype> = BTreeMap::new();
    for proto in extracted {
        if by_name.contains_key(&proto.name) && !overridden.contains(proto.name.as_str()) {
            return Err(BindgenError::DuplicatePrototype(proto.name));
        }
        by_name.insert(proto.name.clone(), proto);
    }
    for proto in hardcoded {
        let name = proto.name.clone();
        if by_name.insert(name.clone(), proto).is_some() {
            info!("hardcoded binding overrides declaration of {}", name);
        }
    }
    Ok(by_name.into_values().collect())
}
