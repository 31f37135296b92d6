//! Declaration sources
//!
//! The generator does not care where declaration lines come from. A
//! [`DeclarationSource`] yields them in order; [`HeaderScan`] is the usual
//! one, reading C headers and keeping only the bindable families.

use crate::error::BindgenError;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Something that yields raw declaration lines
pub trait DeclarationSource {
    /// Ordered declaration lines, blank lines already dropped
    fn declarations(&self) -> Result<Vec<String>, BindgenError>;

    /// Short description for log messages
    fn describe(&self) -> String;
}

/// Name families bound by default
pub const DEFAULT_FAMILIES: &[&str] = &["editor", "bview", "buffer", "cursor", "mark"];

/// Internal, lifecycle and listener functions that are never bound
pub const DEFAULT_DENYLIST: &str = r"(editor_(init|deinit|run|debug_dump)|cre|listener)";

/// Line filter shared by header scanning: family match, then denylist
#[derive(Debug, Clone)]
pub struct DeclarationFilter {
    include: Regex,
    deny: Option<Regex>,
}

impl DeclarationFilter {
    /// Build a filter for the given name families and denylist pattern
    pub fn new(families: &[String], denylist: Option<&str>) -> Result<Self, BindgenError> {
        if families.is_empty() {
            return Err(BindgenError::Config(
                "at least one function family is required".to_string(),
            ));
        }
        for family in families {
            let valid = family.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if family.is_empty() || !valid {
                return Err(BindgenError::Config(format!(
                    "invalid function family '{}'",
                    family
                )));
            }
        }
        let pattern = format!(r"^\S+ \*?({})_.*\);$", families.join("|"));
        let include = Regex::new(&pattern).map_err(|e| BindgenError::Config(e.to_string()))?;
        let deny = match denylist {
            Some(p) if !p.is_empty() => {
                Some(Regex::new(p).map_err(|e| {
                    BindgenError::Config(format!("bad denylist pattern '{}': {}", p, e))
                })?)
            }
            _ => None,
        };
        Ok(DeclarationFilter { include, deny })
    }

    pub fn accepts(&self, line: &str) -> bool {
        if line.trim().is_empty() || !self.include.is_match(line) {
            return false;
        }
        !self.deny.as_ref().is_some_and(|d| d.is_match(line))
    }
}

impl Default for DeclarationFilter {
    fn default() -> Self {
        let families: Vec<String> = DEFAULT_FAMILIES.iter().map(|f| f.to_string()).collect();
        DeclarationFilter::new(&families, Some(DEFAULT_DENYLIST))
            .expect("default declaration filter is valid")
    }
}

/// Reads C headers in order and keeps the bindable declarations
#[derive(Debug, Clone)]
pub struct HeaderScan {
    pub headers: Vec<PathBuf>,
    pub filter: DeclarationFilter,
}

impl HeaderScan {
    pub fn new(headers: Vec<PathBuf>, filter: DeclarationFilter) -> Self {
        HeaderScan { headers, filter }
    }
}

impl DeclarationSource for HeaderScan {
    fn declarations(&self) -> Result<Vec<String>, BindgenError> {
        let mut lines = Vec::new();
        for path in &self.headers {
            let content = fs::read_to_string(path).map_err(|e| BindgenError::Source {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let before = lines.len();
            lines.extend(
                content
                    .lines()
                    .filter(|l| self.filter.accepts(l))
                    .map(str::to_string),
            );
            debug!(
                "{}: {} bindable declarations",
                path.display(),
                lines.len() - before
            );
        }
        Ok(lines)
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self
            .headers
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("headers [{}]", names.join(", "))
    }
}

/// A fixed, in-memory list of declaration lines
#[derive(Debug, Clone, Default)]
pub struct StaticDeclarations {
    lines: Vec<String>,
}

impl StaticDeclarations {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        StaticDeclarations {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl DeclarationSource for StaticDeclarations {
    fn declarations(&self) -> Result<Vec<String>, BindgenError> {
        Ok(self
            .lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        format!("{} static declarations", self.lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_filter() {
        let filter = DeclarationFilter::default();
        assert!(filter.accepts("int mark_move_bol(mark_t *self);"));
        assert!(filter.accepts("mark_t *buffer_add_mark(buffer_t *self, bline_t *maybe_line, bint_t maybe_col);"));
        // Not a bindable family
        assert!(!filter.accepts("int str_append(str_t *str, char *data);"));
        // Lifecycle and listener functions are denied
        assert!(!filter.accepts("int editor_init(editor_t *editor, int argc, char **argv);"));
        assert!(!filter.accepts("int bview_add_listener(bview_t *self, bview_listener_cb_t fn_callback, void *udata);"));
        // Not a complete single-line declaration
        assert!(!filter.accepts("int buffer_insert(buffer_t *self,"));
        assert!(!filter.accepts("   "));
    }

    #[test]
    fn test_filter_rejects_bad_family() {
        let result = DeclarationFilter::new(&["mark|.*".to_string()], None);
        assert!(matches!(result, Err(BindgenError::Config(_))));
        assert!(DeclarationFilter::new(&[], None).is_err());
    }

    #[test]
    fn test_filter_rejects_bad_denylist() {
        let result = DeclarationFilter::new(&["mark".to_string()], Some("(unclosed"));
        assert!(matches!(result, Err(BindgenError::Config(_))));
    }

    #[test]
    fn test_header_scan_reads_in_order() {
        let mut a = NamedTempFile::new().unwrap();
        writeln!(a, "#ifndef __MLE_H").unwrap();
        writeln!(a, "int mark_move_eol(mark_t *self);").unwrap();
        writeln!(a, "int editor_run(editor_t *editor);").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        writeln!(b, "int buffer_undo(buffer_t *self);").unwrap();
        writeln!(b).unwrap();

        let scan = HeaderScan::new(
            vec![a.path().to_path_buf(), b.path().to_path_buf()],
            DeclarationFilter::default(),
        );
        let lines = scan.declarations().unwrap();
        assert_eq!(
            lines,
            vec![
                "int mark_move_eol(mark_t *self);".to_string(),
                "int buffer_undo(buffer_t *self);".to_string(),
            ]
        );
    }

    #[test]
    fn test_header_scan_missing_file() {
        let scan = HeaderScan::new(
            vec![PathBuf::from("/nonexistent/mle.h")],
            DeclarationFilter::default(),
        );
        assert!(matches!(
            scan.declarations(),
            Err(BindgenError::Source { .. })
        ));
    }

    #[test]
    fn test_static_declarations_drop_blank_lines() {
        let source =
            StaticDeclarations::new(["int mark_is_eq(mark_t *self, mark_t *other);", "", "  "]);
        assert_eq!(source.declarations().unwrap().len(), 1);
    }
}
