//! C type model and type categories.
//!
//! A declared type is kept as its base spelling (qualifiers included, e.g.
//! `const char`) plus a pointer depth. Backends never look at the spelling
//! directly; they ask for a [`TypeCategory`] and pick a marshal template.

use std::fmt;

/// A C type as written in a declaration, with pointer stars split out
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CType {
    /// Base type spelling, e.g. `bint_t`, `const char`, `mark_t`
    pub base: String,
    /// Number of `*` levels
    pub pointer_depth: usize,
}

impl CType {
    pub fn new(base: impl Into<String>, pointer_depth: usize) -> Self {
        CType {
            base: base.into(),
            pointer_depth,
        }
    }

    pub fn void() -> Self {
        CType::new("void", 0)
    }

    pub fn void_ptr() -> Self {
        CType::new("void", 1)
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    pub fn is_void(&self) -> bool {
        self.pointer_depth == 0 && self.bare_base() == "void"
    }

    /// The type with one pointer level removed, if it is a pointer
    pub fn deref(&self) -> Option<CType> {
        if self.pointer_depth == 0 {
            return None;
        }
        Some(CType::new(self.base.clone(), self.pointer_depth - 1))
    }

    /// Base spelling without `const`/`volatile` qualifiers on either side,
    /// so `const char` and `char const` are both `char`
    pub fn bare_base(&self) -> &str {
        let mut s = self.base.as_str();
        loop {
            if let Some(rest) = s
                .strip_prefix("const ")
                .or_else(|| s.strip_prefix("volatile "))
                .or_else(|| s.strip_suffix(" const"))
                .or_else(|| s.strip_suffix(" volatile"))
            {
                s = rest;
            } else {
                return s;
            }
        }
    }

    /// Render a declaration of `name` with this type, e.g. `char *data`
    pub fn declare(&self, name: &str) -> String {
        if self.pointer_depth == 0 {
            format!("{} {}", self.base, name)
        } else {
            format!("{} {}{}", self.base, "*".repeat(self.pointer_depth), name)
        }
    }

    /// Identifier-safe spelling, used to name temporaries (`const char *` -> `const_char_p`)
    pub fn ident(&self) -> String {
        let mut ident: String = self
            .base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        for _ in 0..self.pointer_depth {
            ident.push_str("_p");
        }
        ident
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer_depth == 0 {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{} {}", self.base, "*".repeat(self.pointer_depth))
        }
    }
}

/// Opaque pointer base types a backend is allowed to pass through as handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerAllowList {
    names: Vec<String>,
}

/// The pointer types the historical generator accepted
pub const DEFAULT_POINTER_TYPES: &[&str] = &[
    "bline_t",
    "buffer_t",
    "bview_t",
    "cursor_t",
    "editor_t",
    "mark_t",
    "observer_t",
    "void",
    "char",
    "size_t",
    "int",
];

impl PointerAllowList {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PointerAllowList {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, bare_base: &str) -> bool {
        self.names.iter().any(|n| n == bare_base)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for PointerAllowList {
    fn default() -> Self {
        PointerAllowList::new(DEFAULT_POINTER_TYPES.iter().copied())
    }
}

/// Semantic category of a logical type, which selects a marshal template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    SignedInteger,
    UnsignedInteger,
    Float,
    /// `char *` or `const char *`
    CString,
    /// A pointer to an allow-listed type, passed around as a handle
    OpaquePointer,
    /// `void`, only meaningful as a primary return type
    Void,
    Unrecognized,
}

impl TypeCategory {
    /// Classify a logical type against a backend's pointer allow-list
    pub fn classify(ty: &CType, allow: &PointerAllowList) -> TypeCategory {
        let bare = ty.bare_base();
        if ty.is_void() {
            return TypeCategory::Void;
        }
        if ty.pointer_depth == 1 && bare == "char" {
            return TypeCategory::CString;
        }
        if ty.pointer_depth > 0 {
            return if allow.contains(bare) {
                TypeCategory::OpaquePointer
            } else {
                TypeCategory::Unrecognized
            };
        }
        match bare {
            "float" | "double" | "long double" => TypeCategory::Float,
            _ if is_unsigned_name(bare) => TypeCategory::UnsignedInteger,
            _ if is_signed_name(bare) => TypeCategory::SignedInteger,
            _ => TypeCategory::Unrecognized,
        }
    }

    /// Whether values of this category travel as numbers
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeCategory::SignedInteger | TypeCategory::UnsignedInteger | TypeCategory::Float
        )
    }
}

fn is_unsigned_name(bare: &str) -> bool {
    bare.starts_with("unsigned") || bare.starts_with("uint") || bare == "size_t"
}

fn is_signed_name(bare: &str) -> bool {
    bare.contains("int")
        || matches!(
            bare,
            "char" | "signed char" | "short" | "long" | "long long" | "signed" | "ssize_t"
        )
}

/// Whether an integer type fits a `long` parser (`strtol`/`strtoul`)
pub fn is_narrow_integer(bare: &str) -> bool {
    matches!(
        bare,
        "char"
            | "signed char"
            | "unsigned char"
            | "short"
            | "unsigned short"
            | "int"
            | "signed"
            | "unsigned"
            | "unsigned int"
            | "int8_t"
            | "int16_t"
            | "int32_t"
            | "uint8_t"
            | "uint16_t"
            | "uint32_t"
    )
}
