//! Name mangling
//!
//! Every global declaration gets a name built from its source name, a
//! role suffix and, for private names, a namespace token. Suffixes begin with
//! `$` and a `$` inside a source name is doubled, so names of different roles
//! cannot meet by construction. The `NameTable` still checks every global
//! name and falls back to numbered suffixes if two ever do meet.
//!
//! Locals and labels are not global; each flat function runs them through a
//! `LocalNamer`, which retries with a counter-derived suffix until the
//! candidate is free. Local source text is escaped like global names and
//! checked against the `NameTable`, so a local never hides a global.

use crate::options::LowerOptions;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use strata_ast::ast::{is_private_name, ClassId, FunctionId, NodeId};
use tracing::{trace, warn};

/// Stride of the shared local retry counter
pub const RETRY_STRIDE: u64 = 7;
/// The retry counter wraps at this prime, so the stride visits every residue
pub const RETRY_MODULUS: u64 = 1_000_003;

/// Identifiers of the target runtime that locals must never shadow
pub const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "with",
    "yield", "Array", "Function", "Infinity", "Math", "NaN", "Object", "Symbol",
];

/// Syntactic role of a mangled name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    Class,
    Field,
    Getter,
    Setter,
    Method,
    /// Named-parameter trampoline of another declaration
    Trampoline,
    Constructor,
    Factory,
    HoistedClosure,
    Operator,
    StaticInit,
}

impl Role {
    pub fn suffix(self) -> &'static str {
        match self {
            Role::Class => "$",
            Role::Field => "$F",
            Role::Getter => "$G",
            Role::Setter => "$S",
            Role::Method => "$M",
            Role::Trampoline => "$N",
            Role::Constructor => "$C",
            Role::Factory => "$K",
            Role::HoistedClosure => "$L",
            Role::Operator => "$O",
            Role::StaticInit => "$I",
        }
    }
}

/// Double every `$` so source text never looks like a suffix.
pub fn escape(base: &str) -> String {
    base.replace('$', "$$")
}

/// Mangle one name.
///
/// `token` is the namespace token of a private name (see
/// [`MangleContext::namespace_token`]), `None` for public names.
pub fn mangle(base: &str, role: Role, token: Option<&str>) -> String {
    let mut name = escape(base);
    if let Some(token) = token {
        name.push_str(token);
    }
    name.push_str(role.suffix());
    name
}

/// Identifier-safe word for an operator token.
pub fn operator_word(token: &str) -> String {
    let word = match token {
        "+" => "plus",
        "-" => "minus",
        "unary-" => "neg",
        "*" => "times",
        "/" => "div",
        "~/" => "idiv",
        "%" => "mod",
        "==" => "eq",
        "<" => "lt",
        "<=" => "le",
        ">" => "gt",
        ">=" => "ge",
        "[]" => "index",
        "[]=" => "indexSet",
        "&" => "and",
        "|" => "or",
        "^" => "xor",
        "~" => "not",
        "<<" => "shl",
        ">>" => "shr",
        other => return format!("op{}", hex::encode(other)),
    };
    word.to_string()
}

/// What a global name was allocated for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameKey {
    Class(ClassId),
    /// Implementing function of a method, getter, setter or operator
    Member {
        class: ClassId,
        member: String,
        role: Role,
    },
    Constructor {
        class: ClassId,
        name: Option<String>,
    },
    Function(FunctionId),
    StaticInit(ClassId),
    Closure {
        declaration: String,
        node: NodeId,
    },
    /// Trampoline of the global function with the given name
    Trampoline(String),
    /// Record type of a captured scope
    AliasRecord {
        declaration: String,
        scope: u32,
    },
    /// Static-initialization barrier of a unit
    Barrier(usize),
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKey::Class(id) => write!(f, "class {}", id),
            NameKey::Member {
                class,
                member,
                role,
            } => write!(f, "{:?} {} of {}", role, member, class),
            NameKey::Constructor { class, name } => match name {
                Some(name) => write!(f, "constructor {} of {}", name, class),
                None => write!(f, "constructor of {}", class),
            },
            NameKey::Function(id) => write!(f, "function {}", id),
            NameKey::StaticInit(id) => write!(f, "static initializer of {}", id),
            NameKey::Closure { declaration, node } => {
                write!(f, "closure {} in {}", node, declaration)
            }
            NameKey::Trampoline(target) => write!(f, "trampoline of {}", target),
            NameKey::AliasRecord { declaration, scope } => {
                write!(f, "alias record s{} in {}", scope, declaration)
            }
            NameKey::Barrier(unit) => write!(f, "barrier of unit {}", unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    pub name: String,
    pub origin: String,
}

/// Every global name of a program, in allocation order
#[derive(Debug, Clone, Default, Serialize)]
pub struct NameTable {
    entries: Vec<NameEntry>,
    #[serde(skip)]
    by_key: FxHashMap<NameKey, String>,
    #[serde(skip)]
    taken: FxHashSet<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `candidate` for `key`.
    ///
    /// A key already registered gets its earlier name back. A candidate that
    /// belongs to another key is retried with `$1`, `$2`, ... appended.
    pub fn claim(&mut self, key: NameKey, candidate: String) -> String {
        if let Some(existing) = self.by_key.get(&key) {
            return existing.clone();
        }
        let mut name = candidate.clone();
        let mut retry = 0u32;
        while self.taken.contains(&name) {
            retry += 1;
            name = format!("{}${}", candidate, retry);
        }
        if retry > 0 {
            warn!(candidate = %candidate, fallback = %name, origin = %key, "global name collision");
        }
        self.taken.insert(name.clone());
        self.entries.push(NameEntry {
            name: name.clone(),
            origin: key.to_string(),
        });
        self.by_key.insert(key, name.clone());
        name
    }

    pub fn get(&self, key: &NameKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Program-wide naming state
#[derive(Debug, Clone)]
pub struct MangleContext {
    hash_len: usize,
    /// Unit path → namespace token
    tokens: FxHashMap<String, String>,
    names: NameTable,
}

impl MangleContext {
    pub fn new(options: &LowerOptions) -> Self {
        Self {
            hash_len: options.private_hash_len,
            tokens: FxHashMap::default(),
            names: NameTable::new(),
        }
    }

    /// `$_` followed by the first hex digits of the SHA-256 of the unit path.
    pub fn namespace_token(&mut self, unit: &str) -> &str {
        let hash_len = self.hash_len;
        self.tokens.entry(unit.to_string()).or_insert_with(|| {
            let digest = hex::encode(Sha256::digest(unit.as_bytes()));
            let len = hash_len.min(digest.len());
            format!("$_{}", &digest[..len])
        })
    }

    /// Mangle `base` declared in `unit`, adding the unit's token to private names.
    pub fn mangle_in(&mut self, base: &str, role: Role, unit: &str) -> String {
        if is_private_name(base) {
            let token = self.namespace_token(unit).to_string();
            mangle(base, role, Some(&token))
        } else {
            mangle(base, role, None)
        }
    }

    pub fn claim(&mut self, key: NameKey, candidate: String) -> String {
        self.names.claim(key, candidate)
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn into_names(self) -> NameTable {
        self.names
    }
}

/// Function-local names: locals, temporaries and alias objects
#[derive(Debug, Clone)]
pub struct LocalNamer {
    taken: FxHashSet<String>,
    counter: u64,
}

impl LocalNamer {
    pub fn new(reserved: &[String]) -> Self {
        let mut taken: FxHashSet<String> = RESERVED_WORDS.iter().map(|w| w.to_string()).collect();
        taken.extend(reserved.iter().cloned());
        Self { taken, counter: 0 }
    }

    /// Claim `base`, or the first free `base$n` the retry counter produces.
    pub fn claim(&mut self, base: &str) -> String {
        self.claim_where(base, |_| false)
    }

    /// Claim a name for source text. Its `$`s are doubled, and names already
    /// in `globals` are skipped like taken locals.
    pub fn claim_source(&mut self, text: &str, globals: &NameTable) -> String {
        self.claim_where(&escape(text), |name| globals.contains(name))
    }

    fn claim_where(&mut self, base: &str, blocked: impl Fn(&str) -> bool) -> String {
        if !blocked(base) && self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        loop {
            self.counter = (self.counter + RETRY_STRIDE) % RETRY_MODULUS;
            let candidate = format!("{}${}", base, self.counter);
            if !blocked(&candidate) && self.taken.insert(candidate.clone()) {
                trace!(base, name = %candidate, "local name retried");
                return candidate;
            }
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}
