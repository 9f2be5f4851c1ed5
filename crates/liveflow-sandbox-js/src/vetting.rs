//! Static deny-list vetting for script sources.
//!
//! This is advisory hardening: it rejects sources that *mention* dangerous
//! APIs. It is not a sandbox guarantee and can be evaded by obfuscation; the
//! isolated boa context and the watchdog are the actual containment.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScriptError;

/// Category of a deny-list rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyCategory {
    /// Module loaders, process object, global object handles
    ModuleAccess,
    /// Prototype chains and reflection APIs
    Reflection,
    /// Network and browser host objects
    Network,
    /// Filesystem access and process spawning
    Filesystem,
    /// Timer scheduling
    Timers,
    /// Dynamic code evaluation and runtime escape hatches
    EscapeHatch,
}

impl fmt::Display for DenyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DenyCategory::ModuleAccess => "module/process access",
            DenyCategory::Reflection => "reflection/prototype manipulation",
            DenyCategory::Network => "network access",
            DenyCategory::Filesystem => "filesystem/process spawn",
            DenyCategory::Timers => "timers",
            DenyCategory::EscapeHatch => "dynamic code execution",
        };
        f.write_str(name)
    }
}

const DENY_PATTERNS: &[(DenyCategory, &str)] = &[
    (DenyCategory::ModuleAccess, r"\brequire\s*\("),
    (DenyCategory::ModuleAccess, r"\bimport\s*\("),
    (DenyCategory::ModuleAccess, r"(?m)^\s*import\s"),
    (DenyCategory::ModuleAccess, r"(?m)^\s*export\s"),
    (DenyCategory::ModuleAccess, r"\bmodule\s*\.\s*exports\b"),
    (DenyCategory::ModuleAccess, r"\bprocess\s*\."),
    (DenyCategory::ModuleAccess, r"\bglobalThis\b"),
    (DenyCategory::ModuleAccess, r"\bglobal\s*\."),
    (DenyCategory::Reflection, r"__proto__"),
    (DenyCategory::Reflection, r"\bprototype\b"),
    (DenyCategory::Reflection, r"\.\s*constructor\b"),
    (DenyCategory::Reflection, r"\bReflect\s*\."),
    (DenyCategory::Reflection, r"\bProxy\b"),
    (
        DenyCategory::Reflection,
        r"\bObject\s*\.\s*(setPrototypeOf|getPrototypeOf|defineProperty|defineProperties|getOwnPropertyDescriptors?)\b",
    ),
    (
        DenyCategory::Reflection,
        r"__(define|lookup)(Getter|Setter)__",
    ),
    (DenyCategory::Network, r"\bfetch\s*\("),
    (DenyCategory::Network, r"\bXMLHttpRequest\b"),
    (DenyCategory::Network, r"\bWebSocket\b"),
    (DenyCategory::Network, r"\bnavigator\s*\."),
    (DenyCategory::Network, r"\blocation\s*\."),
    (DenyCategory::Network, r"\bdocument\s*\."),
    (DenyCategory::Network, r"\bwindow\s*\."),
    (DenyCategory::Filesystem, r"\bchild_process\b"),
    (DenyCategory::Filesystem, r"\bfs\s*\."),
    (DenyCategory::Filesystem, r"\b(spawn|spawnSync|execSync|execFile|fork)\s*\("),
    (DenyCategory::Filesystem, r"\b(Deno|Bun)\s*\."),
    (DenyCategory::Timers, r"\bset(Timeout|Interval|Immediate)\s*\("),
    (DenyCategory::Timers, r"\bqueueMicrotask\s*\("),
    (DenyCategory::Timers, r"\brequestAnimationFrame\s*\("),
    (DenyCategory::EscapeHatch, r"\beval\s*\("),
    (DenyCategory::EscapeHatch, r"\bFunction\s*\("),
    (DenyCategory::EscapeHatch, r"\bnew\s+Function\b"),
    (DenyCategory::EscapeHatch, r"\bWebAssembly\b"),
    (DenyCategory::EscapeHatch, r"\bimportScripts\s*\("),
    (DenyCategory::EscapeHatch, r"\bSharedArrayBuffer\b"),
    (DenyCategory::EscapeHatch, r"\bAtomics\s*\."),
    (DenyCategory::EscapeHatch, r"\bdebugger\b"),
];

struct DenyRule {
    category: DenyCategory,
    pattern: Regex,
}

static DENY_RULES: LazyLock<Vec<DenyRule>> = LazyLock::new(|| {
    DENY_PATTERNS
        .iter()
        .map(|(category, pattern)| DenyRule {
            category: *category,
            pattern: Regex::new(pattern).expect("deny-list pattern must compile"),
        })
        .collect()
});

/// A single deny-list hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub category: DenyCategory,
    pub matched: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.matched, self.category)
    }
}

/// Collect every deny-list hit in `source`.
pub fn find_violations(source: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    for rule in DENY_RULES.iter() {
        if let Some(m) = rule.pattern.find(source) {
            violations.push(Violation {
                category: rule.category,
                matched: m.as_str().trim().to_string(),
            });
        }
    }
    violations
}

/// Reject the source if any deny-list rule matches.
pub fn vet_source(source: &str) -> Result<(), ScriptError> {
    let violations = find_violations(source);
    if violations.is_empty() {
        return Ok(());
    }
    let summary = violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ScriptError::UnsafeCode(summary))
}
