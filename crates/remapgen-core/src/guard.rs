// Remapgen Core - Guards
// Per-rule filter lines (<only>, <not>, ...) and the guard code they render to

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A rule's applicability filter.
///
/// The compiler offers every line to the guard before looking for an
/// operation; the rendered code is placed at the top of each first-match
/// block, where `break` skips the rule's entries for the event.
pub trait Guard: fmt::Debug {
    /// Consume `line` if it is a guard definition
    fn parse(&mut self, line: &str) -> bool;

    /// Guard code, one statement per line, each ending in `\n`
    fn to_code(&self) -> String;
}

/// Guard that never consumes a line and renders nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGuard;

impl Guard for NoGuard {
    fn parse(&mut self, _line: &str) -> bool {
        false
    }

    fn to_code(&self) -> String {
        String::new()
    }
}

/// Filter tags understood by [`FilterGuard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Only,
    Not,
    KeyboardTypeOnly,
    KeyboardTypeNot,
    ConfigOnly,
    ConfigNot,
}

impl FilterKind {
    /// Tag name, e.g. `keyboardtype_only`
    pub fn tag(self) -> &'static str {
        match self {
            FilterKind::Only => "only",
            FilterKind::Not => "not",
            FilterKind::KeyboardTypeOnly => "keyboardtype_only",
            FilterKind::KeyboardTypeNot => "keyboardtype_not",
            FilterKind::ConfigOnly => "config_only",
            FilterKind::ConfigNot => "config_not",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "only" => Some(FilterKind::Only),
            "not" => Some(FilterKind::Not),
            "keyboardtype_only" => Some(FilterKind::KeyboardTypeOnly),
            "keyboardtype_not" => Some(FilterKind::KeyboardTypeNot),
            "config_only" => Some(FilterKind::ConfigOnly),
            "config_not" => Some(FilterKind::ConfigNot),
            _ => None,
        }
    }

    fn filter_type(self) -> &'static str {
        match self {
            FilterKind::Only => "BRIDGE_FILTERTYPE_APPLICATION_ONLY",
            FilterKind::Not => "BRIDGE_FILTERTYPE_APPLICATION_NOT",
            FilterKind::KeyboardTypeOnly => "BRIDGE_FILTERTYPE_KEYBOARDTYPE_ONLY",
            FilterKind::KeyboardTypeNot => "BRIDGE_FILTERTYPE_KEYBOARDTYPE_NOT",
            FilterKind::ConfigOnly => "BRIDGE_FILTERTYPE_CONFIG_ONLY",
            FilterKind::ConfigNot => "BRIDGE_FILTERTYPE_CONFIG_NOT",
        }
    }

    fn namespace(self) -> &'static str {
        match self {
            FilterKind::Only | FilterKind::Not => "ApplicationType",
            FilterKind::KeyboardTypeOnly | FilterKind::KeyboardTypeNot => "KeyboardType",
            FilterKind::ConfigOnly | FilterKind::ConfigNot => "ConfigIndex",
        }
    }
}

/// One filter line, e.g. `<only>TERMINAL, EMACS</only>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub kind: FilterKind,
    pub values: Vec<String>,
}

impl FilterClause {
    fn render(&self) -> String {
        let mut elements = vec![format!("static_cast<unsigned int>({})", self.kind.filter_type())];
        for value in &self.values {
            if value.contains("::") {
                elements.push(value.clone());
            } else {
                elements.push(format!("{}::{}", self.kind.namespace(), value));
            }
        }
        format!(
            "{{\n  const unsigned int filter[] = {{ {} }};\n  if (RemapFilter::isblocked(filter, sizeof(filter) / sizeof(filter[0]))) break;\n}}\n",
            elements.join(",")
        )
    }
}

fn filter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*<([a-z_]+)>(.*?)</([a-z_]+)>\s*$").expect("filter pattern is valid")
    })
}

/// Guard built from `<only>`/`<not>`/`<keyboardtype_*>`/`<config_*>` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGuard {
    clauses: Vec<FilterClause>,
}

impl FilterGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }
}

impl Guard for FilterGuard {
    fn parse(&mut self, line: &str) -> bool {
        let Some(caps) = filter_pattern().captures(line) else {
            return false;
        };
        if caps[1] != caps[3] {
            return false;
        }
        let Some(kind) = FilterKind::from_tag(&caps[1]) else {
            return false;
        };

        let values: Vec<String> = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return false;
        }

        log::trace!("Guard clause {:?}: {:?}", kind, values);
        self.clauses.push(FilterClause { kind, values });
        true
    }

    fn to_code(&self) -> String {
        self.clauses.iter().map(FilterClause::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_guard() {
        let mut guard = NoGuard;
        assert!(!guard.parse("<only>TERMINAL</only>"));
        assert_eq!(guard.to_code(), "");
    }

    #[test]
    fn test_filter_guard_consumes_filter_lines() {
        let mut guard = FilterGuard::new();
        assert!(guard.parse("  <only>TERMINAL, EMACS</only>"));
        assert!(guard.parse("<keyboardtype_not>MACBOOK</keyboardtype_not>"));
        assert_eq!(guard.clauses().len(), 2);
        assert_eq!(guard.clauses()[0].kind, FilterKind::Only);
        assert_eq!(guard.clauses()[0].values, vec!["TERMINAL", "EMACS"]);
        assert_eq!(guard.clauses()[1].kind, FilterKind::KeyboardTypeNot);
    }

    #[test]
    fn test_filter_guard_ignores_other_lines() {
        let mut guard = FilterGuard::new();
        assert!(!guard.parse("<autogen>--KeyToKey-- KeyCode::A, KeyCode::B</autogen>"));
        assert!(!guard.parse("<name>Change A to B</name>"));
        assert!(!guard.parse("<only>TERMINAL</not>"));
        assert!(!guard.parse("<only></only>"));
        assert!(guard.clauses().is_empty());
        assert_eq!(guard.to_code(), "");
    }

    #[test]
    fn test_filter_guard_code() {
        let mut guard = FilterGuard::new();
        guard.parse("<only>TERMINAL, ApplicationType::EMACS</only>");
        assert_eq!(
            guard.to_code(),
            "{\n  const unsigned int filter[] = { static_cast<unsigned int>(BRIDGE_FILTERTYPE_APPLICATION_ONLY),ApplicationType::TERMINAL,ApplicationType::EMACS };\n  if (RemapFilter::isblocked(filter, sizeof(filter) / sizeof(filter[0]))) break;\n}\n"
        );
    }

    #[test]
    fn test_filter_kind_tags_round_trip() {
        for kind in [
            FilterKind::Only,
            FilterKind::Not,
            FilterKind::KeyboardTypeOnly,
            FilterKind::KeyboardTypeNot,
            FilterKind::ConfigOnly,
            FilterKind::ConfigNot,
        ] {
            assert_eq!(FilterKind::from_tag(kind.tag()), Some(kind));
        }
    }
}
