// Remapgen Core - Fragment Composer
// Per-hook statement lists for one rule, rendered to C++ at the end

use std::fmt;

use indexmap::IndexMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::operand::OperandTable;

/// Dispatch points a generated class can expose, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumIter)]
pub enum HookKind {
    #[strum(serialize = "initialize")]
    Initialize,
    #[strum(serialize = "terminate")]
    Terminate,
    #[strum(serialize = "remap_setkeyboardtype")]
    SetKeyboardType,
    #[strum(serialize = "remap_key")]
    RemapKey,
    #[strum(serialize = "remap_consumer")]
    RemapConsumer,
    #[strum(serialize = "remap_pointing")]
    RemapPointing,
    #[strum(serialize = "remap_simultaneouskeypresses")]
    RemapSimultaneousKeyPresses,
    #[strum(serialize = "get_statusmessage")]
    StatusMessage,
    #[strum(serialize = "remap_dropkeyafterremap")]
    DropKeyAfterRemap,
}

impl HookKind {
    /// Hooks that try entries in order and stop at the first match
    pub fn is_first_match(self) -> bool {
        matches!(
            self,
            HookKind::RemapKey
                | HookKind::RemapConsumer
                | HookKind::RemapPointing
                | HookKind::RemapSimultaneousKeyPresses
        )
    }

    /// Hooks emitted only when the rule contributed code to them
    pub fn is_optional(self) -> bool {
        !matches!(self, HookKind::Initialize | HookKind::Terminate)
    }

    /// C++ declaration of the generated static function
    pub fn signature(self) -> &'static str {
        match self {
            HookKind::Initialize => "static void initialize(void)",
            HookKind::Terminate => "static void terminate(void)",
            HookKind::SetKeyboardType => {
                "static void remap_setkeyboardtype(KeyboardType& keyboardType)"
            }
            HookKind::RemapKey => "static void remap_key(RemapParams& remapParams)",
            HookKind::RemapConsumer => {
                "static void remap_consumer(RemapConsumerParams& remapParams)"
            }
            HookKind::RemapPointing => {
                "static void remap_pointing(RemapPointingParams_relative& remapParams)"
            }
            HookKind::RemapSimultaneousKeyPresses => {
                "static void remap_simultaneouskeypresses(void)"
            }
            HookKind::DropKeyAfterRemap => {
                "static bool remap_dropkeyafterremap(const Params_KeyboardEventCallBack& params)"
            }
            HookKind::StatusMessage => "static const char* get_statusmessage(void)",
        }
    }
}

/// One generated statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Build the operand array and register it in `value_[index]`
    InitializeTable { index: usize, table: OperandTable },
    /// `keyboardType = <expr>.get();`
    AssignKeyboardType { expr: String },
    /// Try one remap entry; leaves the enclosing block on match
    Remap { index: usize },
    RemapSimultaneousKeyPresses { index: usize },
    /// Drop the key event if the entry matches
    DropKey { index: usize },
    ReturnStatusMessage { expr: String },
    /// Guard code plus entries inside a single-iteration `do { } while (false)`
    FirstMatch { guard: String, body: Vec<Statement> },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::InitializeTable { index, table } => {
                writeln!(f, "{{")?;
                writeln!(
                    f,
                    "  const unsigned int vec[] = {{ {} }};",
                    table.elements().join(",")
                )?;
                writeln!(
                    f,
                    "  value_[{}].initialize_remap(vec, sizeof(vec) / sizeof(vec[0]));",
                    index
                )?;
                writeln!(f, "}}")
            }
            Statement::AssignKeyboardType { expr } => {
                writeln!(f, "keyboardType = {}.get();", expr)
            }
            Statement::Remap { index } => {
                writeln!(f, "if (value_[{}].remap(remapParams)) break;", index)
            }
            Statement::RemapSimultaneousKeyPresses { index } => {
                writeln!(f, "value_[{}].remap_SimultaneousKeyPresses();", index)
            }
            Statement::DropKey { index } => {
                writeln!(f, "if (value_[{}].drop(params)) return true;", index)
            }
            Statement::ReturnStatusMessage { expr } => writeln!(f, "return {};", expr),
            Statement::FirstMatch { guard, body } => {
                writeln!(f, "do {{")?;
                f.write_str(guard)?;
                for statement in body {
                    write!(f, "{}", statement)?;
                }
                writeln!(f, "}} while (false);")
            }
        }
    }
}

/// Ordered statement lists, one per hook kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentComposer {
    fragments: IndexMap<HookKind, Vec<Statement>>,
}

impl Default for FragmentComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentComposer {
    pub fn new() -> Self {
        Self {
            fragments: HookKind::iter().map(|kind| (kind, Vec::new())).collect(),
        }
    }

    /// Append a statement to `kind`; order of appends is evaluation order
    pub fn push(&mut self, kind: HookKind, statement: Statement) {
        self.fragments.entry(kind).or_default().push(statement);
    }

    pub fn get(&self, kind: HookKind) -> &[Statement] {
        self.fragments.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_fragment_empty(&self, kind: HookKind) -> bool {
        self.get(kind).is_empty()
    }

    /// True if no hook received any statement
    pub fn is_empty(&self) -> bool {
        self.fragments.values().all(Vec::is_empty)
    }

    /// Replace each non-empty first-match fragment with one guarded block
    pub fn wrap_first_match(&mut self, guard: &str) {
        for (kind, statements) in self.fragments.iter_mut() {
            if !kind.is_first_match() || statements.is_empty() {
                continue;
            }
            let body = std::mem::take(statements);
            statements.push(Statement::FirstMatch {
                guard: guard.to_string(),
                body,
            });
        }
    }

    /// Concatenate `other` after `self`, hook by hook
    pub fn append(&mut self, other: FragmentComposer) {
        for (kind, statements) in other.fragments {
            self.fragments.entry(kind).or_default().extend(statements);
        }
    }

    /// Rendered body of one hook
    pub fn render(&self, kind: HookKind) -> String {
        self.get(kind).iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{OperandGroup, OperandKind};
    use crate::operation::Operation;
    use smallvec::smallvec;

    fn key_table() -> OperandTable {
        OperandTable::new(
            Operation::KeyToKey,
            vec![
                OperandGroup {
                    kind: OperandKind::KeyCode,
                    value: 0,
                    codes: smallvec![0],
                },
                OperandGroup {
                    kind: OperandKind::KeyCode,
                    value: 11,
                    codes: smallvec![11],
                },
            ],
        )
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(HookKind::RemapKey.as_ref(), "remap_key");
        assert_eq!(HookKind::StatusMessage.to_string(), "get_statusmessage");
        assert_eq!(HookKind::iter().count(), 9);
        assert_eq!(HookKind::iter().next(), Some(HookKind::Initialize));
        assert_eq!(
            HookKind::iter().skip(7).collect::<Vec<_>>(),
            vec![HookKind::StatusMessage, HookKind::DropKeyAfterRemap]
        );
    }

    #[test]
    fn test_initialize_table_text() {
        let statement = Statement::InitializeTable {
            index: 3,
            table: key_table(),
        };
        assert_eq!(
            statement.to_string(),
            "{\n  const unsigned int vec[] = { static_cast<unsigned int>(BRIDGE_REMAPTYPE_KEYTOKEY),static_cast<unsigned int>(BRIDGE_DATATYPE_KEYCODE),0,static_cast<unsigned int>(BRIDGE_DATATYPE_KEYCODE),11 };\n  value_[3].initialize_remap(vec, sizeof(vec) / sizeof(vec[0]));\n}\n"
        );
    }

    #[test]
    fn test_push_keeps_order() {
        let mut composer = FragmentComposer::new();
        composer.push(HookKind::RemapKey, Statement::Remap { index: 1 });
        composer.push(HookKind::RemapKey, Statement::Remap { index: 0 });
        assert_eq!(
            composer.render(HookKind::RemapKey),
            "if (value_[1].remap(remapParams)) break;\nif (value_[0].remap(remapParams)) break;\n"
        );
    }

    #[test]
    fn test_wrap_first_match_skips_single_entry_hooks() {
        let mut composer = FragmentComposer::new();
        composer.push(HookKind::RemapConsumer, Statement::Remap { index: 0 });
        composer.push(
            HookKind::StatusMessage,
            Statement::ReturnStatusMessage {
                expr: "\"hi\"".to_string(),
            },
        );
        composer.push(HookKind::DropKeyAfterRemap, Statement::DropKey { index: 1 });
        composer.wrap_first_match("GUARD;\n");

        assert_eq!(
            composer.render(HookKind::RemapConsumer),
            "do {\nGUARD;\nif (value_[0].remap(remapParams)) break;\n} while (false);\n"
        );
        assert_eq!(composer.render(HookKind::StatusMessage), "return \"hi\";\n");
        assert_eq!(
            composer.render(HookKind::DropKeyAfterRemap),
            "if (value_[1].drop(params)) return true;\n"
        );
        assert!(composer.is_fragment_empty(HookKind::RemapKey));
    }

    #[test]
    fn test_append_concatenates_per_hook() {
        let mut left = FragmentComposer::new();
        left.push(HookKind::RemapKey, Statement::Remap { index: 0 });
        let mut right = FragmentComposer::new();
        right.push(HookKind::RemapKey, Statement::Remap { index: 1 });
        right.push(HookKind::RemapPointing, Statement::Remap { index: 2 });

        left.append(right);
        assert_eq!(
            left.get(HookKind::RemapKey),
            &[Statement::Remap { index: 0 }, Statement::Remap { index: 1 }]
        );
        assert_eq!(left.get(HookKind::RemapPointing).len(), 1);
    }

    #[test]
    fn test_empty_composer() {
        let composer = FragmentComposer::new();
        assert!(composer.is_empty());
        assert_eq!(composer.render(HookKind::Initialize), "");
    }
}
