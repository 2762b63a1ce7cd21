// Remapgen Core - Rule Unit
// Compiles the annotation lines of one rule into a RemapClass_<name> class

use std::fmt::Write as _;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use strum::IntoEnumIterator;

use crate::allocator::IndexAllocator;
use crate::error::CompileError;
use crate::fragment::{FragmentComposer, HookKind, Statement};
use crate::guard::Guard;
use crate::operand::{classify_params, OperandTable};
use crate::operation::Operation;
use crate::registry::{Registry, RegistryEntry};
use crate::symbol::{SymbolTable, SIMULTANEOUS_KEY_PREFIX};

/// Rule whose `enabled` predicate reads the global passthrough toggle
pub const PASSTHROUGH_RULE: &str = "notsave_passthrough";

/// Rules with this prefix stay active while passthrough is on
pub const PASSTHROUGH_PREFIX: &str = "passthrough_";

fn autogen_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<autogen>--(.+?)-- (.+)</autogen>").expect("autogen pattern is valid")
    })
}

/// Collaborators a rule needs while its lines are parsed
pub struct CompileContext<'a> {
    pub symbols: &'a dyn SymbolTable,
    pub allocator: &'a mut IndexAllocator,
}

impl<'a> CompileContext<'a> {
    pub fn new(symbols: &'a dyn SymbolTable, allocator: &'a mut IndexAllocator) -> Self {
        Self { symbols, allocator }
    }
}

/// What [`RuleUnit::parse_line`] did with a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Consumed by the guard
    Guard,
    /// Compiled as an operation
    Operation(Operation),
    /// Not an annotation; left to the caller
    Passthrough,
}

impl LineOutcome {
    pub fn is_handled(self) -> bool {
        !matches!(self, LineOutcome::Passthrough)
    }
}

/// Body of the generated `enabled()` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledPredicate {
    /// `return config.notsave_passthrough;`
    PassthroughToggle,
    /// `return config.enabled_flags[i];`
    Flag(u32),
    /// `return config.enabled_flags[i] && ! config.notsave_passthrough;`
    FlagUnlessPassthrough(u32),
}

impl EnabledPredicate {
    /// Select the predicate form for a rule name
    pub fn for_rule(name: &str, symbols: &dyn SymbolTable) -> Result<Self, CompileError> {
        if name == PASSTHROUGH_RULE {
            return Ok(EnabledPredicate::PassthroughToggle);
        }

        let index = symbols
            .config_index(name)
            .ok_or_else(|| CompileError::UnresolvedSymbol {
                rule: name.to_string(),
                operation: "enabled".to_string(),
                token: name.to_string(),
            })?;

        if name.starts_with(PASSTHROUGH_PREFIX) {
            Ok(EnabledPredicate::Flag(index))
        } else {
            Ok(EnabledPredicate::FlagUnlessPassthrough(index))
        }
    }

    pub fn to_code(self) -> String {
        match self {
            EnabledPredicate::PassthroughToggle => {
                "return config.notsave_passthrough;\n".to_string()
            }
            EnabledPredicate::Flag(index) => {
                format!("return config.enabled_flags[{}];\n", index)
            }
            EnabledPredicate::FlagUnlessPassthrough(index) => format!(
                "return config.enabled_flags[{}] && ! config.notsave_passthrough;\n",
                index
            ),
        }
    }
}

/// Output of [`RuleUnit::render`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    /// Class source text; empty when the rule contributed nothing
    pub code: String,
    pub entry: RegistryEntry,
}

/// Accumulated state of one named rule
#[derive(Debug)]
pub struct RuleUnit {
    name: String,
    guard: Box<dyn Guard>,
    composer: FragmentComposer,
    local_index_count: usize,
    slot_count: usize,
    finalized: bool,
}

impl RuleUnit {
    pub fn new(name: &str, guard: Box<dyn Guard>) -> Self {
        Self {
            name: name.to_string(),
            guard,
            composer: FragmentComposer::new(),
            local_index_count: 0,
            slot_count: 0,
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated class name, `RemapClass_<name>`
    pub fn class_name(&self) -> String {
        format!("RemapClass_{}", self.name)
    }

    pub fn fragments(&self) -> &FragmentComposer {
        &self.composer
    }

    /// Operand tables allocated while parsing this rule
    pub fn local_index_count(&self) -> usize {
        self.local_index_count
    }

    /// Size of the emitted `value_` array: one past the highest slot used
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// True if no hook received any statement
    pub fn is_empty(&self) -> bool {
        self.composer.is_empty()
    }

    /// Compile one line of the rule definition
    pub fn parse_line(
        &mut self,
        line: &str,
        ctx: &mut CompileContext<'_>,
    ) -> Result<LineOutcome, CompileError> {
        if self.guard.parse(line) {
            return Ok(LineOutcome::Guard);
        }

        let Some(caps) = autogen_pattern().captures(line) else {
            return Ok(LineOutcome::Passthrough);
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        let params = caps.get(2).map_or("", |m| m.as_str());

        let operation =
            Operation::from_str(name).map_err(|_| CompileError::UnknownOperation {
                rule: self.name.clone(),
                operation: name.to_string(),
            })?;

        if !operation.needs_table() {
            let expr = params.to_string();
            let statement = match operation {
                Operation::SetKeyboardType => Statement::AssignKeyboardType { expr },
                _ => Statement::ReturnStatusMessage { expr },
            };
            self.composer.push(operation.target_hook(), statement);
        } else {
            let index = if operation == Operation::SimultaneousKeyPresses {
                let suffix = ctx.allocator.next_simultaneous_suffix();
                let params = format!("KeyCode::{}{}, {}", SIMULTANEOUS_KEY_PREFIX, suffix, params);
                self.append_table(operation, &params, ctx)?
            } else {
                self.append_table(operation, params, ctx)?
            };

            match operation {
                Operation::DropKeyAfterRemap => {
                    self.composer
                        .push(HookKind::DropKeyAfterRemap, Statement::DropKey { index });
                }
                Operation::SimultaneousKeyPresses => {
                    self.composer
                        .push(HookKind::RemapKey, Statement::Remap { index });
                    self.composer.push(
                        HookKind::RemapSimultaneousKeyPresses,
                        Statement::RemapSimultaneousKeyPresses { index },
                    );
                }
                _ => {
                    self.composer
                        .push(operation.target_hook(), Statement::Remap { index });
                }
            }
        }

        log::debug!("Rule '{}': compiled {}", self.name, operation);
        Ok(LineOutcome::Operation(operation))
    }

    /// Classify `params`, allocate a slot and append its initializer
    fn append_table(
        &mut self,
        operation: Operation,
        params: &str,
        ctx: &mut CompileContext<'_>,
    ) -> Result<usize, CompileError> {
        let groups = classify_params(params, ctx.symbols)
            .map_err(|e| e.at(&self.name, operation.as_ref()))?;

        let index = ctx.allocator.next_variable_index();
        self.local_index_count += 1;
        self.slot_count = self.slot_count.max(index + 1);

        self.composer.push(
            HookKind::Initialize,
            Statement::InitializeTable {
                index,
                table: OperandTable::new(operation, groups),
            },
        );
        Ok(index)
    }

    /// Wrap first-match hooks in their guarded block. Only the first call has an effect.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let guard = self.guard.to_code();
        self.composer.wrap_first_match(&guard);
        self.finalized = true;
    }

    /// Render the class text and its registry entry
    pub fn render(&self, symbols: &dyn SymbolTable) -> Result<RenderedUnit, CompileError> {
        let mut entry = RegistryEntry::absent(&self.name);
        if self.is_empty() {
            return Ok(RenderedUnit {
                code: String::new(),
                entry,
            });
        }

        let enabled = EnabledPredicate::for_rule(&self.name, symbols)?;
        let class_name = self.class_name();
        // At least one element keeps the array declaration well-formed
        let slots = self.slot_count.max(1);

        let mut code = String::new();
        let _ = writeln!(code, "class {} {{", class_name);
        code.push_str("public:\n");

        for kind in HookKind::iter() {
            if kind.is_optional() && self.composer.is_fragment_empty(kind) {
                continue;
            }

            let _ = writeln!(code, "{} {{", kind.signature());
            match kind {
                HookKind::Terminate => {
                    code.push_str(
                        "  for (size_t i = 0; i < sizeof(value_) / sizeof(value_[0]); ++i) {\n",
                    );
                    code.push_str("    value_[i].terminate();\n");
                    code.push_str("  }\n");
                }
                HookKind::DropKeyAfterRemap => {
                    code.push_str("if (! enabled()) return false;\n");
                    code.push_str(&self.composer.render(kind));
                    code.push_str("return false;\n");
                }
                _ => code.push_str(&self.composer.render(kind)),
            }
            code.push_str("}\n");

            entry.set_hook(kind, Some(format!("{}::{}", class_name, kind)));
        }

        code.push_str("static bool enabled(void) {\n");
        code.push_str(&enabled.to_code());
        code.push_str("}\n");
        entry.set_enabled(Some(format!("{}::enabled", class_name)));

        code.push('\n');
        code.push_str("private:\n");
        let _ = writeln!(code, "static RemapClass::Item value_[{}];", slots);
        code.push_str("};\n");
        let _ = writeln!(code, "RemapClass::Item {}::value_[{}];", class_name, slots);
        code.push_str("\n\n");

        log::debug!(
            "Rendered {} ({} tables, {} slots)",
            class_name,
            self.local_index_count,
            slots
        );

        Ok(RenderedUnit { code, entry })
    }

    /// Render, record the entry in `registry`, and return the class text
    pub fn emit(
        &self,
        symbols: &dyn SymbolTable,
        registry: &mut Registry,
    ) -> Result<String, CompileError> {
        let rendered = self.render(symbols)?;
        registry.append(rendered.entry);
        Ok(rendered.code)
    }
}

impl AddAssign for RuleUnit {
    /// Append `rhs`'s fragments after ours; our name and guard are kept.
    /// Finalize both sides first when their guards differ.
    fn add_assign(&mut self, rhs: RuleUnit) {
        if self.finalized != rhs.finalized {
            log::warn!(
                "Merging finalized and unfinalized parts of rule '{}'",
                self.name
            );
        }
        self.composer.append(rhs.composer);
        self.local_index_count += rhs.local_index_count;
        self.slot_count = self.slot_count.max(rhs.slot_count);
        self.finalized = self.finalized && rhs.finalized;
    }
}

impl Add for RuleUnit {
    type Output = RuleUnit;

    fn add(mut self, rhs: RuleUnit) -> RuleUnit {
        self += rhs;
        self
    }
}
