// Remapgen Core - Generator
// Groups annotated source lines into rules and renders whole output files

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::allocator::IndexAllocator;
use crate::error::CompileError;
use crate::guard::{FilterGuard, Guard};
use crate::registry::Registry;
use crate::symbol::SymbolTable;
use crate::unit::{CompileContext, RuleUnit};

/// Builds the guard for each new rule
pub type GuardFactory = fn() -> Box<dyn Guard>;

fn filter_guard() -> Box<dyn Guard> {
    Box::new(FilterGuard::new())
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<identifier>\s*(.+?)\s*</identifier>").expect("identifier pattern is valid")
    })
}

/// One annotated input text
#[derive(Debug, Clone, Copy)]
pub struct Source<'s> {
    /// Label used in diagnostics (usually the file path)
    pub name: &'s str,
    pub text: &'s str,
}

impl<'s> Source<'s> {
    pub fn new(name: &'s str, text: &'s str) -> Self {
        Self { name, text }
    }
}

/// Sources that compile into one output file
#[derive(Debug, Clone)]
pub struct UnitInput<'s> {
    pub name: &'s str,
    pub sources: Vec<Source<'s>>,
}

/// Rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub name: String,
    pub code: String,
    /// Rules in declaration order, including ones that rendered empty
    pub rules: Vec<String>,
    /// Operand-table slots used by the file
    pub slot_count: usize,
}

/// Result of a whole run
#[derive(Debug, Clone)]
pub struct Generation {
    pub units: Vec<GeneratedUnit>,
    pub registry: Registry,
}

/// Drives rule units over annotated sources.
///
/// A line `<identifier>NAME</identifier>` opens rule NAME and `</item>`
/// closes it; lines in between are handed to [`RuleUnit::parse_line`].
/// A rule opened again within the same output file is merged into the
/// first occurrence; both parts are finalized first, so each keeps its guard.
pub struct Generator<'a> {
    symbols: &'a dyn SymbolTable,
    guard_factory: GuardFactory,
}

impl<'a> Generator<'a> {
    pub fn new(symbols: &'a dyn SymbolTable) -> Self {
        Self {
            symbols,
            guard_factory: filter_guard,
        }
    }

    pub fn with_guard(mut self, guard_factory: GuardFactory) -> Self {
        self.guard_factory = guard_factory;
        self
    }

    /// Generate every unit; slot indices restart per unit, simultaneous-key
    /// suffixes run on across units
    pub fn generate_all(&self, units: &[UnitInput<'_>]) -> Result<Generation, CompileError> {
        let mut allocator = IndexAllocator::new();
        let mut registry = Registry::new();
        let mut generated = Vec::with_capacity(units.len());

        for unit in units {
            generated.push(self.generate_unit(
                unit.name,
                &unit.sources,
                &mut allocator,
                &mut registry,
            )?);
            allocator = allocator.next_unit();
        }

        Ok(Generation {
            units: generated,
            registry,
        })
    }

    /// Parse, finalize and render every rule of one output file
    pub fn generate_unit(
        &self,
        name: &str,
        sources: &[Source<'_>],
        allocator: &mut IndexAllocator,
        registry: &mut Registry,
    ) -> Result<GeneratedUnit, CompileError> {
        let mut rules: IndexMap<String, RuleUnit> = IndexMap::new();
        for source in sources {
            self.parse_source(source, allocator, &mut rules)?;
        }

        let mut code = String::new();
        let mut names = Vec::with_capacity(rules.len());
        for (rule_name, rule) in rules {
            code.push_str(&rule.emit(self.symbols, registry)?);
            names.push(rule_name);
        }

        log::info!(
            "Generated '{}': {} rules, {} slots",
            name,
            names.len(),
            allocator.variable_count()
        );

        Ok(GeneratedUnit {
            name: name.to_string(),
            code,
            rules: names,
            slot_count: allocator.variable_count(),
        })
    }

    fn parse_source(
        &self,
        source: &Source<'_>,
        allocator: &mut IndexAllocator,
        rules: &mut IndexMap<String, RuleUnit>,
    ) -> Result<(), CompileError> {
        let mut current: Option<RuleUnit> = None;

        for (lineno, line) in source.text.lines().enumerate() {
            if let Some(caps) = identifier_pattern().captures(line) {
                if let Some(rule) = current.take() {
                    collect(rules, rule);
                }
                let rule_name = caps.get(1).map_or("", |m| m.as_str());
                current = Some(RuleUnit::new(rule_name, (self.guard_factory)()));
                continue;
            }

            if line.trim() == "</item>" {
                if let Some(rule) = current.take() {
                    collect(rules, rule);
                }
                continue;
            }

            let Some(rule) = current.as_mut() else {
                continue;
            };
            let mut ctx = CompileContext::new(self.symbols, &mut *allocator);
            rule.parse_line(line, &mut ctx).map_err(|e| {
                log::error!("{}:{}: {}", source.name, lineno + 1, e);
                e
            })?;
        }

        if let Some(rule) = current.take() {
            collect(rules, rule);
        }
        Ok(())
    }
}

/// Finalize a closed rule and merge it into an earlier part of the same name.
/// Each part keeps its own guard block.
fn collect(rules: &mut IndexMap<String, RuleUnit>, mut rule: RuleUnit) {
    rule.finalize();
    match rules.get_mut(rule.name()) {
        Some(existing) => {
            log::debug!("Merging split definition of rule '{}'", rule.name());
            *existing += rule;
        }
        None => {
            rules.insert(rule.name().to_string(), rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::HookKind;
    use crate::guard::NoGuard;
    use crate::operand::OperandKind;
    use crate::symbol::SymbolMap;

    fn no_guard() -> Box<dyn Guard> {
        Box::new(NoGuard)
    }

    fn symbols() -> SymbolMap {
        let mut map = SymbolMap::new();
        map.insert(OperandKind::KeyCode, "A", 0);
        map.insert(OperandKind::KeyCode, "B", 11);
        map.insert(OperandKind::KeyCode, "C", 8);
        map.insert_config_index("remap_a", 0);
        map.insert_config_index("remap_b", 1);
        map.insert_config_index("empty_rule", 2);
        map
    }

    const SOURCE: &str = r#"
<item>
  <name>A to B</name>
  <identifier>remap_a</identifier>
  <autogen>--KeyToKey-- KeyCode::A, KeyCode::B</autogen>
</item>
<item>
  <name>Nothing</name>
  <identifier>empty_rule</identifier>
</item>
<item>
  <identifier>remap_b</identifier>
  <autogen>--KeyToKey-- KeyCode::B, KeyCode::C</autogen>
</item>
"#;

    #[test]
    fn test_rules_in_declaration_order() {
        let symbols = symbols();
        let generator = Generator::new(&symbols);
        let mut alloc = IndexAllocator::new();
        let mut registry = Registry::new();

        let unit = generator
            .generate_unit("out", &[Source::new("a.xml", SOURCE)], &mut alloc, &mut registry)
            .unwrap();

        assert_eq!(unit.rules, vec!["remap_a", "empty_rule", "remap_b"]);
        assert_eq!(unit.slot_count, 2);
        assert!(unit.code.contains("class RemapClass_remap_a {"));
        assert!(!unit.code.contains("RemapClass_empty_rule"));
        assert!(unit.code.contains("if (value_[1].remap(remapParams)) break;"));
        assert_eq!(
            registry.hook_column(HookKind::Initialize),
            vec![
                "RemapClass_remap_a::initialize",
                "NULL",
                "RemapClass_remap_b::initialize"
            ]
        );
    }

    #[test]
    fn test_split_rule_is_merged() {
        let symbols = symbols();
        let generator = Generator::new(&symbols).with_guard(no_guard);
        let mut alloc = IndexAllocator::new();
        let mut registry = Registry::new();

        let first = "<identifier>remap_a</identifier>\n<autogen>--KeyToKey-- KeyCode::A, KeyCode::B</autogen>\n</item>\n";
        let second = "<identifier>remap_a</identifier>\n<autogen>--KeyToKey-- KeyCode::B, KeyCode::C</autogen>\n</item>\n";
        let unit = generator
            .generate_unit(
                "out",
                &[Source::new("first", first), Source::new("second", second)],
                &mut alloc,
                &mut registry,
            )
            .unwrap();

        assert_eq!(unit.rules, vec!["remap_a"]);
        assert_eq!(registry.len(), 1);
        assert!(unit.code.contains(
            "do {\nif (value_[0].remap(remapParams)) break;\n} while (false);\ndo {\nif (value_[1].remap(remapParams)) break;\n} while (false);\n"
        ));
    }

    #[test]
    fn test_split_rule_keeps_each_guard() {
        let symbols = symbols();
        let generator = Generator::new(&symbols);
        let mut alloc = IndexAllocator::new();
        let mut registry = Registry::new();

        let first = "<identifier>remap_a</identifier>\n<only>TERMINAL</only>\n<autogen>--KeyToKey-- KeyCode::A, KeyCode::B</autogen>\n</item>\n";
        let second = "<identifier>remap_a</identifier>\n<only>EMACS</only>\n<autogen>--KeyToKey-- KeyCode::B, KeyCode::C</autogen>\n</item>\n";
        let unit = generator
            .generate_unit(
                "out",
                &[Source::new("first", first), Source::new("second", second)],
                &mut alloc,
                &mut registry,
            )
            .unwrap();

        assert_eq!(unit.rules, vec!["remap_a"]);
        let terminal = unit.code.find("ApplicationType::TERMINAL").unwrap();
        let first_remap = unit.code.find("value_[0].remap(remapParams)").unwrap();
        let emacs = unit.code.find("ApplicationType::EMACS").unwrap();
        let second_remap = unit.code.find("value_[1].remap(remapParams)").unwrap();
        assert!(terminal < first_remap);
        assert!(first_remap < emacs);
        assert!(emacs < second_remap);
        assert_eq!(unit.code.matches("} while (false);").count(), 2);
    }

    #[test]
    fn test_lines_outside_rules_are_ignored() {
        let symbols = symbols();
        let generator = Generator::new(&symbols);
        let mut alloc = IndexAllocator::new();
        let mut registry = Registry::new();

        let text = "<autogen>--KeyToBanana-- KeyCode::A</autogen>\n";
        let unit = generator
            .generate_unit("out", &[Source::new("x", text)], &mut alloc, &mut registry)
            .unwrap();
        assert!(unit.rules.is_empty());
        assert_eq!(unit.code, "");
    }

    #[test]
    fn test_error_aborts_unit() {
        let symbols = symbols();
        let generator = Generator::new(&symbols);
        let mut alloc = IndexAllocator::new();
        let mut registry = Registry::new();

        let text = "<identifier>remap_a</identifier>\n<autogen>--KeyToBanana-- KeyCode::A</autogen>\n";
        let result =
            generator.generate_unit("out", &[Source::new("x", text)], &mut alloc, &mut registry);
        assert!(matches!(result, Err(CompileError::UnknownOperation { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_generate_all_restarts_slots_per_unit() {
        let symbols = symbols();
        let generator = Generator::new(&symbols);
        let units = vec![
            UnitInput {
                name: "first",
                sources: vec![Source::new("a", SOURCE)],
            },
            UnitInput {
                name: "second",
                sources: vec![Source::new(
                    "b",
                    "<identifier>remap_b</identifier>\n<autogen>--KeyToKey-- KeyCode::B, KeyCode::C</autogen>\n",
                )],
            },
        ];

        let generation = generator.generate_all(&units).unwrap();
        assert_eq!(generation.units.len(), 2);
        assert_eq!(generation.units[1].slot_count, 1);
        assert!(generation.units[1]
            .code
            .contains("value_[0].initialize_remap"));
        assert_eq!(generation.registry.len(), 4);
    }
}
