// Remapgen Core - Symbol Table
// Resolves operand symbol names and rule config indices to numbers

use std::collections::HashMap;
#[cfg(feature = "toml-config")]
use std::path::Path;

use crate::operand::OperandKind;

/// Prefix of the pseudo key codes synthesized for `SimultaneousKeyPresses`
pub const SIMULTANEOUS_KEY_PREFIX: &str = "VK_SIMULTANEOUSKEYPRESSES_";

/// Name lookups the compiler needs from the outside world
pub trait SymbolTable {
    /// Numeric code for `name` within `kind`, e.g. (KeyCode, "A") -> 0
    fn lookup(&self, kind: OperandKind, name: &str) -> Option<u32>;

    /// Index of the rule's flag in the runtime `enabled_flags` array
    fn config_index(&self, rule: &str) -> Option<u32>;
}

/// Errors that can occur when loading a symbol table
#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Simultaneous key range {base} + {count} exceeds u32")]
    SimultaneousRange { base: u32, count: u32 },

    #[error("Duplicate config index {index} for '{first}' and '{second}'")]
    DuplicateConfigIndex {
        index: u32,
        first: String,
        second: String,
    },
}

/// In-memory symbol table
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    codes: HashMap<(OperandKind, String), u32>,
    config_indices: HashMap<String, u32>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol; a later insert for the same name wins
    pub fn insert(&mut self, kind: OperandKind, name: &str, code: u32) {
        self.codes.insert((kind, name.to_string()), code);
    }

    pub fn insert_config_index(&mut self, rule: &str, index: u32) {
        self.config_indices.insert(rule.to_string(), index);
    }

    /// Register `VK_SIMULTANEOUSKEYPRESSES_0 ..` as consecutive key codes from `base`
    pub fn insert_simultaneous_keys(&mut self, base: u32, count: u32) -> Result<(), SymbolError> {
        if count > 0 && base.checked_add(count - 1).is_none() {
            return Err(SymbolError::SimultaneousRange { base, count });
        }
        for i in 0..count {
            self.insert(
                OperandKind::KeyCode,
                &format!("{}{}", SIMULTANEOUS_KEY_PREFIX, i),
                base + i,
            );
        }
        Ok(())
    }

    /// Number of operand symbols (config indices excluded)
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Load a symbol table from a TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, SymbolError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a symbol table from a TOML string
    ///
    /// ```toml
    /// [keycode]
    /// A = 0
    /// [modifierflag]
    /// SHIFT_L = 0x2
    /// [config_index]
    /// remap_a_to_b = 0
    /// [simultaneous]
    /// base = 0x300
    /// count = 32
    /// ```
    #[cfg(feature = "toml-config")]
    pub fn from_toml(content: &str) -> Result<Self, SymbolError> {
        let parsed: toml_format::SymbolsToml =
            toml::from_str(content).map_err(|e| SymbolError::TomlParse(e.to_string()))?;

        let mut map = Self::new();
        let sections = [
            (OperandKind::KeyCode, &parsed.keycode),
            (OperandKind::ModifierFlag, &parsed.modifierflag),
            (OperandKind::ConsumerKeyCode, &parsed.consumerkeycode),
            (OperandKind::PointingButton, &parsed.pointingbutton),
            (OperandKind::OptionFlag, &parsed.option),
        ];
        for (kind, section) in sections {
            for (name, code) in section {
                map.insert(kind, name, *code);
            }
        }

        let mut seen: HashMap<u32, &str> = HashMap::new();
        for (rule, index) in &parsed.config_index {
            if let Some(first) = seen.insert(*index, rule) {
                return Err(SymbolError::DuplicateConfigIndex {
                    index: *index,
                    first: first.to_string(),
                    second: rule.clone(),
                });
            }
            map.insert_config_index(rule, *index);
        }

        if let Some(simultaneous) = parsed.simultaneous {
            map.insert_simultaneous_keys(simultaneous.base, simultaneous.count)?;
        }

        log::debug!(
            "Loaded {} symbols and {} config indices",
            map.len(),
            map.config_indices.len()
        );

        Ok(map)
    }
}

impl SymbolTable for SymbolMap {
    fn lookup(&self, kind: OperandKind, name: &str) -> Option<u32> {
        self.codes.get(&(kind, name.to_string())).copied()
    }

    fn config_index(&self, rule: &str) -> Option<u32> {
        self.config_indices.get(rule).copied()
    }
}

#[cfg(feature = "toml-config")]
mod toml_format {
    use std::collections::HashMap;

    use serde::Deserialize;

    /// Root of a symbol table file
    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct SymbolsToml {
        #[serde(default)]
        pub keycode: HashMap<String, u32>,
        #[serde(default)]
        pub modifierflag: HashMap<String, u32>,
        #[serde(default)]
        pub consumerkeycode: HashMap<String, u32>,
        #[serde(default)]
        pub pointingbutton: HashMap<String, u32>,
        #[serde(default)]
        pub option: HashMap<String, u32>,
        #[serde(default)]
        pub config_index: HashMap<String, u32>,
        #[serde(default)]
        pub simultaneous: Option<SimultaneousToml>,
    }

    /// Range of pseudo key codes reserved for simultaneous key presses
    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct SimultaneousToml {
        pub base: u32,
        pub count: u32,
    }
}
