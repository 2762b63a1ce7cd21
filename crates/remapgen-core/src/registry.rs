// Remapgen Core - Registry
// Entry points of every rendered rule, in declaration order

use indexmap::IndexMap;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::fragment::HookKind;

/// Placeholder emitted into dispatch tables for an absent entry point
pub const ABSENT: &str = "NULL";

/// Entry points one rule contributes to the global dispatch tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    name: String,
    hooks: IndexMap<HookKind, Option<String>>,
    enabled: Option<String>,
}

impl RegistryEntry {
    /// Entry with every hook and the `enabled` predicate absent
    pub fn absent(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hooks: HookKind::iter().map(|kind| (kind, None)).collect(),
            enabled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference to the generated function, `None` if absent
    pub fn hook(&self, kind: HookKind) -> Option<&str> {
        self.hooks.get(&kind).and_then(|r| r.as_deref())
    }

    pub fn set_hook(&mut self, kind: HookKind, reference: Option<String>) {
        self.hooks.insert(kind, reference);
    }

    pub fn enabled(&self) -> Option<&str> {
        self.enabled.as_deref()
    }

    pub fn set_enabled(&mut self, reference: Option<String>) {
        self.enabled = reference;
    }

    /// True if the rule rendered nothing at all
    pub fn is_absent(&self) -> bool {
        self.enabled.is_none() && self.hooks.values().all(Option::is_none)
    }
}

/// Ordered collection of registry entries for one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Duplicate names are kept (and logged); table
    /// positions follow append order either way.
    pub fn append(&mut self, entry: RegistryEntry) {
        if self.entries.iter().any(|e| e.name == entry.name) {
            log::warn!("Rule '{}' registered more than once", entry.name);
        }
        self.entries.push(entry);
    }

    /// Move all entries of `other` after ours
    pub fn extend(&mut self, other: Registry) {
        for entry in other.entries {
            self.append(entry);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// One dispatch-table column: the `kind` reference of every entry, `NULL` for absent
    pub fn hook_column(&self, kind: HookKind) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.hook(kind).unwrap_or(ABSENT))
            .collect()
    }

    /// The `enabled` predicate column, `NULL` for absent
    pub fn enabled_column(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.enabled().unwrap_or(ABSENT))
            .collect()
    }

    /// Serializable view for the downstream table builder
    pub fn to_manifest(&self) -> RegistryManifest {
        RegistryManifest {
            rule: self
                .entries
                .iter()
                .map(|e| ManifestEntry {
                    name: e.name.clone(),
                    initialize: e.hook(HookKind::Initialize).map(str::to_string),
                    terminate: e.hook(HookKind::Terminate).map(str::to_string),
                    remap_setkeyboardtype: e.hook(HookKind::SetKeyboardType).map(str::to_string),
                    remap_key: e.hook(HookKind::RemapKey).map(str::to_string),
                    remap_consumer: e.hook(HookKind::RemapConsumer).map(str::to_string),
                    remap_pointing: e.hook(HookKind::RemapPointing).map(str::to_string),
                    remap_simultaneouskeypresses: e
                        .hook(HookKind::RemapSimultaneousKeyPresses)
                        .map(str::to_string),
                    get_statusmessage: e.hook(HookKind::StatusMessage).map(str::to_string),
                    remap_dropkeyafterremap: e
                        .hook(HookKind::DropKeyAfterRemap)
                        .map(str::to_string),
                    enabled: e.enabled().map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Registry as written to disk (`[[rule]]` tables); absent hooks are omitted
#[derive(Debug, Clone, Serialize)]
pub struct RegistryManifest {
    pub rule: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_setkeyboardtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_consumer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_pointing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_simultaneouskeypresses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_statusmessage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap_dropkeyafterremap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<String>,
}

#[cfg(feature = "toml-config")]
impl RegistryManifest {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_key(name: &str) -> RegistryEntry {
        let mut entry = RegistryEntry::absent(name);
        entry.set_hook(
            HookKind::RemapKey,
            Some(format!("RemapClass_{}::remap_key", name)),
        );
        entry.set_enabled(Some(format!("RemapClass_{}::enabled", name)));
        entry
    }

    #[test]
    fn test_absent_entry() {
        let entry = RegistryEntry::absent("empty_rule");
        assert!(entry.is_absent());
        for kind in HookKind::iter() {
            assert_eq!(entry.hook(kind), None);
        }
        assert_eq!(entry.enabled(), None);
    }

    #[test]
    fn test_columns_are_positional() {
        let mut registry = Registry::new();
        registry.append(entry_with_key("a"));
        registry.append(RegistryEntry::absent("b"));
        registry.append(entry_with_key("c"));

        assert_eq!(
            registry.hook_column(HookKind::RemapKey),
            vec!["RemapClass_a::remap_key", "NULL", "RemapClass_c::remap_key"]
        );
        assert_eq!(
            registry.hook_column(HookKind::RemapConsumer),
            vec!["NULL", "NULL", "NULL"]
        );
        assert_eq!(
            registry.enabled_column(),
            vec!["RemapClass_a::enabled", "NULL", "RemapClass_c::enabled"]
        );
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let mut registry = Registry::new();
        registry.append(entry_with_key("dup"));
        registry.append(entry_with_key("dup"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().filter(|e| e.name() == "dup").count(), 2);
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut first = Registry::new();
        first.append(entry_with_key("a"));
        let mut second = Registry::new();
        second.append(entry_with_key("b"));
        first.extend(second);

        let names: Vec<&str> = first.iter().map(RegistryEntry::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(first.get("b").is_some());
    }

    #[test]
    #[cfg(feature = "toml-config")]
    fn test_manifest_omits_absent_hooks() {
        let mut registry = Registry::new();
        registry.append(entry_with_key("a"));
        registry.append(RegistryEntry::absent("b"));

        let text = registry.to_manifest().to_toml_string().unwrap();
        assert!(text.contains("[[rule]]"));
        assert!(text.contains("remap_key = \"RemapClass_a::remap_key\""));
        assert!(!text.contains("remap_consumer"));
        assert!(text.contains("name = \"b\""));
    }
}
