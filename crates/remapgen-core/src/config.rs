// Remapgen Core - Generator Config
// TOML description of a run: symbol table, output units, registry manifest

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("No [[unit]] entries configured")]
    NoUnits,

    #[error("Unit '{0}' is defined more than once")]
    DuplicateUnit(String),

    #[error("Unit '{0}' has no sources")]
    EmptyUnit(String),
}

/// Root TOML table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorToml {
    /// Symbol table file
    symbols: PathBuf,

    /// Where to write the registry manifest (optional)
    #[serde(default)]
    registry: Option<PathBuf>,

    #[serde(default)]
    unit: Vec<UnitToml>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitToml {
    name: String,
    sources: Vec<PathBuf>,
    output: PathBuf,
}

/// One output file and the sources compiled into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfig {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Generator run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub symbols: PathBuf,
    pub registry: Option<PathBuf>,
    pub units: Vec<UnitConfig>,
}

impl GeneratorConfig {
    /// Parse a config file; relative paths resolve against its directory
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: GeneratorToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        if parsed.unit.is_empty() {
            return Err(ConfigError::NoUnits);
        }

        let mut seen = HashSet::new();
        for unit in &parsed.unit {
            if !seen.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit(unit.name.clone()));
            }
            if unit.sources.is_empty() {
                return Err(ConfigError::EmptyUnit(unit.name.clone()));
            }
        }

        Ok(Self {
            symbols: parsed.symbols,
            registry: parsed.registry,
            units: parsed
                .unit
                .into_iter()
                .map(|u| UnitConfig {
                    name: u.name,
                    sources: u.sources,
                    output: u.output,
                })
                .collect(),
        })
    }

    /// Default config location (~/.config/remapgen/remapgen.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("remapgen").join("remapgen.toml"))
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.symbols);
        if let Some(registry) = self.registry.as_mut() {
            join(registry);
        }
        for unit in &mut self.units {
            for source in &mut unit.sources {
                join(source);
            }
            join(&mut unit.output);
        }
    }
}
