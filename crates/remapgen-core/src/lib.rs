// Remapgen Core Library
// Compiles <autogen> remap annotations into C++ dispatch classes

pub mod allocator;
pub mod error;
pub mod fragment;
pub mod generator;
pub mod guard;
pub mod operand;
pub mod operation;
pub mod registry;
pub mod symbol;
pub mod unit;

#[cfg(feature = "toml-config")]
pub mod config;

pub use allocator::IndexAllocator;
pub use error::CompileError;
pub use fragment::{FragmentComposer, HookKind, Statement};
pub use generator::{GeneratedUnit, Generation, Generator, GuardFactory, Source, UnitInput};
pub use guard::{FilterClause, FilterGuard, FilterKind, Guard, NoGuard};
pub use operand::{
    classify_group, classify_params, parse_operand, Operand, OperandError, OperandGroup,
    OperandKind, OperandTable,
};
pub use operation::Operation;
pub use registry::{ManifestEntry, Registry, RegistryEntry, RegistryManifest, ABSENT};
pub use symbol::{SymbolError, SymbolMap, SymbolTable, SIMULTANEOUS_KEY_PREFIX};
pub use unit::{
    CompileContext, EnabledPredicate, LineOutcome, RenderedUnit, RuleUnit, PASSTHROUGH_PREFIX,
    PASSTHROUGH_RULE,
};

#[cfg(feature = "toml-config")]
pub use config::{ConfigError, GeneratorConfig, UnitConfig};
