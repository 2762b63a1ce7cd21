// Remapgen Core - Operand Classifier
// Parses "KeyCode::A | ModifierFlag::SHIFT_L, ..." parameter lists into typed groups

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CompileError;
use crate::operation::Operation;
use crate::symbol::SymbolTable;

/// Category of a tagged operand token (the part before `::`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumIter, EnumString,
)]
pub enum OperandKind {
    KeyCode,
    ModifierFlag,
    ConsumerKeyCode,
    PointingButton,
    #[strum(serialize = "Option")]
    OptionFlag,
}

impl OperandKind {
    /// Datatype marker the runtime uses to interpret the value that follows it
    pub fn datatype(self) -> &'static str {
        match self {
            OperandKind::KeyCode => "BRIDGE_DATATYPE_KEYCODE",
            OperandKind::ModifierFlag => "BRIDGE_DATATYPE_FLAGS",
            OperandKind::ConsumerKeyCode => "BRIDGE_DATATYPE_CONSUMERKEYCODE",
            OperandKind::PointingButton => "BRIDGE_DATATYPE_POINTINGBUTTON",
            OperandKind::OptionFlag => "BRIDGE_DATATYPE_OPTION",
        }
    }
}

/// Classification failures, before rule/operation context is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandError {
    /// Token has no recognized `Category::` prefix
    UnknownCategory(String),
    /// Group mixes two operand kinds
    KindMismatch {
        group: String,
        expected: OperandKind,
        found: OperandKind,
    },
    /// Symbol name missing from the symbol table
    UnresolvedSymbol(String),
}

impl fmt::Display for OperandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandError::UnknownCategory(token) => write!(f, "unknown datatype '{}'", token),
            OperandError::KindMismatch {
                group,
                expected,
                found,
            } => write!(f, "group '{}' mixes {} and {}", group, expected, found),
            OperandError::UnresolvedSymbol(token) => write!(f, "unknown symbol '{}'", token),
        }
    }
}

impl std::error::Error for OperandError {}

impl OperandError {
    /// Attach the rule and operation the operand list belonged to
    pub fn at(self, rule: &str, operation: &str) -> CompileError {
        let rule = rule.to_string();
        let operation = operation.to_string();
        match self {
            OperandError::UnknownCategory(token) => CompileError::UnknownOperandCategory {
                rule,
                operation,
                token,
            },
            OperandError::KindMismatch {
                group,
                expected,
                found,
            } => CompileError::OperandKindMismatch {
                rule,
                operation,
                group,
                expected,
                found,
            },
            OperandError::UnresolvedSymbol(token) => CompileError::UnresolvedSymbol {
                rule,
                operation,
                token,
            },
        }
    }
}

/// One parsed token: `KeyCode::A` -> (KeyCode, "A")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand<'a> {
    pub kind: OperandKind,
    pub symbol: &'a str,
}

/// Split a token into its category and symbol name
///
/// Categories are matched by prefix only; `Option::X` and `KeyCode::X` never
/// collide even if `X` is the same name.
pub fn parse_operand(token: &str) -> Result<Operand<'_>, OperandError> {
    let (category, symbol) = token
        .split_once("::")
        .ok_or_else(|| OperandError::UnknownCategory(token.to_string()))?;

    let kind = OperandKind::from_str(category)
        .map_err(|_| OperandError::UnknownCategory(token.to_string()))?;

    if symbol.is_empty() {
        return Err(OperandError::UnresolvedSymbol(token.to_string()));
    }

    Ok(Operand { kind, symbol })
}

/// A homogeneous operand group, OR-combined into a single value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandGroup {
    pub kind: OperandKind,
    pub value: u32,
    /// Resolved codes in source order (before combining)
    pub codes: SmallVec<[u32; 4]>,
}

/// Classify one pipe-separated group. Returns `None` for a group with no tokens.
pub fn classify_group(
    group: &str,
    symbols: &dyn SymbolTable,
) -> Result<Option<OperandGroup>, OperandError> {
    let mut kind: Option<OperandKind> = None;
    let mut codes: SmallVec<[u32; 4]> = SmallVec::new();

    for token in group.split('|').map(str::trim).filter(|t| !t.is_empty()) {
        let operand = parse_operand(token)?;

        if let Some(expected) = kind {
            if expected != operand.kind {
                return Err(OperandError::KindMismatch {
                    group: group.trim().to_string(),
                    expected,
                    found: operand.kind,
                });
            }
        }
        kind = Some(operand.kind);

        let code = symbols
            .lookup(operand.kind, operand.symbol)
            .ok_or_else(|| OperandError::UnresolvedSymbol(token.to_string()))?;
        codes.push(code);
    }

    Ok(kind.map(|kind| OperandGroup {
        kind,
        value: codes.iter().fold(0, |acc, code| acc | code),
        codes,
    }))
}

/// Classify a full comma-separated parameter list
pub fn classify_params(
    params: &str,
    symbols: &dyn SymbolTable,
) -> Result<Vec<OperandGroup>, OperandError> {
    let mut groups = Vec::new();
    for group in params.split(',') {
        if let Some(parsed) = classify_group(group, symbols)? {
            groups.push(parsed);
        }
    }
    Ok(groups)
}

/// The numeric array emitted for one operation: marker, then (datatype, value) pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandTable {
    pub operation: Operation,
    pub groups: Vec<OperandGroup>,
}

impl OperandTable {
    pub fn new(operation: Operation, groups: Vec<OperandGroup>) -> Self {
        Self { operation, groups }
    }

    /// Element expressions of the emitted `vec[]`, in order
    pub fn elements(&self) -> Vec<String> {
        let mut elements = Vec::with_capacity(1 + self.groups.len() * 2);
        elements.push(format!(
            "static_cast<unsigned int>({})",
            self.operation.remap_type()
        ));
        for group in &self.groups {
            elements.push(format!("static_cast<unsigned int>({})", group.kind.datatype()));
            elements.push(group.value.to_string());
        }
        elements
    }
}
