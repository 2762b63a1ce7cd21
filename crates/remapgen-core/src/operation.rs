// Remapgen Core - Operation Families
// Maps `<autogen>--Name--` tags to the hook they contribute to

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::fragment::HookKind;

/// Every operation name accepted inside `<autogen>--Name-- ...</autogen>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum Operation {
    SetKeyboardType,
    DropKeyAfterRemap,
    ShowStatusMessage,
    SimultaneousKeyPresses,
    KeyToKey,
    KeyToConsumer,
    KeyToPointingButton,
    DoublePressModifier,
    HoldingKeyToKey,
    IgnoreMultipleSameKeyPress,
    KeyOverlaidModifier,
    ConsumerToConsumer,
    ConsumerToKey,
    PointingButtonToPointingButton,
    PointingButtonToKey,
    PointingRelativeToScroll,
}

impl Operation {
    /// Whether the operation's parameters are compiled into an operand table
    pub fn needs_table(self) -> bool {
        !matches!(self, Operation::SetKeyboardType | Operation::ShowStatusMessage)
    }

    /// Hook the operation's dispatch statement is appended to
    pub fn target_hook(self) -> HookKind {
        match self {
            Operation::SetKeyboardType => HookKind::SetKeyboardType,
            Operation::DropKeyAfterRemap => HookKind::DropKeyAfterRemap,
            Operation::ShowStatusMessage => HookKind::StatusMessage,
            Operation::SimultaneousKeyPresses
            | Operation::KeyToKey
            | Operation::KeyToConsumer
            | Operation::KeyToPointingButton
            | Operation::DoublePressModifier
            | Operation::HoldingKeyToKey
            | Operation::IgnoreMultipleSameKeyPress
            | Operation::KeyOverlaidModifier => HookKind::RemapKey,
            Operation::ConsumerToConsumer | Operation::ConsumerToKey => HookKind::RemapConsumer,
            Operation::PointingButtonToPointingButton
            | Operation::PointingButtonToKey
            | Operation::PointingRelativeToScroll => HookKind::RemapPointing,
        }
    }

    /// Marker constant heading the operand table (`BRIDGE_REMAPTYPE_KEYTOKEY`)
    pub fn remap_type(self) -> String {
        format!("BRIDGE_REMAPTYPE_{}", self.as_ref().to_uppercase())
    }
}
