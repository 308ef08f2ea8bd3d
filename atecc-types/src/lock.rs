//! Zone lock state

use std::fmt;

/// Value of a lock byte that has not been locked
const UNLOCKED: u8 = 0x55;

/// Lock state of a zone
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

impl LockState {
    /// Interpret a LockConfig or LockValue byte
    pub fn from_lock_byte(value: u8) -> Self {
        if value == UNLOCKED {
            Self::Unlocked
        } else {
            Self::Locked
        }
    }

    /// Interpret one bit of the SlotLocked field, where a cleared bit is locked
    pub fn from_slot_bit(bit: bool) -> Self {
        if bit {
            Self::Unlocked
        } else {
            Self::Locked
        }
    }

    pub fn is_locked(self) -> bool {
        self == Self::Locked
    }
}

impl From<LockState> for bool {
    fn from(state: LockState) -> bool {
        state.is_locked()
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::Locked => write!(f, "locked"),
        }
    }
}
