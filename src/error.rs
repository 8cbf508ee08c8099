use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("Invalid state")]
    InvalidState,
    #[error("Door index {index} out of range (doors = {doors})")]
    OutOfRange { index: u32, doors: u32 },
    #[error("At least 3 doors are required, got {doors}")]
    TooFewDoors { doors: u32 },
    #[error("Switch is ambiguous with {doors} doors, name the target door")]
    AmbiguousSwitch { doors: u32 },
    #[error("Cannot switch to door {index}")]
    InvalidSwitchTarget { index: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
