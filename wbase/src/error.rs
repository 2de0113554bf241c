use thiserror::Error;

use crate::mode::ModulationClass;

/// Errors surfaced while attaching or configuring a rate controller.
///
/// Every variant is detected up front, before a controller instance is
/// used; nothing on the steady-state decision paths can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0} rates are not supported by this rate control algorithm")]
    UnsupportedModulation(ModulationClass),
    #[error("a peer rate set must contain at least one mode")]
    EmptyRateSet,
    #[error("invalid rate control configuration: {0}")]
    InvalidConfig(&'static str),
}
