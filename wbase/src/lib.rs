pub mod error;
pub mod mode;
pub mod peer;
pub mod txvector;

pub use error::Error;
pub use mode::{ChannelWidth, ModulationClass, RateSet, TxMode, modes};
pub use peer::{DeviceCapabilities, PeerCapabilities, PeerId};
pub use txvector::{Preamble, TxVector};
