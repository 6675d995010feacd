//! ipa - the IPA multiplex protocol used on Abis/IP and by the BSC-NAT
mod error;
mod frame;
pub mod build;
pub mod connection;
pub mod identity;
pub mod net;
pub mod protocol;

pub use error::{Error, ParseError, Result};
pub use frame::{Frame, FrameReader, Frames};
pub use identity::{IdentityTags, UnitId};
pub use protocol::{IdTag, MsgType, Protocol};
