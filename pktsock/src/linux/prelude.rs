pub use super::addr::{LinkAddr, MacAddr, MacAddrParseError};
pub use super::packet::{packet_strerror, PacketKind, PacketSocket};
pub use super::sndrcv::SendFlags;
pub use super::socket::{IoStatus, SOCKET_INVALID};
pub use crate::error::PacketError;
pub use crate::timeout::{Timeout, TimeoutMode};
pub use crate::Interface;
