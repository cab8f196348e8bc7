// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;

use thiserror::Error;

use crate::linux::addr::MacAddrParseError;
use crate::linux::packet::packet_strerror;
use crate::linux::socket::{io_strerror, IoStatus};

/// Errors returned by packet socket operations.
///
/// The `Display` output of each variant is the exact message a script sees.
#[derive(Debug, Error)]
pub enum PacketError {
    /// A method was called on the wrong kind of socket, or with missing or ill-typed
    /// arguments.
    #[error("{0}")]
    Usage(String),
    /// A link socket was asked to send before being bound to an interface.
    #[error("Not bound!")]
    NotBound,
    /// The destination hardware address could not be parsed.
    #[error("invalid mac format!")]
    InvalidMac(#[from] MacAddrParseError),
    /// A send did not complete.
    #[error("{}", send_strerror(.0))]
    Io(IoStatus),
    /// A system call outside the send path failed.
    #[error("{}", io_strerror(.0))]
    System(#[from] io::Error),
}

impl PacketError {
    /// Indicates whether the error stems from calling an operation incorrectly rather than
    /// from the socket or the system.
    #[inline]
    pub fn is_usage(&self) -> bool {
        matches!(self, PacketError::Usage(_))
    }
}

fn send_strerror(status: &IoStatus) -> std::borrow::Cow<'static, str> {
    packet_strerror(*status)
}

pub type Result<T> = std::result::Result<T, PacketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(PacketError::NotBound.to_string(), "Not bound!");
        assert_eq!(
            PacketError::from(MacAddrParseError::OctetCount(1)).to_string(),
            "invalid mac format!"
        );
        assert_eq!(PacketError::Io(IoStatus::Closed).to_string(), "refused");
        assert_eq!(PacketError::Io(IoStatus::Timeout).to_string(), "timeout");
        assert_eq!(
            PacketError::Usage("bad argument".into()).to_string(),
            "bad argument"
        );
    }

    #[test]
    fn system_errors_use_strerror() {
        let err = PacketError::from(io::Error::from_raw_os_error(libc::ENODEV));
        let msg = err.to_string();
        assert!(!msg.contains("os error"));
        assert_eq!(msg, crate::linux::socket::strerror(libc::ENODEV));
        assert!(!err.is_usage());
    }
}
