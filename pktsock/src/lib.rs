// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linux packet sockets for sending raw and cooked link-layer frames.
//!
//! [`PacketSocket`](linux::packet::PacketSocket) wraps an `AF_PACKET` socket in nonblocking
//! mode and sends through it under a block/total [`Timeout`](timeout::Timeout). The
//! [`script`] module exposes the same sockets to an embedding scripting host as
//! `packet{link}`/`packet{net}` objects.
//!
//! Receiving, filtering and frame parsing are out of scope; this crate only transmits.

// Show required OS/features on docs.rs.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(target_os = "linux")]
pub mod error;
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(all(target_os = "linux", feature = "mio"))]
mod mio;
#[cfg(target_os = "linux")]
pub mod script;
pub mod timeout;

#[cfg(target_os = "linux")]
pub use error::{PacketError, Result};
#[cfg(target_os = "linux")]
pub use linux::packet::{PacketKind, PacketSocket};

#[cfg(target_os = "linux")]
use std::ffi::{CStr, CString};
#[cfg(target_os = "linux")]
use std::io;

/// An identifier associated with a particular network device.
///
/// Network interfaces are not guaranteed to be static; network devices can be added and removed,
/// and in certain circumstances an interface that once pointed to one device may end up pointing
/// to another during the course of a program's lifetime. An `Interface` records the name and
/// index that matched at the time it was looked up.
#[cfg(target_os = "linux")]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    /// The interface name, null-terminated.
    name: [u8; libc::IF_NAMESIZE],
    index: u32,
}

#[cfg(target_os = "linux")]
impl Interface {
    /// The maximum length (in bytes) that an interface name can be.
    pub const MAX_INTERFACE_NAME_LEN: usize = libc::IF_NAMESIZE - 1;

    /// Looks up the interface with the given index.
    ///
    /// # Errors
    ///
    /// Any returned error indicates that `index` does not correspond to a valid interface.
    pub fn from_index(index: u32) -> io::Result<Self> {
        let mut name = [0u8; libc::IF_NAMESIZE];
        match unsafe { libc::if_indextoname(index, name.as_mut_ptr() as *mut libc::c_char) } {
            ptr if ptr.is_null() => Err(io::Error::last_os_error()),
            _ => Ok(Self { name, index }),
        }
    }

    /// Looks up the interface with the given name.
    ///
    /// `if_name` should consist of up to 15 non-null bytes, without a terminating null.
    ///
    /// # Errors
    ///
    /// Returns [InvalidInput](io::ErrorKind::InvalidInput) if `if_name` is longer than 15
    /// bytes or contains a null byte.
    ///
    /// Otherwise, any returned error indicates that `if_name` does not correspond with a valid
    /// interface.
    pub fn from_name(if_name: &[u8]) -> io::Result<Self> {
        if if_name.len() > Self::MAX_INTERFACE_NAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name too long",
            ));
        }

        let c_name = CString::new(if_name).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "malformed interface name")
        })?;

        match unsafe { libc::if_nametoindex(c_name.as_ptr()) } {
            0 => Err(io::Error::last_os_error()),
            index => {
                let mut name = [0u8; libc::IF_NAMESIZE];
                name[..if_name.len()].copy_from_slice(if_name);
                Ok(Self { name, index })
            }
        }
    }

    /// The raw index of the network interface.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The name of the interface.
    #[inline]
    pub fn name(&self) -> &CStr {
        // SAFETY: `name` always holds a terminating null within IF_NAMESIZE bytes
        unsafe { CStr::from_ptr(self.name.as_ptr() as *const libc::c_char) }
    }

    /// The name of the interface as bytes, without the terminating null.
    #[inline]
    pub fn name_bytes(&self) -> &[u8] {
        self.name().to_bytes()
    }
}

#[cfg(target_os = "linux")]
impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name())
            .field("index", &self.index)
            .finish()
    }
}

/// Returns the name of the interface with index `index` (`if_indextoname(3)`).
#[cfg(target_os = "linux")]
pub fn if_index_to_name(index: u32) -> io::Result<String> {
    Interface::from_index(index)
        .map(|iface| String::from_utf8_lossy(iface.name_bytes()).into_owned())
}

/// Returns the index of the interface named `name` (`if_nametoindex(3)`).
#[cfg(target_os = "linux")]
pub fn if_name_to_index(name: &str) -> io::Result<u32> {
    Interface::from_name(name.as_bytes()).map(|iface| iface.index())
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn loopback_round_trip() {
        let Ok(index) = if_name_to_index("lo") else {
            // No loopback device in this network namespace
            return;
        };
        assert!(index >= 1);
        assert_eq!(if_index_to_name(index).unwrap(), "lo");

        let iface = Interface::from_index(index).unwrap();
        assert_eq!(iface.name_bytes(), b"lo");
        assert_eq!(iface.index(), index);
    }

    #[test]
    fn malformed_names() {
        let err = Interface::from_name(b"lo\0").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = Interface::from_name(b"sixteen-chars-xx").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_interfaces() {
        assert!(if_name_to_index("no-such-iface0").is_err());
        assert!(if_index_to_name(0).is_err());
    }
}
