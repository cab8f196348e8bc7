// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt::{Debug, Display};
use std::str::FromStr;

/// The length (in bytes) of an Ethernet hardware address.
pub const MAC_ADDR_LEN: usize = 6;

/// The reason a string could not be parsed as a [`MacAddr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MacAddrParseError {
    /// The string did not consist of exactly six colon-separated groups.
    #[error("expected 6 colon-separated octets, found {0}")]
    OctetCount(usize),
    /// The group at the given (zero-based) position was not 1-2 hexadecimal digits.
    #[error("octet {0} is not a 1-2 digit hexadecimal value")]
    InvalidOctet(usize),
}

/// A Media Access Control (MAC) address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr {
    addr: [u8; MAC_ADDR_LEN],
}

impl MacAddr {
    /// The Ethernet broadcast address (`ff:ff:ff:ff:ff:ff`).
    pub const BROADCAST: MacAddr = MacAddr { addr: [0xff; MAC_ADDR_LEN] };

    #[inline]
    pub fn octets(&self) -> [u8; MAC_ADDR_LEN] {
        self.addr
    }
}

impl From<[u8; MAC_ADDR_LEN]> for MacAddr {
    #[inline]
    fn from(value: [u8; MAC_ADDR_LEN]) -> Self {
        Self { addr: value }
    }
}

impl From<MacAddr> for [u8; MAC_ADDR_LEN] {
    #[inline]
    fn from(value: MacAddr) -> Self {
        value.addr
    }
}

impl Debug for MacAddr {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacAddr")
            .field("addr", &format_args!("{}", self))
            .finish()
    }
}

impl Display for MacAddr {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.addr[0], self.addr[1], self.addr[2], self.addr[3], self.addr[4], self.addr[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = MacAddrParseError;

    /// Parses six colon-separated octets of one or two hexadecimal digits each
    /// (`aa:bb:cc:dd:ee:ff`, `0:1:2:3:4:5`). Nothing else is accepted, including trailing
    /// characters after the sixth octet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups = s.split(':').count();
        if groups != MAC_ADDR_LEN {
            return Err(MacAddrParseError::OctetCount(groups));
        }

        let mut addr = [0u8; MAC_ADDR_LEN];
        for (idx, group) in s.split(':').enumerate() {
            if group.is_empty() || group.len() > 2 {
                return Err(MacAddrParseError::InvalidOctet(idx));
            }

            for b in group.bytes() {
                let nibble = match b {
                    b'0'..=b'9' => b - b'0',
                    b'a'..=b'f' => 10 + (b - b'a'),
                    b'A'..=b'F' => 10 + (b - b'A'),
                    _ => return Err(MacAddrParseError::InvalidOctet(idx)),
                };
                addr[idx] = (addr[idx] << 4) | nibble;
            }
        }

        Ok(Self { addr })
    }
}

/// A link-layer destination: hardware address, interface and Ethernet protocol.
///
/// The protocol is held in host byte order and only converted to network byte order when
/// the kernel structure is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkAddr {
    mac: Option<MacAddr>,
    ifindex: u32,
    protocol: u32,
}

impl LinkAddr {
    /// An address naming a destination `mac` on interface `ifindex`.
    #[inline]
    pub fn new(mac: MacAddr, ifindex: u32, protocol: u32) -> Self {
        Self {
            mac: Some(mac),
            ifindex,
            protocol,
        }
    }

    /// An address naming only an interface, as used when binding a socket.
    #[inline]
    pub fn interface(ifindex: u32, protocol: u32) -> Self {
        Self {
            mac: None,
            ifindex,
            protocol,
        }
    }

    #[inline]
    pub fn mac(&self) -> Option<MacAddr> {
        self.mac
    }

    #[inline]
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    #[inline]
    pub fn protocol(&self) -> u32 {
        self.protocol
    }

    /// Constructs a [`libc::sockaddr_ll`] struct from the given address.
    ///
    /// Protocol numbers wider than 16 bits are truncated to their low 16 bits.
    pub fn to_sockaddr(&self) -> libc::sockaddr_ll {
        let mut sll_addr = [0u8; 8];
        let sll_halen = match self.mac {
            Some(mac) => {
                sll_addr[..MAC_ADDR_LEN].copy_from_slice(&mac.octets());
                MAC_ADDR_LEN as u8
            }
            None => 0,
        };

        libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: network_protocol(self.protocol),
            sll_ifindex: self.ifindex as i32,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen,
            sll_addr,
        }
    }
}

/// Converts a host-order Ethernet protocol number into the network-order value the kernel
/// expects (`htons`).
#[inline]
pub(crate) fn network_protocol(protocol: u32) -> u16 {
    (protocol as u16).to_be()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mac() {
        let mac: MacAddr = "01:02:03:04:05:06".parse().unwrap();
        assert_eq!(mac.octets(), [1, 2, 3, 4, 5, 6]);

        let mac: MacAddr = "aa:BB:c:D:0:ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xaa, 0xbb, 0x0c, 0x0d, 0x00, 0xff]);

        let mac: MacAddr = "ff:ff:ff:ff:ff:ff".parse().unwrap();
        assert_eq!(mac, MacAddr::BROADCAST);
    }

    #[test]
    fn reject_malformed_mac() {
        assert_eq!(
            "01:02:03:04:05".parse::<MacAddr>(),
            Err(MacAddrParseError::OctetCount(5))
        );
        assert_eq!("".parse::<MacAddr>(), Err(MacAddrParseError::OctetCount(1)));
        assert_eq!(
            "not-a-mac".parse::<MacAddr>(),
            Err(MacAddrParseError::OctetCount(1))
        );
        assert_eq!(
            "01:02:03:04:05:06:07".parse::<MacAddr>(),
            Err(MacAddrParseError::OctetCount(7))
        );
        assert_eq!(
            "gg:02:03:04:05:06".parse::<MacAddr>(),
            Err(MacAddrParseError::InvalidOctet(0))
        );
        assert_eq!(
            "01:02:03:04:05:06x".parse::<MacAddr>(),
            Err(MacAddrParseError::InvalidOctet(5))
        );
        assert_eq!(
            "01:002:03:04:05:06".parse::<MacAddr>(),
            Err(MacAddrParseError::InvalidOctet(1))
        );
        assert_eq!(
            "01::03:04:05:06".parse::<MacAddr>(),
            Err(MacAddrParseError::InvalidOctet(1))
        );
        assert_eq!(
            "+1:02:03:04:05:06".parse::<MacAddr>(),
            Err(MacAddrParseError::InvalidOctet(0))
        );
    }

    #[test]
    fn display_mac() {
        let mac = MacAddr::from([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
        assert_eq!(mac.to_string().parse::<MacAddr>(), Ok(mac));
    }

    #[test]
    fn destination_sockaddr() {
        let mac = MacAddr::from([1, 2, 3, 4, 5, 6]);
        let sockaddr = LinkAddr::new(mac, 7, 0x0800).to_sockaddr();

        assert_eq!(sockaddr.sll_family, libc::AF_PACKET as u16);
        assert_eq!(sockaddr.sll_ifindex, 7);
        assert_eq!(u16::from_be(sockaddr.sll_protocol), 0x0800);
        assert_eq!(sockaddr.sll_halen, 6);
        assert_eq!(sockaddr.sll_addr, [1, 2, 3, 4, 5, 6, 0, 0]);
        assert_eq!(sockaddr.sll_hatype, 0);
        assert_eq!(sockaddr.sll_pkttype, 0);
    }

    #[test]
    fn interface_sockaddr() {
        let sockaddr = LinkAddr::interface(3, 0x0003).to_sockaddr();

        assert_eq!(sockaddr.sll_ifindex, 3);
        assert_eq!(u16::from_be(sockaddr.sll_protocol), 0x0003);
        assert_eq!(sockaddr.sll_halen, 0);
        assert_eq!(sockaddr.sll_addr, [0; 8]);
    }

    #[test]
    fn wide_protocol_truncated() {
        assert_eq!(u16::from_be(network_protocol(0x1_0800)), 0x0800);
    }
}
