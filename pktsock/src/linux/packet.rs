// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Cow;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use super::addr::{network_protocol, LinkAddr, MacAddr};
use super::sndrcv::SendFlags;
use super::socket::{IoStatus, Socket};
use crate::error::{PacketError, Result};
use crate::timeout::{Timeout, TimeoutMode};

/// The two flavors of packet socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// `SOCK_RAW`: the caller supplies whole frames, link-layer header included.
    Link,
    /// `SOCK_DGRAM`: the kernel builds the link-layer header from a destination address.
    Net,
}

impl PacketKind {
    /// The socket type passed to `socket(2)`.
    #[inline]
    pub fn sock_type(self) -> libc::c_int {
        match self {
            PacketKind::Link => libc::SOCK_RAW,
            PacketKind::Net => libc::SOCK_DGRAM,
        }
    }

    /// The script-visible class name of sockets of this kind.
    #[inline]
    pub fn class_name(self) -> &'static str {
        match self {
            PacketKind::Link => "packet{link}",
            PacketKind::Net => "packet{net}",
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            PacketKind::Link => "link",
            PacketKind::Net => "net",
        }
    }
}

/// Describes a failed send.
///
/// Packet sockets are connectionless, so the only way a send can report a closed
/// connection is when the transport rejected the destination; that case reads "refused".
pub fn packet_strerror(status: IoStatus) -> Cow<'static, str> {
    match status {
        IoStatus::Closed => Cow::Borrowed("refused"),
        _ => status.strerror(),
    }
}

/// A Linux packet (`AF_PACKET`) socket that sends frames under a configurable timeout.
///
/// The socket owns its descriptor and closes it when dropped. The descriptor is always in
/// nonblocking mode; waiting is done in userspace according to the socket's [`Timeout`],
/// which by default never expires.
#[derive(Debug)]
pub struct PacketSocket {
    sock: Socket,
    tm: Timeout,
    kind: PacketKind,
    protocol: u32,
    ifindex: Option<u32>,
}

impl PacketSocket {
    /// Creates a `SOCK_RAW` packet socket for the given Ethernet protocol.
    ///
    /// # Permissions
    ///
    /// A program must have the `CAP_NET_RAW` capability in order for this call to succeed;
    /// otherwise, `EPERM` will be returned.
    #[inline]
    pub fn link(protocol: u32) -> Result<Self> {
        Self::new(PacketKind::Link, protocol)
    }

    /// Creates a `SOCK_DGRAM` packet socket for the given Ethernet protocol.
    ///
    /// Requires `CAP_NET_RAW`, as with [`link()`](Self::link).
    #[inline]
    pub fn net(protocol: u32) -> Result<Self> {
        Self::new(PacketKind::Net, protocol)
    }

    /// Creates a packet socket of the given kind.
    ///
    /// `protocol` is an Ethernet protocol number in host byte order (e.g. `0x0800` for IPv4,
    /// `0x0003` for all protocols). It is reported back unchanged by
    /// [`protocol()`](Self::protocol), but only its low 16 bits reach the kernel.
    pub fn new(kind: PacketKind, protocol: u32) -> Result<Self> {
        let sock = Socket::create(
            libc::AF_PACKET,
            kind.sock_type(),
            network_protocol(protocol) as libc::c_int,
        )?;
        sock.set_nonblocking(true)?;

        log::debug!(
            "opened {} socket (fd {}, protocol {:#06x})",
            kind.class_name(),
            sock.as_raw_fd(),
            protocol
        );

        Ok(Self::with_socket(sock, kind, protocol))
    }

    /// Adopts an already-open descriptor as a packet socket of the given kind.
    ///
    /// The descriptor is switched to nonblocking mode, and will be closed when the returned
    /// socket is closed or dropped.
    ///
    /// # Safety
    ///
    /// `fd` must be an open socket descriptor that nothing else will close.
    pub unsafe fn from_raw_fd(fd: RawFd, kind: PacketKind, protocol: u32) -> Result<Self> {
        let sock = Socket::from_raw_fd(fd);
        sock.set_nonblocking(true)?;
        Ok(Self::with_socket(sock, kind, protocol))
    }

    fn with_socket(sock: Socket, kind: PacketKind, protocol: u32) -> Self {
        Self {
            sock,
            tm: Timeout::blocking(),
            kind,
            protocol,
            ifindex: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// The Ethernet protocol number the socket was created with, in host byte order.
    #[inline]
    pub fn protocol(&self) -> u32 {
        self.protocol
    }

    /// The interface the socket is bound to, if any.
    #[inline]
    pub fn ifindex(&self) -> Option<u32> {
        self.ifindex
    }

    /// Binds the socket to the interface with index `ifindex`.
    ///
    /// Once bound, a link socket can [`send()`](Self::send) and a net socket no longer needs
    /// an interface index for [`send_to()`](Self::send_to).
    pub fn bind(&mut self, ifindex: u32) -> Result<()> {
        let sockaddr = LinkAddr::interface(ifindex, self.protocol).to_sockaddr();
        self.sock.bind(&sockaddr)?;
        self.ifindex = Some(ifindex);

        log::debug!(
            "bound {} socket (fd {}) to interface {}",
            self.kind.class_name(),
            self.sock.as_raw_fd(),
            ifindex
        );
        Ok(())
    }

    /// Sends a complete link-layer frame out of the interface the socket is bound to.
    ///
    /// Returns the number of bytes sent, which may be less than `frame.len()`.
    ///
    /// # Errors
    ///
    /// [`PacketError::Usage`] if this is not a link socket, [`PacketError::NotBound`] if it has
    /// not been bound to an interface, and [`PacketError::Io`] if the send itself failed or
    /// timed out.
    pub fn send(&mut self, frame: &[u8]) -> Result<usize> {
        self.expect_kind(PacketKind::Link, "send")?;
        if self.ifindex.is_none() {
            return Err(PacketError::NotBound);
        }

        self.tm.mark_start();
        let res = self.sock.send(frame, SendFlags::NO_SIGNAL, &self.tm);
        self.log_send("send", frame.len(), res)
    }

    /// Sends a network-layer payload to `mac`; the kernel prepends the link-layer header.
    ///
    /// `mac` must be six colon-separated hexadecimal octets. If the socket is bound, the
    /// frame leaves through the bound interface and `ifindex` is ignored; otherwise `ifindex`
    /// must name the (nonzero) outgoing interface.
    ///
    /// # Errors
    ///
    /// [`PacketError::Usage`] if this is not a net socket or no usable interface index is
    /// available, [`PacketError::InvalidMac`] if `mac` is malformed, and [`PacketError::Io`] if
    /// the send itself failed or timed out.
    pub fn send_to(&mut self, payload: &[u8], mac: &str, ifindex: Option<u32>) -> Result<usize> {
        self.expect_kind(PacketKind::Net, "sendto")?;

        let ifindex = match (self.ifindex, ifindex) {
            (Some(bound), _) => bound,
            (None, Some(i)) if i > 0 => i,
            (None, Some(_)) => {
                return Err(PacketError::Usage(
                    "interface index must be a positive integer".into(),
                ))
            }
            (None, None) => {
                return Err(PacketError::Usage(
                    "interface index expected on an unbound socket".into(),
                ))
            }
        };

        let mac: MacAddr = mac.parse()?;
        let sockaddr = LinkAddr::new(mac, ifindex, self.protocol).to_sockaddr();

        self.tm.mark_start();
        let res = self
            .sock
            .send_to(payload, SendFlags::NO_SIGNAL, &sockaddr, &self.tm);
        self.log_send("sendto", payload.len(), res)
    }

    fn expect_kind(&self, kind: PacketKind, method: &str) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(PacketError::Usage(format!(
                "{} requires a {} socket, got {}",
                method,
                kind.class_name(),
                self.kind.class_name()
            )))
        }
    }

    fn log_send(&self, op: &str, len: usize, res: std::result::Result<usize, IoStatus>) -> Result<usize> {
        match res {
            Ok(sent) => {
                log::trace!("{} on fd {}: {}/{} bytes", op, self.sock.as_raw_fd(), sent, len);
                Ok(sent)
            }
            Err(status) => {
                log::debug!(
                    "{} on fd {} failed: {}",
                    op,
                    self.sock.as_raw_fd(),
                    packet_strerror(status)
                );
                Err(PacketError::Io(status))
            }
        }
    }

    /// Packet sockets never buffer unread data in userspace, so readiness as reported by the
    /// kernel can always be trusted.
    #[inline]
    pub fn dirty(&self) -> bool {
        false
    }

    #[inline]
    pub fn timeout(&self) -> &Timeout {
        &self.tm
    }

    /// Sets the block or total timeout; `None` removes the limit.
    #[inline]
    pub fn set_timeout(&mut self, limit: Option<Duration>, mode: TimeoutMode) {
        self.tm.set(limit, mode);
    }

    /// Replaces the socket's descriptor with `fd`, returning the previous descriptor (which
    /// the caller now owns and must close).
    ///
    /// # Safety
    ///
    /// `fd` must be [`SOCKET_INVALID`](super::socket::SOCKET_INVALID) or an open descriptor
    /// that nothing else will close. No check is made that it is a packet socket, or that it
    /// is nonblocking.
    #[inline]
    pub unsafe fn set_raw_fd(&mut self, fd: RawFd) -> RawFd {
        self.sock.replace_raw_fd(fd)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        !self.sock.is_open()
    }

    /// Closes the socket. Closing an already-closed socket has no effect.
    ///
    /// Any later send fails with [`IoStatus::Closed`], reported as `"refused"`.
    pub fn close(&mut self) {
        if self.sock.is_open() {
            log::debug!(
                "closing {} socket (fd {})",
                self.kind.class_name(),
                self.sock.as_raw_fd()
            );
        }
        self.sock.destroy();
    }

    /// Marks the socket as bound without calling `bind(2)`.
    #[cfg(test)]
    pub(crate) fn assume_bound(&mut self, ifindex: u32) {
        self.ifindex = Some(ifindex);
    }
}

impl AsRawFd for PacketSocket {
    /// The socket's descriptor, or [`SOCKET_INVALID`](super::socket::SOCKET_INVALID) once
    /// closed.
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}
