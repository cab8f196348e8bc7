// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Nonblocking socket primitives driven by a [`Timeout`].
//!
//! Sends never block in the kernel: the descriptor is nonblocking, and when the kernel
//! reports `EAGAIN` the caller waits in `poll(2)` for as long as the timeout's retry budget
//! allows before trying again.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::fd::{AsRawFd, RawFd};
use std::{io, mem, ptr};

use super::sndrcv::SendFlags;
use crate::timeout::Timeout;

/// The descriptor value of a socket that is closed or was never opened.
pub const SOCKET_INVALID: RawFd = -1;

/// The outcome of a socket operation that did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStatus {
    /// The timeout expired before the operation could complete.
    Timeout,
    /// The socket is closed, or the peer is gone.
    Closed,
    /// The kernel reported the contained `errno`.
    Os(i32),
}

impl IoStatus {
    /// A short human-readable description of the status.
    ///
    /// A handful of common errors get terse names shared with other socket types; everything
    /// else is described by the C library.
    pub fn strerror(&self) -> Cow<'static, str> {
        match *self {
            IoStatus::Timeout => Cow::Borrowed("timeout"),
            IoStatus::Closed => Cow::Borrowed("closed"),
            IoStatus::Os(errno) => match errno {
                libc::EADDRINUSE => Cow::Borrowed("address already in use"),
                libc::EISCONN => Cow::Borrowed("already connected"),
                libc::EACCES => Cow::Borrowed("permission denied"),
                libc::ECONNREFUSED => Cow::Borrowed("connection refused"),
                libc::ECONNABORTED | libc::ECONNRESET => Cow::Borrowed("closed"),
                libc::ETIMEDOUT => Cow::Borrowed("timeout"),
                _ => Cow::Owned(strerror(errno)),
            },
        }
    }
}

/// Describes `errno` the way `strerror(3)` does, without any "(os error N)" decoration.
pub fn strerror(errno: i32) -> String {
    let mut buf = [0 as libc::c_char; 256];

    match unsafe { libc::strerror_r(errno, buf.as_mut_ptr(), buf.len()) } {
        0 => unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned(),
        _ => format!("Unknown error {}", errno),
    }
}

/// Describes an I/O error the way `strerror(3)` would if it carries an OS error code.
pub fn io_strerror(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(errno) => strerror(errno),
        None => err.to_string(),
    }
}

/// An owned socket descriptor that tolerates being closed more than once.
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
}

impl Socket {
    /// Opens a new socket.
    pub fn create(domain: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> io::Result<Self> {
        match unsafe { libc::socket(domain, ty, protocol) } {
            ..=-1 => Err(io::Error::last_os_error()),
            fd => Ok(Socket { fd }),
        }
    }

    /// Takes ownership of `fd`.
    ///
    /// # Safety
    ///
    /// `fd` must be [`SOCKET_INVALID`] or an open descriptor that nothing else will close.
    #[inline]
    pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Socket { fd }
    }

    /// Swaps the owned descriptor for `fd`, handing the previous one back to the caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw_fd()`](Self::from_raw_fd).
    #[inline]
    pub unsafe fn replace_raw_fd(&mut self, fd: RawFd) -> RawFd {
        mem::replace(&mut self.fd, fd)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.fd != SOCKET_INVALID
    }

    /// Configures whether the descriptor blocks in the kernel.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let mut fl = match unsafe { libc::fcntl(self.fd, libc::F_GETFL, 0) } {
            ..=-1 => return Err(io::Error::last_os_error()),
            f => f,
        };

        if nonblocking {
            fl |= libc::O_NONBLOCK;
        } else {
            fl &= !libc::O_NONBLOCK;
        }

        match unsafe { libc::fcntl(self.fd, libc::F_SETFL, fl) } {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Binds the socket to a link-layer address.
    pub fn bind(&self, sockaddr: &libc::sockaddr_ll) -> io::Result<()> {
        match unsafe {
            libc::bind(
                self.fd,
                ptr::addr_of!(*sockaddr) as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        } {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Sends `buf` over the socket, waiting for writability within `tm`.
    ///
    /// Returns the number of bytes the kernel accepted, which may be less than `buf.len()`.
    pub fn send(&self, buf: &[u8], flags: SendFlags, tm: &Timeout) -> Result<usize, IoStatus> {
        self.retry_send(tm, || unsafe {
            libc::send(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                flags.bits(),
            )
        })
    }

    /// Sends `buf` to the link-layer address `sockaddr`, waiting for writability within `tm`.
    pub fn send_to(
        &self,
        buf: &[u8],
        flags: SendFlags,
        sockaddr: &libc::sockaddr_ll,
        tm: &Timeout,
    ) -> Result<usize, IoStatus> {
        self.retry_send(tm, || unsafe {
            libc::sendto(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                flags.bits(),
                ptr::addr_of!(*sockaddr) as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        })
    }

    fn retry_send<F>(&self, tm: &Timeout, mut send: F) -> Result<usize, IoStatus>
    where
        F: FnMut() -> libc::ssize_t,
    {
        if !self.is_open() {
            return Err(IoStatus::Closed);
        }

        loop {
            let sent = send();
            if sent >= 0 {
                return Ok(sent as usize);
            }

            match io::Error::last_os_error().raw_os_error().unwrap_or(0) {
                libc::EPIPE => return Err(IoStatus::Closed),
                // EPROTOTYPE can show up transiently while the peer is going away
                libc::EPROTOTYPE | libc::EINTR => continue,
                libc::EAGAIN => self.wait_writable(tm)?,
                errno => return Err(IoStatus::Os(errno)),
            }
        }
    }

    /// Waits in `poll(2)` until the socket is writable or the retry budget runs out.
    fn wait_writable(&self, tm: &Timeout) -> Result<(), IoStatus> {
        if tm.is_zero() {
            return Err(IoStatus::Timeout);
        }

        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLOUT,
            revents: 0,
        };

        loop {
            match unsafe { libc::poll(ptr::addr_of_mut!(pfd), 1, tm.retry_millis()) } {
                0 => return Err(IoStatus::Timeout),
                ..=-1 => match io::Error::last_os_error().raw_os_error().unwrap_or(0) {
                    libc::EINTR => continue,
                    errno => return Err(IoStatus::Os(errno)),
                },
                _ => return Ok(()),
            }
        }
    }

    /// Closes the descriptor. Closing an already-closed socket does nothing.
    pub fn destroy(&mut self) {
        if self.is_open() {
            unsafe { libc::close(self.fd) };
            self.fd = SOCKET_INVALID;
        }
    }
}

impl Drop for Socket {
    #[inline]
    fn drop(&mut self) {
        self.destroy();
    }
}

impl AsRawFd for Socket {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixDatagram;
    use std::time::{Duration, Instant};

    use crate::timeout::TimeoutMode;

    fn pair() -> (Socket, UnixDatagram) {
        let (ours, theirs) = UnixDatagram::pair().unwrap();
        let sock = unsafe { Socket::from_raw_fd(ours.into_raw_fd()) };
        sock.set_nonblocking(true).unwrap();
        (sock, theirs)
    }

    /// Sends until the peer's receive queue is full.
    fn saturate(sock: &Socket) {
        let frame = [0u8; 1024];
        let tm = Timeout::new(Some(Duration::ZERO), None);
        while sock.send(&frame, SendFlags::NO_SIGNAL, &tm).is_ok() {}
    }

    #[test]
    fn status_strings() {
        assert_eq!(IoStatus::Timeout.strerror(), "timeout");
        assert_eq!(IoStatus::Closed.strerror(), "closed");
        assert_eq!(IoStatus::Os(libc::ECONNRESET).strerror(), "closed");
        assert_eq!(IoStatus::Os(libc::ETIMEDOUT).strerror(), "timeout");
        assert_eq!(IoStatus::Os(libc::EACCES).strerror(), "permission denied");
        assert_eq!(IoStatus::Os(libc::ENODEV).strerror(), strerror(libc::ENODEV));
    }

    #[test]
    fn strerror_has_no_suffix() {
        let msg = strerror(libc::EPERM);
        assert!(!msg.is_empty());
        assert!(!msg.contains("os error"));
        assert_eq!(io_strerror(&io::Error::from_raw_os_error(libc::EPERM)), msg);
    }

    #[test]
    fn destroy_is_idempotent() {
        let (mut sock, _peer) = pair();
        assert!(sock.is_open());
        sock.destroy();
        assert_eq!(sock.as_raw_fd(), SOCKET_INVALID);
        sock.destroy();
        assert_eq!(sock.as_raw_fd(), SOCKET_INVALID);

        let mut never_opened = unsafe { Socket::from_raw_fd(SOCKET_INVALID) };
        never_opened.destroy();
    }

    #[test]
    fn send_on_closed_socket() {
        let (mut sock, _peer) = pair();
        sock.destroy();
        assert_eq!(
            sock.send(b"x", SendFlags::NO_SIGNAL, &Timeout::blocking()),
            Err(IoStatus::Closed)
        );
    }

    #[test]
    fn send_delivers() {
        let (sock, peer) = pair();
        let sent = sock
            .send(b"frame", SendFlags::NO_SIGNAL, &Timeout::blocking())
            .unwrap();
        assert_eq!(sent, 5);

        let mut buf = [0u8; 16];
        assert_eq!(peer.recv(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"frame");
    }

    #[test]
    fn zero_timeout_fails_fast() {
        let (sock, _peer) = pair();
        saturate(&sock);

        let mut tm = Timeout::blocking();
        tm.set(Some(Duration::ZERO), TimeoutMode::Block);
        tm.mark_start();
        assert_eq!(
            sock.send(b"x", SendFlags::NO_SIGNAL, &tm),
            Err(IoStatus::Timeout)
        );
    }

    #[test]
    fn block_timeout_waits_then_fails() {
        let (sock, _peer) = pair();
        saturate(&sock);

        let mut tm = Timeout::new(Some(Duration::from_millis(50)), None);
        tm.mark_start();
        let start = Instant::now();
        assert_eq!(
            sock.send(b"x", SendFlags::NO_SIGNAL, &tm),
            Err(IoStatus::Timeout)
        );
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn broken_pipe_is_closed() {
        let (sock, peer) = pair();
        drop(peer);
        match sock.send(b"x", SendFlags::NO_SIGNAL, &Timeout::blocking()) {
            Err(IoStatus::Closed) | Err(IoStatus::Os(libc::ECONNREFUSED)) => (),
            other => panic!("unexpected send result: {:?}", other),
        }
    }
}
