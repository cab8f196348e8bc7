// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `mio` readiness support for [`PacketSocket`].
//!
//! A `PacketSocket` is already nonblocking, so registering its descriptor directly is enough
//! for a `mio::Poll` to report when the socket can take another frame. Sends through a
//! registered socket still go through its [`Timeout`](crate::timeout::Timeout); set a zero
//! block timeout to have `send` return immediately instead of polling internally.

use std::io;
use std::os::fd::AsRawFd;

use mio::event::Source;
use mio::unix::SourceFd;
use mio::{Interest, Registry, Token};

use crate::linux::packet::PacketSocket;

impl Source for PacketSocket {
    fn register(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).deregister(registry)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mio::{Events, Interest, Poll, Token};

    use crate::linux::packet::tests::paired;
    use crate::linux::packet::PacketKind;

    const PKT: Token = Token(7);

    #[test]
    fn reports_writable() {
        let (mut pkt, _peer) = paired(PacketKind::Link, 0);
        let mut poll = Poll::new().unwrap();
        let mut events = Events::with_capacity(4);

        poll.registry()
            .register(&mut pkt, PKT, Interest::WRITABLE)
            .unwrap();
        poll.poll(&mut events, Some(Duration::from_secs(1))).unwrap();

        assert!(events
            .iter()
            .any(|event| event.token() == PKT && event.is_writable()));

        poll.registry().deregister(&mut pkt).unwrap();
    }
}
