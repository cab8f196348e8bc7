// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use bitflags::bitflags;

bitflags! {
    /// Flags to modify a call to `send()`/`send_to()`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SendFlags: libc::c_int {
        /// Notifies the link layer that forward progress has happened.
        const CONFIRM = libc::MSG_CONFIRM;
        /// Requires that the frame only be sent to hosts on directly connected networks.
        const DONT_ROUTE = libc::MSG_DONTROUTE;
        /// Returns immediately instead of blocking, regardless of the descriptor's mode.
        const DONT_WAIT = libc::MSG_DONTWAIT;
        /// Blocks the SIGPIPE signal from being raised (EPIPE is still returned).
        const NO_SIGNAL = libc::MSG_NOSIGNAL;
    }
}
