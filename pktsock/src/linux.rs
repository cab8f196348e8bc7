// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! (Linux) `AF_PACKET` packet transmission interface.
//!
//! [`PacketSocket`](packet::PacketSocket) comes in two flavors, picked at construction:
//!
//! - `SOCK_RAW` ([`PacketKind::Link`](packet::PacketKind::Link)): the caller supplies the
//!   whole frame, link-layer header included, and sends it out of the bound interface.
//! - `SOCK_DGRAM` ([`PacketKind::Net`](packet::PacketKind::Net)): the caller supplies the
//!   network-layer payload plus a destination MAC address and interface, and the kernel
//!   builds the link-layer header.
//!
//! To include all common linux-specific structures, simply add `use pktsock::linux::prelude::*`
//! to your source.

// protocol == htons(ETH_P_ALL) -> all protocols
// protocol == 0 -> no packets are received, but any frame may still be sent
// sll_ifindex == 0 -> any interface (only meaningful for bind)
//
// CAP_NET_RAW is required for AF_PACKET

pub mod addr;
pub mod packet;
#[doc(hidden)]
pub mod prelude;
pub mod sndrcv;
pub mod socket;
