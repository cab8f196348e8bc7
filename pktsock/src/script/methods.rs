// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::os::fd::{AsRawFd, RawFd};

use super::registry::{ClassRegistry, NativeFn};
use super::value::{Args, Object, Value};
use super::{returned, CallResult, ANY_GROUP, LINK_CLASS, NET_CLASS};
use crate::error::PacketError;
use crate::linux::packet::{PacketKind, PacketSocket};
use crate::timeout::{limit_from_secs, limit_to_secs, TimeoutMode};
use crate::Interface;

/// Methods shared by both packet classes.
pub(super) const PACKET_METHODS: &[(&str, NativeFn)] = &[
    ("__gc", meth_close),
    ("__tostring", meth_tostring),
    ("close", meth_close),
    ("dirty", meth_dirty),
    ("send", meth_send),
    ("sendto", meth_sendto),
    ("gettype", meth_gettype),
    ("getprotocol", meth_getprotocol),
    ("getfd", meth_getfd),
    ("setfd", meth_setfd),
    ("settimeout", meth_settimeout),
    ("gettimeout", meth_gettimeout),
];

/// Functions in the module namespace.
pub(super) const FUNCTIONS: &[(&str, NativeFn)] = &[
    ("packet_link", global_create_link),
    ("packet_net", global_create_net),
    ("ifindextoname", global_if_indextoname),
    ("ifnametoindex", global_if_nametoindex),
];

fn meth_send(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_class(args, 1, LINK_CLASS)?;
    let data = args.check_bytes(2)?;

    let mut pkt = obj.borrow_mut()?;
    returned(pkt.send(&data).map(|sent| vec![Value::from(sent)]))
}

fn meth_sendto(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_class(args, 1, NET_CLASS)?;
    let data = args.check_bytes(2)?;
    let mac = args.check_bytes(3)?;

    let mut pkt = obj.borrow_mut()?;
    // A bound socket always sends through its own interface
    let ifindex = match pkt.ifindex() {
        Some(_) => None,
        None => {
            let ifindex = args.check_integer(4)?;
            match u32::try_from(ifindex) {
                Ok(i) if i > 0 => Some(i),
                _ => return Err(args.error(4, "interface index must be a positive integer")),
            }
        }
    };

    let mac = String::from_utf8_lossy(&mac);
    returned(
        pkt.send_to(&data, &mac, ifindex)
            .map(|sent| vec![Value::from(sent)]),
    )
}

fn meth_gettype(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let kind = obj.borrow_mut()?.kind();
    Ok(vec![Value::from(kind.as_str())])
}

fn meth_getprotocol(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let protocol = obj.borrow_mut()?.protocol();
    Ok(vec![Value::Integer(i64::from(protocol))])
}

fn meth_getfd(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let fd = obj.borrow_mut()?.as_raw_fd();
    Ok(vec![Value::Integer(i64::from(fd))])
}

/// Replaces the object's descriptor. The previous descriptor is neither closed nor returned;
/// a script that wants to keep it must have fetched it with `getfd` beforehand.
fn meth_setfd(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let fd = RawFd::try_from(args.check_integer(2)?)
        .map_err(|_| args.error(2, "descriptor out of range"))?;

    let mut pkt = obj.borrow_mut()?;
    // SAFETY: the script takes responsibility for handing over a descriptor it no longer
    // closes elsewhere; the object will close it on `close` or finalization.
    let previous = unsafe { pkt.set_raw_fd(fd) };
    log::debug!("{} descriptor replaced: {} -> {}", obj.class(), previous, fd);
    Ok(Vec::new())
}

fn meth_dirty(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let dirty = obj.borrow_mut()?.dirty();
    Ok(vec![Value::Boolean(dirty)])
}

fn meth_settimeout(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let limit = limit_from_secs(args.opt_number(2)?);
    let mode: TimeoutMode = args
        .opt_str(3, "b")?
        .parse()
        .map_err(|e: crate::timeout::InvalidTimeoutMode| args.error(3, &e.to_string()))?;

    obj.borrow_mut()?.set_timeout(limit, mode);
    Ok(vec![Value::Integer(1)])
}

fn meth_gettimeout(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    let pkt = obj.borrow_mut()?;
    let tm = pkt.timeout();
    Ok(vec![
        Value::Number(limit_to_secs(tm.block())),
        Value::Number(limit_to_secs(tm.total())),
    ])
}

fn meth_close(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    obj.borrow_mut()?.close();
    Ok(vec![Value::Integer(1)])
}

fn meth_tostring(reg: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let obj = reg.check_group(args, 1, ANY_GROUP)?;
    Ok(vec![Value::from(format!("{}: {:p}", obj.class(), obj.address()))])
}

fn create(args: &Args<'_>, kind: PacketKind) -> CallResult {
    let protocol = u32::try_from(args.check_integer(1)?)
        .map_err(|_| args.error(1, "protocol out of range"))?;

    returned(
        PacketSocket::new(kind, protocol)
            .map(|pkt| vec![Value::Object(Object::from_socket(pkt))]),
    )
}

fn global_create_link(_: &ClassRegistry, args: &Args<'_>) -> CallResult {
    create(args, PacketKind::Link)
}

fn global_create_net(_: &ClassRegistry, args: &Args<'_>) -> CallResult {
    create(args, PacketKind::Net)
}

fn global_if_indextoname(_: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let index = u32::try_from(args.check_integer(1)?)
        .map_err(|_| args.error(1, "interface index out of range"))?;

    match Interface::from_index(index) {
        Ok(iface) => Ok(vec![Value::String(iface.name_bytes().to_vec())]),
        Err(e) => returned(Err(PacketError::from(e))),
    }
}

fn global_if_nametoindex(_: &ClassRegistry, args: &Args<'_>) -> CallResult {
    let name = args.check_bytes(1)?;

    match Interface::from_name(&name) {
        Ok(iface) => Ok(vec![Value::Integer(i64::from(iface.index()))]),
        Err(e) => returned(Err(PacketError::from(e))),
    }
}
