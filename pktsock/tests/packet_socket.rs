// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end checks against real `AF_PACKET` sockets.
//!
//! Opening a packet socket requires CAP_NET_RAW; every test returns early (with a warning)
//! when the socket cannot be created for lack of privileges.

#![cfg(target_os = "linux")]

use std::io;
use std::time::{Duration, Instant};

use pktsock::linux::socket::IoStatus;
use pktsock::script::{PacketModule, Value};
use pktsock::timeout::TimeoutMode;
use pktsock::{if_name_to_index, PacketError, PacketKind, PacketSocket};

const ETH_P_ALL: u32 = 0x0003;
const ETH_P_IP: u32 = 0x0800;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unprivileged(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EPERM) | Some(libc::EACCES) | Some(libc::EAFNOSUPPORT)
    )
}

fn open(kind: PacketKind, protocol: u32) -> Option<PacketSocket> {
    init_logging();
    match PacketSocket::new(kind, protocol) {
        Ok(pkt) => Some(pkt),
        Err(PacketError::System(e)) if unprivileged(&e) => {
            log::warn!("skipping: cannot open {} socket: {}", kind.class_name(), e);
            None
        }
        Err(e) => panic!("failed to open {} socket: {}", kind.class_name(), e),
    }
}

/// Calls a constructor through the script bridge, or `None` if unprivileged.
fn construct(module: &PacketModule, name: &str, protocol: u32) -> Option<Value> {
    init_logging();
    let ret = module
        .call(name, &[Value::Integer(protocol.into())])
        .unwrap();
    match ret.as_slice() {
        [obj @ Value::Object(_)] => Some(obj.clone()),
        [Value::Nil, Value::String(msg)] => {
            log::warn!("skipping: {}: {}", name, String::from_utf8_lossy(msg));
            None
        }
        other => panic!("unexpected constructor result {:?}", other),
    }
}

fn loopback() -> Option<u32> {
    if_name_to_index("lo").ok()
}

/// Unwraps a send result, or `None` if the loopback device is administratively down.
fn sent(res: pktsock::Result<usize>) -> Option<usize> {
    match res {
        Ok(n) => Some(n),
        Err(PacketError::Io(IoStatus::Os(libc::ENETDOWN))) => {
            log::warn!("skipping: loopback is down");
            None
        }
        Err(e) => panic!("send failed: {}", e),
    }
}

#[test]
fn net_introspection() {
    let module = PacketModule::open();
    let Some(p) = construct(&module, "packet_net", ETH_P_IP) else {
        return;
    };

    assert_eq!(
        module.invoke(&p, "gettype", &[]).unwrap(),
        [Value::from("net")]
    );
    assert_eq!(
        module.invoke(&p, "getprotocol", &[]).unwrap(),
        [Value::Integer(2048)]
    );
    match module.invoke(&p, "getfd", &[]).unwrap().as_slice() {
        [Value::Integer(fd)] => assert!(*fd >= 0),
        other => panic!("unexpected getfd result {:?}", other),
    }
    assert_eq!(
        module.invoke(&p, "dirty", &[]).unwrap(),
        [Value::Boolean(false)]
    );
}

#[test]
fn unbound_link_send_refused() {
    let module = PacketModule::open();
    let Some(p) = construct(&module, "packet_link", ETH_P_ALL) else {
        return;
    };

    assert_eq!(
        module.invoke(&p, "send", &[Value::from("frame")]).unwrap(),
        [Value::Nil, Value::from("Not bound!")]
    );
}

#[test]
fn bad_mac_refused() {
    let module = PacketModule::open();
    let Some(p) = construct(&module, "packet_net", ETH_P_IP) else {
        return;
    };

    for mac in ["not-a-mac", "01:02:03:04:05", "gg:02:03:04:05:06", ""] {
        assert_eq!(
            module
                .invoke(&p, "sendto", &[Value::from("x"), Value::from(mac), Value::Integer(1)])
                .unwrap(),
            [Value::Nil, Value::from("invalid mac format!")],
            "mac {:?}",
            mac
        );
    }
}

#[test]
fn close_is_idempotent() {
    let module = PacketModule::open();
    let Some(p) = construct(&module, "packet_net", ETH_P_IP) else {
        return;
    };

    assert_eq!(module.invoke(&p, "close", &[]).unwrap(), [Value::Integer(1)]);
    assert_eq!(module.invoke(&p, "close", &[]).unwrap(), [Value::Integer(1)]);
    assert_eq!(
        module.invoke(&p, "getfd", &[]).unwrap(),
        [Value::Integer(-1)]
    );

    let ret = module
        .invoke(
            &p,
            "sendto",
            &[Value::from("x"), Value::from("ff:ff:ff:ff:ff:ff"), Value::Integer(1)],
        )
        .unwrap();
    assert!(ret[0].is_nil());
}

#[test]
fn zero_timeout_does_not_block() {
    let Some(index) = loopback() else {
        return;
    };
    let Some(mut pkt) = open(PacketKind::Net, ETH_P_IP) else {
        return;
    };
    pkt.set_timeout(Some(Duration::ZERO), TimeoutMode::Block);

    let start = Instant::now();
    let res = pkt.send_to(b"x", "ff:ff:ff:ff:ff:ff", Some(index));
    assert!(start.elapsed() < Duration::from_millis(500));

    if let Err(e) = res {
        assert!(!e.is_usage());
        assert!(!e.to_string().is_empty());
    }
}

#[test]
fn bound_link_send() {
    let Some(index) = loopback() else {
        return;
    };
    let Some(mut pkt) = open(PacketKind::Link, 0) else {
        return;
    };
    pkt.bind(index).unwrap();
    assert_eq!(pkt.ifindex(), Some(index));

    // Broadcast destination, zero source, experimental ethertype
    let mut frame = vec![0xff; 6];
    frame.extend_from_slice(&[0; 6]);
    frame.extend_from_slice(&[0x88, 0xb5]);
    frame.extend_from_slice(b"pktsock");

    if let Some(n) = sent(pkt.send(&frame)) {
        assert_eq!(n, frame.len());
    }
}

#[test]
fn bound_net_ignores_ifindex() {
    let Some(index) = loopback() else {
        return;
    };
    let Some(mut pkt) = open(PacketKind::Net, ETH_P_IP) else {
        return;
    };
    pkt.bind(index).unwrap();

    if let Some(n) = sent(pkt.send_to(b"payload", "00:00:00:00:00:00", None)) {
        assert_eq!(n, 7);
    }
}
