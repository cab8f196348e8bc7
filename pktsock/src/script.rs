// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Host-agnostic scripting binding for packet sockets.
//!
//! A scripting host embeds this module by forwarding calls into [`PacketModule::call()`]
//! (module-level functions) and [`PacketModule::invoke()`] (object methods), converting its
//! own values to and from [`Value`].
//!
//! Results follow the usual multi-value convention: on success, the function's results;
//! on failure, `nil` followed by an error message. Only usage errors (wrong object class,
//! missing or ill-typed arguments) are returned as `Err`, for the host to raise as an
//! exception.
//!
//! Packet objects come in two classes, `packet{link}` and `packet{net}`, which both belong
//! to the `packet{any}` group and to the `select{able}` group recognized by readiness
//! polling (through their `getfd` and `dirty` methods).

use once_cell::sync::Lazy;

use crate::error::{PacketError, Result};

mod methods;
mod registry;
mod value;

pub use registry::{ClassRegistry, NativeFn};
pub use value::{Args, Object, Value};

pub const LINK_CLASS: &str = "packet{link}";
pub const NET_CLASS: &str = "packet{net}";
pub const ANY_GROUP: &str = "packet{any}";
pub const SELECTABLE_GROUP: &str = "select{able}";

/// The results of a native call, or a usage error.
pub type CallResult = Result<Vec<Value>>;

/// Converts a failed operation into the `(nil, message)` convention, letting usage errors
/// through as `Err`.
pub(crate) fn returned(res: CallResult) -> CallResult {
    match res {
        Err(e) if !e.is_usage() => Ok(vec![Value::Nil, Value::from(e.to_string())]),
        res => res,
    }
}

static REGISTRY: Lazy<ClassRegistry> = Lazy::new(|| {
    let mut reg = ClassRegistry::new();
    reg.new_class(NET_CLASS, methods::PACKET_METHODS);
    reg.new_class(LINK_CLASS, methods::PACKET_METHODS);
    for class in [NET_CLASS, LINK_CLASS] {
        reg.add_to_group(class, ANY_GROUP);
        reg.add_to_group(class, SELECTABLE_GROUP);
    }

    log::debug!("registered classes {} and {}", NET_CLASS, LINK_CLASS);
    reg
});

/// The packet module as seen by a script.
#[derive(Clone, Copy)]
pub struct PacketModule {
    registry: &'static ClassRegistry,
}

impl PacketModule {
    /// Opens the module, registering its classes on first use.
    pub fn open() -> Self {
        Self {
            registry: Lazy::force(&REGISTRY),
        }
    }

    #[inline]
    pub fn registry(&self) -> &'static ClassRegistry {
        self.registry
    }

    /// The names of the module-level functions.
    pub fn function_names(&self) -> impl Iterator<Item = &'static str> {
        methods::FUNCTIONS.iter().map(|(name, _)| *name)
    }

    /// Calls a module-level function (`packet_link`, `packet_net`, `ifindextoname`,
    /// `ifnametoindex`).
    pub fn call(&self, name: &str, args: &[Value]) -> CallResult {
        let &(name, f) = methods::FUNCTIONS
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| {
                PacketError::Usage(format!("attempt to call a nil value (field '{}')", name))
            })?;

        f(self.registry, &Args::new(name, args))
    }

    /// Calls method `method` on `target`, which is passed to the method as argument 1.
    pub fn invoke(&self, target: &Value, method: &str, args: &[Value]) -> CallResult {
        let Value::Object(obj) = target else {
            return Err(PacketError::Usage(format!(
                "attempt to index a {} value",
                target.type_name()
            )));
        };

        let (name, f) = self.registry.method(obj.class(), method).ok_or_else(|| {
            PacketError::Usage(format!("attempt to call a nil value (method '{}')", method))
        })?;

        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(target.clone());
        full.extend_from_slice(args);

        f(self.registry, &Args::new(name, &full))
    }
}
