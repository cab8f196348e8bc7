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
use std::cell::{RefCell, RefMut};
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::error::{PacketError, Result};
use crate::linux::packet::PacketSocket;

/// A script-visible packet socket object.
///
/// Clones share the same socket; the socket is finalized (closed) when the last clone is
/// dropped, or earlier through its `close` method.
#[derive(Clone)]
pub struct Object(Rc<Userdata>);

struct Userdata {
    class: &'static str,
    socket: RefCell<PacketSocket>,
}

impl Object {
    /// Wraps `socket`, tagging it with the class that matches its kind.
    pub fn from_socket(socket: PacketSocket) -> Self {
        Object(Rc::new(Userdata {
            class: socket.kind().class_name(),
            socket: RefCell::new(socket),
        }))
    }

    /// The class tag assigned at construction.
    #[inline]
    pub fn class(&self) -> &'static str {
        self.0.class
    }

    /// Borrows the underlying socket for the duration of a method call.
    pub fn borrow_mut(&self) -> Result<RefMut<'_, PacketSocket>> {
        self.0
            .socket
            .try_borrow_mut()
            .map_err(|_| PacketError::Usage(format!("{} object is already in use", self.0.class)))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn address(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:p}", self.0.class, self.address())
    }
}

impl PartialEq for Object {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A value crossing the boundary between the host script and native code.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Vec<u8>),
    Object(Object),
}

impl Value {
    /// The name of the value's type as reported in argument errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) => obj.class(),
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The value as text, if it is a string.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(String::from_utf8_lossy(s)),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(value: usize) -> Self {
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::String(value.into_bytes())
    }
}

impl From<Object> for Value {
    #[inline]
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

/// The arguments of a single native call, with checks that raise usage errors naming the
/// offending (1-based) argument position.
pub struct Args<'a> {
    name: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    #[inline]
    pub fn new(name: &'static str, values: &'a [Value]) -> Self {
        Self { name, values }
    }

    /// The name of the function or method being called.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The argument at `pos`; absent arguments read as `None`, like nil.
    #[inline]
    pub fn get(&self, pos: usize) -> Option<&'a Value> {
        pos.checked_sub(1).and_then(|idx| self.values.get(idx))
    }

    /// A usage error blaming the argument at `pos`.
    pub fn error(&self, pos: usize, msg: &str) -> PacketError {
        PacketError::Usage(format!("bad argument #{} to '{}' ({})", pos, self.name, msg))
    }

    fn type_error(&self, pos: usize, expected: &str) -> PacketError {
        let got = self.get(pos).map_or("nil", Value::type_name);
        self.error(pos, &format!("{} expected, got {}", expected, got))
    }

    /// An integer, or a number with an exact integer representation.
    pub fn check_integer(&self, pos: usize) -> Result<i64> {
        match self.get(pos) {
            Some(&Value::Integer(i)) => Ok(i),
            Some(&Value::Number(n))
                if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 =>
            {
                Ok(n as i64)
            }
            Some(Value::Number(_)) => Err(self.error(pos, "number has no integer representation")),
            _ => Err(self.type_error(pos, "number")),
        }
    }

    pub fn opt_number(&self, pos: usize) -> Result<Option<f64>> {
        match self.get(pos) {
            None | Some(Value::Nil) => Ok(None),
            Some(&Value::Integer(i)) => Ok(Some(i as f64)),
            Some(&Value::Number(n)) => Ok(Some(n)),
            _ => Err(self.type_error(pos, "number")),
        }
    }

    /// A string; numbers are converted to their decimal form.
    pub fn check_bytes(&self, pos: usize) -> Result<Cow<'a, [u8]>> {
        match self.get(pos) {
            Some(Value::String(s)) => Ok(Cow::Borrowed(s.as_slice())),
            Some(Value::Integer(i)) => Ok(Cow::Owned(i.to_string().into_bytes())),
            Some(Value::Number(n)) => Ok(Cow::Owned(n.to_string().into_bytes())),
            _ => Err(self.type_error(pos, "string")),
        }
    }

    pub fn opt_str(&self, pos: usize, default: &'a str) -> Result<Cow<'a, str>> {
        match self.get(pos) {
            None | Some(Value::Nil) => Ok(Cow::Borrowed(default)),
            Some(Value::String(s)) => Ok(String::from_utf8_lossy(s)),
            _ => Err(self.type_error(pos, "string")),
        }
    }
}
