// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Object classes, class groups and method tables.
//!
//! Each class has a name (e.g. `packet{link}`) and a method table. Classes can join any
//! number of named groups (e.g. `packet{any}`, `select{able}`); a method that works on every
//! member of a group checks group membership rather than one particular class.

use std::collections::{HashMap, HashSet};

use super::value::{Args, Object, Value};
use super::CallResult;
use crate::error::Result;

/// A native function or method callable from a script.
///
/// Methods receive their object as argument 1.
pub type NativeFn = fn(&ClassRegistry, &Args<'_>) -> CallResult;

struct Class {
    groups: HashSet<&'static str>,
    methods: HashMap<&'static str, NativeFn>,
}

#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<&'static str, Class>,
}

impl ClassRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class with the given method table, replacing any class of the same name.
    pub fn new_class(&mut self, name: &'static str, methods: &[(&'static str, NativeFn)]) {
        self.classes.insert(
            name,
            Class {
                groups: HashSet::new(),
                methods: methods.iter().copied().collect(),
            },
        );
    }

    /// Adds a registered class to a group. Unknown classes are ignored.
    pub fn add_to_group(&mut self, class: &str, group: &'static str) {
        match self.classes.get_mut(class) {
            Some(c) => {
                c.groups.insert(group);
            }
            None => log::warn!("cannot add unknown class {} to group {}", class, group),
        }
    }

    #[inline]
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn is_in_group(&self, class: &str, group: &str) -> bool {
        self.classes
            .get(class)
            .map_or(false, |c| c.groups.contains(group))
    }

    /// Looks up a method by name in a class's table.
    pub fn method(&self, class: &str, name: &str) -> Option<(&'static str, NativeFn)> {
        self.classes
            .get(class)?
            .methods
            .get_key_value(name)
            .map(|(name, f)| (*name, *f))
    }

    /// Requires the argument at `pos` to be an object of exactly `class`.
    pub fn check_class<'a>(&self, args: &Args<'a>, pos: usize, class: &str) -> Result<&'a Object> {
        match args.get(pos) {
            Some(Value::Object(obj)) if obj.class() == class => Ok(obj),
            other => Err(self.mismatch(args, pos, class, other)),
        }
    }

    /// Requires the argument at `pos` to be an object whose class belongs to `group`.
    pub fn check_group<'a>(&self, args: &Args<'a>, pos: usize, group: &str) -> Result<&'a Object> {
        match args.get(pos) {
            Some(Value::Object(obj)) if self.is_in_group(obj.class(), group) => Ok(obj),
            other => Err(self.mismatch(args, pos, group, other)),
        }
    }

    fn mismatch(
        &self,
        args: &Args<'_>,
        pos: usize,
        expected: &str,
        got: Option<&Value>,
    ) -> crate::error::PacketError {
        let got = got.map_or("nil", Value::type_name);
        args.error(pos, &format!("{} expected, got {}", expected, got))
    }
}
