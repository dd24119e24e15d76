// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample freeing walk (C3.4).
//!
//! Clears every dynamically-sized member of a [`Value`] tree (strings,
//! sequences, and their nested occurrences inside structs/unions/arrays)
//! back to its empty state, so a reused sample buffer does not retain
//! stale heap allocations between takes.
//!
//! The reference engine's `NO_OPTIMIZE` flag disables a memset-based fast
//! path that skips walking a struct believed to hold no dynamically-sized
//! members. A `Value` tree has no such fast path to disable: every
//! member's `Drop` runs when it is cleared regardless, so this walk
//! always visits every member and the flag has no behavior to carry here.

use crate::xtypes::program::{Instr, Program};
use crate::xtypes::value::Value;

/// Recursively clears dynamically-sized members of `value` in place.
pub fn free_sample(program: &Program, table_idx: usize, value: &mut Value) {
    let Value::Struct(members) = value else {
        return;
    };
    let instrs = program.table(table_idx).to_vec();
    for (member_id, member_value) in members.iter_mut() {
        if let Some(type_code) = instrs.iter().find_map(|i| match i {
            Instr::Adr { member_id: id, type_code, .. } if id == member_id => Some(type_code),
            Instr::Plm { member_id: id, type_code, .. } if id == member_id => Some(type_code),
            _ => None,
        }) {
            free_typed(program, type_code, member_value);
        }
    }
}

fn free_typed(program: &Program, type_code: &crate::xtypes::program::TypeCode, value: &mut Value) {
    use crate::xtypes::program::TypeCode;
    match (type_code, value) {
        (TypeCode::String { .. }, Value::String(s)) => s.clear(),
        (TypeCode::Sequence { element, .. }, Value::Sequence(items)) => {
            for item in items.iter_mut() {
                free_typed(program, element, item);
            }
            items.clear();
        }
        (TypeCode::Array { element, .. }, Value::Array(items)) => {
            for item in items.iter_mut() {
                free_typed(program, element, item);
            }
        }
        (TypeCode::Struct { program: idx }, v @ Value::Struct(_)) => free_sample(program, *idx, v),
        (TypeCode::Union { program: idx }, Value::Union { discriminant, member }) => {
            if let Some(case_type) = program.table(*idx).iter().find_map(|i| match i {
                Instr::Jeq4 { discriminant: case, type_code } if case == discriminant => Some(type_code),
                _ => None,
            }) {
                free_typed(program, case_type, member);
            }
        }
        (TypeCode::External { element }, v) => free_typed(program, element, v),
        _ => {}
    }
}
