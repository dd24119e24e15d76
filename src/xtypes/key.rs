// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key extraction and keyhash computation (C3.3).
//!
//! Two entry points, both producing the same 16-byte keyhash for a given
//! sample: [`from_sample`] walks a [`Value`] tree directly, and
//! [`from_serialized_data`] first decodes a CDR buffer (of either XCDR
//! version, native or foreign endian) and then runs the same extraction.
//! Key members are always re-encoded in a fixed canonical form (XCDR1,
//! big-endian) before hashing, independent of the sample's own wire
//! encoding, so the keyhash is stable across encodings of the same
//! logical key.
//!
//! Per RTPS's keyhash convention: if the canonical key encoding is 16
//! bytes or smaller it is used directly (zero-padded); otherwise the
//! keyhash is the MD5 digest of the canonical encoding.

use md5::{Digest, Md5};

use crate::config::XcdrVersion;
use crate::xtypes::error::{SerError, SerResult};
use crate::xtypes::program::{Instr, Program, TypeCode};
use crate::xtypes::stream::{CdrInputStream, CdrOutputStream};
use crate::xtypes::value::Value;

/// 16-byte RTPS keyhash.
pub type KeyHash = [u8; 16];

/// Computes the keyhash for `value` against `program`'s root table.
pub fn from_sample(program: &Program, value: &Value) -> SerResult<KeyHash> {
    let key_bytes = extract_key_cdr(program, 0, value)?;
    Ok(hash(&key_bytes))
}

/// Computes the keyhash for a CDR-encoded sample, decoding it first.
pub fn from_serialized_data(
    program: &Program,
    bytes: &[u8],
    version: XcdrVersion,
    bswap: bool,
) -> SerResult<KeyHash> {
    let mut input = CdrInputStream::new(bytes, version, bswap);
    let value = crate::xtypes::de::deserialize(program, &mut input)?;
    from_sample(program, &value)
}

fn hash(key_bytes: &[u8]) -> KeyHash {
    if key_bytes.len() <= 16 {
        let mut out = [0u8; 16];
        out[..key_bytes.len()].copy_from_slice(key_bytes);
        out
    } else {
        let mut hasher = Md5::new();
        hasher.update(key_bytes);
        hasher.finalize().into()
    }
}

/// Re-encodes the key-significant members of `value` in canonical
/// (XCDR1, big-endian) form.
fn extract_key_cdr(program: &Program, table_idx: usize, value: &Value) -> SerResult<Vec<u8>> {
    let members = gather_key_members(program, table_idx, value)?;
    let mut out = CdrOutputStream::new_be(XcdrVersion::Xcdr1);
    for (type_code, member_value) in &members {
        write_key_member(program, type_code, member_value, &mut out)?;
    }
    Ok(out.into_bytes())
}

fn write_key_member(program: &Program, type_code: &TypeCode, value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    // Key members are always structurally final (never a Plc/Dlc wrapper
    // of their own) in the canonical encoding, so reuse the struct/union
    // recursion from the write path via a synthetic single-member table
    // only for nested structs; primitives go straight to the stream.
    match type_code {
        TypeCode::Struct { program: idx } => {
            let nested = gather_key_members(program, *idx, value)?;
            for (tc, v) in &nested {
                write_key_member(program, tc, v, out)?;
            }
            Ok(())
        }
        _ => write_leaf(type_code, value, out),
    }
}

fn write_leaf(type_code: &TypeCode, value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    match (type_code, value) {
        (TypeCode::Boolean, Value::Boolean(b)) => Ok(out.put1(u8::from(*b))),
        (TypeCode::Byte, Value::Byte(b)) => Ok(out.put1(*b)),
        (TypeCode::Int16, Value::Int16(v)) => Ok(out.put2(*v as u16)),
        (TypeCode::UInt16, Value::UInt16(v)) => Ok(out.put2(*v)),
        (TypeCode::Int32, Value::Int32(v)) => Ok(out.put4(*v as u32)),
        (TypeCode::UInt32, Value::UInt32(v)) => Ok(out.put4(*v)),
        (TypeCode::Int64, Value::Int64(v)) => Ok(out.put8(*v as u64)),
        (TypeCode::UInt64, Value::UInt64(v)) => Ok(out.put8(*v)),
        (TypeCode::Float32, Value::Float32(v)) => Ok(out.put_f32(*v)),
        (TypeCode::Float64, Value::Float64(v)) => Ok(out.put_f64(*v)),
        (TypeCode::Char8, Value::Char8(c)) => Ok(out.put1(*c)),
        (TypeCode::String { .. }, Value::String(s)) => Ok(out.put_string(Some(s))),
        (TypeCode::Enum { bit_bound: 1 }, Value::Int32(v)) => Ok(out.put1(*v as u8)),
        (TypeCode::Enum { bit_bound: 2 }, Value::Int32(v)) => Ok(out.put2(*v as u16)),
        (TypeCode::Enum { bit_bound: _ }, Value::Int32(v)) => Ok(out.put4(*v as u32)),
        (TypeCode::Array { element, dims }, Value::Array(items)) => {
            let expected: u32 = dims.iter().product();
            if items.len() as u32 != expected {
                return Err(SerError::InvalidData {
                    reason: format!("key array has {} elements, expected {expected}", items.len()),
                });
            }
            for item in items {
                write_leaf(element, item, out)?;
            }
            Ok(())
        }
        (tc, v) => Err(SerError::InvalidData {
            reason: format!("unsupported key member: value {v:?} / type {tc:?}"),
        }),
    }
}

fn gather_key_members<'v>(
    program: &Program,
    table_idx: usize,
    value: &'v Value,
) -> SerResult<Vec<(TypeCode, &'v Value)>> {
    let instrs = program.table(table_idx);
    let mut key_ids: Vec<u32> = instrs
        .iter()
        .find_map(|i| match i {
            Instr::Kof { member_ids } => Some(member_ids.clone()),
            _ => None,
        })
        .unwrap_or_default();
    // Canonical key CDR orders key members by ascending member id,
    // independent of declaration order or the Kof list's own order.
    key_ids.sort_unstable();

    let mut out = Vec::with_capacity(key_ids.len());
    for id in key_ids {
        let descriptor = instrs.iter().find_map(|i| match i {
            Instr::Adr { member_id, type_code, .. } if *member_id == id => Some(type_code),
            Instr::Plm { member_id, type_code, .. } if *member_id == id => Some(type_code),
            _ => None,
        });
        let type_code = descriptor.ok_or_else(|| SerError::InvalidData {
            reason: format!("KOF references unknown member id {id}"),
        })?;
        let member_value = value.member(id).ok_or_else(|| SerError::InvalidData {
            reason: format!("key member {id} absent from sample"),
        })?;
        out.push((type_code.clone(), member_value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xtypes::program::Flags;

    fn keyed_point_program() -> Program {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Kof { member_ids: vec![0] },
            Instr::Adr {
                member_id: 0,
                flags: Flags::KEY,
                type_code: TypeCode::Int32,
            },
            Instr::Adr {
                member_id: 1,
                flags: Flags::none(),
                type_code: TypeCode::Int32,
            },
        ]);
        program
    }

    #[test]
    fn small_key_is_zero_padded_not_hashed() {
        let program = keyed_point_program();
        let value = Value::Struct(vec![(0, Value::Int32(7)), (1, Value::Int32(99))]);
        let hash = from_sample(&program, &value).unwrap();
        assert_eq!(&hash[0..4], &7i32.to_be_bytes());
        assert_eq!(&hash[4..16], &[0u8; 12]);
    }

    #[test]
    fn non_key_members_do_not_affect_the_hash() {
        let program = keyed_point_program();
        let a = Value::Struct(vec![(0, Value::Int32(7)), (1, Value::Int32(1))]);
        let b = Value::Struct(vec![(0, Value::Int32(7)), (1, Value::Int32(2))]);
        assert_eq!(from_sample(&program, &a).unwrap(), from_sample(&program, &b).unwrap());
    }

    #[test]
    fn long_key_is_md5_hashed() {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Kof { member_ids: vec![0] },
            Instr::Adr {
                member_id: 0,
                flags: Flags::KEY,
                type_code: TypeCode::String { bound: None },
            },
        ]);
        let value = Value::Struct(vec![(0, Value::String("this key is long enough to need md5".to_string()))]);
        let hash = from_sample(&program, &value).unwrap();

        let key_bytes = extract_key_cdr(&program, 0, &value).unwrap();
        let mut hasher = Md5::new();
        hasher.update(&key_bytes);
        let expected: KeyHash = hasher.finalize().into();
        assert_eq!(hash, expected);
    }

    #[test]
    fn keyhash_is_stable_across_encodings_of_the_same_sample() {
        let program = keyed_point_program();
        let value = Value::Struct(vec![(0, Value::Int32(123)), (1, Value::Int32(0))]);

        let mut le_out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        crate::xtypes::ser::serialize(&program, &value, &mut le_out).unwrap();
        let le_bytes = le_out.into_bytes();

        let mut be_out = CdrOutputStream::new_be(XcdrVersion::Xcdr1);
        crate::xtypes::ser::serialize(&program, &value, &mut be_out).unwrap();
        let be_bytes = be_out.into_bytes();

        let from_le = from_serialized_data(&program, &le_bytes, XcdrVersion::Xcdr2, false).unwrap();
        let from_be = from_serialized_data(&program, &be_bytes, XcdrVersion::Xcdr1, false).unwrap();
        assert_eq!(from_le, from_be);
        assert_eq!(from_le, from_sample(&program, &value).unwrap());
    }

    #[test]
    fn key_cdr_orders_members_by_ascending_id_regardless_of_kof_order() {
        // Kof lists y (id=5) before x (id=1), but the canonical key CDR
        // must still place x before y.
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Kof { member_ids: vec![5, 1] },
            Instr::Adr {
                member_id: 5,
                flags: Flags::KEY,
                type_code: TypeCode::Int16,
            },
            Instr::Adr {
                member_id: 1,
                flags: Flags::KEY,
                type_code: TypeCode::Int16,
            },
        ]);
        let value = Value::Struct(vec![(1, Value::Int16(2)), (5, Value::Int16(1))]);
        let key_bytes = extract_key_cdr(&program, 0, &value).unwrap();
        assert_eq!(key_bytes, vec![0x00, 0x02, 0x00, 0x01]);
    }
}
