// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read path of the byte-code interpreter (C3).
//!
//! `deserialize` is the mirror of [`crate::xtypes::ser::serialize`]:
//! it walks a [`Program`] against a [`CdrInputStream`] and builds a
//! [`Value`] tree. `normalize` runs the same walk but discards the
//! result, used to validate a buffer (including byte-swapped input via
//! the stream's `bswap` flag) before it is handed to application code.
//!
//! An unknown member inside a `Plc` (mutable) container is skipped using
//! its NEXTINT length, unless its EMHEADER carries the must-understand
//! bit, in which case the whole sample is rejected rather than silently
//! dropping data the writer required a reader to understand.

use crate::xtypes::error::{SerError, SerResult};
use crate::xtypes::program::{unpack_emheader, Flags, Instr, Program, TypeCode, ROOT};
use crate::xtypes::stream::CdrInputStream;
use crate::xtypes::value::Value;

/// Deserializes a [`Value`] tree for `program`'s root table from `input`.
pub fn deserialize(program: &Program, input: &mut CdrInputStream<'_>) -> SerResult<Value> {
    read_table(program, ROOT, input)
}

/// Validates that `input` can be fully parsed against `program` without
/// building the resulting value, surfacing malformed input as an error
/// rather than a panic.
pub fn normalize(program: &Program, input: &mut CdrInputStream<'_>) -> SerResult<()> {
    deserialize(program, input).map(|_| ())
}

pub(crate) fn read_table(program: &Program, table_idx: usize, input: &mut CdrInputStream<'_>) -> SerResult<Value> {
    let instrs = program.table(table_idx);
    let has_plc = instrs.iter().any(|i| matches!(i, Instr::Plc));
    let has_dlc = instrs.iter().any(|i| matches!(i, Instr::Dlc));

    if has_plc {
        let len = input.get4()? as usize;
        let end = input.index() + len;
        let members = read_mutable_members(program, instrs, input, end)?;
        input.skip_to(end)?;
        Ok(Value::Struct(members))
    } else if has_dlc {
        let len = input.get4()? as usize;
        let end = input.index() + len;
        let members = read_final_members(program, instrs, input)?;
        input.skip_to(end)?;
        Ok(Value::Struct(members))
    } else {
        Ok(Value::Struct(read_final_members(program, instrs, input)?))
    }
}

fn read_final_members(program: &Program, instrs: &[Instr], input: &mut CdrInputStream<'_>) -> SerResult<Vec<(u32, Value)>> {
    let mut members = Vec::new();
    for instr in instrs {
        if let Instr::Adr {
            member_id,
            flags,
            type_code,
        } = instr
        {
            if flags.contains(Flags::OPTIONAL) {
                let present = input.get1()? != 0;
                if present {
                    members.push((*member_id, read_typed(program, type_code, input)?));
                } else {
                    members.push((*member_id, Value::Absent));
                }
            } else {
                members.push((*member_id, read_typed(program, type_code, input)?));
            }
        }
    }
    Ok(members)
}

fn read_mutable_members(
    program: &Program,
    instrs: &[Instr],
    input: &mut CdrInputStream<'_>,
    container_end: usize,
) -> SerResult<Vec<(u32, Value)>> {
    let mut members = Vec::new();
    while input.index() < container_end {
        let em = input.get4()?;
        let (member_id, must_understand) = unpack_emheader(em);
        let len = input.get4()? as usize;
        let member_start = input.index();
        let member_end = member_start + len;

        match instrs.iter().find_map(|i| match i {
            Instr::Plm {
                member_id: id,
                type_code,
                ..
            } if *id == member_id => Some(type_code),
            _ => None,
        }) {
            Some(type_code) => {
                let value = read_typed(program, type_code, input)?;
                input.skip_to(member_end)?;
                members.push((member_id, value));
            }
            None if must_understand => {
                return Err(SerError::InvalidData {
                    reason: format!("unknown member {member_id} has must-understand set"),
                });
            }
            None => {
                input.skip_to(member_end)?;
            }
        }
    }

    for instr in instrs {
        if let Instr::Plm { member_id, flags, .. } = instr {
            let present = members.iter().any(|(id, _)| id == member_id);
            if !present {
                if flags.contains(Flags::OPTIONAL) {
                    members.push((*member_id, Value::Absent));
                } else {
                    return Err(SerError::InvalidData {
                        reason: format!("required member {member_id} missing from parameter list"),
                    });
                }
            }
        }
    }
    Ok(members)
}

fn read_typed(program: &Program, type_code: &TypeCode, input: &mut CdrInputStream<'_>) -> SerResult<Value> {
    match type_code {
        TypeCode::Boolean => Ok(Value::Boolean(input.get1()? != 0)),
        TypeCode::Byte => Ok(Value::Byte(input.get1()?)),
        TypeCode::Int16 => Ok(Value::Int16(input.get2()? as i16)),
        TypeCode::UInt16 => Ok(Value::UInt16(input.get2()?)),
        TypeCode::Int32 => Ok(Value::Int32(input.get4()? as i32)),
        TypeCode::UInt32 => Ok(Value::UInt32(input.get4()?)),
        TypeCode::Int64 => Ok(Value::Int64(input.get8()? as i64)),
        TypeCode::UInt64 => Ok(Value::UInt64(input.get8()?)),
        TypeCode::Float32 => Ok(Value::Float32(input.get_f32()?)),
        TypeCode::Float64 => Ok(Value::Float64(input.get_f64()?)),
        TypeCode::Char8 => Ok(Value::Char8(input.get1()?)),
        TypeCode::String { bound } => {
            let s = input.get_string()?;
            if let Some(bound) = bound {
                if s.len() as u32 > *bound {
                    return Err(SerError::InvalidData {
                        reason: format!("string of length {} exceeds bound {bound}", s.len()),
                    });
                }
            }
            Ok(Value::String(s))
        }
        TypeCode::Enum { bit_bound } => Ok(Value::Int32(read_sized_int(*bit_bound, input)? as i32)),
        TypeCode::Bitmask { bit_bound } => Ok(Value::UInt64(u64::from(read_sized_int(*bit_bound, input)?))),
        TypeCode::Array { element, dims } => {
            let count: u32 = dims.iter().product();
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_typed(program, element, input)?);
            }
            Ok(Value::Array(items))
        }
        TypeCode::Sequence { element, bound } => {
            let len = input.get4()?;
            if let Some(bound) = bound {
                if len > *bound {
                    return Err(SerError::InvalidData {
                        reason: format!("sequence of length {len} exceeds bound {bound}"),
                    });
                }
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(read_typed(program, element, input)?);
            }
            Ok(Value::Sequence(items))
        }
        TypeCode::Struct { program: idx } => read_table(program, *idx, input),
        TypeCode::Union { program: idx } => {
            let discriminant = input.get4()? as i32;
            let member = read_union_case(program, *idx, discriminant, input)?;
            Ok(Value::Union {
                discriminant,
                member: Box::new(member),
            })
        }
        TypeCode::External { element } => read_typed(program, element, input),
    }
}

fn read_union_case(program: &Program, table_idx: usize, discriminant: i32, input: &mut CdrInputStream<'_>) -> SerResult<Value> {
    let instrs = program.table(table_idx);
    for instr in instrs {
        if let Instr::Jeq4 {
            discriminant: case,
            type_code,
        } = instr
        {
            if *case == discriminant {
                return read_typed(program, type_code, input);
            }
        }
    }
    Err(SerError::InvalidData {
        reason: format!("no union case matches discriminant {discriminant}"),
    })
}

fn read_sized_int(bit_bound: u8, input: &mut CdrInputStream<'_>) -> SerResult<u32> {
    match bit_bound {
        1 => Ok(u32::from(input.get1()?)),
        2 => Ok(u32::from(input.get2()?)),
        4 => input.get4(),
        other => Err(SerError::EncoderFailed {
            reason: format!("unsupported enum/bitmask width {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::XcdrVersion;
    use crate::xtypes::program::{Flags, Instr, Program};
    use crate::xtypes::ser::serialize;
    use crate::xtypes::stream::CdrOutputStream;

    fn flat_point_program() -> Program {
        let mut program = Program::new();
        program.push_table(vec![
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
    fn flat_struct_roundtrips() {
        let program = flat_point_program();
        let value = Value::Struct(vec![(0, Value::Int32(11)), (1, Value::Int32(-4))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        let bytes = out.into_bytes();

        let mut input = CdrInputStream::new(&bytes, XcdrVersion::Xcdr2, false);
        let decoded = deserialize(&program, &mut input).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn mutable_struct_skips_unknown_trailing_member() {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Plc,
            Instr::Plm {
                member_id: 0,
                flags: Flags::KEY,
                type_code: TypeCode::Int32,
            },
        ]);
        let value = Value::Struct(vec![(0, Value::Int32(5))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        let mut bytes = out.into_bytes();

        // Append an unknown member (id=99, a single i32) inside the DHEADER.
        let mut extra = Vec::new();
        extra.extend_from_slice(&(0x5000_0000u32 | 99).to_le_bytes());
        extra.extend_from_slice(&4u32.to_le_bytes());
        extra.extend_from_slice(&7i32.to_le_bytes());
        let old_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        bytes[0..4].copy_from_slice(&(old_len + extra.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&extra);

        let mut input = CdrInputStream::new(&bytes, XcdrVersion::Xcdr2, false);
        let decoded = deserialize(&program, &mut input).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn unknown_member_with_must_understand_set_is_rejected() {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Plc,
            Instr::Plm {
                member_id: 0,
                flags: Flags::KEY,
                type_code: TypeCode::Int32,
            },
        ]);
        let value = Value::Struct(vec![(0, Value::Int32(5))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        let mut bytes = out.into_bytes();

        // Append an unknown member (id=99) with must-understand set.
        let mut extra = Vec::new();
        extra.extend_from_slice(&(0x5000_0000u32 | (1 << 31) | 99).to_le_bytes());
        extra.extend_from_slice(&4u32.to_le_bytes());
        extra.extend_from_slice(&7i32.to_le_bytes());
        let old_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        bytes[0..4].copy_from_slice(&(old_len + extra.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&extra);

        let mut input = CdrInputStream::new(&bytes, XcdrVersion::Xcdr2, false);
        assert!(deserialize(&program, &mut input).is_err());
    }

    #[test]
    fn normalize_rejects_truncated_input() {
        let program = flat_point_program();
        let bytes = vec![0u8; 4]; // only one of two required i32 members present
        let mut input = CdrInputStream::new(&bytes, XcdrVersion::Xcdr2, false);
        assert!(normalize(&program, &mut input).is_err());
    }

    #[test]
    fn union_roundtrips_through_the_active_case() {
        let mut program = Program::new();
        let case_table = program.push_table(vec![
            Instr::Jeq4 {
                discriminant: 0,
                type_code: TypeCode::Int32,
            },
            Instr::Jeq4 {
                discriminant: 1,
                type_code: TypeCode::Float64,
            },
        ]);
        program.push_table(vec![Instr::Adr {
            member_id: 0,
            flags: Flags::none(),
            type_code: TypeCode::Union { program: case_table },
        }]);

        let value = Value::Struct(vec![(
            0,
            Value::Union {
                discriminant: 0,
                member: Box::new(Value::Int32(42)),
            },
        )]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        crate::xtypes::ser::write_table(&program, 1, &value, &mut out).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInputStream::new(&bytes, XcdrVersion::Xcdr2, false);
        let decoded = read_table(&program, 1, &mut input).unwrap();
        assert_eq!(decoded, value);
    }
}
