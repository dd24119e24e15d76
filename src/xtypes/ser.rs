// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write path of the byte-code interpreter (C3).
//!
//! `serialize` walks a [`Program`] against a [`Value`] tree and emits CDR
//! bytes to a [`CdrOutputStream`]. `Dlc` wraps its container in a DHEADER
//! (a 4-byte length prefix, back-patched via [`CdrOutputStream::reserve4`]);
//! `Plc` frames every member with a 4-byte EMHEADER word (length code,
//! must-understand flag and member id bit-packed together per XTypes
//! v1.3 Sec.7.4.3.4.3) followed by a 4-byte NEXTINT length, so an unknown
//! or `@optional`-absent member can be skipped by a reader without
//! understanding its type, and is itself always wrapped in an outer
//! DHEADER so the whole container can be skipped too.

use crate::xtypes::error::{SerError, SerResult};
use crate::xtypes::program::{pack_emheader, Flags, Instr, Program, TypeCode, ROOT};
use crate::xtypes::stream::CdrOutputStream;
use crate::xtypes::value::Value;

/// Serializes `value` against `program`'s root table into `out`.
pub fn serialize(program: &Program, value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    write_table(program, ROOT, value, out)
}

pub(crate) fn write_table(program: &Program, table_idx: usize, value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    let instrs = program.table(table_idx);
    let has_plc = instrs.iter().any(|i| matches!(i, Instr::Plc));
    let has_dlc = instrs.iter().any(|i| matches!(i, Instr::Dlc));

    if has_plc {
        let hole = out.reserve4();
        write_mutable_members(program, instrs, value, out)?;
        let len = (out.index() - hole - 4) as u32;
        out.patch4(hole, len);
        Ok(())
    } else if has_dlc {
        let hole = out.reserve4();
        write_final_members(program, instrs, value, out)?;
        let len = (out.index() - hole - 4) as u32;
        out.patch4(hole, len);
        Ok(())
    } else {
        write_final_members(program, instrs, value, out)
    }
}

fn write_final_members(program: &Program, instrs: &[Instr], value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    for instr in instrs {
        if let Instr::Adr {
            member_id,
            flags,
            type_code,
        } = instr
        {
            write_member(program, *member_id, *flags, type_code, value, out)?;
        }
    }
    Ok(())
}

fn write_member(
    program: &Program,
    member_id: u32,
    flags: Flags,
    type_code: &TypeCode,
    value: &Value,
    out: &mut CdrOutputStream,
) -> SerResult<()> {
    let member = value.member(member_id);
    if flags.contains(Flags::OPTIONAL) {
        match member {
            None | Some(Value::Absent) => {
                out.put1(0);
                Ok(())
            }
            Some(v) => {
                out.put1(1);
                write_typed(program, type_code, v, out)
            }
        }
    } else {
        match member {
            Some(v) if !v.is_absent() => write_typed(program, type_code, v, out),
            _ => Err(SerError::InvalidData {
                reason: format!("member {member_id} is required but absent"),
            }),
        }
    }
}

fn write_mutable_members(program: &Program, instrs: &[Instr], value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    for instr in instrs {
        if let Instr::Plm {
            member_id,
            flags,
            type_code,
        } = instr
        {
            let member = value.member(*member_id);
            match member {
                None | Some(Value::Absent) if flags.contains(Flags::OPTIONAL) => continue,
                None | Some(Value::Absent) => {
                    return Err(SerError::InvalidData {
                        reason: format!("member {member_id} is required but absent"),
                    })
                }
                Some(v) => {
                    out.put4(pack_emheader(*member_id, flags.contains(Flags::MUST_UNDERSTAND)));
                    let hole = out.reserve4();
                    write_typed(program, type_code, v, out)?;
                    let len = (out.index() - hole - 4) as u32;
                    out.patch4(hole, len);
                }
            }
        }
    }
    Ok(())
}

fn write_typed(program: &Program, type_code: &TypeCode, value: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    match (type_code, value) {
        (TypeCode::Boolean, Value::Boolean(b)) => {
            out.put1(u8::from(*b));
            Ok(())
        }
        (TypeCode::Byte, Value::Byte(b)) => {
            out.put1(*b);
            Ok(())
        }
        (TypeCode::Int16, Value::Int16(v)) => {
            out.put2(*v as u16);
            Ok(())
        }
        (TypeCode::UInt16, Value::UInt16(v)) => {
            out.put2(*v);
            Ok(())
        }
        (TypeCode::Int32, Value::Int32(v)) => {
            out.put4(*v as u32);
            Ok(())
        }
        (TypeCode::UInt32, Value::UInt32(v)) => {
            out.put4(*v);
            Ok(())
        }
        (TypeCode::Int64, Value::Int64(v)) => {
            out.put8(*v as u64);
            Ok(())
        }
        (TypeCode::UInt64, Value::UInt64(v)) => {
            out.put8(*v);
            Ok(())
        }
        (TypeCode::Float32, Value::Float32(v)) => {
            out.put_f32(*v);
            Ok(())
        }
        (TypeCode::Float64, Value::Float64(v)) => {
            out.put_f64(*v);
            Ok(())
        }
        (TypeCode::Char8, Value::Char8(c)) => {
            out.put1(*c);
            Ok(())
        }
        (TypeCode::String { bound }, Value::String(s)) => {
            if let Some(bound) = bound {
                if s.len() as u32 > *bound {
                    return Err(SerError::InvalidData {
                        reason: format!("string of length {} exceeds bound {bound}", s.len()),
                    });
                }
            }
            out.put_string(Some(s));
            Ok(())
        }
        (TypeCode::Enum { bit_bound }, Value::Int32(v)) => write_sized_int(*bit_bound, *v as u32, out),
        (TypeCode::Bitmask { bit_bound }, Value::UInt64(v)) => write_sized_int(*bit_bound, *v as u32, out),
        (TypeCode::Array { element, dims }, Value::Array(items)) => {
            let expected: u32 = dims.iter().product();
            if items.len() as u32 != expected {
                return Err(SerError::InvalidData {
                    reason: format!("array has {} elements, expected {expected}", items.len()),
                });
            }
            for item in items {
                write_typed(program, element, item, out)?;
            }
            Ok(())
        }
        (TypeCode::Sequence { element, bound }, Value::Sequence(items)) => {
            if let Some(bound) = bound {
                if items.len() as u32 > *bound {
                    return Err(SerError::InvalidData {
                        reason: format!("sequence of length {} exceeds bound {bound}", items.len()),
                    });
                }
            }
            out.put4(items.len() as u32);
            for item in items {
                write_typed(program, element, item, out)?;
            }
            Ok(())
        }
        (TypeCode::Struct { program: idx }, Value::Struct(_)) => write_table(program, *idx, value, out),
        (TypeCode::Union { program: idx }, Value::Union { discriminant, member }) => {
            out.put4(*discriminant as u32);
            write_union_case(program, *idx, *discriminant, member, out)
        }
        (TypeCode::External { element }, v) => write_typed(program, element, v, out),
        (tc, v) => Err(SerError::InvalidData {
            reason: format!("value {v:?} does not match type code {tc:?}"),
        }),
    }
}

fn write_union_case(program: &Program, table_idx: usize, discriminant: i32, member: &Value, out: &mut CdrOutputStream) -> SerResult<()> {
    let instrs = program.table(table_idx);
    for instr in instrs {
        if let Instr::Jeq4 {
            discriminant: case,
            type_code,
        } = instr
        {
            if *case == discriminant {
                return write_typed(program, type_code, member, out);
            }
        }
    }
    Err(SerError::InvalidData {
        reason: format!("no union case matches discriminant {discriminant}"),
    })
}

fn write_sized_int(bit_bound: u8, value: u32, out: &mut CdrOutputStream) -> SerResult<()> {
    match bit_bound {
        1 => {
            out.put1(value as u8);
            Ok(())
        }
        2 => {
            out.put2(value as u16);
            Ok(())
        }
        4 => {
            out.put4(value);
            Ok(())
        }
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
    fn flat_struct_serializes_without_framing() {
        let program = flat_point_program();
        let value = Value::Struct(vec![(0, Value::Int32(1)), (1, Value::Int32(2))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        assert_eq!(out.into_bytes(), vec![1, 0, 0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn mutable_struct_frames_each_member_and_the_container() {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Plc,
            Instr::Plm {
                member_id: 0,
                flags: Flags::KEY,
                type_code: TypeCode::Int32,
            },
            Instr::Plm {
                member_id: 1,
                flags: Flags::OPTIONAL,
                type_code: TypeCode::Int32,
            },
        ]);
        let value = Value::Struct(vec![(0, Value::Int32(9))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        let bytes = out.into_bytes();

        // DHEADER covers just the one present, mandatory member.
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 12);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 0x5000_0000); // EMHEADER: Lc=NextInt, member id 0
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 4); // NEXTINT length
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 9);
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn must_understand_plm_sets_the_emheader_flag_bit() {
        let mut program = Program::new();
        program.push_table(vec![
            Instr::Plc,
            Instr::Plm {
                member_id: 3,
                flags: Flags::MUST_UNDERSTAND,
                type_code: TypeCode::Int32,
            },
        ]);
        let value = Value::Struct(vec![(3, Value::Int32(1))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        serialize(&program, &value, &mut out).unwrap();
        let bytes = out.into_bytes();
        let em = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(em, 0x5000_0000 | (1 << 31) | 3);
    }

    #[test]
    fn required_member_missing_is_an_error() {
        let program = flat_point_program();
        let value = Value::Struct(vec![(0, Value::Int32(1))]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        assert!(serialize(&program, &value, &mut out).is_err());
    }

    #[test]
    fn union_case_dispatches_on_discriminant() {
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
                discriminant: 1,
                member: Box::new(Value::Float64(2.5)),
            },
        )]);
        let mut out = CdrOutputStream::new_le(XcdrVersion::Xcdr2);
        write_table(&program, 1, &value, &mut out).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1);
        assert_eq!(f64::from_le_bytes(bytes[4..12].try_into().unwrap()), 2.5);
    }
}
