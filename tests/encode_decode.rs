//! Black-box coverage of the instruction encoding across both widths,
//! complementing the in-module round-trip tests in `src/instruction/mod.rs`.

use vsimd::config::Width;
use vsimd::instruction::{decode, encode_mem, encode_param, Decoded, MemParams, OpCode, Params};

#[test]
fn every_opcode_round_trips_at_both_widths() {
    for width in [Width::Bits24, Width::Bits32] {
        for op in OpCode::ALL {
            if op.is_memory_form() {
                let bytes = encode_mem(width, op, 3, 10).unwrap();
                assert_eq!(bytes.len(), width.instruction_stride());
                let decoded = decode(width, &bytes).unwrap();
                assert_eq!(decoded, Decoded::Mem { op, mem: MemParams { reg: 3, addr: 10 } });
            } else if op != OpCode::Cmpx {
                let limit = width.param_limit() - 1;
                let params = Params { p0: limit.min(5) as u8, p1: limit.min(2) as u8, p2: 0 };
                let bytes = encode_param(width, op, params).unwrap();
                assert_eq!(bytes.len(), width.instruction_stride());
                let decoded = decode(width, &bytes).unwrap();
                assert_eq!(decoded, Decoded::Param { op, params });
            }
        }
    }
}

#[test]
fn cmpx_32bit_register_operands_are_nibble_limited() {
    // Registers 0-15 pack into the nibble-split byte; 16 does not fit.
    let ok = encode_param(Width::Bits32, OpCode::Cmpx, Params { p0: 15, p1: 0, p2: 100 });
    assert!(ok.is_ok());
    let too_wide = encode_param(Width::Bits32, OpCode::Cmpx, Params { p0: 16, p1: 0, p2: 100 });
    assert!(too_wide.is_err());
}

#[test]
fn unknown_opcode_byte_is_rejected() {
    let garbage = [0xFFu8, 0, 0];
    assert!(decode(Width::Bits24, &garbage).is_err());
}

#[test]
fn memory_form_address_limits_differ_by_width() {
    assert!(encode_mem(Width::Bits24, OpCode::Ldx, 0, 4095).is_ok());
    assert!(encode_mem(Width::Bits24, OpCode::Ldx, 0, 4096).is_err());
    assert!(encode_mem(Width::Bits32, OpCode::Ldx, 0, 65535).is_ok());
}
