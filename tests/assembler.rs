//! Library-API-level assembler coverage: a full program assembled, saved,
//! reloaded from disk, and decoded back to the same instruction stream.

use vsimd::assembler::assemble;
use vsimd::config::{MachineConfig, Width};
use vsimd::instruction::OpCode;
use vsimd::program::Program;

fn config() -> MachineConfig {
    MachineConfig { n_index_registers: 8, n_pe: 4, pe_memory_cells: 16, width: Width::Bits24 }
}

#[test]
fn assembled_program_round_trips_through_a_saved_binary() {
    let source = "\
        total DATA 0\n\
        LDXI 0,5\n\
        STX 0,0\n\
        LDX 1,0\n\
        CLOAD total\n\
        CBCAST";
    let program = assemble(source, Width::Bits24, &config()).unwrap();

    let dir = std::env::temp_dir();
    let path = dir.join(format!("vsimd-assembler-test-{}.bin", std::process::id()));
    program.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let reloaded = Program::from_bytes(Width::Bits24, bytes).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.size(), program.size());
    for i in 0..program.size() {
        assert_eq!(reloaded.decode_at(i).unwrap(), program.decode_at(i).unwrap());
    }
}

#[test]
fn data_pseudo_op_alias_resolves_to_the_same_address_as_the_store() {
    let source = "slot DATA 9\nCLOAD slot\nCSTORE slot";
    let program = assemble(source, Width::Bits24, &config()).unwrap();
    // DATA -> LDXI + STX(addr 0), then CLOAD(addr 0), CSTORE(addr 0).
    assert_eq!(program.decode_at(1).unwrap().op(), OpCode::Stx);
    assert_eq!(program.decode_at(2).unwrap().op(), OpCode::Cload);
    assert_eq!(program.decode_at(3).unwrap().op(), OpCode::Cstore);
}

#[test]
fn out_of_range_immediate_is_rejected_before_assembly_completes() {
    // 24-bit params are 6 bits wide; 64 overflows that field.
    let err = assemble("LDXI 0,64", Width::Bits24, &config()).unwrap_err();
    assert!(matches!(err, vsimd::error::AssembleError::OutOfRange { .. }));
}
