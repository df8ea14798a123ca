//! Pipelined executor (C7) coverage at the library-API level, including the
//! file-backed `ProgramReader` path the in-module tests don't exercise (they
//! all run against `MemoryProgramReader`).

use vsimd::assembler::assemble;
use vsimd::config::{MachineConfig, Width};
use vsimd::executor::pipelined::PipelinedExecutor;
use vsimd::program_reader::{FileProgramReader, ProgramReader};

fn config() -> MachineConfig {
    MachineConfig { n_index_registers: 8, n_pe: 4, pe_memory_cells: 16, width: Width::Bits24 }
}

#[test]
fn runs_correctly_against_a_file_backed_program() {
    let config = config();
    let source = "LDXI 0,0\nLDXI 1,3\nloop: INCX 0,1\nCMPX 0,1,loop";
    let program = assemble(source, Width::Bits24, &config).unwrap();

    let dir = std::env::temp_dir();
    let path = dir.join(format!("vsimd-pipelined-test-{}.bin", std::process::id()));
    program.save(&path).unwrap();

    let reader: Box<dyn ProgramReader> = Box::new(FileProgramReader::open(&path, Width::Bits24).unwrap());
    std::fs::remove_file(&path).unwrap();

    let executor = PipelinedExecutor::new(&config, reader);
    let state = executor.run(|_| {}).unwrap();
    assert_eq!(state.index_registers[0], 3);
}

#[test]
fn repeated_backward_branches_terminate_with_the_same_result_every_time() {
    let config = config();
    let source = "LDXI 0,0\nLDXI 1,5\nloop: INCX 0,1\nCMPX 0,1,loop";
    for _ in 0..5 {
        let program = assemble(source, Width::Bits24, &config).unwrap();
        let reader: Box<dyn ProgramReader> = Box::new(vsimd::program_reader::MemoryProgramReader::new(program));
        let executor = PipelinedExecutor::new(&config, reader);
        let state = executor.run(|_| {}).unwrap();
        assert_eq!(state.index_registers[0], 5);
    }
}
