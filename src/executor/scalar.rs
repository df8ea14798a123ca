//! Non-pipelined scalar executor (C6): fetch, decode, dispatch, advance.

use super::{dispatch, Effect};
use crate::config::MachineConfig;
use crate::error::ExecuteError;
use crate::pe::{shutdown_all, spawn_pes, Ack, PeHandle};
use crate::program::Program;
use crate::state::MachineState;
use crossbeam_channel::Receiver;

pub struct ScalarExecutor {
    pub state: MachineState,
    handles: Vec<PeHandle>,
    ack_rx: Receiver<Ack>,
}

impl ScalarExecutor {
    pub fn new(config: &MachineConfig) -> Self {
        let (handles, ack_rx) = spawn_pes(config.n_pe, config.pe_memory_cells);
        Self { state: MachineState::new(config), handles, ack_rx }
    }

    /// Walks `ProgramCounter` from 0 until it reaches the instruction count,
    /// calling `on_retire` after each instruction retires (used by the CLI's
    /// `--verbose` state dump).
    pub fn run(mut self, program: &Program, mut on_retire: impl FnMut(&MachineState)) -> Result<MachineState, ExecuteError> {
        let len = program.size();
        while self.state.program_counter < len {
            let pc = self.state.program_counter;
            let decoded = program.decode_at(pc)?;
            log::trace!("scalar: fetch pc={pc} op={:?}", decoded.op());
            match dispatch(&mut self.state, &self.handles, &self.ack_rx, decoded) {
                // CMPX rewrites PC to target - 1 so the unconditional post-increment below lands exactly on target.
                Effect::Jump { target } => {
                    log::debug!("scalar: branch taken at pc={pc}, target={target}");
                    self.state.program_counter = target - 1;
                }
                Effect::None => {}
            }
            self.state.program_counter += 1;
            log::trace!("scalar: retired pc={pc}, ar={}", self.state.arithmetic_register);
            on_retire(&self.state);
        }
        log::info!("scalar: program complete after {len} instructions");
        shutdown_all(self.handles);
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::config::Width;

    fn config() -> MachineConfig {
        MachineConfig { n_index_registers: 8, n_pe: 4, pe_memory_cells: 16, width: Width::Bits24 }
    }

    #[test]
    fn immediate_store_load() {
        let config = config();
        let program = assemble("LDXI 0,7\nSTX 0,0\nLDX 1,0", config.width, &config).unwrap();
        let executor = ScalarExecutor::new(&config);
        let state = executor.run(&program, |_| {}).unwrap();
        assert_eq!(state.index_registers[1], 7);
    }

    #[test]
    fn cu_arith_round_trip() {
        let config = config();
        let program = assemble("LDXI 0,42\nSTX 0,0\nCLOAD 0\nCSTORE 1", config.width, &config).unwrap();
        let executor = ScalarExecutor::new(&config);
        let state = executor.run(&program, |_| {}).unwrap();
        assert_eq!(state.cu_memory[1], 42);
    }

    #[test]
    fn broadcast_reaches_every_pe() {
        let config = config();
        let program = assemble("LDXI 0,99\nSTX 0,0\nCLOAD 0\nCBCAST", config.width, &config).unwrap();
        let executor = ScalarExecutor::new(&config);
        let state = executor.run(&program, |_| {}).unwrap();
        assert_eq!(state.arithmetic_register, 99);
    }

    #[test]
    fn loop_branch_visits_body_expected_number_of_times() {
        let config = config();
        // IR[0] counts 0..3, IR[1] is the fixed bound 3; CMPX loops back while IR[0] < IR[1].
        let source = "LDXI 0,0\nLDXI 1,3\nloop: INCX 0,1\nCMPX 0,1,loop";
        let program = assemble(source, config.width, &config).unwrap();
        let executor = ScalarExecutor::new(&config);
        let state = executor.run(&program, |_| {}).unwrap();
        assert_eq!(state.index_registers[0], 3);
    }
}
