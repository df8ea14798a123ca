//! Control-unit-side machine state (C1).
//!
//! `Memory` in spec terms is a single contiguous array partitioned into one
//! slice per PE plus a CU-private tail. This crate instead gives each PE its
//! own owned `Vec<i64>` (see [`crate::pe::ProcessingElement`]) and keeps only
//! the CU's tail slice here, as `cu_memory` -- that sidesteps aliasing a
//! mutable buffer across OS threads while preserving the same partition and
//! no-reallocation invariants (recorded as a design decision in DESIGN.md).

use crate::config::MachineConfig;

/// Everything the Control Unit owns directly.
#[derive(Clone, Debug)]
pub struct MachineState {
    pub index_registers: Vec<i64>,
    pub arithmetic_register: i64,
    pub length_register: i64,
    /// CU-side enable vector; per §9 of the design notes, `ProcessingElement::enabled`
    /// is authoritative for masked execution and this field is kept only for
    /// architectural completeness.
    pub mask: Vec<bool>,
    /// The CU's private memory tail -- `pe_memory_cells` cells, matching the
    /// width of each PE's own slice.
    pub cu_memory: Vec<i64>,
    pub program_counter: i64,
}

impl MachineState {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            index_registers: vec![0; config.n_index_registers],
            arithmetic_register: 0,
            length_register: 0,
            mask: vec![true; config.n_pe],
            cu_memory: vec![0; config.pe_memory_cells],
            program_counter: 0,
        }
    }

    /// Total instruction count consumed so far is the caller's job to track;
    /// this just reports whether `program_counter` has walked off the end.
    pub fn halted(&self, program_len: i64) -> bool {
        self.program_counter >= program_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_matches_config() {
        let config = MachineConfig { n_index_registers: 8, n_pe: 4, pe_memory_cells: 16, ..Default::default() };
        let state = MachineState::new(&config);
        assert_eq!(state.index_registers.len(), 8);
        assert_eq!(state.cu_memory.len(), 16);
        assert_eq!(state.mask.len(), 4);
        assert_eq!(state.program_counter, 0);
    }
}
