//! Semantics of the ten scalar (CU) operations (§4.1).

use crate::instruction::{MemParams, Params};
use crate::pe::{dispatch_and_barrier, Ack, Command, PeHandle};
use crate::state::MachineState;
use crossbeam_channel::Receiver;

/// What a scalar op did to control flow. Only `CMPX` can produce a `Jump`;
/// the two executors apply the jump's PC-adjustment convention differently
/// (non-pipelined rewrites `PC` to `target - 1` so its post-increment lands
/// correctly, the pipelined executor hands `target` straight to the fetcher).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarEffect {
    None,
    Jump { target: i64 },
}

pub fn ldx(state: &mut MachineState, mem: MemParams) {
    state.index_registers[mem.reg as usize] = state.cu_memory[mem.addr as usize];
}

pub fn stx(state: &mut MachineState, mem: MemParams) {
    state.cu_memory[mem.addr as usize] = state.index_registers[mem.reg as usize];
}

pub fn ldxi(state: &mut MachineState, params: Params) {
    state.index_registers[params.p0 as usize] = params.p1 as i64;
}

pub fn incx(state: &mut MachineState, params: Params) {
    state.index_registers[params.p0 as usize] += params.p1 as i64;
}

pub fn decx(state: &mut MachineState, params: Params) {
    state.index_registers[params.p0 as usize] -= params.p1 as i64;
}

pub fn mulx(state: &mut MachineState, params: Params) {
    state.index_registers[params.p0 as usize] *= params.p1 as i64;
}

pub fn cload(state: &mut MachineState, mem: MemParams) {
    state.arithmetic_register = state.cu_memory[mem.addr as usize];
}

pub fn cstore(state: &mut MachineState, mem: MemParams) {
    state.cu_memory[mem.addr as usize] = state.arithmetic_register;
}

pub fn cmpx(state: &MachineState, params: Params) -> ScalarEffect {
    let ra = state.index_registers[params.p0 as usize];
    let rb = state.index_registers[params.p1 as usize];
    if ra < rb {
        ScalarEffect::Jump { target: params.p2 as i64 }
    } else {
        ScalarEffect::None
    }
}

/// Broadcasts the CU's arithmetic register to every PE's routing register,
/// regardless of `Enabled` -- `SetRrForce` bypasses the mask in `apply`,
/// unlike `BCAST`'s masked `SetRr` scatter.
pub fn cbcast(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>) {
    dispatch_and_barrier(handles, ack_rx, Command::SetRrForce { value: state.arithmetic_register });
}
