//! Semantics of the twelve vector (PE) operations (§4.1, §4.2).
//!
//! Every function here dispatches one command to all PEs and barrier-waits
//! for `N_PE` acks before returning, matching the non-overlap rule in
//! spec.md §4.3: "No two vector ops overlap; between vector ops only CU
//! state is live." Both the scalar and the pipelined executor call through
//! this module so the barrier discipline lives in exactly one place.

use crate::instruction::{Params, RegisterType};
use crate::pe::{dispatch_and_barrier, Ack, Command, PeHandle};
use crate::state::MachineState;
use crossbeam_channel::Receiver;

fn index_value(state: &MachineState, ri: u8) -> i64 {
    state.index_registers[ri as usize]
}

pub fn lod(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Lod { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

pub fn sto(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Sto { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

pub fn add(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Add { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

pub fn sub(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Sub { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

pub fn mul(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Mul { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

pub fn div(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let command = Command::Div { addr_base: params.p0, index_value: index_value(state, params.p1) };
    dispatch_and_barrier(handles, ack_rx, command);
}

/// Gather-then-scatter: read PE `IR[ri]`'s routing register, then write it
/// into every enabled PE's routing register. Two barriers, one op.
pub fn bcast(state: &MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let source = index_value(state, params.p0) as usize;
    let acks = dispatch_and_barrier(handles, ack_rx, Command::ReadRr);
    let value = acks
        .iter()
        .find(|ack| ack.pe_index == source)
        .map(|ack| ack.rr)
        .unwrap_or(0);
    dispatch_and_barrier(handles, ack_rx, Command::SetRr { value });
}

pub fn mov(handles: &[PeHandle], ack_rx: &Receiver<Ack>, params: Params) {
    let from = RegisterType::from_byte(params.p0).expect("assembler validates register operands");
    let to = RegisterType::from_byte(params.p1).expect("assembler validates register operands");
    dispatch_and_barrier(handles, ack_rx, Command::Mov { from, to });
}

pub fn radd(handles: &[PeHandle], ack_rx: &Receiver<Ack>) {
    dispatch_and_barrier(handles, ack_rx, Command::Radd);
}

pub fn rsub(handles: &[PeHandle], ack_rx: &Receiver<Ack>) {
    dispatch_and_barrier(handles, ack_rx, Command::Rsub);
}

pub fn rmul(handles: &[PeHandle], ack_rx: &Receiver<Ack>) {
    dispatch_and_barrier(handles, ack_rx, Command::Rmul);
}

pub fn rdiv(handles: &[PeHandle], ack_rx: &Receiver<Ack>) {
    dispatch_and_barrier(handles, ack_rx, Command::Rdiv);
}
