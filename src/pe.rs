//! Processing Elements (C2): one SIMD lane each, run as its own worker
//! thread communicating with the Control Unit over `crossbeam_channel`
//! rendezvous, per the concurrency model in spec.md §5.

use crate::instruction::RegisterType;
use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;

/// A command dispatched by the CU to one PE. `*_value` fields carry an
/// already-resolved CU index-register value -- a PE never reads CU state
/// directly, so the CU resolves `IR[ri]` before sending.
#[derive(Clone, Copy, Debug)]
pub enum Command {
    Lod { addr_base: u8, index_value: i64 },
    Sto { addr_base: u8, index_value: i64 },
    Add { addr_base: u8, index_value: i64 },
    Sub { addr_base: u8, index_value: i64 },
    Mul { addr_base: u8, index_value: i64 },
    Div { addr_base: u8, index_value: i64 },
    /// Read this PE's routing register without mutating anything; used by
    /// `BCAST`'s gather phase.
    ReadRr,
    /// Overwrite this PE's routing register; used by `BCAST`'s scatter
    /// phase, which -- like every other vector op -- honors the enable mask.
    SetRr { value: i64 },
    /// Overwrite this PE's routing register unconditionally, bypassing the
    /// enable mask. `CBCAST` is a scalar (CU) op, not a vector op, and the
    /// original's `Cbcast` writes every PE's routing register with no
    /// enable check -- unlike `BCAST`, which is masked.
    SetRrForce { value: i64 },
    Mov { from: RegisterType, to: RegisterType },
    Radd,
    Rsub,
    Rmul,
    Rdiv,
    Shutdown,
}

/// One PE's reply to a command: "command retired", plus its current routing
/// register so gather operations don't need a second round trip.
#[derive(Clone, Copy, Debug)]
pub struct Ack {
    pub pe_index: usize,
    pub rr: i64,
}

/// The CU-side handle to a running PE worker: where to send commands, and
/// (shared across all PEs) where acks arrive.
pub struct PeHandle {
    pub command_tx: Sender<Command>,
    pub join: JoinHandle<()>,
}

/// One lane's private state. `memory` is this PE's disjoint slice of the
/// machine's shared memory -- owned outright rather than aliased, see
/// [`crate::state`].
pub struct ProcessingElement {
    pub index: usize,
    pub arithmetic_register: i64,
    pub routing_register: i64,
    pub pe_index_register: i64,
    pub enabled: bool,
    pub memory: Vec<i64>,
}

impl ProcessingElement {
    pub fn new(index: usize, memory_cells: usize) -> Self {
        Self {
            index,
            arithmetic_register: 0,
            routing_register: 0,
            pe_index_register: 0,
            enabled: true,
            memory: vec![0; memory_cells],
        }
    }

    /// Applies one command, honoring the enable mask, and returns the ack
    /// that should be sent regardless of whether `enabled` was set.
    pub fn apply(&mut self, command: Command) -> Ack {
        // CBCAST's force-set bypasses the enable mask entirely -- it's a
        // scalar (CU) op, not a vector op, so it isn't subject to masked
        // execution the way every other command in this match is.
        if let Command::SetRrForce { value } = command {
            self.routing_register = value;
            return Ack { pe_index: self.index, rr: self.routing_register };
        }
        if self.enabled {
            match command {
                Command::Lod { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    self.arithmetic_register = self.memory[addr];
                }
                Command::Sto { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    self.memory[addr] = self.arithmetic_register;
                }
                Command::Add { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    self.arithmetic_register += self.memory[addr];
                }
                Command::Sub { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    self.arithmetic_register -= self.memory[addr];
                }
                Command::Mul { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    self.arithmetic_register *= self.memory[addr];
                }
                Command::Div { addr_base, index_value } => {
                    let addr = self.resolve(addr_base, index_value);
                    let divisor = self.memory[addr];
                    // Zero-dividend is a documented silent no-op (spec.md §9);
                    // a zero divisor is guarded too, to avoid a hard panic
                    // where the original would have trapped at the OS level.
                    if self.arithmetic_register != 0 && divisor != 0 {
                        self.arithmetic_register /= divisor;
                    }
                }
                Command::ReadRr => {}
                Command::SetRr { value } => self.routing_register = value,
                Command::SetRrForce { .. } => unreachable!("handled unconditionally above"),
                Command::Mov { from, to } => {
                    if from != to {
                        let value = self.read_register(from);
                        self.write_register(to, value);
                    }
                }
                Command::Radd => self.arithmetic_register += self.routing_register,
                Command::Rsub => self.arithmetic_register -= self.routing_register,
                Command::Rmul => self.arithmetic_register *= self.routing_register,
                Command::Rdiv => {
                    if self.arithmetic_register != 0 && self.routing_register != 0 {
                        self.arithmetic_register /= self.routing_register;
                    }
                }
                Command::Shutdown => unreachable!("Shutdown is handled by the run loop"),
            }
        }
        Ack { pe_index: self.index, rr: self.routing_register }
    }

    fn resolve(&self, addr_base: u8, index_value: i64) -> usize {
        (addr_base as i64 + index_value) as usize
    }

    fn read_register(&self, which: RegisterType) -> i64 {
        match which {
            RegisterType::Index => self.pe_index_register,
            RegisterType::Routing => self.routing_register,
            RegisterType::Arithmetic => self.arithmetic_register,
        }
    }

    fn write_register(&mut self, which: RegisterType, value: i64) {
        match which {
            RegisterType::Index => self.pe_index_register = value,
            RegisterType::Routing => self.routing_register = value,
            RegisterType::Arithmetic => self.arithmetic_register = value,
        }
    }

    /// Runs this PE's command loop until it receives `Shutdown`, forwarding
    /// one `Ack` per retired command to the shared completion channel.
    pub fn run(mut self, command_rx: Receiver<Command>, ack_tx: Sender<Ack>) {
        while let Ok(command) = command_rx.recv() {
            if matches!(command, Command::Shutdown) {
                break;
            }
            let ack = self.apply(command);
            if ack_tx.send(ack).is_err() {
                break;
            }
        }
    }
}

/// Spawns `n_pe` PE workers and returns their command handles plus the
/// shared ack receiver the CU barrier-waits on.
pub fn spawn_pes(n_pe: usize, memory_cells: usize) -> (Vec<PeHandle>, Receiver<Ack>) {
    let (ack_tx, ack_rx) = crossbeam_channel::bounded::<Ack>(n_pe);
    let mut handles = Vec::with_capacity(n_pe);
    for index in 0..n_pe {
        let (command_tx, command_rx) = crossbeam_channel::bounded::<Command>(0);
        let ack_tx = ack_tx.clone();
        let pe = ProcessingElement::new(index, memory_cells);
        let join = std::thread::Builder::new()
            .name(format!("pe-{index}"))
            .spawn(move || pe.run(command_rx, ack_tx))
            .expect("failed to spawn PE worker thread");
        handles.push(PeHandle { command_tx, join });
    }
    (handles, ack_rx)
}

/// Sends `command` to every PE and barrier-waits for exactly `N_PE` acks,
/// per the C6/C7 shared vector-op contract.
pub fn dispatch_and_barrier(handles: &[PeHandle], ack_rx: &Receiver<Ack>, command: Command) -> Vec<Ack> {
    for handle in handles {
        handle
            .command_tx
            .send(command)
            .expect("PE worker thread terminated unexpectedly");
    }
    (0..handles.len())
        .map(|_| ack_rx.recv().expect("PE worker terminated before acking"))
        .collect()
}

pub fn shutdown_all(handles: Vec<PeHandle>) {
    for handle in &handles {
        let _ = handle.command_tx.send(Command::Shutdown);
    }
    for handle in handles {
        let _ = handle.join.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_zero_dividend_is_noop() {
        let mut pe = ProcessingElement::new(0, 4);
        pe.memory[0] = 5;
        pe.arithmetic_register = 0;
        pe.apply(Command::Div { addr_base: 0, index_value: 0 });
        assert_eq!(pe.arithmetic_register, 0);
    }

    #[test]
    fn div_zero_divisor_is_noop_not_panic() {
        let mut pe = ProcessingElement::new(0, 4);
        pe.memory[0] = 0;
        pe.arithmetic_register = 7;
        pe.apply(Command::Div { addr_base: 0, index_value: 0 });
        assert_eq!(pe.arithmetic_register, 7);
    }

    #[test]
    fn disabled_pe_ignores_side_effects() {
        let mut pe = ProcessingElement::new(0, 4);
        pe.enabled = false;
        pe.arithmetic_register = 10;
        pe.memory[0] = 99;
        let ack = pe.apply(Command::Lod { addr_base: 0, index_value: 0 });
        assert_eq!(pe.arithmetic_register, 10);
        assert_eq!(ack.pe_index, 0);
    }

    #[test]
    fn mov_same_register_is_noop() {
        let mut pe = ProcessingElement::new(0, 4);
        pe.arithmetic_register = 55;
        pe.apply(Command::Mov { from: RegisterType::Arithmetic, to: RegisterType::Arithmetic });
        assert_eq!(pe.arithmetic_register, 55);
    }

    #[test]
    fn mov_transfers_between_registers() {
        let mut pe = ProcessingElement::new(0, 4);
        pe.routing_register = 42;
        pe.apply(Command::Mov { from: RegisterType::Routing, to: RegisterType::Arithmetic });
        assert_eq!(pe.arithmetic_register, 42);
        assert_eq!(pe.routing_register, 42);
    }
}
