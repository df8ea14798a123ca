//! Execution engines (C6/C7). Both share the exact same opcode dispatch and
//! PE barrier discipline, implemented once here; they differ only in how
//! they fetch/decode and in how a `CMPX` jump is applied to `ProgramCounter`.

pub mod pipelined;
pub mod scalar;

use crate::instruction::execution::scalar_ops::ScalarEffect;
use crate::instruction::execution::{scalar_ops, vector_ops};
use crate::instruction::{Decoded, OpCode};
use crate::pe::{Ack, PeHandle};
use crate::state::MachineState;
use crossbeam_channel::Receiver;

pub use scalar_ops::ScalarEffect as Effect;

/// Executes one decoded instruction against `state`, dispatching vector ops
/// to the PE pool and barrier-waiting as needed. Returns the control-flow
/// effect -- non-`None` only for `CMPX`.
pub fn dispatch(state: &mut MachineState, handles: &[PeHandle], ack_rx: &Receiver<Ack>, decoded: Decoded) -> Effect {
    match decoded {
        Decoded::Mem { op, mem } => {
            match op {
                OpCode::Ldx => scalar_ops::ldx(state, mem),
                OpCode::Stx => scalar_ops::stx(state, mem),
                OpCode::Cload => scalar_ops::cload(state, mem),
                OpCode::Cstore => scalar_ops::cstore(state, mem),
                other => unreachable!("{other:?} is not a memory-form opcode"),
            }
            ScalarEffect::None
        }
        Decoded::Param { op, params } => match op {
            OpCode::Ldxi => {
                scalar_ops::ldxi(state, params);
                ScalarEffect::None
            }
            OpCode::Incx => {
                scalar_ops::incx(state, params);
                ScalarEffect::None
            }
            OpCode::Decx => {
                scalar_ops::decx(state, params);
                ScalarEffect::None
            }
            OpCode::Mulx => {
                scalar_ops::mulx(state, params);
                ScalarEffect::None
            }
            OpCode::Cmpx => scalar_ops::cmpx(state, params),
            OpCode::Cbcast => {
                scalar_ops::cbcast(state, handles, ack_rx);
                ScalarEffect::None
            }
            OpCode::Lod => {
                vector_ops::lod(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Sto => {
                vector_ops::sto(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Add => {
                vector_ops::add(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Sub => {
                vector_ops::sub(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Mul => {
                vector_ops::mul(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Div => {
                vector_ops::div(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Bcast => {
                vector_ops::bcast(state, handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Mov => {
                vector_ops::mov(handles, ack_rx, params);
                ScalarEffect::None
            }
            OpCode::Radd => {
                vector_ops::radd(handles, ack_rx);
                ScalarEffect::None
            }
            OpCode::Rsub => {
                vector_ops::rsub(handles, ack_rx);
                ScalarEffect::None
            }
            OpCode::Rmul => {
                vector_ops::rmul(handles, ack_rx);
                ScalarEffect::None
            }
            OpCode::Rdiv => {
                vector_ops::rdiv(handles, ack_rx);
                ScalarEffect::None
            }
            other => unreachable!("{other:?} is not a param-form opcode"),
        },
    }
}
