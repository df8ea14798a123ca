//! Pipelined Fetch/Decode/Execute executor (C7) -- the hardest subsystem.
//!
//! Three concurrent workers: a Fetcher thread, a Decoder thread, and the
//! Executor running on the calling thread (the "driver"). They rendezvous
//! over zero-capacity `crossbeam_channel`s, which gives the same synchronous
//! hand-off semantics as the unbuffered channels the original design calls
//! for. A taken `CMPX` branch drives the four-step flush protocol in
//! [`PipelinedExecutor::flush`].
//!
//! One deliberate simplification from the channel-pulse design this is
//! grounded on: end-of-program is propagated as an `End` sentinel riding the
//! same `raw`/`desc` channels as real instructions, rather than as separate
//! `fetchFinished`/`decodeFinished` pulse channels. Because the channels are
//! synchronous and FIFO, the sentinel still arrives strictly after every
//! real instruction ahead of it and strictly before any instruction fetched
//! after a subsequent PC redirect, so the invariants in spec.md §4.4 hold
//! without the extra channels.

use super::{dispatch, Effect};
use crate::config::MachineConfig;
use crate::error::ExecuteError;
use crate::instruction::{self, Decoded};
use crate::pe::{shutdown_all, spawn_pes, Ack, PeHandle};
use crate::program_reader::{ProgramReader, ReadResult};
use crate::state::MachineState;
use crossbeam_channel::{select, Receiver, Sender};
use std::collections::HashMap;
use std::thread::JoinHandle;

enum RawMsg {
    Record { pc: i64, bytes: Vec<u8> },
    End,
}

enum DescMsg {
    Record { decoded: Decoded },
    End,
}

struct FetcherChannels {
    raw_tx: Sender<RawMsg>,
    wait_rx: Receiver<()>,
    pc_rx: Receiver<i64>,
    stop_rx: Receiver<()>,
}

fn fetcher_loop(mut reader: Box<dyn ProgramReader>, channels: FetcherChannels) {
    let FetcherChannels { raw_tx, wait_rx, pc_rx, stop_rx } = channels;
    let mut cache: HashMap<i64, Vec<u8>> = HashMap::new();
    let mut pc: i64 = 0;

    'outer: loop {
        // Non-blocking check: has the executor asked us to stop or to pause
        // and wait for a new PC before we touch the reader again?
        select! {
            recv(stop_rx) -> _ => break 'outer,
            recv(wait_rx) -> _ => {
                match wait_for_pc(&pc_rx, &stop_rx) {
                    Some(new_pc) => { pc = new_pc; continue 'outer; }
                    None => break 'outer,
                }
            }
            default => {}
        }

        let bytes = if let Some(cached) = cache.get(&pc) {
            log::trace!("fetcher: cache hit at pc={pc}");
            cached.clone()
        } else {
            match reader.read_instruction(pc) {
                Ok(ReadResult::Record(bytes)) => {
                    log::trace!("fetcher: miss at pc={pc}, reading from backing store");
                    cache.insert(pc, bytes.clone());
                    bytes
                }
                Ok(ReadResult::EndOfProgram) => {
                    log::debug!("fetcher: end of program reached at pc={pc}");
                    if raw_tx.send(RawMsg::End).is_err() {
                        break 'outer;
                    }
                    // Past end-of-program we still owe the executor the
                    // wait-for-pc handshake: a taken branch can target an
                    // index at or before this point, and flush's step 1
                    // rendezvous depends on someone listening on wait_rx.
                    match wait_for_wait_then_pc(&wait_rx, &pc_rx, &stop_rx) {
                        Some(new_pc) => {
                            pc = new_pc;
                            continue 'outer;
                        }
                        None => break 'outer,
                    }
                }
                Err(_) => break 'outer,
            }
        };

        select! {
            send(raw_tx, RawMsg::Record { pc, bytes }) -> res => {
                if res.is_err() { break 'outer; }
                pc += 1;
            }
            recv(wait_rx) -> _ => {
                match wait_for_pc(&pc_rx, &stop_rx) {
                    Some(new_pc) => pc = new_pc,
                    None => break 'outer,
                }
            }
            recv(stop_rx) -> _ => break 'outer,
        }
    }
}

fn wait_for_pc(pc_rx: &Receiver<i64>, stop_rx: &Receiver<()>) -> Option<i64> {
    select! {
        recv(pc_rx) -> new_pc => new_pc.ok(),
        recv(stop_rx) -> _ => None,
    }
}

/// The post-EOF handshake: first accept the `wait_rx` rendezvous (flush
/// step 1 is trying to send exactly this), then the new PC itself --
/// matching the grounded original's `getPcChange` two-step `select`
/// (`case <-fetchWaitForPcChange: *pc = <-fetchPcChange`), rather than
/// jumping straight to waiting on `pc_rx` the way the other call sites do
/// (they've already consumed a `wait_rx` receive in the `select!` that
/// dispatched to them).
fn wait_for_wait_then_pc(wait_rx: &Receiver<()>, pc_rx: &Receiver<i64>, stop_rx: &Receiver<()>) -> Option<i64> {
    select! {
        recv(wait_rx) -> _ => wait_for_pc(pc_rx, stop_rx),
        recv(stop_rx) -> _ => None,
    }
}

struct DecoderChannels {
    raw_rx: Receiver<RawMsg>,
    desc_tx: Sender<DescMsg>,
    pause_rx: Receiver<()>,
    resume_rx: Receiver<()>,
    stop_rx: Receiver<()>,
}

fn decoder_loop(width: crate::config::Width, channels: DecoderChannels) {
    let DecoderChannels { raw_rx, desc_tx, pause_rx, resume_rx, stop_rx } = channels;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(pause_rx) -> _ => drain_until_resume(&raw_rx, &resume_rx),
            recv(raw_rx) -> msg => {
                let Ok(msg) = msg else { break };
                let out = match msg {
                    RawMsg::End => DescMsg::End,
                    RawMsg::Record { pc, bytes } => {
                        match instruction::decode(width, &bytes) {
                            Ok(decoded) => {
                                log::trace!("decoder: pc={pc} op={:?}", decoded.op());
                                DescMsg::Record { decoded }
                            }
                            // A malformed record from a trusted, already-assembled
                            // binary indicates a bug elsewhere in the pipeline.
                            Err(e) => panic!("pipelined decoder received an undecodable record: {e}"),
                        }
                    }
                };
                // The decoder discards an in-flight descriptor rather than
                // blocking if a pause lands while it is trying to hand off.
                select! {
                    send(desc_tx, out) -> res => { if res.is_err() { break; } }
                    recv(pause_rx) -> _ => drain_until_resume(&raw_rx, &resume_rx),
                }
            }
        }
    }
}

fn drain_until_resume(raw_rx: &Receiver<RawMsg>, resume_rx: &Receiver<()>) {
    loop {
        select! {
            recv(raw_rx) -> _ => {}
            recv(resume_rx) -> _ => break,
        }
    }
}

struct FetcherHandle {
    wait_tx: Sender<()>,
    pc_tx: Sender<i64>,
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

struct DecoderHandle {
    pause_tx: Sender<()>,
    resume_tx: Sender<()>,
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

pub struct PipelinedExecutor {
    pub state: MachineState,
    pe_handles: Vec<PeHandle>,
    ack_rx: Receiver<Ack>,
    desc_rx: Receiver<DescMsg>,
    fetcher: FetcherHandle,
    decoder: DecoderHandle,
}

impl PipelinedExecutor {
    pub fn new(config: &MachineConfig, reader: Box<dyn ProgramReader>) -> Self {
        let width = config.width;
        let (pe_handles, ack_rx) = spawn_pes(config.n_pe, config.pe_memory_cells);

        let (raw_tx, raw_rx) = crossbeam_channel::bounded::<RawMsg>(0);
        let (desc_tx, desc_rx) = crossbeam_channel::bounded::<DescMsg>(0);
        let (wait_tx, wait_rx) = crossbeam_channel::bounded::<()>(0);
        let (pc_tx, pc_rx) = crossbeam_channel::bounded::<i64>(0);
        let (fetch_stop_tx, fetch_stop_rx) = crossbeam_channel::bounded::<()>(0);
        let (pause_tx, pause_rx) = crossbeam_channel::bounded::<()>(0);
        let (resume_tx, resume_rx) = crossbeam_channel::bounded::<()>(0);
        let (decode_stop_tx, decode_stop_rx) = crossbeam_channel::bounded::<()>(0);

        let fetcher_channels = FetcherChannels { raw_tx, wait_rx, pc_rx, stop_rx: fetch_stop_rx };
        let fetcher_join = std::thread::Builder::new()
            .name("fetcher".to_string())
            .spawn(move || fetcher_loop(reader, fetcher_channels))
            .expect("failed to spawn fetcher thread");

        let decoder_channels = DecoderChannels { raw_rx, desc_tx, pause_rx, resume_rx, stop_rx: decode_stop_rx };
        let decoder_join = std::thread::Builder::new()
            .name("decoder".to_string())
            .spawn(move || decoder_loop(width, decoder_channels))
            .expect("failed to spawn decoder thread");

        Self {
            state: MachineState::new(config),
            pe_handles,
            ack_rx,
            desc_rx,
            fetcher: FetcherHandle { wait_tx, pc_tx, stop_tx: fetch_stop_tx, join: fetcher_join },
            decoder: DecoderHandle { pause_tx, resume_tx, stop_tx: decode_stop_tx, join: decoder_join },
        }
    }

    /// Drives the pipeline to completion, calling `on_retire` after each
    /// instruction retires.
    pub fn run(mut self, mut on_retire: impl FnMut(&MachineState)) -> Result<MachineState, ExecuteError> {
        loop {
            match self.desc_rx.recv() {
                Ok(DescMsg::End) => break,
                Ok(DescMsg::Record { decoded }) => {
                    log::trace!("executor: retiring op={:?}", decoded.op());
                    match dispatch(&mut self.state, &self.pe_handles, &self.ack_rx, decoded) {
                        Effect::Jump { target } => self.flush(target),
                        Effect::None => {}
                    }
                    on_retire(&self.state);
                }
                Err(_) => break,
            }
        }

        log::info!("pipelined: program complete, shutting down workers");
        let _ = self.fetcher.stop_tx.send(());
        let _ = self.decoder.stop_tx.send(());
        let _ = self.fetcher.join.join();
        let _ = self.decoder.join.join();
        shutdown_all(self.pe_handles);
        Ok(self.state)
    }

    /// The four-step flush protocol from spec.md §4.4: tell the fetcher to
    /// stop and wait, pause and drain the decoder, drain any stray
    /// descriptor still in flight to the executor, then hand the fetcher
    /// its new PC.
    fn flush(&mut self, target: i64) {
        log::debug!("executor: flush -> target={target}");

        // 1. SendWaitForPc -- keep draining the descriptor channel while
        //    retrying, so a decoder blocked trying to hand off doesn't
        //    deadlock us.
        loop {
            select! {
                send(self.fetcher.wait_tx, ()) -> res => { if res.is_ok() { break; } }
                recv(self.desc_rx) -> _ => {}
            }
        }

        // 2. DrainDecode -- pause the decoder (it discards its own in-flight
        //    descriptor and drains raw records internally), then resume it.
        let _ = self.decoder.pause_tx.send(());
        let _ = self.decoder.resume_tx.send(());

        // 3. DrainExecute -- opportunistically drop a stray wrong-path
        //    descriptor that crossed the boundary before the pause landed.
        while self.desc_rx.try_recv().is_ok() {}

        // 4. SendPC -- the fetcher is parked waiting for exactly this.
        let _ = self.fetcher.pc_tx.send(target);
        log::trace!("executor: flush complete, fetcher redirected to pc={target}");
    }
}
