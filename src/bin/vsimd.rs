//! Command-line driver: lexes/assembles source into a binary, and/or
//! executes a binary against the chosen machine width and executor.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use vsimd::assembler::assemble;
use vsimd::config::{MachineConfig, Width};
use vsimd::error::VsimdError;
use vsimd::executor::pipelined::PipelinedExecutor;
use vsimd::executor::scalar::ScalarExecutor;
use vsimd::program::Program;
use vsimd::program_reader::{FileProgramReader, MemoryProgramReader, ProgramReader};
use vsimd::state::MachineState;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Arch {
    #[value(name = "24bit")]
    Bits24,
    #[value(name = "24bitpipelined")]
    Bits24Pipelined,
    #[value(name = "32bit")]
    Bits32,
}

impl Arch {
    fn width(self) -> Width {
        match self {
            Arch::Bits24 | Arch::Bits24Pipelined => Width::Bits24,
            Arch::Bits32 => Width::Bits32,
        }
    }

    fn pipelined(self) -> bool {
        matches!(self, Arch::Bits24Pipelined)
    }
}

/// A software emulator for an abstract SIMD associative/array vector machine.
#[derive(Parser, Debug)]
#[command(name = "vsimd", about, version)]
struct Cli {
    /// Lex and assemble this source file into a binary.
    #[arg(short = 'c', long = "compile")]
    compile: Option<PathBuf>,

    /// Output binary path (used with --compile).
    #[arg(short = 'o', long = "output", default_value = "output.simd")]
    output: PathBuf,

    /// Print machine state after each retired instruction.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Assemble and immediately execute, instead of writing a binary.
    #[arg(short = 's', long = "script")]
    script: bool,

    /// Instruction encoding and executor to use.
    #[arg(short = 'a', long = "arch", default_value = "24bit")]
    arch: Arch,

    /// Cells per PE memory slice.
    #[arg(long = "pemem", default_value_t = 64)]
    pemem: usize,

    /// Number of processing elements.
    #[arg(long = "numpe", default_value_t = 32)]
    numpe: usize,

    /// Index register count.
    #[arg(long = "indexregisters", default_value_t = 64)]
    indexregisters: usize,

    /// Binary file to execute (omitted when compiling with --script).
    binary: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), VsimdError> {
    let cli = Cli::parse();
    let width = cli.arch.width();
    let config = MachineConfig {
        n_index_registers: cli.indexregisters,
        n_pe: cli.numpe,
        pe_memory_cells: cli.pemem,
        width,
    };
    config.validate()?;

    if let Some(source_path) = &cli.compile {
        log::info!("assembling {}", source_path.display());
        let source = std::fs::read_to_string(source_path)?;
        let program = assemble(&source, width, &config)?;

        if cli.script {
            log::info!("running assembled program in-place");
            execute(program, &config, cli.arch, cli.verbose)?;
        } else {
            program.save(&cli.output)?;
            log::info!("wrote {} instructions to {}", program.size(), cli.output.display());
        }
        return Ok(());
    }

    let binary_path = cli.binary.ok_or_else(|| {
        VsimdError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "no binary file given and --compile not set"))
    })?;

    if cli.arch.pipelined() {
        let reader: Box<dyn ProgramReader> = Box::new(FileProgramReader::open(&binary_path, width)?);
        let executor = PipelinedExecutor::new(&config, reader);
        let state = executor.run(|state| maybe_dump(cli.verbose, state))?;
        dump_final(&state);
    } else {
        let bytes = std::fs::read(&binary_path)?;
        let program = Program::from_bytes(width, bytes)?;
        let executor = ScalarExecutor::new(&config);
        let state = executor.run(&program, |state| maybe_dump(cli.verbose, state))?;
        dump_final(&state);
    }
    Ok(())
}

fn execute(program: Program, config: &MachineConfig, arch: Arch, verbose: bool) -> Result<(), VsimdError> {
    if arch.pipelined() {
        let reader: Box<dyn ProgramReader> = Box::new(MemoryProgramReader::new(program));
        let executor = PipelinedExecutor::new(config, reader);
        let state = executor.run(|state| maybe_dump(verbose, state))?;
        dump_final(&state);
    } else {
        let executor = ScalarExecutor::new(config);
        let state = executor.run(&program, |state| maybe_dump(verbose, state))?;
        dump_final(&state);
    }
    Ok(())
}

fn maybe_dump(verbose: bool, state: &MachineState) {
    if verbose {
        println!(
            "pc={} ar={} lr={} ir={:?}",
            state.program_counter, state.arithmetic_register, state.length_register, state.index_registers
        );
    }
}

fn dump_final(state: &MachineState) {
    println!("--- final state ---");
    println!("ArithmeticRegister: {}", state.arithmetic_register);
    println!("IndexRegisters: {:?}", state.index_registers);
}
