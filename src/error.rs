use thiserror::Error;

/// Errors raised while assembling source text into a [`crate::program::Program`].
///
/// Every variant that can be attributed to a specific line of source carries
/// a 1-based line number, matching the "line number + short tag" reporting
/// style required of the assembler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: malformed statement: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("line {line}: undefined symbol '{symbol}'")]
    UndefinedSymbol { line: usize, symbol: String },

    #[error("line {line}: wrong number of operands for {mnemonic}: expected {expected}, got {got}")]
    WrongOperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: value {value} out of range for {context} (limit {limit})")]
    OutOfRange {
        line: usize,
        value: i64,
        context: String,
        limit: i64,
    },

    #[error("line {line}: pseudo-op '{mnemonic}' must precede all instructions")]
    PseudoOpAfterCode { line: usize, mnemonic: String },

    #[error("line {line}: BSS width {width} exceeds the number of processing elements ({n_pe})")]
    BssWidthExceedsPeCount { line: usize, width: usize, n_pe: usize },

    #[error("line {line}: BSS allocation overflows per-PE memory (used {used}, capacity {capacity})")]
    BssOverflow { line: usize, used: usize, capacity: usize },

    #[error("symbol '{0}' redefined")]
    DuplicateSymbol(String),
}

/// Errors raised by the [`crate::program`] container itself, independent of
/// the assembler (e.g. when a binary is loaded straight off disk).
#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("instruction index {index} out of bounds (program has {size} instructions)")]
    IndexOutOfBounds { index: i64, size: i64 },

    #[error("memory address {address} exceeds the {limit}-bit address space for this encoding width")]
    AddressOutOfRange { address: i64, limit: u32 },

    #[error("param value {value} exceeds the field width for this encoding")]
    ParamOutOfRange { value: i64 },

    #[error("binary file is not a whole number of {stride}-byte instructions ({len} bytes)")]
    MisalignedBinary { stride: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while executing a loaded program.
///
/// Note: a protocol violation in the pipelined executor (spec.md's "executor
/// internal protocol violation" row) is deliberately *not* a variant here --
/// it indicates an implementation bug rather than a user-facing failure, and
/// is surfaced as a panic instead.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error("unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be nonzero")]
    Zero { field: &'static str },
}

/// Top-level error type returned by the library's public entry points and
/// converted into a process exit code by the CLI binary.
#[derive(Error, Debug)]
pub enum VsimdError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
