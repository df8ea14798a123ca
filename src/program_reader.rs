//! `ProgramReader`: random-access instruction source, file-backed or
//! memory-backed, both required per spec.md §4.6. The pipelined fetcher
//! consults the file-backed reader; the memory-backed one lets an
//! already-assembled [`crate::program::Program`] run identically.

use crate::config::Width;
use crate::error::ProgramError;
use crate::program::Program;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// One instruction record, or the end of the program.
pub enum ReadResult {
    Record(Vec<u8>),
    EndOfProgram,
}

pub trait ProgramReader: Send {
    fn read_instruction(&mut self, index: i64) -> Result<ReadResult, ProgramError>;
    fn width(&self) -> Width;
}

/// Reads instruction records directly off disk, seeking per call. Simple and
/// stateless beyond the open handle -- the Fetcher's own per-PC cache (see
/// `executor::pipelined`) is what avoids repeat reads of the same index.
pub struct FileProgramReader {
    file: File,
    width: Width,
    len_records: i64,
}

impl FileProgramReader {
    pub fn open(path: impl AsRef<Path>, width: Width) -> Result<Self, ProgramError> {
        let file = File::open(path)?;
        let stride = width.instruction_stride() as u64;
        let len_bytes = file.metadata()?.len();
        if len_bytes % stride != 0 {
            return Err(ProgramError::MisalignedBinary { stride: stride as usize, len: len_bytes as usize });
        }
        Ok(Self { file, width, len_records: (len_bytes / stride) as i64 })
    }
}

impl ProgramReader for FileProgramReader {
    fn read_instruction(&mut self, index: i64) -> Result<ReadResult, ProgramError> {
        if index < 0 || index >= self.len_records {
            return Ok(ReadResult::EndOfProgram);
        }
        let stride = self.width.instruction_stride();
        let offset = index as u64 * stride as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; stride];
        self.file.read_exact(&mut buf)?;
        Ok(ReadResult::Record(buf))
    }

    fn width(&self) -> Width {
        self.width
    }
}

/// Reads instruction records out of an in-memory [`Program`].
pub struct MemoryProgramReader {
    program: Program,
}

impl MemoryProgramReader {
    pub fn new(program: Program) -> Self {
        Self { program }
    }
}

impl ProgramReader for MemoryProgramReader {
    fn read_instruction(&mut self, index: i64) -> Result<ReadResult, ProgramError> {
        match self.program.at(index) {
            Ok(record) => Ok(ReadResult::Record(record.to_vec())),
            Err(ProgramError::IndexOutOfBounds { .. }) => Ok(ReadResult::EndOfProgram),
            Err(other) => Err(other),
        }
    }

    fn width(&self) -> Width {
        self.program.width()
    }
}
