use crate::error::ConfigError;

/// Which instruction encoding (and therefore which executor) a run uses.
///
/// Both widths decode through the same opcode table (§4.1); they differ only
/// in record stride and the bit width of their param / memory-address fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Width {
    /// 3-byte records, 6-bit params, 12-bit memory addresses (4096 cells).
    #[default]
    Bits24,
    /// 4-byte records, 8-bit params, 16-bit memory addresses (65536 cells).
    Bits32,
}

impl Width {
    /// Bytes per instruction record for this encoding.
    pub fn instruction_stride(&self) -> usize {
        match self {
            Width::Bits24 => 3,
            Width::Bits32 => 4,
        }
    }

    /// Upper bound (exclusive) on a memory-form address for this encoding.
    pub fn address_limit(&self) -> i64 {
        match self {
            Width::Bits24 => 1 << 12,
            Width::Bits32 => 1 << 16,
        }
    }

    /// Upper bound (exclusive) on a param-form 6-or-8-bit field for this encoding.
    pub fn param_limit(&self) -> i64 {
        match self {
            Width::Bits24 => 1 << 6,
            Width::Bits32 => 1 << 8,
        }
    }
}

/// Construction-time parameters for a [`crate::state::MachineState`].
///
/// Carried explicitly through the CLI and assembler rather than as global
/// state -- the original implementation's process-wide `nextDataPos` counter
/// is exactly the anti-pattern this struct (plus `AssemblerContext`) replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    pub n_index_registers: usize,
    pub n_pe: usize,
    pub pe_memory_cells: usize,
    pub width: Width,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            n_index_registers: 64,
            n_pe: 32,
            pe_memory_cells: 64,
            width: Width::Bits24,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_index_registers == 0 {
            return Err(ConfigError::Zero { field: "n_index_registers" });
        }
        if self.n_pe == 0 {
            return Err(ConfigError::Zero { field: "n_pe" });
        }
        if self.pe_memory_cells == 0 {
            return Err(ConfigError::Zero { field: "pe_memory_cells" });
        }
        Ok(())
    }

    /// Total length of shared `Memory`: one slice per PE plus the CU's own tail slice.
    pub fn total_memory_cells(&self) -> usize {
        self.pe_memory_cells * (self.n_pe + 1)
    }

    /// First cell index belonging to the CU's private memory tail.
    pub fn cu_memory_base(&self) -> usize {
        self.pe_memory_cells * self.n_pe
    }
}
