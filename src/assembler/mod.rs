//! Three-pass assembler (C5): pseudo-ops, then labels, then emit (§4.5).
//!
//! Parameterized by [`Width`] so address widths, instruction stride, and
//! overflow checks all match the chosen encoding, and by [`MachineConfig`]
//! so `BSS` can be checked against the machine's actual PE count and
//! per-PE memory capacity.

pub mod lexer;

use crate::config::{MachineConfig, Width};
use crate::error::{AssembleError, ProgramError};
use crate::instruction::{OpCode, Params};
use crate::program::Program;
use lexer::{lex, LexedLine, Statement};
use std::collections::HashMap;

/// Threaded explicitly through assembly instead of any process-wide state --
/// this is what replaces the original's global next-data-pointer (spec.md §9).
struct AssemblerContext {
    aliases: HashMap<String, i64>,
    labels: HashMap<String, i64>,
    next_data_addr: u16,
    bss_used_height: usize,
}

impl AssemblerContext {
    fn new() -> Self {
        Self { aliases: HashMap::new(), labels: HashMap::new(), next_data_addr: 0, bss_used_height: 0 }
    }

    fn define(&mut self, name: &str, value: i64, as_label: bool) -> Result<(), AssembleError> {
        if self.aliases.contains_key(name) || self.labels.contains_key(name) {
            return Err(AssembleError::DuplicateSymbol(name.to_string()));
        }
        if as_label {
            self.labels.insert(name.to_string(), value);
        } else {
            self.aliases.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn resolve(&self, line: usize, token: &str) -> Result<i64, AssembleError> {
        if let Ok(value) = token.parse::<i64>() {
            return Ok(value);
        }
        if let Some(value) = self.aliases.get(token) {
            return Ok(*value);
        }
        if let Some(value) = self.labels.get(token) {
            return Ok(*value);
        }
        Err(AssembleError::UndefinedSymbol { line, symbol: token.to_string() })
    }
}

/// Assembles source text into an encoded [`Program`] for the given machine
/// width and configuration.
pub fn assemble(source: &str, width: Width, config: &MachineConfig) -> Result<Program, AssembleError> {
    let lines = lex(source)?;
    let mut ctx = AssemblerContext::new();
    let mut program = Program::new(width);
    let mut seen_instruction = false;
    let mut instruction_lines: Vec<&LexedLine> = Vec::new();

    // Pass 1: pseudo-ops. Also collects instruction lines for passes 2/3,
    // and enforces that every pseudo-op precedes all real instructions.
    for line in &lines {
        match &line.statement {
            Statement::Instruction { .. } => {
                seen_instruction = true;
                instruction_lines.push(line);
            }
            Statement::PseudoData { name, value } => {
                require_pseudo_ops_first(seen_instruction, line.line_no, "DATA")?;
                check_range(line.line_no, *value, width.param_limit(), "DATA value")?;
                let addr = ctx.next_data_addr;
                if (addr as i64) >= width.address_limit() {
                    return Err(AssembleError::OutOfRange {
                        line: line.line_no,
                        value: addr as i64,
                        context: "DATA address".to_string(),
                        limit: width.address_limit(),
                    });
                }
                program.data_op(addr, *value).map_err(|e| wrap(line.line_no, e))?;
                ctx.define(name, addr as i64, false)?;
                ctx.next_data_addr += 1;
            }
            Statement::PseudoEquiv { name, value } => {
                require_pseudo_ops_first(seen_instruction, line.line_no, "EQUIV")?;
                ctx.define(name, *value, false)?;
            }
            Statement::PseudoBss { name, width: bss_width, height } => {
                require_pseudo_ops_first(seen_instruction, line.line_no, "BSS")?;
                if *bss_width > config.n_pe {
                    return Err(AssembleError::BssWidthExceedsPeCount { line: line.line_no, width: *bss_width, n_pe: config.n_pe });
                }
                let row = ctx.bss_used_height;
                let used = ctx.bss_used_height + height;
                if used > config.pe_memory_cells {
                    return Err(AssembleError::BssOverflow { line: line.line_no, used, capacity: config.pe_memory_cells });
                }
                ctx.bss_used_height = used;
                ctx.define(name, row as i64, false)?;
            }
        }
    }

    // Pass 2: labels. A label resolves to the instruction index it prefixes,
    // counting from the end of the pseudo-op-emitted prefix.
    let prefix_count = program.size();
    for (relative_index, line) in instruction_lines.iter().enumerate() {
        if let Statement::Instruction { label: Some(label), .. } = &line.statement {
            ctx.define(label, prefix_count + relative_index as i64, true)?;
        }
    }

    // Pass 3: emit. Resolve operands against aliases/labels/literals, and
    // push the fixed-width record for each mnemonic.
    for line in &instruction_lines {
        let Statement::Instruction { mnemonic, operands, .. } = &line.statement else {
            unreachable!("instruction_lines only contains Instruction statements");
        };
        let op = OpCode::from_mnemonic(mnemonic)
            .ok_or_else(|| AssembleError::UnknownMnemonic { line: line.line_no, mnemonic: mnemonic.clone() })?;
        let expected = op.operand_count();
        if operands.len() != expected {
            return Err(AssembleError::WrongOperandCount {
                line: line.line_no,
                mnemonic: mnemonic.clone(),
                expected,
                got: operands.len(),
            });
        }

        if op.is_memory_form() {
            emit_memory_form(&mut program, &ctx, line.line_no, op, operands, width)?;
        } else {
            emit_param_form(&mut program, &ctx, line.line_no, op, operands, width)?;
        }
    }

    Ok(program)
}

fn require_pseudo_ops_first(seen_instruction: bool, line: usize, mnemonic: &str) -> Result<(), AssembleError> {
    if seen_instruction {
        Err(AssembleError::PseudoOpAfterCode { line, mnemonic: mnemonic.to_string() })
    } else {
        Ok(())
    }
}

fn emit_memory_form(
    program: &mut Program,
    ctx: &AssemblerContext,
    line: usize,
    op: OpCode,
    operands: &[String],
    width: Width,
) -> Result<(), AssembleError> {
    // LDX/STX take (reg, addr); CLOAD/CSTORE take (addr) and always target
    // the CU arithmetic register, so their wire-level reg field is unused.
    let (reg, addr) = if operands.len() == 2 {
        (ctx.resolve(line, &operands[0])?, ctx.resolve(line, &operands[1])?)
    } else {
        (0, ctx.resolve(line, &operands[0])?)
    };
    check_range(line, reg, width.param_limit(), "register operand")?;
    check_range(line, addr, width.address_limit(), "memory address")?;
    program.push_mem(op, reg as u8, addr as u16).map_err(|e| wrap(line, e))
}

fn emit_param_form(
    program: &mut Program,
    ctx: &AssemblerContext,
    line: usize,
    op: OpCode,
    operands: &[String],
    width: Width,
) -> Result<(), AssembleError> {
    let mut resolved = [0i64; 3];
    for (i, operand) in operands.iter().enumerate() {
        resolved[i] = ctx.resolve(line, operand)?;
    }

    // CMPX's target is a full address-width jump, not a regular narrow
    // param -- everything else is bounded by the encoding's param field.
    let param_limit = width.param_limit();
    if op == OpCode::Cmpx {
        check_range(line, resolved[0], param_limit, "CMPX register operand")?;
        check_range(line, resolved[1], param_limit, "CMPX register operand")?;
        check_range(line, resolved[2], width.address_limit(), "CMPX branch target")?;
    } else if op == OpCode::Mov {
        // MOV's two operands select a PE register (Index/Routing/Arithmetic),
        // not an arbitrary narrow param -- constrain them to that enum's
        // wire range so a bad operand is a line-numbered assembly error
        // instead of a panic deep in vector_ops::mov.
        check_range(line, resolved[0], 3, "MOV register operand")?;
        check_range(line, resolved[1], 3, "MOV register operand")?;
    } else {
        for value in resolved.iter().take(operands.len()) {
            check_range(line, *value, param_limit, "param operand")?;
        }
    }

    let params = Params { p0: resolved[0] as u8, p1: resolved[1] as u8, p2: resolved[2] as u16 };
    program.push(op, params).map_err(|e| wrap(line, e))
}

fn check_range(line: usize, value: i64, limit: i64, context: &str) -> Result<(), AssembleError> {
    if value < 0 || value >= limit {
        Err(AssembleError::OutOfRange { line, value, context: context.to_string(), limit })
    } else {
        Ok(())
    }
}

/// Translates a [`ProgramError`] raised deep inside encoding into a
/// line-numbered [`AssembleError`], preserving whatever detail the
/// program-level error carried.
fn wrap(line: usize, err: ProgramError) -> AssembleError {
    match err {
        ProgramError::ParamOutOfRange { value } => {
            AssembleError::OutOfRange { line, value, context: "encoded param".to_string(), limit: i64::MAX }
        }
        ProgramError::AddressOutOfRange { address, limit } => {
            AssembleError::OutOfRange { line, value: address, context: "encoded address".to_string(), limit: 1i64 << limit }
        }
        other => AssembleError::MalformedLine { line, reason: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MachineConfig {
        MachineConfig { n_index_registers: 8, n_pe: 4, pe_memory_cells: 16, width: Width::Bits24 }
    }

    #[test]
    fn assembles_immediate_store_load() {
        let program = assemble("LDXI 0,7\nSTX 0,0\nLDX 1,0", Width::Bits24, &config()).unwrap();
        assert_eq!(program.size(), 3);
    }

    #[test]
    fn data_pseudo_op_emits_two_instructions_and_an_alias() {
        let source = "answer DATA 42\nCLOAD answer";
        let program = assemble(source, Width::Bits24, &config()).unwrap();
        // DATA -> LDXI + STX, then CLOAD -- three instructions total.
        assert_eq!(program.size(), 3);
    }

    #[test]
    fn equiv_is_a_pure_alias() {
        let source = "FOO EQUIV 3\nLDXI FOO,1";
        let program = assemble(source, Width::Bits24, &config()).unwrap();
        assert_eq!(program.size(), 1);
    }

    #[test]
    fn bss_rejects_width_over_n_pe() {
        let source = "buf BSS 5x2";
        let err = assemble(source, Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::BssWidthExceedsPeCount { .. }));
    }

    #[test]
    fn bss_rejects_cumulative_height_overflow() {
        let source = "a BSS 2x10\nb BSS 2x10";
        let err = assemble(source, Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::BssOverflow { .. }));
    }

    #[test]
    fn pseudo_op_after_instruction_is_rejected() {
        let source = "CBCAST\nfoo EQUIV 1";
        let err = assemble(source, Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::PseudoOpAfterCode { .. }));
    }

    #[test]
    fn label_resolves_to_forward_instruction_index() {
        let source = "CBCAST\ntarget: CBCAST\nLDXI 0,1\nCMPX 0,0,target";
        let program = assemble(source, Width::Bits24, &config()).unwrap();
        assert_eq!(program.size(), 4);
    }

    #[test]
    fn unknown_mnemonic_errors() {
        let err = assemble("NOPE 1,2", Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::UnknownMnemonic { .. }));
    }

    #[test]
    fn wrong_operand_count_errors() {
        let err = assemble("LDXI 0", Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::WrongOperandCount { .. }));
    }

    #[test]
    fn undefined_symbol_errors() {
        let err = assemble("CMPX 0,0,nowhere", Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::UndefinedSymbol { .. }));
    }

    #[test]
    fn duplicate_symbol_errors() {
        let source = "foo EQUIV 1\nfoo EQUIV 2";
        let err = assemble(source, Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::DuplicateSymbol(_)));
    }

    #[test]
    fn mov_rejects_an_out_of_range_register_operand() {
        let err = assemble("MOV 0,5", Width::Bits24, &config()).unwrap_err();
        assert!(matches!(err, AssembleError::OutOfRange { .. }));
    }
}
