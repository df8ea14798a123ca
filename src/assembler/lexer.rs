//! Single-pass-left-to-right, whitespace-delimited, case-insensitive
//! tokenizer that turns one source line into a [`Statement`] (§4.5).

use crate::error::AssembleError;

const PSEUDO_OPS: [&str; 3] = ["DATA", "EQUIV", "BSS"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    PseudoData { name: String, value: i64 },
    PseudoEquiv { name: String, value: i64 },
    PseudoBss { name: String, width: usize, height: usize },
    Instruction { label: Option<String>, mnemonic: String, operands: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexedLine {
    pub line_no: usize,
    pub statement: Statement,
}

/// Normalizes (trims, drops blank lines) and lexes a whole source text.
pub fn lex(source: &str) -> Result<Vec<LexedLine>, AssembleError> {
    let mut lines = Vec::new();
    for (offset, raw) in source.lines().enumerate() {
        let line_no = offset + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        lines.push(LexedLine { line_no, statement: lex_line(line_no, trimmed)? });
    }
    Ok(lines)
}

fn lex_line(line_no: usize, text: &str) -> Result<Statement, AssembleError> {
    let mut words = text.split_whitespace();
    let first = words.next().ok_or_else(|| AssembleError::MalformedLine {
        line: line_no,
        reason: "empty statement".to_string(),
    })?;

    if let Some(label) = first.strip_suffix(':') {
        let mnemonic = words.next().ok_or_else(|| AssembleError::MalformedLine {
            line: line_no,
            reason: "label with no instruction".to_string(),
        })?;
        let operands = split_operands(&words.collect::<Vec<_>>().join(" "));
        return Ok(Statement::Instruction {
            label: Some(label.to_string()),
            mnemonic: mnemonic.to_ascii_uppercase(),
            operands,
        });
    }

    let rest: Vec<&str> = words.collect();
    if let Some(second) = rest.first() {
        let kind = second.to_ascii_uppercase();
        if PSEUDO_OPS.contains(&kind.as_str()) {
            let value_tokens = &rest[1..];
            return lex_pseudo_op(line_no, first, &kind, value_tokens);
        }
    }

    let operands = split_operands(&rest.join(" "));
    Ok(Statement::Instruction { label: None, mnemonic: first.to_ascii_uppercase(), operands })
}

fn lex_pseudo_op(line_no: usize, name: &str, kind: &str, value_tokens: &[&str]) -> Result<Statement, AssembleError> {
    let malformed = |reason: &str| AssembleError::MalformedLine { line: line_no, reason: reason.to_string() };

    match kind {
        "DATA" => {
            let raw = value_tokens.first().ok_or_else(|| malformed("DATA requires a value"))?;
            let value = parse_decimal(raw).ok_or_else(|| malformed("DATA value must be a decimal integer"))?;
            Ok(Statement::PseudoData { name: name.to_string(), value })
        }
        "EQUIV" => {
            let raw = value_tokens.first().ok_or_else(|| malformed("EQUIV requires a value"))?;
            let value = parse_decimal(raw).ok_or_else(|| malformed("EQUIV value must be a decimal integer"))?;
            Ok(Statement::PseudoEquiv { name: name.to_string(), value })
        }
        "BSS" => {
            let raw = value_tokens.first().ok_or_else(|| malformed("BSS requires a WxH shape"))?;
            let (w, h) = raw
                .split_once(['x', 'X'])
                .ok_or_else(|| malformed("BSS shape must be WxH"))?;
            let width = w.parse::<usize>().map_err(|_| malformed("BSS width must be a non-negative integer"))?;
            let height = h.parse::<usize>().map_err(|_| malformed("BSS height must be a non-negative integer"))?;
            Ok(Statement::PseudoBss { name: name.to_string(), width, height })
        }
        _ => unreachable!("kind already filtered against PSEUDO_OPS"),
    }
}

fn split_operands(rest: &str) -> Vec<String> {
    if rest.trim().is_empty() {
        return Vec::new();
    }
    rest.split(',').map(|s| s.trim().to_string()).collect()
}

fn parse_decimal(token: &str) -> Option<i64> {
    token.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_plain_instruction() {
        let lines = lex("LDXI 0,7").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].statement,
            Statement::Instruction { label: None, mnemonic: "LDXI".to_string(), operands: vec!["0".to_string(), "7".to_string()] }
        );
    }

    #[test]
    fn lexes_labeled_instruction() {
        let lines = lex("loop: INCX 0,1").unwrap();
        assert_eq!(
            lines[0].statement,
            Statement::Instruction {
                label: Some("loop".to_string()),
                mnemonic: "INCX".to_string(),
                operands: vec!["0".to_string(), "1".to_string()]
            }
        );
    }

    #[test]
    fn lexes_data_pseudo_op() {
        let lines = lex("answer DATA 42").unwrap();
        assert_eq!(lines[0].statement, Statement::PseudoData { name: "answer".to_string(), value: 42 });
    }

    #[test]
    fn lexes_bss_pseudo_op() {
        let lines = lex("buf BSS 4x8").unwrap();
        assert_eq!(lines[0].statement, Statement::PseudoBss { name: "buf".to_string(), width: 4, height: 8 });
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let lines = lex("\n; comment\nCBCAST\n").unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn case_insensitive_mnemonics() {
        let lines = lex("ldxi 0,7").unwrap();
        assert_eq!(
            lines[0].statement,
            Statement::Instruction { label: None, mnemonic: "LDXI".to_string(), operands: vec!["0".to_string(), "7".to_string()] }
        );
    }
}
