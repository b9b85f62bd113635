//! Parser for VM source text.
//!
//! The source language is line oriented: one command per line, `//`
//! comments, blank lines ignored. Parsing produces the full [`Command`]
//! sequence for one source unit, or every error found; the code generator
//! downstream assumes commands are valid, so anything malformed must be
//! rejected here.
//!
//! # Example
//!
//! ```
//! use hackvm_parser::parse;
//!
//! let source = "
//!     function Main.main 0
//!     push constant 7
//!     push constant 8
//!     add          // top two stack cells
//!     return
//! ";
//!
//! let commands = parse(source).unwrap();
//! assert_eq!(commands.len(), 5);
//! ```

mod error;

use hackvm_core::{Command, Segment};

pub use error::{ParseError, ParseErrorKind, ParseErrors};

/// Parse one source unit into its command sequence.
///
/// Label and function-name tokens in the result borrow from `source`.
/// All malformed lines are collected; the unit is rejected as a whole if
/// any line fails.
pub fn parse(source: &str) -> Result<Vec<Command<'_>>, ParseErrors> {
    let mut commands = Vec::new();
    let mut errors = ParseErrors::new();

    for (index, raw) in source.lines().enumerate() {
        let line_no = index as u32 + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, line_no) {
            Ok(command) => commands.push(command),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(commands)
    } else {
        Err(errors)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(start) => &line[..start],
        None => line,
    }
}

fn parse_line(line: &str, line_no: u32) -> Result<Command<'_>, ParseError> {
    let mut tokens = line.split_whitespace();
    let op = tokens
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingOperand, line_no, ""))?;

    let command = match op {
        "add" => Command::Add,
        "sub" => Command::Sub,
        "neg" => Command::Neg,
        "and" => Command::And,
        "or" => Command::Or,
        "not" => Command::Not,
        "lt" => Command::Lt,
        "gt" => Command::Gt,
        "eq" => Command::Eq,
        "return" => Command::Return,
        "push" | "pop" => {
            let segment = segment_token(&mut tokens, line_no)?;
            let index = index_token(&mut tokens, line_no)?;
            if op == "push" {
                Command::Push { segment, index }
            } else {
                Command::Pop { segment, index }
            }
        }
        "label" => Command::Label(label_token(&mut tokens, line_no)?),
        "goto" => Command::Goto(label_token(&mut tokens, line_no)?),
        "if-goto" => Command::IfGoto(label_token(&mut tokens, line_no)?),
        "function" => {
            let name = label_token(&mut tokens, line_no)?;
            let locals = index_token(&mut tokens, line_no)?;
            Command::Function { name, locals }
        }
        "call" => {
            let function = label_token(&mut tokens, line_no)?;
            let args = index_token(&mut tokens, line_no)?;
            Command::Call { function, args }
        }
        other => {
            return Err(ParseError::new(
                ParseErrorKind::UnknownOperation,
                line_no,
                other,
            ));
        }
    };

    if let Some(extra) = tokens.next() {
        return Err(ParseError::new(
            ParseErrorKind::TrailingToken,
            line_no,
            extra,
        ));
    }
    Ok(command)
}

fn label_token<'src>(
    tokens: &mut impl Iterator<Item = &'src str>,
    line_no: u32,
) -> Result<&'src str, ParseError> {
    tokens
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingOperand, line_no, ""))
}

fn segment_token<'src>(
    tokens: &mut impl Iterator<Item = &'src str>,
    line_no: u32,
) -> Result<Segment, ParseError> {
    let word = tokens
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingOperand, line_no, ""))?;
    Segment::from_keyword(word)
        .ok_or_else(|| ParseError::new(ParseErrorKind::UnknownSegment, line_no, word))
}

fn index_token<'src>(
    tokens: &mut impl Iterator<Item = &'src str>,
    line_no: u32,
) -> Result<u16, ParseError> {
    let word = tokens
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingOperand, line_no, ""))?;
    word.parse::<u16>()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidIndex, line_no, word))
}
