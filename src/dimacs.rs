//! DIMACS CNF parsing.
//!
//! The whole input is read into memory first, then scanned once by a forward-only
//! [`Cursor`]. Every completed clause is handed to a [`ClauseSink`] immediately;
//! if the sink reports a contradiction the rest of the input is never looked at.
//!
//! ```text
//! c comment lines and the problem line are skipped wholesale
//! p cnf 3 2
//! 1 -2 0
//! 2 3 -1 0
//! ```
//!
//! Malformed integers are reported as [`ParseError`] without any attempt to
//! resynchronize. Whether that is fatal is up to the caller; the executables
//! terminate on it.

use std::io::{self, Read};

use log::debug;

use crate::lit::Lit;

const INITIAL_CAPACITY: usize = 65536;

/// Receiver of parsed clauses.
pub trait ClauseSink {
    /// Commits one clause. Returns `false` on an immediate contradiction.
    fn add_clause(&mut self, lits: &[Lit]) -> bool;

    /// Called once after the last clause. Returns `false` on a contradiction.
    fn simplify(&mut self) -> bool;
}

/// Result of feeding a formula into a [`ClauseSink`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// No contradiction found while loading.
    Ok,
    /// The sink detected a contradiction: the formula is trivially unsatisfiable.
    Conflict,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("PARSE ERROR! Unexpected char: {}", display_byte(*.found))]
    UnexpectedChar {
        /// The offending byte, `None` at end of input.
        found: Option<u8>,
        offset: usize,
    },
    #[error("PARSE ERROR! Literal out of range at byte {offset}")]
    OutOfRange { offset: usize },
}

fn display_byte(found: Option<u8>) -> String {
    match found {
        Some(b) => (b as char).to_string(),
        None => String::new(),
    }
}

/// Reads the entire stream into memory.
///
/// The buffer starts at 64 KiB and doubles whenever it fills up.
pub fn read_input<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut data = vec![0u8; INITIAL_CAPACITY];
    let mut size = 0;
    loop {
        if size == data.len() {
            data.resize(data.len() * 2, 0);
        }
        let n = reader.read(&mut data[size..])?;
        if n == 0 {
            break;
        }
        size += n;
    }
    data.truncate(size);
    debug!("read {} bytes of input", size);
    Ok(data)
}

/// Forward-only position in an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The current byte, or `None` at end of input.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn advance(&mut self) {
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if (9..=13).contains(&b) || b == b' ' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skips to just past the next newline (or to the end).
    pub fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.advance();
            if b == b'\n' {
                return;
            }
        }
    }

    /// Parses an optionally signed decimal integer, skipping leading whitespace.
    pub fn parse_int(&mut self) -> Result<i64, ParseError> {
        self.skip_whitespace();
        let mut negative = false;
        match self.peek() {
            Some(b'-') => {
                negative = true;
                self.advance();
            }
            Some(b'+') => self.advance(),
            _ => {}
        }
        match self.peek() {
            Some(b) if b.is_ascii_digit() => {}
            found => {
                return Err(ParseError::UnexpectedChar {
                    found,
                    offset: self.pos,
                })
            }
        }
        let start = self.pos;
        let mut value: i64 = 0;
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0') as i64))
                .ok_or(ParseError::OutOfRange { offset: start })?;
            self.advance();
        }
        Ok(if negative { -value } else { value })
    }
}

/// Reads one `0`-terminated clause into `lits`, which is cleared first.
fn read_clause(cursor: &mut Cursor<'_>, lits: &mut Vec<Lit>) -> Result<(), ParseError> {
    lits.clear();
    loop {
        let offset = cursor.offset();
        let parsed = cursor.parse_int()?;
        if parsed == 0 {
            return Ok(());
        }
        let lit = i32::try_from(parsed).map_err(|_| ParseError::OutOfRange { offset })?;
        lits.push(Lit::from_dimacs(lit));
    }
}

/// Feeds every clause of `data` into `sink`, then calls [`ClauseSink::simplify`].
///
/// Stops at the first clause the sink rejects and returns [`Outcome::Conflict`].
pub fn parse<S: ClauseSink>(data: &[u8], sink: &mut S) -> Result<Outcome, ParseError> {
    let mut cursor = Cursor::new(data);
    let mut lits = Vec::new();
    let mut clauses = 0usize;

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some(b'c') | Some(b'p') => cursor.skip_line(),
            Some(_) => {
                read_clause(&mut cursor, &mut lits)?;
                clauses += 1;
                if !sink.add_clause(&lits) {
                    debug!("conflict while adding clause #{}", clauses);
                    return Ok(Outcome::Conflict);
                }
            }
        }
    }

    debug!("parsed {} clauses", clauses);
    if sink.simplify() {
        Ok(Outcome::Ok)
    } else {
        Ok(Outcome::Conflict)
    }
}

/// Returns `(variables, clauses)` from the first `p <fmt> V C` line, if present.
pub fn header(data: &[u8]) -> Option<(usize, usize)> {
    let mut cursor = Cursor::new(data);
    loop {
        cursor.skip_whitespace();
        match cursor.peek()? {
            b'p' => {
                let start = cursor.offset();
                cursor.skip_line();
                let line = std::str::from_utf8(&data[start..cursor.offset()]).ok()?;
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 4 {
                    return None;
                }
                let vars = parts[2].parse().ok()?;
                let clauses = parts[3].parse().ok()?;
                return Some((vars, clauses));
            }
            b'c' => cursor.skip_line(),
            _ => return None,
        }
    }
}
