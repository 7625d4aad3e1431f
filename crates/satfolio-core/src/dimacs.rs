//! DIMACS CNF reader.
//!
//! Accepts comment lines (`c ...`), one `p cnf <vars> <clauses>` header, and
//! zero-terminated clauses that may span lines. A `%` line ends the input
//! (SATLIB convention). Literals outside the declared variable range and a
//! clause count that disagrees with the header are parse errors.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::cnf::Cnf;
use crate::error::{Result, SatfolioError};
use crate::lit::Lit;

/// Reads a DIMACS CNF file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Cnf> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

/// Parses DIMACS CNF text.
pub fn parse_str(input: &str) -> Result<Cnf> {
    parse_reader(input.as_bytes())
}

pub fn parse_reader<R: BufRead>(reader: R) -> Result<Cnf> {
    let mut header: Option<(usize, usize)> = None;
    let mut cnf = Cnf::new(0);
    let mut clause: Vec<Lit> = Vec::new();
    let mut last_line = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let line = match line {
            Ok(line) => line,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                return Err(SatfolioError::parse(line_no, "line is not valid UTF-8"));
            }
            Err(err) => return Err(err.into()),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        if trimmed.starts_with('%') {
            break;
        }
        if trimmed.starts_with('p') {
            if header.is_some() {
                return Err(SatfolioError::parse(line_no, "duplicate problem line"));
            }
            let parsed = parse_header(trimmed, line_no)?;
            cnf = Cnf::new(parsed.0);
            header = Some(parsed);
            continue;
        }
        let Some((num_vars, _)) = header else {
            return Err(SatfolioError::parse(line_no, "clause before problem line"));
        };
        for token in trimmed.split_whitespace() {
            let value: i64 = token.parse().map_err(|_| {
                SatfolioError::parse(line_no, format!("invalid literal `{}`", token))
            })?;
            if value == 0 {
                cnf.add_clause(clause.drain(..));
                continue;
            }
            if value.unsigned_abs() as usize > num_vars {
                return Err(SatfolioError::parse(
                    line_no,
                    format!("literal {} exceeds declared variable count {}", value, num_vars),
                ));
            }
            let lit = i32::try_from(value)
                .ok()
                .and_then(Lit::from_dimacs)
                .ok_or_else(|| {
                    SatfolioError::parse(line_no, format!("literal {} out of range", value))
                })?;
            clause.push(lit);
        }
    }

    let Some((_, num_clauses)) = header else {
        return Err(SatfolioError::parse(last_line, "missing problem line"));
    };
    if !clause.is_empty() {
        cnf.add_clause(clause);
    }
    if cnf.num_clauses() != num_clauses {
        return Err(SatfolioError::parse(
            last_line,
            format!(
                "header declares {} clauses but {} were read",
                num_clauses,
                cnf.num_clauses()
            ),
        ));
    }
    Ok(cnf)
}

fn parse_header(line: &str, line_no: usize) -> Result<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        ["p", "cnf", vars, clauses] => {
            let vars = vars
                .parse()
                .map_err(|_| SatfolioError::parse(line_no, "invalid variable count"))?;
            let clauses = clauses
                .parse()
                .map_err(|_| SatfolioError::parse(line_no, "invalid clause count"))?;
            if vars > i32::MAX as usize {
                return Err(SatfolioError::parse(line_no, "variable count too large"));
            }
            Ok((vars, clauses))
        }
        _ => Err(SatfolioError::parse(
            line_no,
            "expected `p cnf <variables> <clauses>`",
        )),
    }
}
