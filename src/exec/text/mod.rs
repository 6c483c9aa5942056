// src/exec/text/mod.rs

//! Line-oriented step scripts.
//!
//! ```text
//! # greet everyone who says hello, then quit on "bye"
//! event greet hello {who}
//! event bye #*#bye#*#
//! :loop
//! ifset bye done
//! delay 100
//! ifset who hi
//! goto loop
//! :hi
//! print hi $who
//! unset who
//! goto loop
//! :done
//! return $greet
//! ```

pub mod interp;
pub mod parse;

pub use interp::{StepScript, interpolate};
pub use parse::{Instr, ParseError, Program, parse_program};

/// Parse `source` into a ready-to-run script.
pub fn compile(source: &str) -> Result<StepScript, ParseError> {
    parse_program(source).map(StepScript::new)
}
