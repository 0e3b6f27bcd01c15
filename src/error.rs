//--> Imports <--

use std::{
	fmt,
	io,
};

use thiserror::Error;

//--> Type Aliases <--

pub type Result<T> = std::result::Result<T, AsmError>;

//--> Structs <--

/// An error pinned to the source line that was being compiled when it fired.
#[derive(Debug)]
pub struct LineError {
	pub line: usize,
	pub text: String,
	pub error: AsmError,
}

//--> Enums <--

#[derive(Debug, Error)]
pub enum AsmError {
	#[error("Syntax error: {0}")]
	Syntax(String),

	#[error("Unknown instruction or directive '{0}'")]
	UnknownMnemonic(String),

	#[error("Invalid operands for {0}")]
	InvalidOperands(String),

	#[error("Symbol '{0}' is already defined")]
	DuplicateSymbol(String),

	#[error("Address overflow at ${0:X} -> exit")]
	AddressOverflow(u32),

	#[error("Division by zero")]
	DivisionByZero,

	#[error("Value out of range: {0}")]
	OutOfRange(String),

	#[error("Symbol '{0}' must be defined before this point")]
	Undefined(String),

	#[error("{source} (patching a reference from line {line})")]
	Deferred { line: usize, source: Box<AsmError> },

	#[error("Unresolved symbols: {}", .0.join(", "))]
	Unresolved(Vec<String>),

	#[error("No data created")]
	NoData,

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

//--> Functions <--

impl LineError {
	pub fn new(line: usize, text: &str, error: AsmError) -> LineError {
		LineError { line, text: String::from(text.trim()), error }
	}
}

impl fmt::Display for LineError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Error in line {}: {}\n{}", self.line, self.error, self.text)
	}
}

impl std::error::Error for LineError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { Some(&self.error) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn line_error_shows_line_message_and_trimmed_text() {
		let err = LineError::new(12, "\t  LD A,(IX+300)   ", AsmError::OutOfRange(String::from("index displacement 300")));

		assert_eq!(err.to_string(), "Error in line 12: Value out of range: index displacement 300\nLD A,(IX+300)");
	}

	#[test]
	fn unresolved_lists_every_name() {
		let err = AsmError::Unresolved(vec![String::from("foo"), String::from("bar")]);

		assert_eq!(err.to_string(), "Unresolved symbols: foo, bar");
	}

	#[test]
	fn deferred_errors_name_the_referencing_line() {
		let err = AsmError::Deferred { line: 3, source: Box::new(AsmError::OutOfRange(String::from("byte value 300"))) };

		assert_eq!(err.to_string(), "Value out of range: byte value 300 (patching a reference from line 3)");
	}
}
