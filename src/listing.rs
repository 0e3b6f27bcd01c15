//--> Imports <--

use std::io::{self, Write};

use crate::z80::{
	memory::Memory,
	symbols::{SymbolKind, SymbolTable},
	Assembly,
	SourceLine,
};

//--> Constants <--

const BYTES_PER_ROW: u32 = 4;

// Longest byte dump one line gets before its middle is cut out.
const MAX_ROWS: u32 = 8;

// Rows kept at the head of a cut dump. The last two rows are always kept too.
const HEAD_ROWS: u32 = MAX_ROWS - 2;

// Column the source text starts at when a line has no bytes.
const TEXT_COLUMN: usize = 24;

//--> Functions <--

/// Writes the whole listing: every source line with its bytes, then the cross reference.
pub fn write_listing<W: Write>(out: &mut W, assembly: &Assembly) -> io::Result<()> {
	for line in &assembly.lines {
		write_line(out, &assembly.memory, line)?;
	}

	write_cross_reference(out, &assembly.symbols)
}

/// Address, up to four bytes per row, and the source text after the first row of opcode bytes.
pub fn write_line<W: Write>(out: &mut W, memory: &Memory, line: &SourceLine) -> io::Result<()> {
	let text = line.text.as_str();

	if line.first >= line.last {
		return if text.is_empty() { writeln!(out) } else { writeln!(out, "{:w$}{}", "", text, w = TEXT_COLUMN) };
	}

	let code_len = line.last - line.first;
	let end_op = (line.last - 1).min(line.first + BYTES_PER_ROW - 1);
	let last_row = (code_len - 1) / BYTES_PER_ROW;
	let elide = last_row >= MAX_ROWS;

	let mut address = line.first;

	while address < line.last {
		let row = (address - line.first) / BYTES_PER_ROW;
		let col = (address - line.first) % BYTES_PER_ROW;

		if elide && row >= HEAD_ROWS && row + 2 <= last_row {
			if row == HEAD_ROWS { writeln!(out, "...")?; }
			address += BYTES_PER_ROW;
			continue;
		}

		if col == 0 { write!(out, "{:04X}   ", address)?; }

		write!(out, " {:02X}", memory.get(address))?;

		if address == end_op {
			writeln!(out, "{:w$}{}", "", text, w = (5 + 3 * (3 - col)) as usize)?;
		} else if col == BYTES_PER_ROW - 1 || address == line.last - 1 {
			writeln!(out)?;
		}

		address += 1;
	}

	Ok(())
}

/// Labels with their addresses and names nobody defined. Constants are left out.
pub fn write_cross_reference<W: Write>(out: &mut W, symbols: &SymbolTable) -> io::Result<()> {
	write!(out, "\nCross reference\n\n")?;

	for (name, symbol) in symbols.iter() {
		if symbol.is_pending() {
			writeln!(out, "----    {} is undefined!", name)?;
		} else if let (SymbolKind::Label, Some(value)) = (symbol.kind, symbols.value(name)) {
			writeln!(out, "{:04X}{:>w$}", value, name, w = 20 + name.len())?;
		}
	}

	Ok(())
}
