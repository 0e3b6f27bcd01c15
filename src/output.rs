//--> Imports <--

use std::io::{self, Write};

use tracing::info;

use crate::{
	error::{AsmError, Result},
	ihex::RecordEncoder,
	z80::memory::Memory,
};

//--> Constants <--

// CP/M loads .com files here.
const COM_ORIGIN: u16 = 0x100;

const C_COLUMNS: usize = 16;

//--> Structs <--

/// The part of memory that goes into the output files.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Image<'a> {
	pub start: u16,
	pub bytes: &'a [u8],
}

//--> Functions <--

/// Everything from `offset` (or the lowest written address) up to the highest written address.
pub fn select(memory: &Memory, offset: Option<u16>) -> Result<Image<'_>> {
	let (min, max) = memory.range().ok_or(AsmError::NoData)?;
	let start = offset.unwrap_or(min);

	if start > max {
		return Err(AsmError::OutOfRange(format!("start offset ${:04X} is past the last byte at ${:04X}", start, max)));
	}

	info!("Writing data range [0x{:04X}...0x{:04X}]", start, max);

	Ok(Image { start, bytes: memory.slice(start, max) })
}

impl Image<'_> {
	/// A binary starting at 0x100 is a CP/M program.
	pub fn is_com(&self) -> bool { self.start == COM_ORIGIN }
}

pub fn write_binary<W: Write>(out: &mut W, image: &Image) -> io::Result<()> {
	out.write_all(image.bytes)
}

pub fn write_hex<W: Write>(out: &mut W, image: &Image) -> io::Result<()> {
	let mut encoder = RecordEncoder::new(|line: &str| out.write_all(line.as_bytes()));

	encoder.set_address(u32::from(image.start))?;
	encoder.write_bytes(image.bytes)?;
	encoder.end()
}

/// A C header with the load address and the bytes as an array, both named after `name`.
pub fn write_c_array<W: Write>(out: &mut W, name: &str, image: &Image) -> io::Result<()> {
	write!(out, "#ifndef INCLUDE_{0}_H\n#define INCLUDE_{0}_H\n\n", name)?;
	writeln!(out, "const uint16_t {}Addr = 0x{:04X};", name, image.start)?;
	write!(out, "const uint8_t {}[] = {{\n  ", name)?;

	let last = image.bytes.len().saturating_sub(1);

	for (i, byte) in image.bytes.iter().enumerate() {
		write!(out, "0x{:02X}", byte)?;

		if i == last {
			write!(out, "\n}};\n\n#endif\n")?;
		} else if i % C_COLUMNS == C_COLUMNS - 1 {
			write!(out, ",\n  ")?;
		} else {
			write!(out, ", ")?;
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn memory_with(start: u32, bytes: &[u8]) -> Memory {
		let mut memory = Memory::new(0xff);
		memory.write_all(start, bytes).unwrap();
		memory
	}

	#[test]
	fn selection_runs_from_lowest_to_highest_write() {
		let memory = memory_with(0x200, &[1, 2, 3]);
		let image = select(&memory, None).unwrap();

		assert_eq!(image, Image { start: 0x200, bytes: &[1, 2, 3] });
		assert!(!image.is_com());
	}

	#[test]
	fn offset_pulls_in_fill_bytes() {
		let memory = memory_with(0x102, &[7]);
		let image = select(&memory, Some(0x100)).unwrap();

		assert_eq!(image.bytes, &[0xff, 0xff, 7]);
		assert!(image.is_com());
	}

	#[test]
	fn offset_past_the_data_is_refused() {
		let memory = memory_with(0x10, &[1]);

		assert!(matches!(select(&memory, Some(0x11)), Err(AsmError::OutOfRange(_))));
	}

	#[test]
	fn empty_memory_has_no_data() {
		assert!(matches!(select(&Memory::new(0), None), Err(AsmError::NoData)));
	}

	#[test]
	fn hex_output_goes_through_the_record_encoder() {
		let memory = memory_with(0x100, &[0x3e, 0x05, 0xc9]);
		let mut out: Vec<u8> = Vec::new();

		write_hex(&mut out, &select(&memory, None).unwrap()).unwrap();

		assert_eq!(String::from_utf8(out).unwrap(), ":030100003E05C9F0\n:00000001FF\n");
	}

	#[test]
	fn c_array_wraps_after_sixteen_values() {
		let bytes: Vec<u8> = (0..17).collect();
		let memory = memory_with(0x4000, &bytes);
		let mut out: Vec<u8> = Vec::new();

		write_c_array(&mut out, "demo", &select(&memory, None).unwrap()).unwrap();

		let expected = String::from("#ifndef INCLUDE_demo_H\n#define INCLUDE_demo_H\n\n")
			+ "const uint16_t demoAddr = 0x4000;\n"
			+ "const uint8_t demo[] = {\n  "
			+ "0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,\n  "
			+ "0x10\n};\n\n#endif\n";

		assert_eq!(String::from_utf8(out).unwrap(), expected);
	}

	#[test]
	fn binary_is_the_bytes_verbatim() {
		let memory = memory_with(0, &[0xde, 0xad]);
		let mut out: Vec<u8> = Vec::new();

		write_binary(&mut out, &select(&memory, None).unwrap()).unwrap();

		assert_eq!(out, vec![0xde, 0xad]);
	}
}
