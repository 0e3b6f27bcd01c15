//--> Imports <--

use std::io;

//--> Constants <--

const DATA_PER_RECORD: usize = 16;

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_LINEAR_ADDRESS: u8 = 0x04;

//--> Structs <--

/// Turns a run of bytes into Intel HEX text, handing each finished record line to `sink`.
pub struct RecordEncoder<F: FnMut(&str) -> io::Result<()>> {
	sink: F,
	// Address of the first byte in `buffer`.
	address: u32,
	// Upper 16 address bits last announced with a type 04 record.
	segment: u16,
	buffer: Vec<u8>,
}

//--> Functions <--

impl<F: FnMut(&str) -> io::Result<()>> RecordEncoder<F> {
	pub fn new(sink: F) -> RecordEncoder<F> {
		RecordEncoder { sink, address: 0, segment: 0, buffer: Vec::with_capacity(DATA_PER_RECORD) }
	}

	/// Starts a new record at `address`, flushing whatever is buffered first.
	pub fn set_address(&mut self, address: u32) -> io::Result<()> {
		self.flush()?;
		self.address = address;
		Ok(())
	}

	pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
		for byte in bytes {
			self.buffer.push(*byte);

			// Records never straddle a 64 KiB boundary.
			let next = self.address + self.buffer.len() as u32;

			if self.buffer.len() == DATA_PER_RECORD || next & 0xffff == 0 { self.flush()?; }
		}

		Ok(())
	}

	/// Flushes the last data record and writes the end-of-file record.
	pub fn end(mut self) -> io::Result<()> {
		self.flush()?;
		self.record(END_OF_FILE, 0, &[])
	}

	fn flush(&mut self) -> io::Result<()> {
		if self.buffer.is_empty() { return Ok(()) }

		let segment = (self.address >> 16) as u16;

		if segment != self.segment {
			self.record(EXTENDED_LINEAR_ADDRESS, 0, &segment.to_be_bytes())?;
			self.segment = segment;
		}

		let data = std::mem::take(&mut self.buffer);
		self.record(DATA, self.address as u16, &data)?;
		self.address += data.len() as u32;

		Ok(())
	}

	fn record(&mut self, kind: u8, address: u16, data: &[u8]) -> io::Result<()> {
		let [high, low] = address.to_be_bytes();
		let mut fields: Vec<u8> = vec![data.len() as u8, high, low, kind];
		fields.extend_from_slice(data);

		let mut line = String::with_capacity(2 * fields.len() + 4);
		line.push(':');

		for byte in &fields {
			line.push_str(&format!("{:02X}", byte));
		}

		line.push_str(&format!("{:02X}\n", checksum(&fields)));

		(self.sink)(&line)
	}
}

// Two's complement of the byte sum, so a whole record adds up to zero.
fn checksum(bytes: &[u8]) -> u8 {
	bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)).wrapping_neg()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(address: u32, bytes: &[u8]) -> Vec<String> {
		let mut lines: Vec<String> = Vec::new();

		{
			let mut encoder = RecordEncoder::new(|line: &str| {
				lines.push(String::from(line));
				Ok(())
			});

			encoder.set_address(address).unwrap();
			encoder.write_bytes(bytes).unwrap();
			encoder.end().unwrap();
		}

		lines
	}

	fn parse_hex_byte(s: &str) -> u8 {
		u8::from_str_radix(s, 16).unwrap()
	}

	fn verify_checksum(line: &str) {
		let digits = line.trim_end().strip_prefix(':').unwrap();
		let sum = (0..digits.len()).step_by(2).fold(0u8, |sum, i| sum.wrapping_add(parse_hex_byte(&digits[i..i + 2])));

		assert_eq!(sum, 0, "checksum mismatch for {}", line);
	}

	#[test]
	fn short_run_is_one_record_plus_end() {
		assert_eq!(encode(0x100, &[0x3e, 0x05, 0xc9]), vec![
			String::from(":030100003E05C9F0\n"),
			String::from(":00000001FF\n"),
		]);
	}

	#[test]
	fn records_hold_sixteen_bytes_each() {
		let lines = encode(0x8000, &[0xaa; 40]);

		assert_eq!(lines.len(), 4);
		assert!(lines[0].starts_with(":10800000"));
		assert!(lines[1].starts_with(":10801000"));
		assert!(lines[2].starts_with(":08802000"));

		for line in &lines {
			verify_checksum(line);
		}
	}

	#[test]
	fn records_split_at_the_top_of_a_segment() {
		let lines = encode(0xfff8, &[0x11; 16]);

		assert!(lines[0].starts_with(":08FFF800"));
		assert_eq!(lines[1], ":020000040001F9\n");
		assert!(lines[2].starts_with(":08000000"));
	}

	#[test]
	fn nothing_written_is_just_the_end_record() {
		assert_eq!(encode(0, &[]), vec![String::from(":00000001FF\n")]);
	}
}
