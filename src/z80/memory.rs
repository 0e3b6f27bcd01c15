//--> Imports <--

use tracing::trace;

use crate::error::{AsmError, Result};

//--> Constants <--

pub const RAM_SIZE: u32 = 0x10000;

//--> Structs <--

/// The 64 KiB the program is assembled into, plus the write cursor and the span written so far.
pub struct Memory {
	ram: Vec<u8>,
	pub pc: u32,
	min: u32,
	max: u32,
}

//--> Functions <--

impl Memory {
	pub fn new(fill: u8) -> Memory {
		Memory { ram: vec![fill; RAM_SIZE as usize], pc: 0, min: RAM_SIZE, max: 0 }
	}

	/// Refuses addresses past the top of memory and widens the touched range otherwise.
	pub fn check(&mut self, address: u32) -> Result<()> {
		if address >= RAM_SIZE { return Err(AsmError::AddressOverflow(address)) }

		self.min = self.min.min(address);
		self.max = self.max.max(address);

		trace!("check({:04X}) [{:04X}..{:04X}]", address, self.min, self.max);

		Ok(())
	}

	pub fn write(&mut self, address: u32, value: u8) -> Result<()> {
		self.check(address)?;
		self.ram[address as usize] = value;
		Ok(())
	}

	pub fn write_all(&mut self, address: u32, values: &[u8]) -> Result<()> {
		for (offset, value) in values.iter().enumerate() {
			self.write(address + offset as u32, *value)?;
		}

		Ok(())
	}

	/// Stores at the cursor and moves it along.
	pub fn emit(&mut self, value: u8) -> Result<()> {
		self.write(self.pc, value)?;
		self.pc += 1;
		Ok(())
	}

	/// Moves the cursor without writing. It may stop one past the last byte, but no further.
	pub fn skip(&mut self, count: u32) -> Result<()> {
		match self.pc.checked_add(count) {
			Some(end) if end <= RAM_SIZE => {
				self.pc = end;
				Ok(())
			},
			end => Err(AsmError::AddressOverflow(end.unwrap_or(u32::MAX)))
		}
	}

	pub fn get(&self, address: u32) -> u8 {
		self.ram.get(address as usize).copied().unwrap_or(0)
	}

	/// Lowest and highest address written, if anything was.
	pub fn range(&self) -> Option<(u16, u16)> {
		if self.min <= self.max { Some((self.min as u16, self.max as u16)) } else { None }
	}

	pub fn slice(&self, start: u16, end: u16) -> &[u8] {
		&self.ram[start as usize..=end as usize]
	}
}
