//--> Imports <--

use indexmap::IndexMap;

use crate::error::{AsmError, Result};

use super::expr::Expr;

//--> Structs <--

/// A patch waiting on at least one undefined symbol.
///
/// `pc` is the address `$` stood for on the line that created it and `line` is that line's number.
/// A fixup depending on several names is registered against each of them; whichever definition
/// lets the expression resolve applies it, the other copies then evaluate to nothing new.
#[derive(Clone, Debug, PartialEq)]
pub struct Fixup {
	pub target: FixupTarget,
	pub expr: Expr,
	pub pc: u32,
	pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
	pub kind: SymbolKind,
	pub state: Resolution,
}

/// Every name seen so far, in order of first appearance.
#[derive(Debug, Default)]
pub struct SymbolTable {
	symbols: IndexMap<String, Symbol>,
}

//--> Enums <--

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
	Label,
	Constant,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
	Defined(i32),
	Pending(Vec<Fixup>),
}

/// How a value is laid into memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
	Byte,
	Word,
	// Signed IX/IY offset.
	Displacement,
	// JR/DJNZ offset, counted from `origin`.
	Relative { origin: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum FixupTarget {
	Memory { address: u32, width: Width },
	// A constant whose defining expression is still waiting.
	Symbol { name: String },
}

//--> Functions <--

impl SymbolTable {
	pub fn new() -> SymbolTable { SymbolTable { symbols: IndexMap::new() } }

	pub fn len(&self) -> usize { self.symbols.len() }

	pub fn is_empty(&self) -> bool { self.symbols.is_empty() }

	pub fn get(&self, name: &str) -> Option<&Symbol> { self.symbols.get(name) }

	/// The value of `name` if it has been defined.
	pub fn value(&self, name: &str) -> Option<i32> {
		match self.symbols.get(name) {
			Some(Symbol { state: Resolution::Defined(v), .. }) => Some(*v),
			_ => None
		}
	}

	/// Defines `name` and hands back whatever fixups were waiting on it, for the caller to apply.
	pub fn define(&mut self, name: &str, value: i32, kind: SymbolKind) -> Result<Vec<Fixup>> {
		match self.symbols.get_mut(name) {
			None => {
				self.symbols.insert(String::from(name), Symbol { kind, state: Resolution::Defined(value) });
				Ok(Vec::new())
			},
			Some(symbol) => match &mut symbol.state {
				Resolution::Defined(_) => Err(AsmError::DuplicateSymbol(String::from(name))),
				Resolution::Pending(fixups) => {
					let fixups = std::mem::take(fixups);

					symbol.kind = kind;
					symbol.state = Resolution::Defined(value);

					Ok(fixups)
				}
			}
		}
	}

	/// Parks `fixup` on `name`, creating a pending entry when the name is new.
	pub fn add_fixup(&mut self, name: &str, fixup: Fixup) {
		let symbol = self.symbols.entry(String::from(name)).or_insert_with(|| Symbol {
			kind: SymbolKind::Label,
			state: Resolution::Pending(Vec::new())
		});

		if let Resolution::Pending(fixups) = &mut symbol.state {
			fixups.push(fixup);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
		self.symbols.iter().map(|(name, symbol)| (name.as_str(), symbol))
	}

	/// Names that were referenced but never defined.
	pub fn unresolved(&self) -> Vec<String> {
		self.iter().filter(|(_, s)| s.is_pending()).map(|(name, _)| String::from(name)).collect()
	}
}

impl Symbol {
	pub fn is_pending(&self) -> bool { matches!(self.state, Resolution::Pending(_)) }
}

impl Width {
	/// Checks `value` fits and returns the bytes to store, low byte first.
	pub fn encode(self, value: i32) -> Result<Vec<u8>> {
		match self {
			Width::Byte => {
				if !(-128..=255).contains(&value) { return Err(AsmError::OutOfRange(format!("byte value {}", value))) }
				Ok(vec![value as u8])
			},
			Width::Word => {
				if !(-32768..=65535).contains(&value) { return Err(AsmError::OutOfRange(format!("word value {}", value))) }
				Ok((value as u16).to_le_bytes().to_vec())
			},
			Width::Displacement => {
				if !(-128..=127).contains(&value) { return Err(AsmError::OutOfRange(format!("index displacement {}", value))) }
				Ok(vec![value as u8])
			},
			Width::Relative { origin } => {
				let offset = value.wrapping_sub(origin as i32);

				if !(-128..=127).contains(&offset) { return Err(AsmError::OutOfRange(format!("relative jump distance {}", offset))) }
				Ok(vec![offset as u8])
			},
		}
	}

	pub fn size(self) -> u32 {
		if let Width::Word = self { 2 } else { 1 }
	}
}
