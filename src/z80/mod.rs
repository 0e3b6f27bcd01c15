//--> Imports <--

// Splits source lines into labels, mnemonics and operand tokens.
pub mod lexer;

// Operand expressions and their evaluation.
pub mod expr;

// Names, their values, and the patches waiting on them.
pub mod symbols;

// The 64 KiB image being assembled.
pub mod memory;

// Register and addressing mode recognition.
pub mod operand;

// Z80 opcode tables.
pub mod encoder;

// ORG, DEFB and friends.
pub mod directive;

use tracing::{debug, info, warn};

use crate::error::{AsmError, LineError, Result};

use self::{
	directive::Directive,
	expr::{Expr, Value},
	memory::Memory,
	symbols::{Fixup, FixupTarget, SymbolKind, SymbolTable, Width},
};

//--> Structs <--

/// Settings that change what the core produces.
#[derive(Clone, Debug, Default)]
pub struct Config {
	pub fill: u8,
	pub unresolved: Severity,
}

/// Everything one compilation run works on, threaded through the lexer, encoder and directives.
pub struct CompilationContext {
	pub memory: Memory,
	pub symbols: SymbolTable,
	pub line: usize,
	// PC at the start of the current line; what `$` evaluates to.
	pub line_pc: u32,
	// First address the current line actually wrote to.
	line_start: Option<u32>,
}

/// What a source line turned into, kept for the listing.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceLine {
	pub first: u32,
	pub last: u32,
	pub text: String,
}

/// The finished run.
pub struct Assembly {
	pub memory: Memory,
	pub symbols: SymbolTable,
	pub lines: Vec<SourceLine>,
	pub warnings: Vec<String>,
}

//--> Enums <--

/// How to treat names that are still undefined when the source runs out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
	#[default]
	Ignore,
	Warn,
	Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
	Continue,
	Stop,
}

//--> Functions <--

/// Assembles a whole source text in one pass. The first error ends the run.
pub fn assemble(source: &str, config: &Config) -> std::result::Result<Assembly, LineError> {
	let mut ctx = CompilationContext::new(config.fill);
	let mut lines: Vec<SourceLine> = Vec::new();
	let mut last_line: usize = 0;

	for (index, text) in source.lines().enumerate() {
		let number = index + 1;
		last_line = number;

		ctx.begin_line(number);

		let flow = compile_line(&mut ctx, text).map_err(|e| LineError::new(number, text, e))?;

		lines.push(SourceLine {
			first: ctx.line_start.unwrap_or(ctx.memory.pc),
			last: ctx.memory.pc,
			text: String::from(text)
		});

		if let Flow::Stop = flow {
			debug!("END in line {}", number);
			break;
		}
	}

	let mut warnings: Vec<String> = Vec::new();
	let unresolved = ctx.symbols.unresolved();

	if !unresolved.is_empty() {
		match config.unresolved {
			Severity::Ignore => {},
			Severity::Warn => {
				for name in unresolved {
					warn!("{} is never defined", name);
					warnings.push(format!("Symbol '{}' is never defined", name));
				}
			},
			Severity::Error => return Err(LineError::new(last_line, "", AsmError::Unresolved(unresolved))),
		}
	}

	match ctx.memory.range() {
		Some((min, max)) => info!("{} lines, {} symbols, ${:04X}..${:04X}", last_line, ctx.symbols.len(), min, max),
		None => info!("{} lines, {} symbols, nothing written", last_line, ctx.symbols.len()),
	}

	Ok(Assembly { memory: ctx.memory, symbols: ctx.symbols, lines, warnings })
}

fn compile_line(ctx: &mut CompilationContext, text: &str) -> Result<Flow> {
	let statement = lexer::split_line(text)?;

	debug!("{:5} {:04X} {:?} {:?}", ctx.line, ctx.line_pc, statement.label, statement.mnemonic);

	if let (Some(name), Some("EQU")) = (&statement.label, statement.mnemonic.as_deref()) {
		directive::define_constant(ctx, name, &statement.operands)?;
		return Ok(Flow::Continue);
	}

	if let Some(name) = &statement.label {
		ctx.define(name, ctx.line_pc as i32, SymbolKind::Label)?;
	}

	let Some(mnemonic) = statement.mnemonic else { return Ok(Flow::Continue) };

	if let Some(directive) = Directive::from_mnemonic(&mnemonic) {
		directive::apply(ctx, directive, &statement.operands)
	} else if encoder::is_instruction(&mnemonic) {
		encoder::encode(ctx, &mnemonic, &statement.operands)?;
		Ok(Flow::Continue)
	} else {
		Err(AsmError::UnknownMnemonic(mnemonic))
	}
}

impl CompilationContext {
	pub fn new(fill: u8) -> CompilationContext {
		CompilationContext {
			memory: Memory::new(fill),
			symbols: SymbolTable::new(),
			line: 0,
			line_pc: 0,
			line_start: None
		}
	}

	fn begin_line(&mut self, line: usize) {
		self.line = line;
		self.line_pc = self.memory.pc;
		self.line_start = None;
	}

	pub fn emit(&mut self, value: u8) -> Result<()> {
		self.line_start.get_or_insert(self.memory.pc);
		self.memory.emit(value)
	}

	pub fn emit_all(&mut self, values: &[u8]) -> Result<()> {
		for value in values {
			self.emit(*value)?;
		}

		Ok(())
	}

	/// Emits `expr` at the PC, or a zero placeholder plus a fixup if it needs names not defined yet.
	pub fn emit_expr(&mut self, expr: &Expr, width: Width) -> Result<()> {
		match expr.evaluate(&self.symbols, self.line_pc)? {
			Value::Resolved(value) => self.emit_all(&width.encode(value)?),
			Value::Pending(names) => {
				let fixup = Fixup {
					target: FixupTarget::Memory { address: self.memory.pc, width },
					expr: expr.clone(),
					pc: self.line_pc,
					line: self.line
				};

				for name in names {
					self.symbols.add_fixup(&name, fixup.clone());
				}

				self.emit_all(&vec![0; width.size() as usize])
			}
		}
	}

	/// Defines a symbol and patches everything that was waiting on it before returning.
	pub fn define(&mut self, name: &str, value: i32, kind: SymbolKind) -> Result<()> {
		debug!("define {} = {:04X}", name, value);

		for fixup in self.symbols.define(name, value, kind)? {
			self.apply(fixup)?;
		}

		Ok(())
	}

	fn apply(&mut self, fixup: Fixup) -> Result<()> {
		let deferred = |e: AsmError| AsmError::Deferred { line: fixup.line, source: Box::new(e) };

		// Still waiting on another name; that name holds its own copy of this fixup.
		let value = match fixup.expr.evaluate(&self.symbols, fixup.pc).map_err(deferred)? {
			Value::Resolved(value) => value,
			Value::Pending(_) => return Ok(())
		};

		match &fixup.target {
			FixupTarget::Memory { address, width } => {
				let bytes = width.encode(value).map_err(deferred)?;
				self.memory.write_all(*address, &bytes)
			},
			FixupTarget::Symbol { name } => self.define(name, value, SymbolKind::Constant).map_err(deferred),
		}
	}
}

impl Assembly {
	/// Names referenced somewhere but never defined.
	pub fn unresolved(&self) -> Vec<String> {
		self.symbols.unresolved()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(source: &str) -> Assembly {
		match assemble(source, &Config::default()) {
			Ok(assembly) => assembly,
			Err(e) => panic!("{}", e)
		}
	}

	fn image(assembly: &Assembly) -> Vec<u8> {
		let (min, max) = assembly.memory.range().unwrap();
		assembly.memory.slice(min, max).to_vec()
	}

	#[test]
	fn labels_take_the_address_of_their_line() {
		let assembly = run(" org $8000\nstart: nop\nnext ld a,1\n");

		assert_eq!(assembly.symbols.value("start"), Some(0x8000));
		assert_eq!(assembly.symbols.value("next"), Some(0x8001));
	}

	#[test]
	fn forward_and_backward_references_give_the_same_bytes() {
		let forward = run(" jp target\n call target\n jr target\ntarget: ret\n");
		let backward = run("target: equ 8\n jp target\n call target\n jr target\n ret\n");

		assert_eq!(image(&forward), image(&backward));
	}

	#[test]
	fn constants_chain_through_forward_references() {
		let assembly = run("Size = End-Start\n ld bc,Size\nStart: db 1,2,3\nEnd:\n");

		assert_eq!(assembly.symbols.value("Size"), Some(3));
		assert_eq!(image(&assembly)[..3], [0x01, 0x03, 0x00]);
	}

	#[test]
	fn expression_with_two_pending_names_is_patched_once_both_exist() {
		let assembly = run(" dw b-a\na: nop\nb: nop\n");

		assert_eq!(image(&assembly)[..2], [0x01, 0x00]);
	}

	#[test]
	fn dollar_in_a_fixup_is_the_referencing_line() {
		let assembly = run(" org $100\n dw later-$\n nop\nlater:\n");

		assert_eq!(assembly.memory.slice(0x100, 0x101), &[0x03, 0x00]);
	}

	#[test]
	fn end_stops_reading() {
		let assembly = run(" nop\n end\n halt\n");

		assert_eq!(image(&assembly), vec![0x00]);
		assert_eq!(assembly.lines.len(), 2);
	}

	#[test]
	fn listing_lines_record_what_was_emitted() {
		let assembly = run(" org $10\n ld a,5\n; just a comment\n ds 4\n");

		assert_eq!(assembly.lines[0], SourceLine { first: 0x10, last: 0x10, text: String::from(" org $10") });
		assert_eq!((assembly.lines[1].first, assembly.lines[1].last), (0x10, 0x12));
		assert_eq!((assembly.lines[2].first, assembly.lines[2].last), (0x12, 0x12));
		assert_eq!((assembly.lines[3].first, assembly.lines[3].last), (0x16, 0x16));
	}

	#[test]
	fn errors_carry_the_line() {
		let err = assemble(" nop\n frobnicate a\n", &Config::default()).err().unwrap();

		assert_eq!(err.line, 2);
		assert_eq!(err.text, "frobnicate a");
		assert!(matches!(err.error, AsmError::UnknownMnemonic(_)));
	}

	#[test]
	fn duplicate_label_stops_before_anything_else_is_written() {
		let mut ctx = CompilationContext::new(0xff);
		let mut failed = None;

		for (index, text) in "a: nop\n nop\na: nop\n halt\n".lines().enumerate() {
			ctx.begin_line(index + 1);

			if let Err(e) = compile_line(&mut ctx, text) {
				failed = Some((index + 1, e));
				break;
			}
		}

		assert!(matches!(failed, Some((3, AsmError::DuplicateSymbol(ref name))) if name == "a"));
		assert_eq!(ctx.memory.range(), Some((0, 1)));
		assert_eq!(ctx.memory.pc, 2);
		assert_eq!(ctx.memory.get(2), 0xff);
		assert_eq!(ctx.memory.get(3), 0xff);
	}

	#[test]
	fn late_range_errors_point_back_at_the_reference() {
		let err = assemble(" org 0\n jr far\n org $1000\nfar: nop\n", &Config::default()).err().unwrap();

		assert_eq!(err.line, 4);
		assert!(matches!(err.error, AsmError::Deferred { line: 2, .. }));
	}

	#[test]
	fn unresolved_names_follow_the_configured_severity() {
		let source = " jp nowhere\n";

		assert!(run(source).warnings.is_empty());
		assert_eq!(run(source).unresolved(), vec![String::from("nowhere")]);

		let warned = assemble(source, &Config { unresolved: Severity::Warn, ..Config::default() }).ok().unwrap();
		assert_eq!(warned.warnings.len(), 1);

		let failed = assemble(source, &Config { unresolved: Severity::Error, ..Config::default() }).err().unwrap();
		assert!(matches!(failed.error, AsmError::Unresolved(names) if names == vec![String::from("nowhere")]));
	}
}
