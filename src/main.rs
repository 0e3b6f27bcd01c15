//--> Imports <--

use std::{
	fmt,
	fs::{self, File},
	io::{self, BufWriter, Write},
	path::{Path, PathBuf},
	process,
};

use clap::{
	Arg,
	ArgAction,
	PossibleValue,
	ValueEnum,
};

use tracing::{info, Level};

use z80asm::{
	assemble,
	listing,
	AsmError,
	output::{self, Image},
	Config,
	LineError,
	Severity,
};

//--> Structs <--

struct Error {
	is_warning: bool,
	file: PathBuf,
	line: Option<usize>,
	text: Option<String>,
	message: String,
}

//--> Enums <--

#[derive(Clone, Copy, Eq, PartialEq)]
enum Unresolved {
	Ignore,
	Warn,
	Error,
}

//--> Functions <--

fn main() {
	let args = {
		clap::command!()
		.long_about(
			"TurboAss Z80 is a small one-pass assembler for Z80 code. \
			It reads one source file and writes the assembled bytes as a raw binary, \
			Intel HEX records, or a C header, next to the source file.\n\n\
			A binary that starts at 0x0100 is written as a CP/M '.com' file."
		)
		.arg_required_else_help(true)
		.args([
			{
				Arg::new("bin")
				.short('b')
				.help("Creates a binary file (.bin, or .com when the code starts at 0x0100).")
			},
			{
				Arg::new("c-array")
				.short('c')
				.help("Creates a C header (.h) holding the code as a byte array.")
			},
			{
				Arg::new("hex")
				.short('i')
				.help("Creates an Intel HEX file (.hex).")
			},
			{
				Arg::new("listing")
				.short('l')
				.help("Creates a listing file (.lst) with a cross reference.")
			},
			{
				Arg::new("fill")
				.short('f')
				.value_name("XX")
				.value_parser(parse_hex_byte)
				.help("Fills unused memory with the hexadecimal byte XX. By default, unused memory is 0x00.")
			},
			{
				Arg::new("offset")
				.short('o')
				.value_name("XXXX")
				.value_parser(parse_hex_address)
				.help("Starts the output at the hexadecimal address XXXX instead of the lowest address written.")
			},
			{
				Arg::new("unresolved")
				.short('u')
				.long("unresolved")
				.value_name("SEVERITY")
				.value_parser(clap::value_parser!(Unresolved))
				.help("What to do about names that are never defined. By default they are ignored and their bytes stay 0.")
			},
			{
				Arg::new("verbose")
				.short('v')
				.action(ArgAction::Count)
				.help("Tells the assembler to output additional information. Repeat for more detail.")
			},
			{
				Arg::new("infile")
				.value_name("INFILE")
				.value_parser(clap::value_parser!(PathBuf))
				.required(true)
				.help("Path to the source file.")
			}
		])
		.get_matches()
	};

	let verbosity = args.get_one::<u64>("verbose").copied().unwrap_or(0);

	tracing_subscriber::fmt()
		.with_max_level(match verbosity {
			0 => Level::WARN,
			1 => Level::INFO,
			2 => Level::DEBUG,
			_ => Level::TRACE,
		})
		.with_writer(io::stderr)
		.without_time()
		.with_target(false)
		.init();

	let bin = args.contains_id("bin");
	let c_array = args.contains_id("c-array");
	let hex = args.contains_id("hex");
	let list = args.contains_id("listing");

	let offset = args.get_one::<u16>("offset").copied();

	let config = Config {
		fill: args.get_one::<u8>("fill").copied().unwrap_or(0),
		unresolved: match args.get_one::<Unresolved>("unresolved") {
			Some(Unresolved::Warn) => Severity::Warn,
			Some(Unresolved::Error) => Severity::Error,
			_ => Severity::Ignore,
		}
	};

	// This is a required argument, so unwrapping is okay here.
	let input_path = args.get_one::<PathBuf>("infile").unwrap().clone();

	let source = match fs::read_to_string(&input_path) {
		Ok(source) => source,
		Err(e) => fail(Error::new(false, input_path, None, None, format!("Cannot open infile: {}", e)))
	};

	info!("Processing input file \"{}\"", input_path.display());

	let assembly = match assemble(&source, &config) {
		Ok(assembly) => assembly,
		Err(e) => fail(Error::from_line_error(&input_path, e))
	};

	for warning in &assembly.warnings {
		eprintln!("{}", Error::new(true, input_path.clone(), None, None, warning.clone()));
	}

	if list {
		let path = input_path.with_extension("lst");
		info!("Creating listing file \"{}\"", path.display());

		if let Err(e) = write_file(&path, |out| listing::write_listing(out, &assembly)) {
			fail(Error::new(false, path, None, None, format!("Can't write listing file: {}", e)));
		}
	}

	if list || verbosity > 0 {
		match memory_range(assembly.memory.range()) {
			Ok(text) => println!("{}", text),
			Err(e) => fail(Error::new(false, input_path, None, None, e.to_string()))
		}
	}

	if !(bin || c_array || hex) {
		info!("No output files created");
		return;
	}

	let image = match output::select(&assembly.memory, offset) {
		Ok(image) => image,
		Err(e) => fail(Error::new(false, input_path, None, None, e.to_string()))
	};

	if bin {
		let path = input_path.with_extension(if image.is_com() { "com" } else { "bin" });
		create(&path, |out| output::write_binary(out, &image));
	}

	if hex {
		create(&input_path.with_extension("hex"), |out| output::write_hex(out, &image));
	}

	if c_array {
		let name = c_name(&input_path);
		create(&input_path.with_extension("h"), |out| output::write_c_array(out, &name, &image));
	}

	report(&input_path, &image);
}

fn create<F>(path: &Path, body: F) where F: FnOnce(&mut BufWriter<File>) -> io::Result<()> {
	info!("Creating output file \"{}\"", path.display());

	if let Err(e) = write_file(path, body) {
		fail(Error::new(false, path.to_path_buf(), None, None, format!("Can't write output file: {}", e)));
	}
}

fn write_file<F>(path: &Path, body: F) -> io::Result<()> where F: FnOnce(&mut BufWriter<File>) -> io::Result<()> {
	let mut out = BufWriter::new(File::create(path)?);
	body(&mut out)?;
	out.flush()
}

fn report(input_path: &Path, image: &Image) {
	let end = usize::from(image.start) + image.bytes.len() - 1;
	info!("{}: {} bytes at [0x{:04X}...0x{:04X}]", input_path.display(), image.bytes.len(), image.start, end);
}

fn memory_range(range: Option<(u16, u16)>) -> Result<String, AsmError> {
	let (min, max) = range.ok_or(AsmError::NoData)?;

	Ok(format!(" Using memory range [0x{:04X}...0x{:04X}]", min, max))
}

// The header's identifiers are built from the file name, so anything a C identifier can't hold becomes '_'.
fn c_name(path: &Path) -> String {
	let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

	stem.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

fn parse_hex_byte(s: &str) -> Result<u8, String> {
	u8::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|_| format!("'{}' is not a hexadecimal byte", s))
}

fn parse_hex_address(s: &str) -> Result<u16, String> {
	u16::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|_| format!("'{}' is not a hexadecimal address", s))
}

fn fail(err: Error) -> ! {
	eprintln!("{}", err);
	process::exit(1);
}

impl Error {
	pub fn new(is_warning: bool, file: PathBuf, line: Option<usize>, text: Option<String>, message: String) -> Error {
		Error { is_warning, file, line, text, message }
	}

	pub fn from_line_error(file: &Path, err: LineError) -> Error {
		let text = if err.text.is_empty() { None } else { Some(err.text) };

		Error::new(false, file.to_path_buf(), Some(err.line), text, err.error.to_string())
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let start = if self.is_warning { "WARN" } else { "ERR" };

		match self.line {
			Some(l) => write!(f, "{}: {}: {}: {}", start, self.file.display(), l, self.message)?,
			None => write!(f, "{}: {}: {}", start, self.file.display(), self.message)?
		}

		match &self.text {
			Some(text) => write!(f, "\n\t{}", text),
			None => Ok(())
		}
	}
}

impl ValueEnum for Unresolved {
	fn to_possible_value<'a>(&self) -> Option<PossibleValue<'a>> {
		match self {
			Unresolved::Ignore => Some(PossibleValue::new("ignore")),
			Unresolved::Warn => Some(PossibleValue::new("warn")),
			Unresolved::Error => Some(PossibleValue::new("error")),
		}
	}

	fn value_variants<'a>() -> &'a [Self] {
		&[
			Unresolved::Ignore,
			Unresolved::Warn,
			Unresolved::Error,
		]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_arguments() {
		assert_eq!(parse_hex_byte("ff"), Ok(0xff));
		assert_eq!(parse_hex_byte("0x7E"), Ok(0x7e));
		assert!(parse_hex_byte("100").is_err());
		assert_eq!(parse_hex_address("0100"), Ok(0x100));
		assert!(parse_hex_address("nope").is_err());
	}

	#[test]
	fn memory_range_is_reported_or_refused_when_empty() {
		assert_eq!(memory_range(Some((0x100, 0x1ff))).unwrap(), " Using memory range [0x0100...0x01FF]");
		assert!(matches!(memory_range(None), Err(AsmError::NoData)));
	}

	#[test]
	fn c_names_are_identifiers() {
		assert_eq!(c_name(Path::new("dir/boot-rom.v2.asm")), "boot_rom_v2");
	}

	#[test]
	fn errors_show_line_and_source() {
		let err = Error::new(false, PathBuf::from("a.asm"), Some(7), Some(String::from("LD A,")), String::from("Syntax error: Empty operand"));

		assert_eq!(err.to_string(), "ERR: a.asm: 7: Syntax error: Empty operand\n\tLD A,");
	}
}
