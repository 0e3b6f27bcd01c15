use z80asm::{
	assemble,
	listing,
	output,
	AsmError,
	Assembly,
	Config,
	Severity,
};

fn ok(source: &str) -> Assembly {
	match assemble(source, &Config::default()) {
		Ok(assembly) => assembly,
		Err(e) => panic!("{}", e)
	}
}

fn bytes(assembly: &Assembly) -> Vec<u8> {
	output::select(&assembly.memory, None).unwrap().bytes.to_vec()
}

fn listing_of(assembly: &Assembly) -> String {
	let mut out: Vec<u8> = Vec::new();
	listing::write_listing(&mut out, assembly).unwrap();
	String::from_utf8(out).unwrap()
}

const PROGRAM: &str = "\
; copies a block and spins
X = 5
	org $100
start:	ld hl,source
	ld de,$8000
	ld bc,X
	ldir
	jp done
source:	db \"Hello\"
done:	halt
	end
";

#[test]
fn forward_label_is_patched_into_the_operand() {
	let assembly = ok(PROGRAM);

	assert_eq!(bytes(&assembly), vec![
		0x21, 0x0e, 0x01,
		0x11, 0x00, 0x80,
		0x01, 0x05, 0x00,
		0xed, 0xb0,
		0xc3, 0x13, 0x01,
		b'H', b'e', b'l', b'l', b'o',
		0x76,
	]);
	assert!(assembly.unresolved().is_empty());
}

#[test]
fn cross_reference_has_labels_but_no_undefined_lines() {
	let text = listing_of(&ok(PROGRAM));
	let (_, xref) = text.split_once("Cross reference\n\n").unwrap();

	assert!(!xref.contains("undefined"));
	assert!(!xref.contains('X'));
	assert!(xref.contains(&format!("0100{:>25}", "start")));
	assert!(xref.contains(&format!("010E{:>26}", "source")));
	assert!(xref.contains(&format!("0113{:>24}", "done")));
}

#[test]
fn forward_and_backward_definitions_are_byte_identical() {
	let forward = ok(" org $4000\n call sub\n jr sub\n ld a,(ix+off)\nsub: ret\noff = 3\n");
	let backward = ok("off = 3\n org $4000\n call $4008\n jr $4008\n ld a,(ix+3)\nsub: ret\n");

	assert_eq!(bytes(&forward), bytes(&backward));
}

#[test]
fn duplicate_symbols_stop_the_run() {
	let err = assemble("a: nop\n nop\na: nop\n halt\n", &Config::default()).err().unwrap();

	assert_eq!(err.line, 3);
	assert!(matches!(err.error, AsmError::DuplicateSymbol(ref name) if name == "a"));
	assert_eq!(err.to_string(), "Error in line 3: Symbol 'a' is already defined\na: nop");
}

#[test]
fn writing_past_the_top_of_memory_fails() {
	let err = assemble(" org $fffe\n db 1,2,3\n", &Config::default()).err().unwrap();

	assert_eq!(err.line, 2);
	assert!(matches!(err.error, AsmError::AddressOverflow(0x10000)));
}

#[test]
fn reserved_space_may_end_at_the_top_of_memory_but_not_past_it() {
	let assembly = ok(" org $fff0\n nop\n ds $f\n");

	assert_eq!(assembly.memory.pc, 0x10000);
	assert_eq!(bytes(&assembly), vec![0x00]);

	let err = assemble(" org $fff0\n ds $100\nlbl: end\n", &Config::default()).err().unwrap();

	assert_eq!(err.line, 2);
	assert!(matches!(err.error, AsmError::AddressOverflow(0x100f0)));

	let err = assemble(" ds $7fffffff\n ds $7fffffff\n ds $7fffffff\n nop\n", &Config::default()).err().unwrap();

	assert_eq!(err.line, 1);
	assert!(matches!(err.error, AsmError::AddressOverflow(0x7fffffff)));
}

#[test]
fn undefined_names_stay_zero_and_show_in_the_listing() {
	let assembly = ok(" ld hl,nowhere\n ret\n");

	assert_eq!(bytes(&assembly), vec![0x21, 0x00, 0x00, 0xc9]);
	assert!(listing_of(&assembly).ends_with("----    nowhere is undefined!\n"));
}

#[test]
fn strict_mode_refuses_undefined_names() {
	let config = Config { unresolved: Severity::Error, ..Config::default() };
	let err = assemble(" ld hl,nowhere\n", &config).err().unwrap();

	assert!(matches!(err.error, AsmError::Unresolved(_)));
}

#[test]
fn fill_byte_shows_between_blocks() {
	let config = Config { fill: 0xe5, ..Config::default() };
	let assembly = assemble(" org 0\n nop\n org 3\n nop\n", &config).ok().unwrap();

	assert_eq!(bytes(&assembly), vec![0x00, 0xe5, 0xe5, 0x00]);
}

#[test]
fn syntax_errors_report_the_line() {
	let err = assemble(" nop\n\n ld a,#1\n", &Config::default()).err().unwrap();

	assert_eq!(err.line, 3);
	assert!(matches!(err.error, AsmError::Syntax(_)));
}

#[test]
fn nothing_assembled_is_no_data() {
	let assembly = ok("; nothing here\nvalue = 1\n");

	assert!(matches!(output::select(&assembly.memory, None), Err(AsmError::NoData)));
}
