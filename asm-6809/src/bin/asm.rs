//! Command-line front end: `asm [-o out] [-s srec-out] [-l listfile] source`.
//! Flag parsing is hand-rolled, matching the teacher's plain CLI idiom
//! rather than a parsing crate.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use asm_6809::assembler::{expand_includes, Assembler};

struct Args {
    source: PathBuf,
    bin_out: Option<PathBuf>,
    srec_out: Option<PathBuf>,
    list_out: Option<PathBuf>,
}

fn usage() -> ! {
    eprintln!("usage: asm [-o out] [-s srec-out] [-l listfile] source");
    std::process::exit(2);
}

fn parse_args() -> Args {
    let mut source = None;
    let mut bin_out = None;
    let mut srec_out = None;
    let mut list_out = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" => bin_out = Some(PathBuf::from(args.next().unwrap_or_else(|| usage()))),
            "-s" => srec_out = Some(PathBuf::from(args.next().unwrap_or_else(|| usage()))),
            "-l" => list_out = Some(PathBuf::from(args.next().unwrap_or_else(|| usage()))),
            _ if source.is_none() => source = Some(PathBuf::from(arg)),
            _ => usage(),
        }
    }
    let Some(source) = source else { usage() };
    Args { source, bin_out, srec_out, list_out }
}

fn prompt_continue(error_count: usize) -> bool {
    eprint!("{error_count} error(s) in pass 1, continue to pass 2? [y/N] ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn write_output(path: &PathBuf, bytes: &[u8]) {
    std::fs::write(path, bytes).unwrap_or_else(|e| {
        eprintln!("cannot write {}: {e}", path.display());
        std::process::exit(4);
    });
}

fn main() -> ExitCode {
    let args = parse_args();
    let lines = expand_includes(&args.source);

    let mut asm = Assembler::new();
    let errors_pass1 = asm.assemble_pass1(&lines);
    if errors_pass1 > 0 {
        report(&asm);
        if !prompt_continue(errors_pass1) {
            return ExitCode::from(3);
        }
    }

    asm.assemble_pass2(&lines);
    report(&asm);

    if let Some(path) = &args.bin_out {
        write_output(path, &asm.image.to_binary());
    }
    if let Some(path) = &args.srec_out {
        write_output(path, asm.image.to_srecords().as_bytes());
    }
    if let Some(path) = &args.list_out {
        write_output(path, listing(&asm).as_bytes());
    }

    ExitCode::SUCCESS
}

fn report(asm: &Assembler) {
    for d in &asm.diagnostics {
        eprintln!("{}:{}: {}", d.file, d.line, d.text);
    }
}

fn listing(asm: &Assembler) -> String {
    let mut out = String::new();
    if let Some(title) = &asm.title {
        out.push_str(title);
        out.push('\n');
    }
    out.push_str("symbol table:\n");
    for sym in asm.symtab.defined() {
        out.push_str(&format!("{:<16} {:04X}  cat={}\n", sym.name, sym.value, sym.cat));
    }
    out
}
