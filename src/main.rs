//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` image (or assemble-and-run `.asm`)
//! - `ls8-emu asm <source>` - Assemble to an `.ls8` image
//! - `ls8-emu disasm <image>` - Disassemble an image

use clap::{Parser, Subcommand};
use std::io::Write;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LS-8, an 8-bit educational stack-machine computer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 image (or .asm source) to execute
        program: String,
        /// Maximum number of cycles to run (default: unlimited)
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Show a machine trace on stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        /// Write the final machine state as JSON to this file
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Assemble source to an .ls8 image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an .ls8 image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, max_cycles, trace, dump_state } => {
            run_program(&program, max_cycles, trace, dump_state);
        }
        Commands::Asm { source, output } => {
            assemble_file(&source, output);
        }
        Commands::Disasm { image } => {
            disassemble_file(&image);
        }
    }
}

/// Load program bytes from an image file, assembling first when the
/// path points at `.asm` source.
fn load_bytes(path: &str) -> Vec<u8> {
    use ls8::{assemble, load_image};

    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => image.bytes,
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, dump_state: Option<String>) {
    use ls8::Cpu;

    let bytes = load_bytes(path);

    if bytes.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&bytes) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    // Program output goes to stdout; everything else stays on stderr.
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut cycles = 0u64;
    while cpu.is_running() {
        if let Some(limit) = max_cycles {
            if cycles >= limit {
                eprintln!(
                    "⚠️  Reached max cycles limit ({}). Use --max-cycles to raise it.",
                    limit
                );
                break;
            }
        }

        if trace {
            eprintln!("{}", cpu.trace());
        }

        let pc = cpu.regs.pc;
        match cpu.step(&mut out) {
            Ok(_) => cycles += 1,
            Err(e) => {
                eprintln!("❌ CPU error at PC={:02X}: {}", pc, e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = out.flush() {
        eprintln!("❌ Failed to flush output: {}", e);
        std::process::exit(1);
    }

    if let Some(state_path) = dump_state {
        let json = match serde_json::to_string_pretty(&cpu) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("❌ Failed to serialize machine state: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&state_path, json) {
            eprintln!("❌ Failed to write {}: {}", state_path, e);
            std::process::exit(1);
        }
        eprintln!("✓ Machine state written to {}", state_path);
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::{assemble, save_image};

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".ls8"));

    eprintln!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let bytes = match assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("✓ Assembled {} bytes", bytes.len());

    if let Err(e) = save_image(&out_path, &bytes) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    eprintln!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    use ls8::{disassemble, load_image};

    let image = match load_image(image_path) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", disassemble(&image.bytes));
}
