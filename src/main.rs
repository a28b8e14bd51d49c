//! TD4 Emulator - CLI Entry Point
//!
//! Commands:
//! - `td4-emu hex <rom> [steps]` - Run a hex ROM image
//! - `td4-emu asm <source> [steps]` - Assemble and run a program
//! - `td4-emu dump <source>` - Assemble to a hex ROM image
//! - `td4-emu disasm <rom>` - Disassemble a hex ROM image

use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use td4::Cpu;

#[derive(Parser)]
#[command(name = "td4-emu")]
#[command(version)]
#[command(about = "An emulator and assembler for the TD4 4-bit CPU")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a hex ROM image and run it
    Hex {
        /// Path to the hex image
        rom: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Assemble a source file and run it
    Asm {
        /// Path to the source file
        source: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Assemble a source file and print the hex ROM image
    Dump {
        /// Path to the source file
        source: String,
        /// Write the image to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a hex ROM image
    Disasm {
        /// Path to the hex image
        rom: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Number of instructions to execute (0 runs until input or output fails)
    #[arg(default_value_t = 0)]
    steps: u64,
    /// Do not print the per-step trace
    #[arg(short, long)]
    quiet: bool,
    /// Do not read stdin for IN instructions; they use the latched value
    #[arg(long)]
    no_input: bool,
    /// Print the final machine state as JSON on stderr
    #[arg(long)]
    json: bool,
    /// Print status messages on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hex { rom, run } => load_hex_image(&rom).map_or(ExitCode::FAILURE, |cpu| run_program(cpu, &run)),
        Commands::Asm { source, run } => {
            if run.verbose {
                eprintln!("📝 Assembling: {}", source);
            }
            assemble_file(&source).map_or(ExitCode::FAILURE, |cpu| run_program(cpu, &run))
        }
        Commands::Dump { source, output } => dump_file(&source, output),
        Commands::Disasm { rom } => disassemble_file(&rom),
    }
}

fn load_hex_image(path: &str) -> Option<Cpu> {
    match td4::load_hex(path) {
        Ok(rom) => Some(Cpu::with_rom(rom)),
        Err(e) => {
            eprintln!("❌ Failed to load '{}': {}", path, e);
            None
        }
    }
}

fn assemble_file(path: &str) -> Option<Cpu> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("❌ Unable to open '{}': {}", path, e);
            return None;
        }
    };

    // The assembler writes its own diagnostic.
    td4::assemble_reader(BufReader::new(file), &mut io::stderr()).ok()
}

fn run_program(mut cpu: Cpu, args: &RunArgs) -> ExitCode {
    if args.verbose {
        eprintln!("🔧 Running {}", match args.steps {
            0 => "until input or output fails".to_string(),
            n => format!("{} steps", n),
        });
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut trace = stdout.lock();

    let input: Option<&mut dyn BufRead> = if args.no_input { None } else { Some(&mut input) };
    let trace: Option<&mut dyn Write> = if args.quiet { None } else { Some(&mut trace) };

    // Engine errors only end the run.
    if let Err(e) = cpu.run(args.steps, input, trace) {
        if args.verbose {
            eprintln!("⏹  Stopped: {}", e);
        }
    }

    if args.verbose {
        eprintln!("✓ Executed {} steps, OUT={} PC={}", cpu.cycles, cpu.regs.out, cpu.regs.pc);
    }

    if args.json {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn dump_file(source: &str, output: Option<String>) -> ExitCode {
    let Some(cpu) = assemble_file(source) else {
        return ExitCode::FAILURE;
    };

    let result = match &output {
        Some(path) => td4::save_hex(path, &cpu.rom),
        None => td4::write_hex(&cpu.rom, &mut io::stdout().lock()),
    };

    match result {
        Ok(()) => {
            if let Some(path) = output {
                eprintln!("✓ Saved to {}", path);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to write image: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn disassemble_file(path: &str) -> ExitCode {
    match load_hex_image(path) {
        Some(cpu) => {
            print!("{}", td4::disassemble(&cpu.rom));
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}
