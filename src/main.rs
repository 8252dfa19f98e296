use clap::Parser;
use log::info;

use symex816::snes::assertions::AssertionStore;
use symex816::snes::log::Log;
use symex816::snes::rom::ROM;
use symex816::Result;

/// Symbolic execution engine for static analysis of 65816 (SNES) ROMs.
#[derive(Parser)]
#[clap(name = "symex816", version)]
struct Args {
    /// ROM file to analyze.
    rom: String,

    /// Optional assertion file (forced state changes / resolved jump
    /// targets) to load before analyzing.
    #[clap(long)]
    assertions: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let rom = ROM::from_file(&args.rom)?;
    let assertions = match &args.assertions {
        Some(path) => AssertionStore::from_file(path)?,
        None => AssertionStore::new(),
    };

    info!("analyzing {} ({:?})", rom.path(), rom.rom_type());

    let log = Log::new(rom, assertions);
    log.analyze();

    let subroutines = log.subroutines().borrow();
    let instructions = log.instructions().borrow();
    let entry_points = log.entry_points().borrow();

    println!("entry points:  {}", entry_points.len());
    println!("subroutines:   {}", subroutines.len());
    println!("instructions:  {}", instructions.len());

    let unresolved = subroutines
        .values()
        .filter(|sub| sub.state_changes.iter().any(|(_, change)| change.unknown()))
        .count();
    println!("subroutines with an UNKNOWN return state: {}", unresolved);

    Ok(())
}
