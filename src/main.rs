// memlab: byte-level memory machine with a terminal front end

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use memlab::config::MachineConfig;
use memlab::interpreter::console::Console;
use memlab::interpreter::engine::Machine;
use memlab::memory::codec::Endianness;
use memlab::parser::lexer::clean_statement;
use memlab::symbols::AllocationPolicy;
use memlab::ui::App;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ByteOrder {
    Little,
    Big,
}

impl From<ByteOrder> for Endianness {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Little => Endianness::Little,
            ByteOrder::Big => Endianness::Big,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "memlab")]
#[command(about = "Run C-like statements against a byte-addressable memory and watch the bytes")]
struct Cli {
    /// Statements to run first, one per line
    program: Option<PathBuf>,

    /// Pointer and int width in bytes (2, 4 or 8)
    #[arg(long, default_value = "4")]
    word_size: usize,

    #[arg(long, value_enum, default_value = "little")]
    endian: ByteOrder,

    /// Memory size in bytes; a multiple of 16 larger than 16
    #[arg(long, default_value = "256")]
    memory: usize,

    /// Place variables at pseudo-random addresses instead of packing them
    #[arg(long)]
    scattered: bool,

    /// Seed for scattered placement
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Run without the TUI: execute the program (or stdin) and print results
    #[arg(long)]
    headless: bool,

    /// Write logs to this file (the TUI otherwise logs nothing)
    #[arg(long)]
    log: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> MachineConfig {
        let allocation = if self.scattered {
            AllocationPolicy::Scattered
        } else {
            AllocationPolicy::Aligned
        };
        MachineConfig {
            seed: self.seed,
            ..MachineConfig::default()
        }
        .with_word_size(self.word_size)
        .with_endianness(self.endian.into())
        .with_memory_size(self.memory)
        .with_allocation(allocation)
    }
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memlab=info"));

    if let Some(path) = &cli.log {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let source = match &cli.program {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };

    if cli.headless {
        let code = run_headless(&cli, source.as_deref())?;
        std::process::exit(code);
    }

    let machine = Machine::new(cli.config())?;
    let mut app = App::new(machine);
    if let Some(source) = &source {
        app.run_script(source);
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Execute statements from the program file, or from stdin when there is
/// none, printing each result. Returns the process exit code.
fn run_headless(cli: &Cli, source: Option<&str>) -> Result<i32, Box<dyn std::error::Error>> {
    let mut machine = Machine::with_console(cli.config(), Console::stdio())?;
    info!(program = ?cli.program, "headless run");

    let lines: Box<dyn Iterator<Item = io::Result<String>> + '_> = match source {
        Some(text) => Box::new(text.lines().map(|line| Ok(line.to_string()))),
        // one line at a time, so `input` can read the lines in between
        None => Box::new(std::iter::from_fn(|| {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) => None,
                Ok(_) => Some(Ok(line.trim_end_matches(['\r', '\n']).to_string())),
                Err(err) => Some(Err(err)),
            }
        })),
    };

    for (index, line) in lines.enumerate() {
        let line = line?;
        if clean_statement(&line).is_empty() {
            continue;
        }
        match machine.execute(&line) {
            Ok(Some(result)) => println!("{}", machine.describe(&result)),
            Ok(None) => {}
            Err(err) => {
                error!(line = index + 1, "statement failed");
                eprintln!("error: line {}: {}", index + 1, err);
                return Ok(1);
            }
        }
    }
    Ok(0)
}
