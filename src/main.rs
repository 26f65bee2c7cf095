use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minildb::DB;

#[derive(Parser, Debug)]
#[command(name = "minildb", version, about = "Mini LevelDB-style embedded key-value store")]
struct Cli {
    /// Directory to store database files
    #[arg(short = 'd', long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Put a key-value pair into the database
    Put { key: String, value: String },
    /// Get the value for a key from the database
    Get { key: String },
    /// Flush the MemTable to SSTable files
    Flush,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> minildb::Result<()> {
    let mut db = DB::open(&cli.data_dir)?;

    let result = match &cli.command {
        Command::Put { key, value } => db.put(key.as_bytes(), value.as_bytes()).map(|()| {
            println!("OK");
        }),
        Command::Get { key } => db.get(key.as_bytes()).map(|value| {
            println!("{}", String::from_utf8_lossy(&value));
        }),
        Command::Flush => db.flush().map(|()| {
            println!("Flushed MemTable to SSTable files");
        }),
    };

    // Close regardless of how the command went; its error only surfaces
    // when the command itself succeeded.
    let closed = db.close();
    result.and(closed)
}
