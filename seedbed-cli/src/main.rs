//! Seedbed command line interface.
//!
//! Two verbs: `push` loads a payload file into a database, `pull` writes
//! a database out to a file. The database target is a redb file path
//! (optionally prefixed `redb://`) or `memory://<name>` for an ephemeral
//! scratch store. Exit code 0 on success, 1 on any error with the message
//! on stderr.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use seedbed::document::document_count;
use seedbed::errors::{ErrorKind, SeedbedError, SeedbedResult};
use seedbed::format;
use seedbed::pipeline::{pull, pull_to_sink, push, PushOptions};
use seedbed::store::memory::InMemoryStore;
use seedbed::store::redb::RedbStore;
use seedbed::store::Store;

/// Seedbed - declarative seed data for document stores.
#[derive(Parser, Debug)]
#[command(name = "seedbed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Push data from a file into a database
    Push {
        /// Payload file to read (.yml, .yaml or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Database to write to (redb file path or memory://<name>)
        #[arg(short, long)]
        db: String,

        /// Keep existing collections instead of dropping the database first
        #[arg(long)]
        keep: bool,
    },

    /// Pull the contents of a database into a file
    Pull {
        /// Output file to write (.yml, .yaml or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Database to read from (redb file path or memory://<name>)
        #[arg(short, long)]
        db: String,

        /// Stream JSON to the file instead of buffering the database
        #[arg(long)]
        stream: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    colog::init();
    log::set_max_level(if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });

    if let Err(error) = run(cli) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

fn run(cli: Cli) -> SeedbedResult<()> {
    match cli.command {
        Commands::Push { file, db, keep } => {
            let raw = format::read_payload(&file)?;
            let store = open_target(&db)?;

            let mut options = PushOptions::new().with_source(&file);
            if keep {
                options = options.keep_existing();
            }

            let results = push(&store, &raw, &options)?;

            println!("Pushed {} to {}", file.display(), db);
            for (name, result) in &results {
                println!("  {}: {} documents", name, result.inserted_count());
            }
            Ok(())
        }
        Commands::Pull { file, db, stream } => {
            let store = open_target(&db)?;

            if stream {
                let mut sink = File::create(&file)?;
                pull_to_sink(&store, &mut sink)?;
                println!("Streamed {} to {}", db, file.display());
            } else {
                let payload = pull(&store)?;
                format::write_payload(&file, &payload)?;
                println!(
                    "Wrote {} collections ({} documents) from {} to {}",
                    payload.len(),
                    document_count(&payload),
                    db,
                    file.display()
                );
            }
            Ok(())
        }
    }
}

/// Opens the database target named on the command line.
///
/// `memory://<name>` gives an ephemeral in-memory store; anything else is
/// treated as a redb file path, with an optional `redb://` prefix.
fn open_target(target: &str) -> SeedbedResult<Store> {
    if let Some(name) = target.strip_prefix("memory://") {
        if name.is_empty() {
            return Err(SeedbedError::new(
                "memory:// target needs a database name",
                ErrorKind::ConfigurationError,
            ));
        }
        return Ok(Store::new(InMemoryStore::new(name)));
    }

    let path = target.strip_prefix("redb://").unwrap_or(target);
    Ok(Store::new(RedbStore::open(Path::new(path))?))
}
