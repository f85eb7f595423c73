//! `shared-kv-worker` — one participant in a multi-process run.
//!
//! Opens the store in multi-process mode and increments an integer key a
//! number of times, reads it, or deletes it.
//!
//! ```text
//! shared-kv-worker db.json 7 update              # 10 atomic increments of key 7
//! shared-kv-worker db.json 7 update -n 50        # 50 increments
//! shared-kv-worker db.json 7 get                 # print the value (or "absent")
//! shared-kv-worker db.json 7 delete
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use shared_kv::{ConcurrencyMode, DefaultStore, DEFAULT_READER_SLOTS};
use tracing::{debug, error};

#[derive(Parser)]
#[command(
    name = "shared-kv-worker",
    version,
    about = "Increment or delete one key of a shared-kv store from its own process"
)]
struct Cli {
    /// Backing file of the store.
    path: PathBuf,

    /// Integer key to operate on.
    key: u32,

    /// What to do with the key.
    #[arg(value_enum)]
    op: Op,

    /// Increment cycles for `update`.
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: u32,

    /// Reader permit pool size. Opening fails if it differs from the size
    /// the lock was created with.
    #[arg(long, default_value_t = DEFAULT_READER_SLOTS)]
    reader_slots: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Op {
    /// Add one to the value, `iterations` times. A missing key starts at 0.
    Update,
    /// Print the value on stdout.
    Get,
    /// Remove the key.
    Delete,
}

fn main() -> ExitCode {
    setup_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, path = %cli.path.display(), key = cli.key, "worker failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> shared_kv::Result<()> {
    let db = DefaultStore::<u32, i64>::builder(&cli.path)
        .mode(ConcurrencyMode::MultiProcess)
        .reader_slots(cli.reader_slots)
        .build()?;

    match cli.op {
        Op::Update => {
            for _ in 0..cli.iterations {
                db.transaction(|mem| {
                    let current = mem.get(&cli.key).unwrap_or(0);
                    mem.set(cli.key, current + 1);
                })?;
            }
            debug!(key = cli.key, iterations = cli.iterations, "increments done");
        }
        Op::Get => match db.get(&cli.key)? {
            Some(value) => println!("{value}"),
            None => println!("absent"),
        },
        Op::Delete => {
            let prev = db.delete(&cli.key)?;
            debug!(key = cli.key, ?prev, "deleted");
        }
    }
    Ok(())
}

/// Respects `RUST_LOG` if set, otherwise only warnings and errors. Logs go to
/// stderr so stdout stays free.
fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
