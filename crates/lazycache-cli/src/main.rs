//! lazycache store maintenance CLI.
//!
//! Provides the `lazycache` binary for inspecting and maintaining the
//! on-disk stores written by `lazycache-eval`: listing keys, printing and
//! deleting entries, checking every entry decodes, and converting a flat
//! store into the sharded layout.
//!
//! The store directory comes from `--dir` or the `LAZYCACHE_DIR`
//! environment variable. Log verbosity is controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lazycache_eval::{Codec, JsonCodec};
use lazycache_storage::{DirStore, KeyValueStore, ShardedDirStore, StorageError};

/// Inspect and maintain lazycache stores.
#[derive(Parser)]
#[command(name = "lazycache", about = "Inspect and maintain lazycache stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which store to open.
#[derive(Args)]
struct StoreArgs {
    /// Store directory.
    #[arg(short, long, env = "LAZYCACHE_DIR")]
    dir: PathBuf,

    /// The store uses the two-level sharded layout.
    #[arg(long)]
    sharded: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List every key in the store.
    Keys {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Decode and print the value stored under a key.
    Show {
        #[command(flatten)]
        store: StoreArgs,

        /// Hex fingerprint of the entry.
        key: String,
    },

    /// Delete the entry stored under a key.
    Rm {
        #[command(flatten)]
        store: StoreArgs,

        /// Hex fingerprint of the entry.
        key: String,
    },

    /// Check that every entry decodes.
    Verify {
        #[command(flatten)]
        store: StoreArgs,

        /// Delete entries that fail to decode.
        #[arg(long)]
        evict: bool,
    },

    /// Copy a flat store into a sharded store.
    Migrate {
        /// Flat store directory to read.
        #[arg(long)]
        from: PathBuf,

        /// Sharded store directory to write.
        #[arg(long)]
        to: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Keys { store } => run_keys(&store),
        Commands::Show { store, key } => run_show(&store, &key),
        Commands::Rm { store, key } => run_rm(&store, &key),
        Commands::Verify { store, evict } => run_verify(&store, evict).code,
        Commands::Migrate { from, to } => run_migrate(&from, &to),
    };
    process::exit(exit_code);
}

fn open_store(args: &StoreArgs) -> Result<Box<dyn KeyValueStore>, StorageError> {
    if args.sharded {
        Ok(Box::new(ShardedDirStore::open(&args.dir)?))
    } else {
        Ok(Box::new(DirStore::open(&args.dir)?))
    }
}

/// Maps a storage failure to an exit code: 1 for a missing or malformed
/// key, 3 for I/O and database errors.
fn exit_code(err: &StorageError) -> i32 {
    match err {
        StorageError::NotFound(_) | StorageError::InvalidKey { .. } => 1,
        _ => 3,
    }
}

fn report(err: &StorageError) -> i32 {
    eprintln!("Error: {err}");
    exit_code(err)
}

/// Execute the keys subcommand.
fn run_keys(args: &StoreArgs) -> i32 {
    let mut store = match open_store(args) {
        Ok(store) => store,
        Err(e) => return report(&e),
    };
    match store.keys() {
        Ok(keys) => {
            for key in keys {
                println!("{key}");
            }
            0
        }
        Err(e) => report(&e),
    }
}

/// Execute the show subcommand.
///
/// Returns exit code: 0 = printed, 1 = missing or undecodable entry,
/// 3 = I/O error.
fn run_show(args: &StoreArgs, key: &str) -> i32 {
    let mut store = match open_store(args) {
        Ok(store) => store,
        Err(e) => return report(&e),
    };
    let bytes = match store.get(key) {
        Ok(bytes) => bytes,
        Err(e) => return report(&e),
    };
    match JsonCodec.decode(&bytes) {
        Ok(value) => {
            println!("{value}");
            0
        }
        Err(e) => {
            eprintln!("Error: entry {key} is corrupt: {e}");
            1
        }
    }
}

/// Execute the rm subcommand.
fn run_rm(args: &StoreArgs, key: &str) -> i32 {
    let mut store = match open_store(args) {
        Ok(store) => store,
        Err(e) => return report(&e),
    };
    match store.delete(key) {
        Ok(()) => 0,
        Err(e) => report(&e),
    }
}

/// Outcome of a verify run.
#[derive(Debug, Default)]
struct VerifyReport {
    checked: usize,
    corrupt: Vec<String>,
    evicted: usize,
    code: i32,
}

/// Execute the verify subcommand.
///
/// Exit code 1 when corrupt entries remain in the store.
fn run_verify(args: &StoreArgs, evict: bool) -> VerifyReport {
    let mut report_out = VerifyReport::default();
    let mut store = match open_store(args) {
        Ok(store) => store,
        Err(e) => {
            report_out.code = report(&e);
            return report_out;
        }
    };
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            report_out.code = report(&e);
            return report_out;
        }
    };

    for key in keys {
        let bytes = match store.get(&key) {
            Ok(bytes) => bytes,
            // Removed while we were scanning.
            Err(StorageError::NotFound(_)) => continue,
            Err(e) => {
                report_out.code = report(&e);
                return report_out;
            }
        };
        report_out.checked += 1;
        if let Err(err) = JsonCodec.decode(&bytes) {
            tracing::warn!(key = %key, error = %err, "corrupt entry");
            if evict {
                match store.delete(&key) {
                    Ok(()) | Err(StorageError::NotFound(_)) => report_out.evicted += 1,
                    Err(e) => {
                        report_out.code = report(&e);
                        return report_out;
                    }
                }
            }
            report_out.corrupt.push(key);
        }
    }

    println!(
        "checked {} entries, {} corrupt, {} evicted",
        report_out.checked,
        report_out.corrupt.len(),
        report_out.evicted
    );
    for key in &report_out.corrupt {
        println!("corrupt: {key}");
    }
    report_out.code = if report_out.corrupt.len() > report_out.evicted {
        1
    } else {
        0
    };
    report_out
}

/// Execute the migrate subcommand.
fn run_migrate(from: &Path, to: &Path) -> i32 {
    let mut source = match DirStore::open(from) {
        Ok(store) => store,
        Err(e) => return report(&e),
    };
    let mut target = match ShardedDirStore::open(to) {
        Ok(store) => store,
        Err(e) => return report(&e),
    };
    let keys = match source.keys() {
        Ok(keys) => keys,
        Err(e) => return report(&e),
    };

    let mut copied = 0usize;
    for key in keys {
        let bytes = match source.get(&key) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => continue,
            Err(e) => return report(&e),
        };
        match target.put(&key, &bytes) {
            Ok(()) => copied += 1,
            Err(StorageError::InvalidKey { reason, .. }) => {
                tracing::warn!(key = %key, reason, "skipping key that cannot be sharded");
            }
            Err(e) => return report(&e),
        }
    }

    tracing::info!(copied = copied as u64, from = %from.display(), to = %to.display(), "migration finished");
    println!("copied {copied} entries");
    0
}
