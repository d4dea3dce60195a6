//! Example: concatenate stored objects into one stream and copy it to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Objects under ./data/<bucket>/
//! cargo run --example cat_objects -- local ./data logs part-0001 part-0002
//!
//! # S3-compatible endpoint (path-style), starting 1 KiB in
//! OBJSTREAM_ENDPOINT=http://localhost:9000 \
//!     cargo run --example cat_objects -- http - logs part-0001 part-0002 --offset 1024
//! ```
//!
//! For `http`, pass `-` as the endpoint to take it from `OBJSTREAM_ENDPOINT`.
//! Set `RUST_LOG=objstream_core=trace` to see every range fetch.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use objstream_core::store::{HttpConfig, HttpObjectStore, LocalObjectStore};
use objstream_core::{ObjectStore, VirtualStream, Whence};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let offset = take_offset(&mut args)?;

    if args.len() < 4 {
        eprintln!("Usage: cat_objects <local|http> <root_or_endpoint> <bucket> <key>... [--offset N]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  cat_objects local ./data logs part-0001 part-0002");
        eprintln!("  cat_objects http http://localhost:9000 logs part-0001 --offset 1024");
        std::process::exit(1);
    }

    let mode = args[0].as_str();
    let location = &args[1];
    let bucket = &args[2];
    let keys = &args[3..];

    match mode {
        "local" => {
            let store = LocalObjectStore::open(location)?;
            eprintln!("Reading from {}", store.root().display());
            run(store, bucket, keys, offset)
        }
        "http" => {
            let mut config = HttpConfig::from_env();
            if location != "-" {
                config.endpoint = location.clone();
            }
            let store = HttpObjectStore::with_config(config)?;
            eprintln!(
                "Reading from {} (timeout {}s, {} retries)",
                store.config().endpoint,
                store.config().timeout_secs,
                store.config().max_retries
            );
            run(store, bucket, keys, offset)
        }
        _ => {
            eprintln!("Unknown mode: {mode}. Use 'local' or 'http'.");
            std::process::exit(1);
        }
    }
}

fn take_offset(args: &mut Vec<String>) -> Result<i64, Box<dyn std::error::Error>> {
    let Some(pos) = args.iter().position(|a| a == "--offset") else {
        return Ok(0);
    };
    let value = args.get(pos + 1).ok_or("--offset needs a value")?.parse()?;
    args.drain(pos..=pos + 1);
    Ok(value)
}

fn run<S: ObjectStore>(
    store: S,
    bucket: &str,
    keys: &[String],
    offset: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = VirtualStream::open(Arc::new(store), bucket, keys.iter().cloned())?;

    eprintln!(
        "{} objects, {} bytes total",
        stream.segments().len(),
        stream.total_size()
    );
    for segment in stream.segments() {
        eprintln!("  {:>12}  {}", segment.size(), segment.key());
    }

    // Negative offsets count back from the end.
    let whence = if offset < 0 { Whence::End } else { Whence::Start };
    stream.seek(offset, whence)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let copied = io::copy(&mut stream, &mut out)?;
    out.flush()?;

    eprintln!("copied {copied} bytes");
    Ok(())
}
