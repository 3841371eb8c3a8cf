//! `vinrecon fetch`: download one feed and write a UTF-8 CSV snapshot.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use vinrecon_feed::{FeedClient, FeedSource, FetchOptions};
use vinrecon_io::{encode, TextEncoding};
use vinrecon_recon::config::parse_delimiter;

use crate::exit_codes::{EXIT_DECODE_FAILED, EXIT_OUTPUT};
use crate::recon::load_feed;
use crate::CliError;

pub fn cmd_fetch(
    source: String,
    out: Option<PathBuf>,
    delimiter: String,
    timeout: u64,
    quiet: bool,
) -> Result<(), CliError> {
    let delimiter = parse_delimiter(&delimiter).map_err(|e| CliError::args(e.to_string()))?;
    if timeout == 0 {
        return Err(CliError::args("--timeout must be > 0"));
    }
    let source = FeedSource::parse(&source).map_err(CliError::args)?;

    let client = FeedClient::new(FetchOptions {
        timeout: Duration::from_secs(timeout),
        ..FetchOptions::default()
    });
    let rowset = load_feed(&client, "feed", &source, delimiter)?;

    let bytes = encode(&rowset, b',', TextEncoding::Utf8)
        .map_err(|e| CliError::new(EXIT_DECODE_FAILED, format!("cannot re-encode feed: {e}")))?;

    match out {
        Some(ref path) => {
            std::fs::write(path, &bytes)
                .map_err(|e| CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display())))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|_| stdout.flush())
                .map_err(|e| CliError::new(EXIT_OUTPUT, format!("cannot write snapshot: {e}")))?;
        }
    }

    if !quiet {
        eprintln!(
            "{}: {} rows, {} columns (decoded as {}){}",
            source,
            rowset.len(),
            rowset.headers.len(),
            rowset.encoding,
            out.as_ref()
                .map(|p| format!(" -> {}", p.display()))
                .unwrap_or_default(),
        );
    }
    Ok(())
}
