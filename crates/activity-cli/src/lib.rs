//! Shared entry point and subcommand implementations for the
//! `linear-activity`, `github-activity` and `slack-activity` binaries.
//!
//! Each binary parses its own [`clap::Parser`] args and hands an async
//! `run` function to [`main_with`], which owns logging setup, the tokio
//! runtime and the exit-code contract:
//!
//! | outcome                          | exit |
//! |----------------------------------|------|
//! | report written                   | 0    |
//! | `--help` / `--version`           | 0    |
//! | missing or invalid configuration | 1    |
//! | fetch failed after retries       | 1    |

pub mod cmd;

use std::future::Future;
use std::path::PathBuf;

use clap::Parser;

/// Parse `A`, run `run` to completion on a current-thread runtime and exit.
///
/// Configuration errors print clap's usage text to stderr before any
/// network call. Run errors print the full error chain.
pub fn main_with<A, F, Fut>(run: F)
where
    A: Parser,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = anyhow::Result<PathBuf>>,
{
    let args = match A::try_parse() {
        Ok(args) => args,
        // Help and version go to stdout and exit 0; everything else is a
        // configuration error.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_tracing();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run(args)));

    match result {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Diagnostics go to stderr so stdout carries only the report path.
/// `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
