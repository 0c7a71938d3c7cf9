//! openapi-from-comments - Command-line tool for generating OpenAPI documentation.
//!
//! Scans a Go source tree for `@Directive` comments and writes an OpenAPI
//! 3.1 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-comments [OPTIONS] --dir <DIR>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-comments --dir ./service -o docs/openapi.yaml
//! ```
//!
//! Generate JSON, reading general info from a specific file:
//! ```bash
//! openapi-from-comments --dir ./service -g cmd/api/main.go -f json -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-comments --dir ./service -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_comments::cli;

fn main() -> Result<()> {
    // Parse first so --verbose can pick the log level before anything logs
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-comments starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
