//! Helpers shared by the command-line tools.
//!
//! All tools follow the same conventions: `-h`/`--help` or no argument at
//! all prints the usage to stdout and exits with status 0, a malformed
//! command line prints a message to stderr and exits with status 1.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use nalgebra::Point2;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CliError {
    #[error("Malformed 2D point: {0}")]
    MalformedPoint(String),
}

/// Parses a point written as `x:y`.
///
/// # Examples
///
/// ```rust
/// use paper_pnp::cli::parse_point2d;
///
/// let p = parse_point2d("12:34").unwrap();
/// assert_eq!((p.x, p.y), (12.0, 34.0));
/// assert!(parse_point2d("12").is_err());
/// ```
pub fn parse_point2d(arg: &str) -> Result<Point2<f64>, CliError> {
    let malformed = || CliError::MalformedPoint(arg.to_string());

    let (x, y) = arg.split_once(':').ok_or_else(malformed)?;
    let x: f64 = x.trim().parse().map_err(|_| malformed())?;
    let y: f64 = y.trim().parse().map_err(|_| malformed())?;

    if !x.is_finite() || !y.is_finite() {
        return Err(malformed());
    }
    Ok(Point2::new(x, y))
}

/// Process exit status for a command-line parsing outcome.
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

/// Parses the process arguments, exiting on help requests and usage errors.
pub fn parse_args<C: Parser>() -> C {
    match C::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = exit_code(err.kind());
            if err.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
                // clap sends this one to stderr; usage belongs on stdout.
                let _ = C::command().print_help();
            } else {
                let _ = err.print();
            }
            std::process::exit(code);
        }
    }
}
