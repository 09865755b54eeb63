//! Reporting of unrecoverable errors.

use std::error::Error;
use std::fmt::Write;
use std::process;

/// Render an error followed by its chain of sources, one `\t from` line each.
pub fn format_fatal(err: &dyn Error) -> String {
    let mut report = err.to_string();
    if report.is_empty() {
        report.push_str("unknown error");
    }
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(report, "\n\t from {cause}");
        source = cause.source();
    }
    report
}

/// Log `err`, print it to stderr and exit with `status`.
pub fn exit_application(err: &dyn Error, status: i32) -> ! {
    let report = format_fatal(err);
    tracing::error!(status, "{report}");
    eprintln!("{report}");
    process::exit(status)
}
