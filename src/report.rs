//! Human-readable output for the errors that survive classification.

use crate::classifier::StackClassifier;
use crate::stack::ReportedError;
use memcheck_config::Configuration;
use std::io::{self, Write};

/// Counts from one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub suppressed: usize,
    pub retained: usize,
}

impl ReportSummary {
    pub fn has_errors(&self) -> bool {
        self.retained > 0
    }
}

/// Errors that the classifier keeps, in their original order.
pub fn retained_errors<'e>(
    config: &Configuration,
    errors: &'e [ReportedError],
) -> Vec<&'e ReportedError> {
    let classifier = StackClassifier::new(config);
    errors
        .iter()
        .filter(|error| !classifier.skip_stack(&error.stack))
        .collect()
}

/// Classify `errors` and write the retained ones to `out`.
pub fn write_report<W: Write + ?Sized>(
    out: &mut W,
    config: &Configuration,
    errors: &[ReportedError],
) -> io::Result<ReportSummary> {
    let retained = retained_errors(config, errors);
    let summary = ReportSummary {
        total: errors.len(),
        suppressed: errors.len() - retained.len(),
        retained: retained.len(),
    };

    for error in &retained {
        writeln!(
            out,
            "{}: {}",
            error.kind.as_deref().unwrap_or("Error"),
            error.message.as_deref().unwrap_or("(no description)")
        )?;
        for (i, frame) in error.stack.iter().enumerate() {
            let marker = if i == 0 { "at" } else { "by" };
            writeln!(out, "    {marker} {frame}")?;
        }
        writeln!(out)?;
    }

    if summary.has_errors() {
        writeln!(
            out,
            "{} error(s) in {} ({} suppressed)",
            summary.retained,
            config.binary_name(),
            summary.suppressed
        )?;
    }
    out.flush()?;

    log::info!(
        "Classified {} error(s): {} retained, {} suppressed",
        summary.total,
        summary.retained,
        summary.suppressed
    );
    Ok(summary)
}

/// Classify `errors` and write the retained ones to the configured sink.
pub fn render_errors(config: &Configuration, errors: &[ReportedError]) -> io::Result<ReportSummary> {
    let mut sink = config.output().open()?;
    write_report(&mut *sink, config, errors)
}
