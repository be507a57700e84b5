use crate::core::fields::ParseFailure;
use crate::editor::Editor;
use crate::error::Error;
use crate::ingest::IngestEngine;
use crate::store::TaskStore;

const FAILURE_PREAMBLE: &str = "\
# The following lines were not successfully imported.
# Uncomment to re-attempt parsing or leave commented to abort.
# In some cases, the task might have been added, but some parts didn't parse.
# As long as you don't change the description (case-insensitive) the task
# will be updated, not duped.

";

/// Buffer header shown on every pass.
pub fn header(name: &str, version: &str) -> String {
    format!(
        "# {} {}\n#\n# Input tasks in the form:\n#    (N) Task @CONTEXT +PROJECT due: scheduled:\n\n",
        name, version
    )
}

/// Render failures as comments: `# <line>` then `#    ERROR: <reason>`.
///
/// Commented lines are skipped on ingest, so a failure left as-is is dropped
/// and an uncommented one is resubmitted.
pub fn render_failures(failures: &[ParseFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut out = String::from(FAILURE_PREAMBLE);
    for failure in failures {
        out.push_str(&format!(
            "# {}\n#    ERROR: {}\n\n",
            failure.line, failure.reason
        ));
    }
    out
}

pub fn render_buffer(header: &str, failures: &[ParseFailure]) -> String {
    let mut buffer = header.to_string();
    buffer.push_str(&render_failures(failures));
    buffer
}

/// Totals across every pass of a retry loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub passes: usize,
    pub created: usize,
    pub updated: usize,
}

/// Edit, ingest, and re-present failures until a pass has none.
///
/// `failed` seeds the first buffer, e.g. with failures from a one-shot
/// ingest; pass an empty list to start from a blank buffer.
pub fn run(
    store: &mut dyn TaskStore,
    editor: &mut dyn Editor,
    header: &str,
    mut failed: Vec<ParseFailure>,
) -> Result<RetrySummary, Error> {
    let mut summary = RetrySummary::default();

    loop {
        let buffer = render_buffer(header, &failed);
        let edited = editor.edit(&buffer)?;

        let report = IngestEngine::new(store).ingest_text(&edited);
        summary.passes += 1;
        summary.created += report.created;
        summary.updated += report.updated;
        failed = report.failures;

        if failed.is_empty() {
            break;
        }
        log::info!(
            "Pass {} left {} failed lines, reopening the editor",
            summary.passes,
            failed.len()
        );
    }

    Ok(summary)
}
