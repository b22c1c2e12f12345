//! Markdown run report generation
//!
//! This module generates a human-readable markdown report of one driver's
//! run from the jobs' terminal reports.

use crate::crawler::JobOutcome;
use crate::output::traits::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_report(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Wavecrawl Run Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Driver**: {}\n", summary.driver));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Rules Hash**: {}\n\n", summary.rules_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Seeds**: {}\n", summary.jobs.len()));
    md.push_str(&format!(
        "- **Completed Jobs**: {}\n",
        summary.jobs_with_outcome(JobOutcome::is_success)
    ));
    md.push_str(&format!(
        "- **Failed Jobs**: {}\n",
        summary.jobs_with_outcome(|o| matches!(o, JobOutcome::Failed(_)))
    ));
    md.push_str(&format!(
        "- **Cancelled Jobs**: {}\n",
        summary.jobs_with_outcome(|o| matches!(o, JobOutcome::Cancelled))
    ));
    md.push_str(&format!("- **Pages Fetched**: {}\n", summary.total_fetched()));
    md.push_str(&format!("- **Failed Fetches**: {}\n", summary.total_failed()));
    md.push_str(&format!(
        "- **Filtered Out**: {}\n",
        summary.total_skipped()
    ));
    md.push_str(&format!(
        "- **URLs Discovered**: {}\n",
        summary.total_discovered()
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.jobs.is_empty() {
        md.push_str("## Jobs\n\n");
        md.push_str("| # | Seed | Outcome | Waves | Fetched | Failed | Skipped | Discovered | Time (s) |\n");
        md.push_str("|---|------|---------|-------|---------|--------|---------|------------|----------|\n");
        for job in &summary.jobs {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {:.1} |\n",
                job.id,
                job.seed,
                escape_cell(&job.outcome.to_string()),
                job.waves,
                job.fetched,
                job.failed,
                job.skipped,
                job.discovered,
                job.elapsed.as_secs_f64()
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Report generated by Wavecrawl v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
