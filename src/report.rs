//! Terminal report artifact
//!
//! Renders the analyst report plus verdict into one markdown file,
//! named deterministically from the sanitized subject and date.

use crate::collector::sanitize_subject;
use crate::models::Verdict;
use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the final report for a subject, returning the file path.
pub fn save_report(
    reports_dir: impl AsRef<Path>,
    subject_name: &str,
    report: &str,
    verdict: &Verdict,
) -> Result<PathBuf> {
    let safe_name = sanitize_subject(subject_name)?;
    let date = Utc::now().format("%Y-%m-%d").to_string();

    std::fs::create_dir_all(reports_dir.as_ref())?;
    let path = reports_dir
        .as_ref()
        .join(format!("{}_Analyst_Report_{}.md", safe_name, date));

    std::fs::write(&path, render_report(subject_name, &date, report, verdict))?;
    info!(path = %path.display(), "Report saved");
    Ok(path)
}

fn render_report(subject_name: &str, date: &str, report: &str, verdict: &Verdict) -> String {
    format!(
        "# Analyst Report: {name}\n\n\
         **Date:** {date}\n\n\
         ---\n\n\
         ## Executive Summary\n\n\
         **Recommendation:** {rec}  \n\
         **Confidence:** {conf}  \n\
         **Expected 3-Year Return:** {ret}  \n\
         **Probability of 40%+ Return:** {prob}\n\n\
         ---\n\n\
         ## Detailed Analysis\n\n\
         {report}\n\n\
         ---\n\n\
         ## Validation & Recommendation\n\n\
         ### Key Drivers:\n{drivers}\n\n\
         ### Key Risks:\n{risks}\n\n\
         ### Red Flags Found:\n{red_flags}\n\n\
         ### Financial Concerns:\n{concerns}\n\n\
         ### Reasoning:\n{reasoning}\n",
        name = subject_name,
        date = date,
        rec = verdict.recommendation,
        conf = not_empty(&verdict.confidence),
        ret = not_empty(&verdict.expected_return_3y),
        prob = not_empty(&verdict.probability_40pct_return),
        report = report,
        drivers = bullet_list(&verdict.key_drivers, "None identified"),
        risks = bullet_list(&verdict.key_risks, "None identified"),
        red_flags = bullet_list(&verdict.red_flags_found, "No major red flags identified"),
        concerns = bullet_list(
            &verdict.financial_concerns,
            "No major financial concerns identified"
        ),
        reasoning = not_empty(&verdict.reasoning),
    )
}

fn bullet_list(items: &[String], empty_note: &str) -> String {
    if items.is_empty() {
        return format!("- {}", empty_note);
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn not_empty(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}
