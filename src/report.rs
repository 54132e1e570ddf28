//! Report presentation: the printable HTML page and the raw markdown export.

use chrono::{Local, NaiveDate};

use crate::clients::{ReportResult, SourceRef};
use crate::error::Result;
use crate::render::MarkdownRenderer;

pub const MARKDOWN_FILENAME: &str = "risk-assessment-report.md";
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

const PAGE_STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 56rem; margin: 2rem auto; padding: 0 1rem; color: #1f2937; }
header { border-bottom: 2px solid #e5e7eb; padding-bottom: 1.5rem; }
table { border-collapse: collapse; } th, td { border: 1px solid #d1d5db; padding: 0.5rem; }
li.flex { display: flex; align-items: flex-start; } .flex-grow { flex-grow: 1; } .ml-2 { margin-left: 0.5rem; }
.print-tag { display: inline-flex; align-items: center; font-size: 0.75rem; padding: 0.1rem 0.5rem; border-radius: 9999px; }
.risk-tag-financial { background: #dcfce7; color: #166534; }
.risk-tag-operational { background: #dbeafe; color: #1e40af; }
.risk-tag-strategic { background: #f3e8ff; color: #6b21a8; }
.risk-tag-compliance { background: #fef9c3; color: #854d0e; }
footer { border-top: 1px solid #e5e7eb; padding-top: 1.5rem; }
@media print { .print-tag { border: 1px solid currentColor; } }
"#;

/// "October 19, 2026"
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// A generated report ready to be shown
pub struct ReportPage<'a> {
    result: &'a ReportResult,
    generated_on: NaiveDate,
}

impl<'a> ReportPage<'a> {
    pub fn new(result: &'a ReportResult) -> Self {
        Self {
            result,
            generated_on: Local::now().date_naive(),
        }
    }

    pub fn generated_on(mut self, date: NaiveDate) -> Self {
        self.generated_on = date;
        self
    }

    /// Sanitized "Grounding Sources" footer, empty when there are none
    pub fn sources_html(&self, renderer: &MarkdownRenderer) -> String {
        if self.result.sources.is_empty() {
            return String::new();
        }
        let items: String = self
            .result
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| source_item(i + 1, source))
            .collect();
        renderer.sanitize(&format!(
            "<footer><h3>Grounding Sources</h3><ul>{}</ul></footer>",
            items
        ))
    }

    /// Complete standalone HTML document
    pub fn to_html(&self, renderer: &MarkdownRenderer) -> Result<String> {
        let body = renderer.render_report(&self.result.report)?;
        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Risk Assessment Report</title>\n<style>{style}</style>\n</head>\n<body>\n<header>\n<h1>Risk Assessment Report</h1>\n<p>Date of Generation: {date}</p>\n<p>Status: <span class=\"status-completed\">Completed</span></p>\n</header>\n<article>\n{body}</article>\n{sources}\n</body>\n</html>\n",
            style = PAGE_STYLE,
            date = format_report_date(self.generated_on),
            body = body,
            sources = self.sources_html(renderer),
        ))
    }
}

fn source_item(index: usize, source: &SourceRef) -> String {
    let title = if source.title.trim().is_empty() {
        &source.uri
    } else {
        &source.title
    };
    format!(
        "<li><span class=\"source-title\">{}. {}</span> <a href=\"{}\" title=\"{}\">{}</a></li>",
        index,
        ammonia::clean_text(title),
        ammonia::clean_text(&source.uri),
        ammonia::clean_text(&source.uri),
        ammonia::clean_text(&source.uri),
    )
}

/// Raw markdown for clipboard copy and file download. Never transformed.
pub fn export_markdown(result: &ReportResult) -> &str {
    &result.report
}
