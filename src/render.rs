//! Markdown to sanitized HTML for generated reports.
//!
//! List items whose own text ends in `(Financial)`, `(Operational)`,
//! `(Strategic)` or `(Compliance)` lose the suffix and gain a coloured badge.
//! Every other event passes through untouched, so untagged documents render
//! exactly as plain pulldown-cmark output would.

use std::panic::{AssertUnwindSafe, catch_unwind};

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::error::{AssistantError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTag {
    Financial,
    Operational,
    Strategic,
    Compliance,
}

impl RiskTag {
    pub const ALL: [RiskTag; 4] = [
        RiskTag::Financial,
        RiskTag::Operational,
        RiskTag::Strategic,
        RiskTag::Compliance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RiskTag::Financial => "Financial",
            RiskTag::Operational => "Operational",
            RiskTag::Strategic => "Strategic",
            RiskTag::Compliance => "Compliance",
        }
    }

    fn screen_classes(self) -> &'static str {
        match self {
            RiskTag::Financial => {
                "bg-green-100 text-green-800 dark:bg-green-900 dark:text-green-300"
            }
            RiskTag::Operational => "bg-blue-100 text-blue-800 dark:bg-blue-900 dark:text-blue-300",
            RiskTag::Strategic => {
                "bg-purple-100 text-purple-800 dark:bg-purple-900 dark:text-purple-300"
            }
            RiskTag::Compliance => {
                "bg-yellow-100 text-yellow-800 dark:bg-yellow-900 dark:text-yellow-300"
            }
        }
    }

    fn icon(self) -> &'static str {
        match self {
            RiskTag::Financial => "&#x1F4B0;",
            RiskTag::Operational => "&#x2699;",
            RiskTag::Strategic => "&#x265E;",
            RiskTag::Compliance => "&#x2696;",
        }
    }

    /// Print stylesheet hook, e.g. `risk-tag-financial`
    pub fn print_class(self) -> String {
        format!("risk-tag-{}", self.name().to_lowercase())
    }

    /// Find an exact, case-sensitive `(Name)` at the end of `text`
    pub fn strip_suffix(text: &str) -> Option<(RiskTag, &str)> {
        let trimmed = text.trim_end();
        Self::ALL.into_iter().find_map(|tag| {
            trimmed
                .strip_suffix(')')
                .and_then(|t| t.strip_suffix(tag.name()))
                .and_then(|t| t.strip_suffix('('))
                .map(|rest| (tag, rest.trim_end()))
        })
    }

    fn badge_html(self) -> String {
        format!(
            "<span class=\"inline-flex items-center text-xs font-medium px-2 py-0.5 rounded-full {} print-tag {}\"><span class=\"risk-icon mr-1.5\" aria-hidden=\"true\">{}</span> {}</span>",
            self.screen_classes(),
            self.print_class(),
            self.icon(),
            self.name()
        )
    }
}

/// Markdown renderer with its own sanitizer and list-item behaviour.
pub struct MarkdownRenderer {
    risk_badges: bool,
    sanitizer: ammonia::Builder<'static>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Renderer with risk-tag badges enabled
    pub fn new() -> Self {
        Self::with_risk_badges(true)
    }

    /// Plain markdown rendering, same sanitizer
    pub fn plain() -> Self {
        Self::with_risk_badges(false)
    }

    pub fn with_risk_badges(risk_badges: bool) -> Self {
        let mut sanitizer = ammonia::Builder::default();
        sanitizer
            .add_tags(&["input"])
            .add_generic_attributes(&["class", "aria-hidden"])
            .add_tag_attributes("input", &["type", "disabled", "checked"]);
        Self {
            risk_badges,
            sanitizer,
        }
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options
    }

    /// Markdown to sanitized HTML. The output is safe to embed as trusted markup.
    pub fn render(&self, markdown: &str) -> String {
        let events: Vec<Event<'_>> = Parser::new_ext(markdown, Self::options()).collect();
        let events = if self.risk_badges {
            annotate_items(events)
        } else {
            events
        };

        let mut dirty = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut dirty, events.into_iter());
        self.sanitize(&dirty)
    }

    /// Allow-list clean of arbitrary HTML
    pub fn sanitize(&self, dirty: &str) -> String {
        self.sanitizer.clean(dirty).to_string()
    }

    /// Presentation boundary: a failure inside the pipeline becomes a
    /// `Render` error instead of taking the caller down.
    pub fn render_report(&self, markdown: &str) -> Result<String> {
        catch_unwind(AssertUnwindSafe(|| self.render(markdown))).map_err(|_| {
            tracing::error!(chars = markdown.len(), "markdown rendering panicked");
            AssistantError::Render {
                message: "The report could not be displayed.".to_string(),
            }
        })
    }
}

fn is_inline(event: &Event<'_>) -> bool {
    match event {
        Event::Text(_)
        | Event::Code(_)
        | Event::InlineHtml(_)
        | Event::SoftBreak
        | Event::HardBreak
        | Event::FootnoteReference(_) => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
        ),
        Event::End(tag) => matches!(
            tag,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
        ),
        _ => false,
    }
}

/// Index of the `End(Item)` closing the item opened at `start`
fn item_end(events: &[Event<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(Tag::Item) => depth += 1,
            Event::End(TagEnd::Item) => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    events.len()
}

fn annotate_items(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter_start = 0;
    let mut i = 0;
    while i < events.len() {
        if matches!(events[i], Event::Start(Tag::Item)) {
            let end = item_end(&events, i);
            out.extend(events[iter_start..i].iter().cloned());
            let inner = annotate_items(events[i + 1..end.min(events.len())].to_vec());
            match tag_item(&inner) {
                Some(tagged) => out.extend(tagged),
                None => {
                    out.push(Event::Start(Tag::Item));
                    out.extend(inner);
                    if end < events.len() {
                        out.push(Event::End(TagEnd::Item));
                    }
                }
            }
            i = end + 1;
            iter_start = i;
        } else {
            i += 1;
        }
    }
    if iter_start < events.len() {
        out.extend(events[iter_start..].iter().cloned());
    }
    out
}

/// Rebuild one item's events with a badge, or `None` when it carries no tag
fn tag_item<'a>(inner: &[Event<'a>]) -> Option<Vec<Event<'a>>> {
    let mut pos = 0;
    let mut paragraph = false;
    let mut marker = None;
    loop {
        match inner.get(pos) {
            Some(Event::Start(Tag::Paragraph)) if !paragraph && marker.is_none() => {
                paragraph = true;
                pos += 1;
            }
            Some(Event::TaskListMarker(checked)) if marker.is_none() => {
                marker = Some(*checked);
                pos += 1;
            }
            _ => break,
        }
    }

    let run_end = inner[pos..]
        .iter()
        .position(|e| !is_inline(e))
        .map_or(inner.len(), |offset| pos + offset);
    let mut run = coalesce_text(&inner[pos..run_end]);

    let (tag, remaining) = match run.last() {
        Some(Event::Text(text)) => {
            let (tag, rest) = RiskTag::strip_suffix(text)?;
            (tag, rest.to_string())
        }
        _ => return None,
    };
    run.pop();
    if !remaining.is_empty() {
        run.push(Event::Text(CowStr::from(remaining)));
    }

    let mut rest_start = run_end;
    if paragraph && matches!(inner.get(run_end), Some(Event::End(TagEnd::Paragraph))) {
        rest_start += 1;
    }

    let mut out = Vec::with_capacity(inner.len() + 6);
    out.push(Event::Html(CowStr::from("<li class=\"flex items-start mb-2\">")));
    if let Some(checked) = marker {
        out.push(Event::TaskListMarker(checked));
    }
    out.push(Event::Html(CowStr::from("<span class=\"flex-grow\">")));
    out.extend(run);
    out.push(Event::Html(CowStr::from(
        "</span><span class=\"ml-2 flex-shrink-0\">",
    )));
    out.push(Event::Html(CowStr::from(tag.badge_html())));
    out.push(Event::Html(CowStr::from("</span>")));
    out.extend(inner[rest_start..].iter().cloned());
    out.push(Event::Html(CowStr::from("</li>\n")));
    Some(out)
}

/// Merge adjacent text events so a tag split across chunks is still seen whole
fn coalesce_text<'a>(events: &[Event<'a>]) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::with_capacity(events.len());
    for event in events {
        match (out.last_mut(), event) {
            (Some(Event::Text(prev)), Event::Text(next)) => {
                let merged = format!("{}{}", &**prev, &**next);
                *prev = CowStr::from(merged);
            }
            _ => out.push(event.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_suffix_requires_exact_trailing_tag() {
        assert_eq!(
            RiskTag::strip_suffix("Risk of overrun. (Financial)"),
            Some((RiskTag::Financial, "Risk of overrun."))
        );
        assert_eq!(
            RiskTag::strip_suffix("Vendor lock-in (Strategic)  "),
            Some((RiskTag::Strategic, "Vendor lock-in"))
        );
        assert_eq!(RiskTag::strip_suffix("Lower case (financial)"), None);
        assert_eq!(RiskTag::strip_suffix("Partial (Finance)"), None);
        assert_eq!(RiskTag::strip_suffix("(Compliance) leading"), None);
    }

    #[test]
    fn print_class_is_lowercased_name() {
        assert_eq!(RiskTag::Operational.print_class(), "risk-tag-operational");
    }

    #[test]
    fn coalesce_merges_adjacent_text_only() {
        let events = vec![
            Event::Text("a".into()),
            Event::Text("b".into()),
            Event::SoftBreak,
            Event::Text("c".into()),
        ];
        let merged = coalesce_text(&events);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], Event::Text("ab".into()));
    }

    #[test]
    fn nested_tagged_item_inside_untagged_parent() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("- Parent\n  - Child risk (Operational)\n");
        assert!(html.contains("risk-tag-operational"));
        assert!(html.contains("Parent"));
        assert!(!html.contains("(Operational)"));
    }
}
