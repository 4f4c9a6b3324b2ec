//! Text format filter pipeline.
//!
//! Renders article bodies to safe HTML based on their format:
//! - markdown: CommonMark (plus tables, strikethrough) then sanitized
//! - plain_text: HTML-escapes all content and keeps line breaks

use pulldown_cmark::{Options, Parser, html};

/// Format name for Markdown bodies.
pub const FORMAT_MARKDOWN: &str = "markdown";
/// Format name for plain-text bodies.
pub const FORMAT_PLAIN_TEXT: &str = "plain_text";

/// Formats accepted on articles.
pub const KNOWN_FORMATS: &[&str] = &[FORMAT_MARKDOWN, FORMAT_PLAIN_TEXT];

/// Trait for text filters in the pipeline.
pub trait TextFilter: Send + Sync {
    /// Filter name for debugging.
    fn name(&self) -> &str;

    /// Process the input text and return filtered output.
    fn process(&self, input: &str) -> String;
}

/// Pipeline of text filters applied in sequence.
pub struct FilterPipeline {
    filters: Vec<Box<dyn TextFilter>>,
}

impl FilterPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add<F: TextFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Create pipeline for a specific format.
    pub fn for_format(format: &str) -> Self {
        match format {
            FORMAT_MARKDOWN => Self::markdown(),
            _ => Self::plain_text(), // Default to safest option
        }
    }

    /// Markdown rendered to HTML, then sanitized.
    pub fn markdown() -> Self {
        Self::new().add(MarkdownFilter).add(SanitizeFilter)
    }

    /// Create a plain text pipeline (escapes all HTML).
    pub fn plain_text() -> Self {
        Self::new().add(HtmlEscapeFilter).add(NewlineFilter)
    }

    /// Names of the filters, in order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Process text through all filters in the pipeline.
    pub fn process(&self, input: &str) -> String {
        self.filters
            .iter()
            .fold(input.to_string(), |acc, filter| filter.process(&acc))
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::plain_text()
    }
}

/// Filter that escapes all HTML characters.
pub struct HtmlEscapeFilter;

impl TextFilter for HtmlEscapeFilter {
    fn name(&self) -> &str {
        "html_escape"
    }

    fn process(&self, input: &str) -> String {
        html_escape(input)
    }
}

/// Filter that converts newlines to <br> tags.
pub struct NewlineFilter;

impl TextFilter for NewlineFilter {
    fn name(&self) -> &str {
        "newline"
    }

    fn process(&self, input: &str) -> String {
        input.replace('\n', "<br>\n")
    }
}

/// Filter that renders Markdown to HTML.
pub struct MarkdownFilter;

impl TextFilter for MarkdownFilter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn process(&self, input: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(input, options);
        let mut out = String::with_capacity(input.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Filter that strips dangerous tags and attributes with ammonia.
pub struct SanitizeFilter;

impl TextFilter for SanitizeFilter {
    fn name(&self) -> &str {
        "sanitize"
    }

    fn process(&self, input: &str) -> String {
        ammonia::clean(input)
    }
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Strip Markdown/HTML down to plain words, for excerpts and word counts.
pub fn plain_text(body: &str, format: &str) -> String {
    if format != FORMAT_MARKDOWN {
        return body.to_string();
    }

    use pulldown_cmark::{Event, TagEnd};
    let mut out = String::with_capacity(body.len());
    for event in Parser::new(body) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => out.push(' '),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_filter() {
        let filter = HtmlEscapeFilter;
        assert_eq!(
            filter.process("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn plain_text_pipeline_keeps_line_breaks() {
        let html = FilterPipeline::plain_text().process("a < b\nc");
        assert_eq!(html, "a &lt; b<br>\nc");
    }

    #[test]
    fn markdown_renders_headings_and_emphasis() {
        let html = FilterPipeline::markdown().process("# Title\n\nSome *text*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn markdown_strips_script_tags() {
        let html = FilterPipeline::markdown().process("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("hi"));
    }

    #[test]
    fn unknown_format_falls_back_to_plain_text() {
        let pipeline = FilterPipeline::for_format("full_html");
        assert_eq!(pipeline.filter_names(), vec!["html_escape", "newline"]);
    }

    #[test]
    fn plain_text_from_markdown() {
        let text = plain_text("# Hello\n\nThis is **bold** and `code`.", FORMAT_MARKDOWN);
        assert_eq!(text, "Hello This is bold and code.");
    }
}
