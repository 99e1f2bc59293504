//! Markdown-to-ANSI rendering for answers.
//!
//! `pulldown-cmark` does the parsing; this module maps its events onto
//! crossterm styles. Constructs without a terminal equivalent (images, raw
//! HTML) fall back to their text.

use crossterm::style::{ContentStyle, Stylize};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

/// Render `text` for a terminal `width` columns wide.
pub fn render(text: &str, width: u16) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(width);
    for event in Parser::new_ext(text, options) {
        renderer.event(event);
    }
    renderer.finish()
}

/// Tags that need work when they close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Block,
    Heading,
    Quote,
    CodeBlock,
    List,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Inline,
}

struct Renderer {
    out: String,
    open: Vec<Open>,
    /// A list marker was just written; the item's first block continues its line.
    after_marker: bool,
    width: u16,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    heading: Option<HeadingLevel>,
    quote_depth: usize,
    in_code_block: bool,
    /// One entry per open list: the next number for ordered lists.
    lists: Vec<Option<u64>>,
    /// Destination and label text of the open link.
    link: Option<(String, String)>,
    table_cell: usize,
}

impl Renderer {
    fn new(width: u16) -> Self {
        Self {
            out: String::new(),
            open: Vec::new(),
            after_marker: false,
            width,
            strong: 0,
            emphasis: 0,
            strikethrough: 0,
            heading: None,
            quote_depth: 0,
            in_code_block: false,
            lists: Vec::new(),
            link: None,
            table_cell: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) if self.in_code_block => self.code_block_text(&text),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.line_prefix();
                self.after_marker = false;
                self.out.push_str(&code.yellow().to_string());
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::InlineMath(math) | Event::DisplayMath(math) => self.text(&math),
            Event::FootnoteReference(name) => self.text(&format!("[^{}]", name)),
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.block_break();
                let rule = "─".repeat(self.width as usize).dark_grey().to_string();
                self.out.push_str(&rule);
                self.out.push('\n');
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                self.block_break();
                Open::Block
            }
            Tag::Heading { level, .. } => {
                self.block_break();
                self.heading = Some(level);
                Open::Heading
            }
            Tag::BlockQuote(_) => {
                self.block_break();
                self.quote_depth += 1;
                Open::Quote
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.out.push_str(&format!("  {}\n", lang.dark_grey()));
                    }
                }
                Open::CodeBlock
            }
            Tag::List(first) => {
                self.block_break();
                self.lists.push(first);
                Open::List
            }
            Tag::Item => {
                self.block_break();
                let depth = self.lists.len().max(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}.", n);
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.line_prefix();
                self.out.push_str(&format!("{}{} ", "  ".repeat(depth), marker));
                self.after_marker = true;
                Open::Block
            }
            Tag::Emphasis => {
                self.emphasis += 1;
                Open::Emphasis
            }
            Tag::Strong => {
                self.strong += 1;
                Open::Strong
            }
            Tag::Strikethrough => {
                self.strikethrough += 1;
                Open::Strikethrough
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link = Some((dest_url.to_string(), String::new()));
                Open::Link
            }
            Tag::TableHead | Tag::TableRow => {
                self.block_break();
                self.table_cell = 0;
                Open::Block
            }
            Tag::TableCell => {
                if self.table_cell > 0 {
                    self.out.push_str(&" │ ".dark_grey().to_string());
                }
                self.table_cell += 1;
                Open::Inline
            }
            Tag::Table(_) => Open::Block,
            _ => Open::Inline,
        };
        self.open.push(open);
    }

    fn end(&mut self) {
        match self.open.pop() {
            Some(Open::Block) => self.block_break(),
            Some(Open::Heading) => {
                self.heading = None;
                self.block_break();
            }
            Some(Open::Quote) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.block_break();
            }
            Some(Open::CodeBlock) => {
                self.in_code_block = false;
                self.block_break();
            }
            Some(Open::List) => {
                self.lists.pop();
                self.block_break();
            }
            Some(Open::Emphasis) => self.emphasis = self.emphasis.saturating_sub(1),
            Some(Open::Strong) => self.strong = self.strong.saturating_sub(1),
            Some(Open::Strikethrough) => self.strikethrough = self.strikethrough.saturating_sub(1),
            Some(Open::Link) => {
                if let Some((url, label)) = self.link.take() {
                    // Autolinks already show the address.
                    if !url.is_empty() && url != label {
                        self.out.push_str(&format!(" ({})", url).dark_grey().to_string());
                    }
                }
            }
            Some(Open::Inline) | None => {}
        }
    }

    fn text(&mut self, text: &str) {
        self.line_prefix();
        self.after_marker = false;
        if let Some((_, label)) = self.link.as_mut() {
            label.push_str(text);
        }
        let style = self.style();
        if style == ContentStyle::default() {
            self.out.push_str(text);
        } else {
            self.out.push_str(&style.apply(text).to_string());
        }
    }

    fn code_block_text(&mut self, text: &str) {
        for line in text.lines() {
            self.line_prefix();
            self.out.push_str(&format!("    {}\n", line.yellow()));
        }
    }

    fn style(&self) -> ContentStyle {
        let mut style = ContentStyle::new();
        if self.strong > 0 || self.heading.is_some() {
            style = style.bold();
        }
        if self.emphasis > 0 || self.quote_depth > 0 {
            style = style.italic();
        }
        if self.strikethrough > 0 {
            style = style.crossed_out();
        }
        match self.heading {
            Some(HeadingLevel::H1) => style = style.underlined(),
            Some(_) => style = style.cyan(),
            None if self.link.is_some() => style = style.underlined(),
            None => {}
        }
        style
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    /// Quote bars at the start of a line.
    fn line_prefix(&mut self) {
        if self.quote_depth > 0 && self.at_line_start() {
            let bars = "│ ".repeat(self.quote_depth).dark_grey().to_string();
            self.out.push_str(&bars);
        }
    }

    /// Start the next block on a fresh line.
    fn block_break(&mut self) {
        if self.after_marker {
            return;
        }
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out.trim_end_matches('\n').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip ANSI escape sequences.
    fn plain(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for n in chars.by_ref() {
                    if n.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_headings_lose_markers() {
        let out = plain(&render("# Title\n## Section", 40));
        assert_eq!(out, "Title\nSection");
    }

    #[test]
    fn test_inline_markers_removed() {
        let out = plain(&render("Use **bold**, *italic* and `code`.", 40));
        assert_eq!(out, "Use bold, italic and code.");
    }

    #[test]
    fn test_unmatched_markers_kept() {
        let out = plain(&render("2 * 3 = 6 and a lone ` tick", 40));
        assert_eq!(out, "2 * 3 = 6 and a lone ` tick");
    }

    #[test]
    fn test_intraword_underscores_kept() {
        let text = "Call my__private__fn on snake_case_names, or `__init__.py`";
        let out = plain(&render(text, 80));
        assert_eq!(out, "Call my__private__fn on snake_case_names, or __init__.py");
    }

    #[test]
    fn test_lists() {
        let out = plain(&render("- one\n- two\n\n1. first\n2. second", 40));
        assert_eq!(out, "  • one\n  • two\n  1. first\n  2. second");
    }

    #[test]
    fn test_loose_list_keeps_marker_on_text_line() {
        let out = plain(&render("- one\n\n- two", 40));
        assert_eq!(out, "  • one\n  • two");
    }

    #[test]
    fn test_nested_list() {
        let out = plain(&render("- outer\n  - inner", 40));
        assert_eq!(out, "  • outer\n    • inner");
    }

    #[test]
    fn test_code_block_is_not_formatted() {
        let out = plain(&render("```rust\nlet x = **y**;\n```\ndone", 40));
        assert_eq!(out, "  rust\n    let x = **y**;\ndone");
    }

    #[test]
    fn test_rule_and_quote() {
        let out = plain(&render("---\n> quoted", 5));
        assert_eq!(out, "─────\n│ quoted");
    }

    #[test]
    fn test_link() {
        let out = plain(&render("See [docs](https://docs.perplexity.ai) [1]", 40));
        assert_eq!(out, "See docs (https://docs.perplexity.ai) [1]");
    }

    #[test]
    fn test_autolink_not_repeated() {
        let out = plain(&render("<https://perplexity.ai>", 40));
        assert_eq!(out, "https://perplexity.ai");
    }

    #[test]
    fn test_table_rows() {
        let out = plain(&render("| a | b |\n|---|---|\n| 1 | 2 |", 40));
        assert_eq!(out, "a │ b\n1 │ 2");
    }
}
