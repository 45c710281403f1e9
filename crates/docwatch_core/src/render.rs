use std::ops::Range;

use crate::region::{Element, Literal, Markup};

const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "button", "head",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "figcaption", "table", "thead", "tbody", "tfoot", "details", "summary", "dl", "dt", "dd",
    "address", "pre",
];

/// Renders a markup tree as markdown with ATX headings.
///
/// Literal nodes are copied verbatim, including inside list items and
/// blockquotes; text runs collapse to single spaces.
pub fn render_markdown(tree: &Markup) -> String {
    let mut writer = MarkdownWriter::default();
    writer.visit(tree);
    writer.finish()
}

fn render_children(children: &[Markup]) -> String {
    let mut writer = MarkdownWriter::default();
    for child in children {
        writer.visit(child);
    }
    writer.finish()
}

fn render_nested(children: &[Markup]) -> Rendered {
    let mut writer = MarkdownWriter::default();
    for child in children {
        writer.visit(child);
    }
    writer.into_rendered()
}

/// Trimmed output of a nested writer plus the byte ranges that came from
/// block literals.
struct Rendered {
    text: String,
    verbatim: Vec<Range<usize>>,
}

impl Rendered {
    fn is_verbatim(&self, offset: usize) -> bool {
        self.verbatim
            .iter()
            .any(|range| range.start <= offset && offset <= range.end)
    }

    fn lines(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        let mut offset = 0;
        self.text.split('\n').map(move |line| {
            let at = offset;
            offset += line.len() + 1;
            (line, self.is_verbatim(at))
        })
    }
}

#[derive(Default)]
struct MarkdownWriter {
    builder: String,
    verbatim: Vec<Range<usize>>,
}

impl MarkdownWriter {
    fn finish(self) -> String {
        self.builder.trim().to_string()
    }

    fn into_rendered(self) -> Rendered {
        let end = self.builder.trim_end().len();
        let start = self.builder.len() - self.builder.trim_start().len();
        if start >= end {
            return Rendered {
                text: String::new(),
                verbatim: Vec::new(),
            };
        }
        let verbatim = self
            .verbatim
            .iter()
            .filter(|range| range.end >= start && range.start <= end)
            .map(|range| range.start.max(start) - start..range.end.min(end) - start)
            .collect();
        Rendered {
            text: self.builder[start..end].to_string(),
            verbatim,
        }
    }

    fn visit(&mut self, node: &Markup) {
        match node {
            Markup::Text(text) => self.append_text(text),
            Markup::Literal(Literal::Inline(text)) => self.builder.push_str(text),
            Markup::Literal(Literal::Block(text)) => self.append_verbatim(text),
            Markup::Element(element) => self.visit_element(element),
        }
    }

    fn visit_children(&mut self, element: &Element) {
        for child in &element.children {
            self.visit(child);
        }
    }

    fn visit_element(&mut self, element: &Element) {
        let tag = element.name.as_str();
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                let text = render_children(&element.children);
                if !text.is_empty() {
                    self.append_block(&format!("{} {}", "#".repeat(level), text));
                }
            }
            "ul" | "ol" => {
                self.ensure_blank_line();
                self.write_list(element);
                self.ensure_blank_line();
            }
            "li" => {
                self.ensure_newline();
                self.write_item("- ", element);
            }
            "tr" => {
                self.ensure_newline();
                self.visit_children(element);
                self.ensure_newline();
            }
            "td" | "th" => {
                self.visit_children(element);
                self.append_text(" ");
            }
            "blockquote" => {
                let inner = render_nested(&element.children);
                if !inner.text.is_empty() {
                    self.ensure_blank_line();
                    self.write_prefixed(&inner, "> ", "> ", ">");
                    self.ensure_blank_line();
                }
            }
            "strong" | "b" => self.wrap_inline(element, "**"),
            "em" | "i" => self.wrap_inline(element, "*"),
            "a" => self.write_anchor(element),
            "br" => self.ensure_newline(),
            "hr" => self.append_block("---"),
            _ if SKIPPED_ELEMENTS.contains(&tag) => {}
            _ if BLOCK_ELEMENTS.contains(&tag) => {
                self.ensure_blank_line();
                self.visit_children(element);
                self.ensure_blank_line();
            }
            _ => self.visit_children(element),
        }
    }

    fn write_list(&mut self, list: &Element) {
        let ordered = list.name == "ol";
        let mut number = list
            .attr("start")
            .and_then(|start| start.trim().parse::<u64>().ok())
            .unwrap_or(1);
        for child in &list.children {
            match child {
                Markup::Element(item) if item.name == "li" => {
                    let marker = if ordered {
                        format!("{number}. ")
                    } else {
                        "- ".to_string()
                    };
                    number += 1;
                    self.ensure_newline();
                    self.write_item(&marker, item);
                }
                Markup::Text(text) if text.trim().is_empty() => {}
                other => self.visit(other),
            }
        }
    }

    fn write_item(&mut self, marker: &str, item: &Element) {
        let body = render_nested(&item.children);
        self.write_prefixed(&body, marker, "  ", "");
        self.ensure_newline();
    }

    /// Writes `body` with `first` before its first line and `rest` before
    /// each later non-empty line. Verbatim lines are written flush.
    fn write_prefixed(&mut self, body: &Rendered, first: &str, rest: &str, blank: &str) {
        if body.text.is_empty() {
            self.builder.push_str(first);
            return;
        }
        for (index, (line, verbatim)) in body.lines().enumerate() {
            if index > 0 {
                self.builder.push('\n');
            }
            if verbatim {
                if index == 0 {
                    self.builder.push_str(first.trim_end());
                    self.builder.push('\n');
                }
                let start = self.builder.len();
                self.builder.push_str(line);
                self.verbatim.push(start..self.builder.len());
            } else if index == 0 {
                self.builder.push_str(first);
                self.builder.push_str(line);
            } else if line.is_empty() {
                self.builder.push_str(blank);
            } else {
                self.builder.push_str(rest);
                self.builder.push_str(line);
            }
        }
    }

    fn write_anchor(&mut self, anchor: &Element) {
        let href = anchor.attr("href").map(str::trim).filter(|h| !h.is_empty());
        let Some(href) = href else {
            self.visit_children(anchor);
            return;
        };
        let text = render_children(&anchor.children);
        if text.is_empty() {
            return;
        }
        self.append_inline(anchor, &format!("[{text}]({href})"));
    }

    fn wrap_inline(&mut self, element: &Element, mark: &str) {
        let text = render_children(&element.children);
        if text.is_empty() {
            self.append_text(&element.text_content());
            return;
        }
        self.append_inline(element, &format!("{mark}{text}{mark}"));
    }

    /// Appends an inline run while keeping whitespace that surrounded the
    /// element's own text.
    fn append_inline(&mut self, element: &Element, rendered: &str) {
        let raw = element.text_content();
        if raw.starts_with(char::is_whitespace) {
            self.append_text(" ");
        }
        self.builder.push_str(rendered);
        if raw.ends_with(char::is_whitespace) {
            self.append_text(" ");
        }
    }

    fn append_block(&mut self, text: &str) {
        self.ensure_blank_line();
        self.builder.push_str(text);
        self.ensure_blank_line();
    }

    fn append_verbatim(&mut self, text: &str) {
        self.ensure_blank_line();
        let start = self.builder.len();
        self.builder.push_str(text);
        self.verbatim.push(start..self.builder.len());
        self.ensure_blank_line();
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                match self.last_char() {
                    None | Some(' ') | Some('\n') => continue,
                    _ => self.builder.push(' '),
                }
            } else {
                self.builder.push(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        self.trim_trailing_spaces();
        if matches!(self.last_char(), None | Some('\n')) {
            return;
        }
        self.builder.push('\n');
    }

    fn ensure_blank_line(&mut self) {
        self.trim_trailing_spaces();
        if self.builder.is_empty() {
            return;
        }
        while !self.builder.ends_with("\n\n") {
            self.builder.push('\n');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        while self.builder.ends_with(' ') {
            self.builder.pop();
        }
    }

    fn last_char(&self) -> Option<char> {
        self.builder.chars().next_back()
    }
}

#[cfg(test)]
mod tests {
    use super::render_markdown;
    use crate::region::{Element, Literal, Markup};

    fn el(name: &str, children: Vec<Markup>) -> Markup {
        Markup::Element(Element {
            name: name.into(),
            children,
            ..Default::default()
        })
    }

    #[test]
    fn trailing_spaces_are_trimmed_before_newlines() {
        let tree = el(
            "div",
            vec![
                el("p", vec![Markup::text("one   ")]),
                el("p", vec![Markup::text("  two")]),
            ],
        );
        assert_eq!(render_markdown(&tree), "one\n\ntwo");
    }

    #[test]
    fn block_literal_keeps_internal_blank_lines() {
        let tree = el(
            "section",
            vec![Markup::Literal(Literal::Block("```py\na\n\n\nb\n```".into()))],
        );
        assert_eq!(render_markdown(&tree), "```py\na\n\n\nb\n```");
    }
}
