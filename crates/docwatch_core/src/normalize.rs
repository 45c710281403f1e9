use std::fmt;

use crate::region::{ContentRegion, Element, Literal, Markup};
use crate::render::render_markdown;

/// Fence tag used when a code block names no language.
pub const DEFAULT_CODE_LANGUAGE: &str = "bash";
/// Alt text written for every image reference.
pub const IMAGE_ALT_TEXT: &str = "Image";
/// Attribute marking a `<code>` element as inline code.
pub const INLINE_MARKER_ATTR: &str = "data-inline";

const LANGUAGE_CLASS_PREFIX: &str = "language-";

/// Normalized markdown-like text of a content region; the input to hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalText(String);

impl CanonicalText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CanonicalText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("canonical text is empty")]
    Empty,
}

/// Runs the rewrite passes in order, then renders the result.
///
/// Code blocks go first so that `<code>` elements inside `<pre>` are already
/// consumed when code spans are rewritten.
pub fn normalize(region: &ContentRegion) -> Result<CanonicalText, NormalizeError> {
    let tree = Markup::Element(region.root().clone());
    let tree = rewrite_images(rewrite_code_spans(fence_code_blocks(tree)));
    let text = render_markdown(&tree);
    if text.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(CanonicalText(text))
}

/// Replaces every `<pre>` with a fenced block literal holding its text verbatim.
pub fn fence_code_blocks(tree: Markup) -> Markup {
    apply(tree, &|element| {
        if element.name != "pre" {
            return Rewrite::Keep;
        }
        let language = block_language(element);
        Rewrite::Replace(Markup::Literal(Literal::Block(fenced(
            &language,
            &element.text_content(),
        ))))
    })
}

/// Replaces the remaining `<code>` elements: inline-marked ones with a
/// backtick span, the rest with a fenced block.
pub fn rewrite_code_spans(tree: Markup) -> Markup {
    apply(tree, &|element| {
        if element.name != "code" {
            return Rewrite::Keep;
        }
        let text = element.text_content();
        if is_inline(element) {
            Rewrite::Replace(Markup::Literal(Literal::Inline(format!("`{text}`"))))
        } else {
            let language =
                language_of(element).unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string());
            Rewrite::Replace(Markup::Literal(Literal::Block(fenced(&language, &text))))
        }
    })
}

/// Replaces `<img>` with a markdown image reference; images without a
/// source are dropped.
pub fn rewrite_images(tree: Markup) -> Markup {
    apply(tree, &|element| {
        if element.name != "img" {
            return Rewrite::Keep;
        }
        match element.attr("src").map(str::trim).filter(|src| !src.is_empty()) {
            Some(src) => Rewrite::Replace(Markup::Literal(Literal::Inline(format!(
                "![{IMAGE_ALT_TEXT}]({src})"
            )))),
            None => Rewrite::Drop,
        }
    })
}

enum Rewrite {
    Keep,
    Replace(Markup),
    Drop,
}

fn apply(tree: Markup, rule: &dyn Fn(&Element) -> Rewrite) -> Markup {
    rewrite_node(tree, rule).unwrap_or_else(|| Markup::text(""))
}

fn rewrite_node(node: Markup, rule: &dyn Fn(&Element) -> Rewrite) -> Option<Markup> {
    let element = match node {
        Markup::Element(element) => element,
        other => return Some(other),
    };
    match rule(&element) {
        Rewrite::Replace(replacement) => Some(replacement),
        Rewrite::Drop => None,
        Rewrite::Keep => {
            let Element {
                name,
                attrs,
                children,
            } = element;
            let children = children
                .into_iter()
                .filter_map(|child| rewrite_node(child, rule))
                .collect();
            Some(Markup::Element(Element {
                name,
                attrs,
                children,
            }))
        }
    }
}

fn fenced(language: &str, code: &str) -> String {
    format!("```{language}\n{code}\n```")
}

fn is_inline(element: &Element) -> bool {
    element
        .attr(INLINE_MARKER_ATTR)
        .is_some_and(|value| !value.trim().eq_ignore_ascii_case("false"))
}

fn language_of(element: &Element) -> Option<String> {
    element
        .classes()
        .filter_map(|class| class.strip_prefix(LANGUAGE_CLASS_PREFIX))
        .find(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn block_language(pre: &Element) -> String {
    first_code(pre)
        .and_then(language_of)
        .or_else(|| language_of(pre))
        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string())
}

fn first_code(element: &Element) -> Option<&Element> {
    element.children.iter().find_map(|child| {
        let child = child.as_element()?;
        if child.name == "code" {
            Some(child)
        } else {
            first_code(child)
        }
    })
}
