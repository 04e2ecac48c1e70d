// src/render.rs

//! Lenient formatting of assistant replies.
//!
//! A reply is cut into blocks: runs of prose, split into paragraphs on blank
//! lines, and fenced code blocks with their language tag. Inside prose,
//! single-backtick spans become inline code.
//!
//! This is a best-effort formatter, not a markdown parser:
//! - a fence without a language tag is labelled `javascript`
//! - an unterminated fence runs to the end of the reply
//! - nothing else (headings, lists, emphasis) is recognised

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const FENCE: &str = "```";
const DEFAULT_FENCE_LANGUAGE: &str = "javascript";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { inlines: Vec<Inline> },
    Code { language: String, code: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Code(String),
}

struct OpenFence {
    language: String,
    lines: Vec<String>,
}

impl OpenFence {
    fn new(tag: &str) -> Self {
        let tag = tag.trim();
        Self {
            language: if tag.is_empty() {
                DEFAULT_FENCE_LANGUAGE.to_string()
            } else {
                tag.to_string()
            },
            lines: Vec::new(),
        }
    }

    fn into_block(self) -> Block {
        Block::Code {
            language: self.language,
            code: self.lines.join("\n"),
        }
    }
}

pub fn render_reply(reply: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut prose = String::new();
    let mut open: Option<OpenFence> = None;

    for line in reply.lines() {
        let fence_tag = line.trim_start().strip_prefix(FENCE);

        match open.take() {
            Some(fence) if fence_tag.is_some_and(|rest| rest.trim().is_empty()) => {
                blocks.push(fence.into_block());
            }
            Some(mut fence) => {
                fence.lines.push(line.to_string());
                open = Some(fence);
            }
            None => match fence_tag {
                Some(tag) => {
                    flush_prose(&mut prose, &mut blocks);
                    open = Some(OpenFence::new(tag));
                }
                None => {
                    prose.push_str(line);
                    prose.push('\n');
                }
            },
        }
    }

    if let Some(fence) = open {
        blocks.push(fence.into_block());
    }
    flush_prose(&mut prose, &mut blocks);

    blocks
}

fn blank_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"))
}

fn inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid regex"))
}

fn flush_prose(prose: &mut String, blocks: &mut Vec<Block>) {
    for paragraph in blank_line().split(prose.as_str()) {
        let paragraph = paragraph.trim();
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph {
                inlines: split_inline(paragraph),
            });
        }
    }
    prose.clear();
}

/// Split prose on single-backtick code spans. An unmatched backtick stays text.
pub fn split_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in inline_code().captures_iter(text) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if whole.start() > last {
            out.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        out.push(Inline::Code(code.as_str().to_string()));
        last = whole.end();
    }

    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }

    out
}

/// Plain-text rendering for terminals.
pub fn to_plain_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph { inlines } => inlines
                .iter()
                .map(|inline| match inline {
                    Inline::Text(t) => t.clone(),
                    Inline::Code(c) => format!("`{}`", c),
                })
                .collect::<String>(),
            Block::Code { language, code } => {
                let body = code
                    .lines()
                    .map(|l| format!("    {}", l))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("[{}]\n{}", language, body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn code(s: &str) -> Inline {
        Inline::Code(s.to_string())
    }

    #[test]
    fn prose_code_prose() {
        let reply = "Here you go:\n```python\nprint(1)\nprint(2)\n```\nThat prints two lines.";

        assert_eq!(
            render_reply(reply),
            vec![
                Block::Paragraph {
                    inlines: vec![text("Here you go:")]
                },
                Block::Code {
                    language: "python".to_string(),
                    code: "print(1)\nprint(2)".to_string()
                },
                Block::Paragraph {
                    inlines: vec![text("That prints two lines.")]
                },
            ]
        );
    }

    #[test]
    fn blank_lines_split_paragraphs() {
        let blocks = render_reply("First.\nStill first.\n\n  \nSecond.");

        assert_eq!(
            blocks,
            vec![
                Block::Paragraph {
                    inlines: vec![text("First.\nStill first.")]
                },
                Block::Paragraph {
                    inlines: vec![text("Second.")]
                },
            ]
        );
    }

    #[test]
    fn inline_code_spans_are_distinct() {
        assert_eq!(
            split_inline("Call `len(xs)` then `sorted`."),
            vec![
                text("Call "),
                code("len(xs)"),
                text(" then "),
                code("sorted"),
                text("."),
            ]
        );
    }

    #[test]
    fn unmatched_backtick_stays_text() {
        assert_eq!(split_inline("a ` b"), vec![text("a ` b")]);
    }

    #[test]
    fn untagged_fence_defaults_language() {
        let blocks = render_reply("```\nx = 1\n```");
        assert_eq!(
            blocks,
            vec![Block::Code {
                language: DEFAULT_FENCE_LANGUAGE.to_string(),
                code: "x = 1".to_string()
            }]
        );
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let blocks = render_reply("Intro\n```cpp\nint main() {\n  return 0;\n}");

        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1],
            Block::Code {
                language: "cpp".to_string(),
                code: "int main() {\n  return 0;\n}".to_string()
            }
        );
    }

    #[test]
    fn several_code_blocks_keep_order() {
        let reply = "```java\nA\n```\nbetween\n```cpp\nB\n```";
        let blocks = render_reply(reply);

        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Code { language, .. } if language == "java"));
        assert!(matches!(&blocks[2], Block::Code { language, .. } if language == "cpp"));
    }

    #[test]
    fn plain_text_rendering_indents_code() {
        let blocks = render_reply("Use `x`:\n```py\na\nb\n```");
        assert_eq!(to_plain_text(&blocks), "Use `x`:\n\n[py]\n    a\n    b");
    }

    #[test]
    fn blocks_serialize_with_type_tags() {
        let json = serde_json::to_value(render_reply("Hi `x`")).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "paragraph", "inlines": [
                    {"type": "text", "text": "Hi "},
                    {"type": "code", "text": "x"}
                ]}
            ])
        );
    }
}
