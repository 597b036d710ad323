//! # Whitespace Normalization
//!
//! A pure text transform applied to every file the engine copies into the host
//! tree. It never touches host files the engine does not own.
//!
//! The pass:
//!
//! 1. Converts `\r\n` and lone `\r` terminators to `\n`.
//! 2. Strips trailing whitespace from every line.
//! 3. Drops trailing blank lines and ends non-empty output with one `\n`.
//! 4. For Python and C sources, rewraps lines longer than the configured
//!    width after a comma that sits inside an open bracket, so the
//!    continuation is implicit in both languages. Lines with no such comma in
//!    the lookback window are left as they are.
//!
//! Rewrapping only ever inserts a line break plus indentation after a comma,
//! so the sequence of non-whitespace characters is preserved.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language of a file, which decides how aggressive normalization is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    Python,
    C,
    /// Anything else: whitespace cleanup only, no rewrapping.
    #[default]
    Plain,
}

impl Language {
    /// Detect the language from a file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Language::Python,
            Some("c") | Some("h") => Language::C,
            _ => Language::Plain,
        }
    }
}

/// Tunables for the normalizer, configurable from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeOptions {
    /// Maximum line width in characters.
    pub max_width: usize,
    /// How far left of `max_width` a break point may sit.
    pub lookback: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: 80,
            lookback: 40,
        }
    }
}

/// Normalize `text` for the given language.
pub fn normalize(text: &str, language: Language, options: &NormalizeOptions) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    let mut regions = Regions::default();
    for line in unified.split('\n') {
        let line = line.trim_end();
        let protected = regions.observe(line, language);
        if protected || !is_wrappable(line, language) {
            lines.push(line.to_string());
        } else {
            wrap_line(line, language, options, &mut lines);
        }
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Tracks multi-line regions whose lines must never be rewrapped: Python
/// triple-quoted strings, C block comments, and any line continued from the
/// previous one with a trailing `\` (such as the body of a C macro).
#[derive(Debug, Default)]
struct Regions {
    triple_quote: Option<&'static str>,
    block_comment: bool,
    continued: bool,
}

impl Regions {
    /// Returns true if `line` starts inside, or opens, a protected region.
    fn observe(&mut self, line: &str, language: Language) -> bool {
        let continued = std::mem::replace(&mut self.continued, line.ends_with('\\'));
        let inside = match language {
            Language::Python => {
                let was_inside = self.triple_quote.is_some();
                let mut touched = false;
                for delim in ["\"\"\"", "'''"] {
                    if self.triple_quote.is_some_and(|open| open != delim) {
                        continue;
                    }
                    let count = line.matches(delim).count();
                    if count > 0 {
                        touched = true;
                    }
                    if count % 2 == 1 {
                        self.triple_quote = match self.triple_quote {
                            Some(_) => None,
                            None => Some(delim),
                        };
                    }
                }
                was_inside || touched
            }
            Language::C => {
                let was_inside = self.block_comment;
                let open = line.rfind("/*");
                let close = line.rfind("*/");
                self.block_comment = match (open, close) {
                    (Some(o), Some(c)) => o > c,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    (None, None) => self.block_comment,
                };
                was_inside
            }
            Language::Plain => false,
        };
        continued || inside
    }
}

fn is_wrappable(line: &str, language: Language) -> bool {
    let trimmed = line.trim_start();
    if line.ends_with('\\') {
        return false;
    }
    match language {
        Language::Python => !trimmed.starts_with('#'),
        Language::C => {
            !(trimmed.starts_with('#')
                || trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*'))
        }
        Language::Plain => false,
    }
}

#[derive(Debug, Clone, Default)]
struct Scanner {
    quote: Option<char>,
    escaped: bool,
    /// Display column just after each currently open bracket.
    brackets: Vec<usize>,
}

enum Token {
    Comma,
    Comment,
    Other,
}

impl Scanner {
    fn step(&mut self, c: char, next: Option<char>, column: usize, language: Language) -> Token {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.quote = None;
            }
            return Token::Other;
        }

        match c {
            '"' | '\'' => self.quote = Some(c),
            '#' if language == Language::Python => return Token::Comment,
            '/' if language == Language::C && matches!(next, Some('/') | Some('*')) => {
                return Token::Comment
            }
            '(' | '[' | '{' => self.brackets.push(column),
            ')' | ']' | '}' => {
                self.brackets.pop();
            }
            ',' => return Token::Comma,
            _ => {}
        }
        Token::Other
    }
}

fn wrap_line(line: &str, language: Language, options: &NormalizeOptions, out: &mut Vec<String>) {
    let chars: Vec<char> = line.chars().collect();
    let floor = options.max_width.saturating_sub(options.lookback);

    let mut scanner = Scanner::default();
    let mut seg_start = 0;
    let mut seg_indent = 0;

    loop {
        if seg_indent + (chars.len() - seg_start) <= options.max_width {
            break;
        }

        let mut probe = scanner.clone();
        let mut best: Option<(usize, Scanner)> = None;
        for i in seg_start..chars.len() {
            let column = seg_indent + (i - seg_start) + 1;
            if column > options.max_width {
                break;
            }
            match probe.step(chars[i], chars.get(i + 1).copied(), column, language) {
                Token::Comment => break,
                Token::Comma if !probe.brackets.is_empty() && column > floor => {
                    best = Some((i, probe.clone()));
                }
                _ => {}
            }
        }

        let Some((comma, after)) = best else {
            break;
        };
        let mut next = comma + 1;
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }
        if next >= chars.len() {
            break;
        }
        let indent = after.brackets.last().copied().unwrap_or(seg_indent);
        let head_width = seg_indent + (comma + 1 - seg_start);
        if indent >= head_width {
            break;
        }

        out.push(segment(&chars[seg_start..=comma], seg_indent));
        scanner = after;
        seg_start = next;
        seg_indent = indent;
    }

    out.push(segment(&chars[seg_start..], seg_indent));
}

fn segment(chars: &[char], indent: usize) -> String {
    let mut s = " ".repeat(indent);
    s.extend(chars);
    s
}
