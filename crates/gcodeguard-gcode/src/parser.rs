//! G-code line parser
//!
//! Turns one line of text into an [`Instruction`]: the raw text, the code with
//! comments removed, every word in order, and one numeric field per tracked
//! letter (G, M, X, Y, Z, I, J, R, F, S, T).
//!
//! Field extraction is first-match: when a letter appears twice on a line
//! (`G0 G90 X10`) only the first well-formed occurrence is exposed as a field.
//! The complete word list is kept so the fix synthesizer can rewrite the line
//! without losing words it does not understand. The behaviour lives behind
//! [`LineTokenizer`] so a stricter tokenizer can be swapped in.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Letters exposed as semantic fields
pub const TRACKED_LETTERS: [char; 11] = ['G', 'M', 'X', 'Y', 'Z', 'I', 'J', 'R', 'F', 'S', 'T'];

/// One address word as written on the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Upper-case address letter
    pub letter: char,
    /// Numeric text exactly as written (may be malformed)
    pub text: String,
    /// Parsed value, `None` when the text is not a number
    pub value: Option<f64>,
}

impl Word {
    /// Create a word from a letter and a value
    pub fn new(letter: char, value: f64) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            text: format_value(value),
            value: Some(value),
        }
    }

    /// Whether this word is `letter` with numeric value `value`
    pub fn matches(&self, letter: char, value: f64) -> bool {
        self.letter == letter && self.value == Some(value)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.letter, self.text)
    }
}

/// A parsed line of G-code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Line exactly as received
    pub raw: String,
    /// Line with comments removed and whitespace trimmed
    pub code: String,
    /// Comment text, if the line carried one
    pub comment: Option<String>,
    /// Every address word, in order
    pub words: Vec<Word>,
    pub g: Option<f64>,
    pub m: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub r: Option<f64>,
    pub f: Option<f64>,
    pub s: Option<f64>,
    pub t: Option<f64>,
}

impl Instruction {
    /// True for blank and comment-only lines
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Field value for a tracked letter
    pub fn field(&self, letter: char) -> Option<f64> {
        match letter.to_ascii_uppercase() {
            'G' => self.g,
            'M' => self.m,
            'X' => self.x,
            'Y' => self.y,
            'Z' => self.z,
            'I' => self.i,
            'J' => self.j,
            'R' => self.r,
            'F' => self.f,
            'S' => self.s,
            'T' => self.t,
            _ => None,
        }
    }

    fn field_mut(&mut self, letter: char) -> Option<&mut Option<f64>> {
        match letter {
            'G' => Some(&mut self.g),
            'M' => Some(&mut self.m),
            'X' => Some(&mut self.x),
            'Y' => Some(&mut self.y),
            'Z' => Some(&mut self.z),
            'I' => Some(&mut self.i),
            'J' => Some(&mut self.j),
            'R' => Some(&mut self.r),
            'F' => Some(&mut self.f),
            'S' => Some(&mut self.s),
            'T' => Some(&mut self.t),
            _ => None,
        }
    }

    /// Whether the line carries an X or Y word
    pub fn has_xy(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Whether the line carries any linear axis word
    pub fn has_axis(&self) -> bool {
        self.has_xy() || self.z.is_some()
    }

    /// Whether the line carries I or J arc-centre offsets
    pub fn has_center_offset(&self) -> bool {
        self.i.is_some() || self.j.is_some()
    }

    /// G-code code (`G1`, `M3`) test
    pub fn is_code(&self, letter: char, value: f64) -> bool {
        self.field(letter) == Some(value)
    }
}

/// Strategy for turning a text line into an [`Instruction`]
pub trait LineTokenizer: Send + Sync {
    /// Get the name/identifier of this tokenizer
    fn name(&self) -> &str;

    /// Parse one line; never fails
    fn parse(&self, line: &str) -> Instruction;
}

/// Default tokenizer: first well-formed occurrence of each letter wins
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchTokenizer;

impl FirstMatchTokenizer {
    /// Create a new first-match tokenizer
    pub fn new() -> Self {
        Self
    }
}

impl LineTokenizer for FirstMatchTokenizer {
    fn name(&self) -> &str {
        "first_match"
    }

    fn parse(&self, line: &str) -> Instruction {
        let (code, comment) = split_comment(line);
        let words = tokenize_words(&code);

        let mut instruction = Instruction {
            raw: line.to_string(),
            code,
            comment,
            ..Instruction::default()
        };

        for word in &words {
            let Some(value) = word.value else { continue };
            if let Some(slot) = instruction.field_mut(word.letter) {
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
        }

        instruction.words = words;
        instruction
    }
}

/// Parse a line with the default first-match tokenizer
pub fn parse(line: &str) -> Instruction {
    FirstMatchTokenizer.parse(line)
}

/// Remove `(...)` and `;...` comments, returning the code and the comment text
fn split_comment(line: &str) -> (String, Option<String>) {
    let mut code = String::with_capacity(line.len());
    let mut comments: Vec<String> = Vec::new();
    let mut rest = line;

    loop {
        let paren = rest.find('(');
        let semi = rest.find(';');
        match (paren, semi) {
            (Some(p), s) if s.map_or(true, |s| p < s) => {
                code.push_str(&rest[..p]);
                code.push(' ');
                match rest[p + 1..].find(')') {
                    Some(end) => {
                        comments.push(rest[p + 1..p + 1 + end].trim().to_string());
                        rest = &rest[p + 2 + end..];
                    }
                    None => {
                        // Unmatched parenthesis runs to end of line
                        comments.push(rest[p + 1..].trim().to_string());
                        rest = "";
                    }
                }
            }
            (_, Some(s)) => {
                code.push_str(&rest[..s]);
                comments.push(rest[s + 1..].trim().to_string());
                break;
            }
            _ => {
                code.push_str(rest);
                break;
            }
        }
    }

    comments.retain(|c| !c.is_empty());
    let comment = if comments.is_empty() {
        None
    } else {
        Some(comments.join(" "))
    };
    (code.trim().to_string(), comment)
}

fn tokenize_words(code: &str) -> Vec<Word> {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = WORD_REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z])\s*([+-]?[0-9]*\.?[0-9]*)").expect("invalid regex pattern")
    });

    regex
        .captures_iter(code)
        .map(|caps| {
            let letter = caps[1].chars().next().unwrap_or(' ').to_ascii_uppercase();
            let text = caps[2].to_string();
            let value = text.parse::<f64>().ok().filter(|v| v.is_finite());
            Word {
                letter,
                text,
                value,
            }
        })
        .collect()
}

/// Format a numeric value for output: at most four decimals, no trailing zeros
///
/// Four places keep inch words within 0.003 mm of the value they encode.
pub fn format_value(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // Avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let mut text = format!("{:.4}", rounded);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}
