//! Fix synthesizer
//!
//! Rules never edit text. They emit [`FixDirective`]s against the line as it
//! was parsed, and [`synthesize`] composes them by class:
//!
//! 1. prepend lines, in the order the rules ran (exact duplicates collapse)
//! 2. in-place modifications of the line's own words
//! 3. appended words, skipped when the line already carries the letter
//!
//! Within the modify class, feed caps combine to the lowest value, spindle
//! floors to the highest, and any other field takes the last value written,
//! so the result does not depend on which rule ran first.

use gcodeguard_gcode::{Axis, Instruction, Word};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker comment carried by every line the synthesizer writes
pub const FIX_MARKER: &str = "[safety-fix]";

/// One corrective action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FixDirective {
    /// Insert a complete line before the instruction
    PrependLine { line: String },
    /// Replace the first `letter`+`from` word with `letter`+`to`
    ReplaceToken { letter: char, from: f64, to: f64 },
    /// Set the F word (program units)
    SetFeed { value: f64 },
    /// Set the S word on the line itself
    SetSpindle { value: f64 },
    /// Set an axis word (program units and distance mode)
    SetAxis { axis: Axis, value: f64 },
    /// Drop every word with this letter
    RemoveToken { letter: char },
    /// Add a word at the end of the line
    AppendToken { letter: char, value: f64 },
}

impl FixDirective {
    /// Stable kind name used in reports and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PrependLine { .. } => "prepend-line",
            Self::ReplaceToken { .. } => "replace-token",
            Self::SetFeed { .. } => "set-feed",
            Self::SetSpindle { .. } => "set-spindle",
            Self::SetAxis { .. } => "set-axis-value",
            Self::RemoveToken { .. } => "remove-token",
            Self::AppendToken { .. } => "append-token",
        }
    }
}

impl fmt::Display for FixDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrependLine { line } => write!(f, "insert '{}'", line),
            Self::ReplaceToken { letter, from, to } => {
                write!(f, "replace {}{} with {}{}", letter, from, letter, to)
            }
            Self::SetFeed { value } => write!(f, "set F{}", value),
            Self::SetSpindle { value } => write!(f, "set S{}", value),
            Self::SetAxis { axis, value } => write!(f, "set {}{}", axis, value),
            Self::RemoveToken { letter } => write!(f, "remove {}", letter),
            Self::AppendToken { letter, value } => write!(f, "append {}{}", letter, value),
        }
    }
}

/// A directive together with the rule that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub rule: String,
    #[serde(flatten)]
    pub directive: FixDirective,
}

impl Fix {
    pub fn new(rule: impl Into<String>, directive: FixDirective) -> Self {
        Self {
            rule: rule.into(),
            directive,
        }
    }
}

/// Compose `fixes` into the output text for `instruction`
///
/// Returns one or more newline-separated lines. Without modify or append
/// directives the instruction's own line is emitted exactly as received.
pub fn synthesize(instruction: &Instruction, fixes: &[Fix]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for fix in fixes {
        if let FixDirective::PrependLine { line } = &fix.directive {
            let marked = format!("{} ; {}", line, FIX_MARKER);
            if !lines.contains(&marked) {
                lines.push(marked);
            }
        }
    }

    let mut words = instruction.words.clone();
    let mut modified = false;
    let mut feed: Option<f64> = None;
    let mut spindle: Option<f64> = None;
    let mut axes: [Option<f64>; 3] = [None; 3];

    for fix in fixes {
        match &fix.directive {
            FixDirective::ReplaceToken { letter, from, to } => {
                match words.iter_mut().find(|w| w.matches(*letter, *from)) {
                    Some(word) => *word = Word::new(*letter, *to),
                    // Motion came from the modal state; make it explicit
                    None => words.insert(0, Word::new(*letter, *to)),
                }
                modified = true;
            }
            FixDirective::SetFeed { value } => {
                feed = Some(feed.map_or(*value, |current: f64| current.min(*value)));
            }
            FixDirective::SetSpindle { value } => {
                spindle = Some(spindle.map_or(*value, |current: f64| current.max(*value)));
            }
            FixDirective::SetAxis { axis, value } => {
                axes[axis_slot(*axis)] = Some(*value);
            }
            FixDirective::RemoveToken { letter } => {
                words.retain(|w| w.letter != *letter);
                modified = true;
            }
            FixDirective::PrependLine { .. } | FixDirective::AppendToken { .. } => {}
        }
    }

    if let Some(value) = feed {
        set_word(&mut words, 'F', value);
        modified = true;
    }
    if let Some(value) = spindle {
        set_word(&mut words, 'S', value);
        modified = true;
    }
    for axis in Axis::all() {
        if let Some(value) = axes[axis_slot(axis)] {
            set_word(&mut words, axis.letter(), value);
            modified = true;
        }
    }

    for fix in fixes {
        if let FixDirective::AppendToken { letter, value } = &fix.directive {
            let present = words
                .iter()
                .any(|w| w.letter == *letter && w.value.is_some());
            if !present {
                words.push(Word::new(*letter, *value));
                modified = true;
            }
        }
    }

    if modified {
        lines.push(render(&words, instruction.comment.as_deref()));
    } else {
        lines.push(instruction.raw.clone());
    }

    lines.join("\n")
}

fn axis_slot(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
    }
}

/// Overwrite the first well-formed `letter` word, or add one at the end
fn set_word(words: &mut Vec<Word>, letter: char, value: f64) {
    match words
        .iter_mut()
        .find(|w| w.letter == letter && w.value.is_some())
    {
        Some(word) => *word = Word::new(letter, value),
        None => words.push(Word::new(letter, value)),
    }
}

fn render(words: &[Word], comment: Option<&str>) -> String {
    let code = words
        .iter()
        .map(Word::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match comment {
        Some(text) if !text.starts_with(FIX_MARKER) => {
            format!("{} ; {} {}", code, FIX_MARKER, text)
        }
        Some(text) => format!("{} ; {}", code, text),
        None => format!("{} ; {}", code, FIX_MARKER),
    }
}
