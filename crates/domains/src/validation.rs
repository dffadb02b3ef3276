//! # Input Validation
//!
//! Recognizers for usernames, passwords and free text. Each one walks its
//! input a character at a time through a small explicit state machine and
//! reports the first rule it breaks.

use thiserror::Error;

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 16;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 32;

/// Adjacent token pairs that are never accepted in posted text.
const FORBIDDEN_PAIRS: &[(&str, &str)] = &[
    ("drop", "table"),
    ("drop", "database"),
    ("delete", "from"),
    ("insert", "into"),
    ("alter", "table"),
    ("truncate", "table"),
    ("union", "select"),
    ("select", "*"),
];

/// Raw markers checked after whitespace is squeezed out.
const FORBIDDEN_MARKERS: &[&str] = &["--", "/*", "*/", "1=1"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("username must start with a letter")]
    UsernameStart,

    #[error("username separators must sit between letters or digits")]
    MisplacedSeparator,

    #[error("{field} contains invalid character {ch:?}")]
    InvalidChar { field: &'static str, ch: char },

    #[error("password must contain at least one {0}")]
    MissingCharClass(&'static str),

    #[error("text contains forbidden sequence `{0}`")]
    ForbiddenSequence(String),
}

// ── Username ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsernameState {
    Start,
    Word,
    Separator,
}

fn is_username_separator(ch: char) -> bool {
    matches!(ch, '_' | '.' | '-')
}

/// Accepts 4-16 ASCII characters: a leading letter, then letters, digits and
/// single `_`/`.`/`-` separators that never end the name.
pub fn validate_username(input: &str) -> Result<(), ValidationError> {
    check_length("username", input, USERNAME_MIN, USERNAME_MAX)?;

    let mut state = UsernameState::Start;
    for ch in input.chars() {
        state = match (state, ch) {
            (UsernameState::Start, c) if c.is_ascii_alphabetic() => UsernameState::Word,
            (UsernameState::Start, _) => return Err(ValidationError::UsernameStart),
            (_, c) if c.is_ascii_alphanumeric() => UsernameState::Word,
            (UsernameState::Word, c) if is_username_separator(c) => UsernameState::Separator,
            (UsernameState::Separator, c) if is_username_separator(c) => {
                return Err(ValidationError::MisplacedSeparator)
            }
            (_, c) => return Err(ValidationError::InvalidChar { field: "username", ch: c }),
        };
    }

    match state {
        UsernameState::Word => Ok(()),
        UsernameState::Separator => Err(ValidationError::MisplacedSeparator),
        UsernameState::Start => Err(ValidationError::Empty { field: "username" }),
    }
}

// ── Password ────────────────────────────────────────────────────────────────

/// Character classes seen so far; the recognizer's accumulated state.
#[derive(Debug, Default, Clone, Copy)]
struct PasswordClasses {
    upper: bool,
    lower: bool,
    digit: bool,
    special: bool,
}

/// Accepts 8-32 printable ASCII characters with at least one uppercase,
/// lowercase, digit and punctuation character. Whitespace is rejected.
pub fn validate_password(input: &str) -> Result<(), ValidationError> {
    check_length("password", input, PASSWORD_MIN, PASSWORD_MAX)?;

    let mut seen = PasswordClasses::default();
    for ch in input.chars() {
        match ch {
            c if c.is_ascii_uppercase() => seen.upper = true,
            c if c.is_ascii_lowercase() => seen.lower = true,
            c if c.is_ascii_digit() => seen.digit = true,
            c if c.is_ascii_punctuation() => seen.special = true,
            c => return Err(ValidationError::InvalidChar { field: "password", ch: c }),
        }
    }

    if !seen.upper {
        return Err(ValidationError::MissingCharClass("uppercase letter"));
    }
    if !seen.lower {
        return Err(ValidationError::MissingCharClass("lowercase letter"));
    }
    if !seen.digit {
        return Err(ValidationError::MissingCharClass("digit"));
    }
    if !seen.special {
        return Err(ValidationError::MissingCharClass("special character"));
    }
    Ok(())
}

// ── Free text ───────────────────────────────────────────────────────────────

/// Where a piece of text is going; decides its limit and screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    QuestionTitle,
    QuestionBody,
    Answer,
    Review,
    Message,
    BanReason,
}

impl TextKind {
    pub fn field(self) -> &'static str {
        match self {
            TextKind::QuestionTitle => "title",
            TextKind::QuestionBody => "question",
            TextKind::Answer => "answer",
            TextKind::Review => "review",
            TextKind::Message => "message",
            TextKind::BanReason => "reason",
        }
    }

    pub fn max_len(self) -> usize {
        match self {
            TextKind::QuestionTitle => 120,
            TextKind::QuestionBody | TextKind::Answer => 2000,
            TextKind::Review | TextKind::Message => 1000,
            TextKind::BanReason => 500,
        }
    }

    /// Whether the SQL keyword blocklist applies.
    pub fn screens_sql(self) -> bool {
        matches!(
            self,
            TextKind::QuestionTitle | TextKind::QuestionBody | TextKind::Answer | TextKind::Review
        )
    }
}

/// Trims `input`, checks it against the rules for `kind` and returns the
/// trimmed text.
pub fn validate_text(kind: TextKind, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field: kind.field() });
    }
    if trimmed.chars().count() > kind.max_len() {
        return Err(ValidationError::TooLong { field: kind.field(), max: kind.max_len() });
    }
    if kind.screens_sql() {
        screen_sql(trimmed)?;
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    Between,
    InWord,
}

/// Splits text into lowercase words and `*` tokens.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = TokenState::Between;

    for ch in input.chars() {
        let is_word = ch.is_ascii_alphanumeric() || ch == '_';
        state = match (state, is_word) {
            (_, true) => {
                current.push(ch.to_ascii_lowercase());
                TokenState::InWord
            }
            (TokenState::InWord, false) => {
                tokens.push(std::mem::take(&mut current));
                TokenState::Between
            }
            (TokenState::Between, false) => TokenState::Between,
        };
        if ch == '*' {
            tokens.push("*".to_string());
        }
    }
    if state == TokenState::InWord {
        tokens.push(current);
    }
    tokens
}

fn screen_sql(input: &str) -> Result<(), ValidationError> {
    let squeezed: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(marker) = FORBIDDEN_MARKERS.iter().find(|m| squeezed.contains(*m)) {
        return Err(ValidationError::ForbiddenSequence((*marker).to_string()));
    }

    let tokens = tokenize(input);
    for pair in tokens.windows(2) {
        if let Some((a, b)) = FORBIDDEN_PAIRS
            .iter()
            .find(|(a, b)| pair[0] == *a && pair[1] == *b)
        {
            return Err(ValidationError::ForbiddenSequence(format!("{a} {b}")));
        }
    }
    Ok(())
}

fn check_length(field: &'static str, input: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = input.chars().count();
    if len == 0 {
        return Err(ValidationError::Empty { field });
    }
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
