//! Read-only statement gate
//!
//! Keyword heuristic, not a SQL parser. It keeps obviously mutating output of
//! the language model away from the database; the service should still run
//! under a database role that can only read.
//!
//! Comment markers and `;` only count outside quoted literals, so `'--'`
//! cannot hide a second statement. Keywords are matched anywhere, quotes
//! included.

use std::fmt;

/// Keywords that must not appear anywhere in an accepted statement
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
];

/// Why a statement was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    NotSelect,
    ForbiddenKeyword(&'static str),
    MultipleStatements,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "statement is empty"),
            Self::NotSelect => write!(f, "statement does not start with SELECT"),
            Self::ForbiddenKeyword(kw) => write!(f, "statement contains forbidden keyword {}", kw),
            Self::MultipleStatements => write!(f, "statement contains more than one query"),
        }
    }
}

/// Outcome of classifying a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe,
    Unsafe(RejectReason),
}

impl SafetyVerdict {
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Safe => None,
            Self::Unsafe(reason) => Some(reason),
        }
    }
}

/// Decides whether a statement may be executed
pub trait SqlGate: Send + Sync {
    fn classify(&self, statement: &str) -> SafetyVerdict;
}

/// SELECT-only gate with a keyword denylist. Multi-statement input is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordGate;

impl SqlGate for KeywordGate {
    fn classify(&self, statement: &str) -> SafetyVerdict {
        let scratch = normalize(statement);

        if scratch.is_empty() {
            return SafetyVerdict::Unsafe(RejectReason::Empty);
        }
        if !scratch.starts_with("SELECT") {
            return SafetyVerdict::Unsafe(RejectReason::NotSelect);
        }
        if let Some(kw) = FORBIDDEN_KEYWORDS
            .iter()
            .copied()
            .find(|kw| scratch.contains(kw))
        {
            return SafetyVerdict::Unsafe(RejectReason::ForbiddenKeyword(kw));
        }
        if has_trailing_statement(&scratch) {
            return SafetyVerdict::Unsafe(RejectReason::MultipleStatements);
        }

        SafetyVerdict::Safe
    }
}

/// Uppercased copy with comments removed and whitespace collapsed
fn normalize(statement: &str) -> String {
    let upper = statement.trim().to_uppercase();
    strip_comments(&upper)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop `-- ...` and `/* ... */` outside quoted literals
fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            out.push(ch);
            continue;
        }

        match (ch, chars.peek().copied()) {
            ('\'', _) | ('"', _) => {
                quote = Some(ch);
                out.push(ch);
            }
            ('-', Some('-')) => {
                // Keep the newline so the tokens either side stay apart
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(ch),
        }
    }

    out
}

/// True when a `;` outside quotes is followed by more SQL
fn has_trailing_statement(sql: &str) -> bool {
    let mut quote: Option<char> = None;

    for (idx, ch) in sql.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, ';') => {
                let rest = sql[idx + 1..].trim_start_matches(|c: char| c == ';' || c.is_whitespace());
                if !rest.is_empty() {
                    return true;
                }
            }
            (None, _) => {}
        }
    }

    false
}
