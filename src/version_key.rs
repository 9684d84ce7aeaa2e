//! Version/build string parsing and ordering.
//!
//! Upstream providers expose differently-shaped version and build strings
//! (`"1.20.1"`, `"47.1.12-beta"`, `"loader-0.15.11-installer-1.0.1"`, ...).
//! [`VersionKey`] turns any of them into a two-level tuple key with a total
//! ordering, so "latest" and "sorted descending" are well-defined everywhere
//! a build list is surfaced.
//!
//! The raw string is split on the first hyphen into a *release* segment and
//! an optional *qualifier* segment. The release segment tokenizes on `.`;
//! the qualifier tokenizes by alternating digit/non-digit runs (separator
//! punctuation is dropped), e.g. `"47.1.12-beta"` -> `[47, 1, 12, "beta"]`.
//! Numeric tokens compare numerically, textual tokens lexicographically, and
//! numeric ranks above textual at the same position, so stable builds sort
//! above pre-release-style suffixes.

use std::cmp::Ordering;

/// One component of a parsed version key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of ASCII digits, compared numerically.
    Number(u64),
    /// Any other run, lowercased, compared lexicographically.
    Text(String),
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => a.cmp(b),
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            // Numeric outranks textual at the same position.
            (Token::Number(_), Token::Text(_)) => Ordering::Greater,
            (Token::Text(_), Token::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A normalized, orderable key derived from a raw version/build string.
///
/// Construct with [`VersionKey::parse`]; the `Ord` implementation is the
/// comparator. Descending order is the presentation default for build lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionKey {
    release: Vec<Token>,
    qualifier: Vec<Token>,
}

impl VersionKey {
    /// Parses a raw version/build string into an orderable key.
    ///
    /// An empty or malformed input (nothing before the first hyphen) yields
    /// the lowest possible key.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (release_raw, qualifier_raw) = match trimmed.split_once('-') {
            Some((release, qualifier)) => (release, Some(qualifier)),
            None => (trimmed, None),
        };

        if release_raw.is_empty() {
            return Self::lowest();
        }

        let release = release_raw.split('.').map(component_token).collect();
        let qualifier = qualifier_raw.map(tokenize_runs).unwrap_or_default();

        Self { release, qualifier }
    }

    /// The key that sorts below every parseable version string.
    #[must_use]
    pub fn lowest() -> Self {
        Self {
            release: Vec::new(),
            qualifier: Vec::new(),
        }
    }

    /// Whether this is the degenerate lowest key (empty/malformed input).
    #[must_use]
    pub fn is_lowest(&self) -> bool {
        self.release.is_empty()
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_lowest(), other.is_lowest()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare_tokens(&self.release, &other.release)
                .then_with(|| compare_tokens(&self.qualifier, &other.qualifier)),
        }
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compares two raw strings in descending presentation order.
///
/// Suitable for `sort_by` when the sort key is the raw string itself.
#[must_use]
pub fn compare_desc(a: &str, b: &str) -> Ordering {
    VersionKey::parse(b).cmp(&VersionKey::parse(a))
}

fn component_token(component: &str) -> Token {
    if !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()) {
        match component.parse::<u64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Text(component.to_ascii_lowercase()),
        }
    } else {
        Token::Text(component.to_ascii_lowercase())
    }
}

/// Splits a qualifier segment into alternating digit/non-digit runs,
/// dropping separator punctuation from the textual runs.
fn tokenize_runs(segment: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut run = String::new();
    let mut run_is_digit: Option<bool> = None;

    for ch in segment.chars() {
        let is_digit = ch.is_ascii_digit();
        if run_is_digit != Some(is_digit) && !run.is_empty() {
            push_run(&mut tokens, &run, run_is_digit == Some(true));
            run.clear();
        }
        run_is_digit = Some(is_digit);
        run.push(ch);
    }
    if !run.is_empty() {
        push_run(&mut tokens, &run, run_is_digit == Some(true));
    }

    tokens
}

fn push_run(tokens: &mut Vec<Token>, run: &str, numeric: bool) {
    if numeric {
        match run.parse::<u64>() {
            Ok(n) => tokens.push(Token::Number(n)),
            Err(_) => tokens.push(Token::Text(run.to_string())),
        }
    } else {
        let cleaned: String = run
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | '_' | '+'))
            .flat_map(char::to_lowercase)
            .collect();
        if !cleaned.is_empty() {
            tokens.push(Token::Text(cleaned));
        }
    }
}

/// Lexicographic token comparison where a trailing numeric run ranks above
/// its absence and a trailing textual run ranks below it.
///
/// This is what makes `47.1.12` sort above `47.1.12-beta` while `47.1.12.1`
/// still sorts above `47.1.12`.
fn compare_tokens(a: &[Token], b: &[Token]) -> Ordering {
    let mut index = 0;
    loop {
        match (a.get(index), b.get(index)) {
            (None, None) => return Ordering::Equal,
            (Some(extra), None) => return trailing_rank(extra),
            (None, Some(extra)) => return trailing_rank(extra).reverse(),
            (Some(x), Some(y)) => {
                let ordering = x.cmp(y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
        index += 1;
    }
}

fn trailing_rank(token: &Token) -> Ordering {
    match token {
        Token::Number(_) => Ordering::Greater,
        Token::Text(_) => Ordering::Less,
    }
}
