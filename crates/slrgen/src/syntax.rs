//! Loader for the line-based grammar description.
//!
//! ```text
//! 1        <- number of nonterminals
//! 1        <- number of terminals
//! 2        <- number of rules
//! A        <- nonterminal names, one per line
//! a        <- terminal names, one per line
//! S->Aa    <- rules, `LEFT->RIGHT`
//! A->a
//! ```
//!
//! The right-hand side of a rule is a concatenation of single-character
//! symbols, or [`EPSILON`] (or nothing) for the empty production.

use std::fmt;

/// The marker of the empty production.
pub const EPSILON: &str = "ε";

/// The nonterminal used as the start symbol when present.
pub const DEFAULT_START_SYMBOL: &str = "S";

const ARROW: &str = "->";

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub line: usize,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub line: usize,
    pub left: String,
    pub right: Vec<String>,
}

/// The unresolved contents of a grammar description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrammarSource {
    pub nonterminals: Vec<Spanned<String>>,
    pub terminals: Vec<Spanned<String>>,
    pub productions: Vec<Production>,
}

#[derive(Debug, thiserror::Error)]
#[error("line {}: {}", line, kind)]
pub struct SyntaxError {
    pub line: usize,
    pub kind: SyntaxErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    MissingLine { expected: &'static str },
    InvalidCount { found: String },
    InvalidSymbolName { found: String },
    MissingArrow,
    TrailingContent,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLine { expected } => write!(f, "missing line, expecting {}", expected),
            Self::InvalidCount { found } => write!(f, "invalid count `{}'", found),
            Self::InvalidSymbolName { found } => write!(f, "invalid symbol name `{}'", found),
            Self::MissingArrow => write!(f, "missing `{}' in rule", ARROW),
            Self::TrailingContent => write!(f, "unexpected content after the last rule"),
        }
    }
}

struct Lines<'s> {
    inner: std::iter::Enumerate<std::str::Lines<'s>>,
    last_line: usize,
}

impl<'s> Lines<'s> {
    fn next(&mut self, expected: &'static str) -> Result<(usize, &'s str), SyntaxError> {
        match self.inner.next() {
            Some((i, line)) => {
                self.last_line = i + 1;
                Ok((i + 1, line.trim()))
            }
            None => Err(SyntaxError {
                line: self.last_line + 1,
                kind: SyntaxErrorKind::MissingLine { expected },
            }),
        }
    }

    fn count(&mut self, expected: &'static str) -> Result<usize, SyntaxError> {
        let (line, text) = self.next(expected)?;
        text.parse().map_err(|_| SyntaxError {
            line,
            kind: SyntaxErrorKind::InvalidCount {
                found: text.to_owned(),
            },
        })
    }
}

/// Parse the grammar description.
pub fn parse(source: &str) -> Result<GrammarSource, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut lines = Lines {
        inner: source.lines().enumerate(),
        last_line: 0,
    };

    let n_nonterminals = lines.count("the number of nonterminals")?;
    let n_terminals = lines.count("the number of terminals")?;
    let n_rules = lines.count("the number of rules")?;
    tracing::trace!(n_nonterminals, n_terminals, n_rules);

    let mut grammar = GrammarSource::default();

    for _ in 0..n_nonterminals {
        let (line, text) = lines.next("a nonterminal name")?;
        grammar.nonterminals.push(Spanned {
            line,
            value: symbol_name(line, text)?,
        });
    }

    for _ in 0..n_terminals {
        let (line, text) = lines.next("a terminal name")?;
        grammar.terminals.push(Spanned {
            line,
            value: symbol_name(line, text)?,
        });
    }

    for _ in 0..n_rules {
        let (line, text) = lines.next("a rule")?;
        grammar.productions.push(production(line, text)?);
    }

    while let Some((i, text)) = lines.inner.next() {
        if !text.trim().is_empty() {
            return Err(SyntaxError {
                line: i + 1,
                kind: SyntaxErrorKind::TrailingContent,
            });
        }
    }

    Ok(grammar)
}

fn symbol_name(line: usize, text: &str) -> Result<String, SyntaxError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if !ch.is_whitespace() && text != EPSILON => Ok(text.to_owned()),
        _ => Err(SyntaxError {
            line,
            kind: SyntaxErrorKind::InvalidSymbolName {
                found: text.to_owned(),
            },
        }),
    }
}

fn production(line: usize, text: &str) -> Result<Production, SyntaxError> {
    let (left, right) = text.split_once(ARROW).ok_or(SyntaxError {
        line,
        kind: SyntaxErrorKind::MissingArrow,
    })?;

    let left = symbol_name(line, left.trim())?;

    let right = right.trim();
    let right = if right == EPSILON {
        vec![]
    } else {
        right
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| symbol_name(line, ch.encode_utf8(&mut [0; 4])))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Production { line, left, right })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let source = "1\n1\n2\nA\na\nS->Aa\nA->a\n";
        let grammar = parse(source).unwrap();
        assert_eq!(
            grammar.nonterminals,
            [Spanned {
                line: 4,
                value: "A".to_owned()
            }]
        );
        assert_eq!(
            grammar.terminals,
            [Spanned {
                line: 5,
                value: "a".to_owned()
            }]
        );
        assert_eq!(
            grammar.productions,
            [
                Production {
                    line: 6,
                    left: "S".into(),
                    right: vec!["A".into(), "a".into()],
                },
                Production {
                    line: 7,
                    left: "A".into(),
                    right: vec!["a".into()],
                },
            ]
        );
    }

    #[test]
    fn parse_empty_productions() {
        let source = "1\n1\n3\nA\nb\nS->Ab\nA->ε\nA->\n";
        let grammar = parse(source).unwrap();
        assert!(grammar.productions[1].right.is_empty());
        assert!(grammar.productions[2].right.is_empty());
    }

    #[test]
    fn tolerates_whitespace_and_trailing_blank_lines() {
        let source = " 1 \r\n1\r\n1\r\nS\r\na\r\nS -> a a\r\n\r\n   \n";
        let grammar = parse(source).unwrap();
        assert_eq!(grammar.productions[0].right, ["a", "a"]);
    }

    #[test]
    fn reports_invalid_count() {
        let err = parse("x\n0\n0\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, SyntaxErrorKind::InvalidCount { .. }));
    }

    #[test]
    fn reports_missing_lines() {
        let err = parse("1\n1\n2\nA\na\nS->Aa\n").unwrap_err();
        assert_eq!(err.line, 7);
        assert!(matches!(err.kind, SyntaxErrorKind::MissingLine { .. }));
    }

    #[test]
    fn reports_missing_arrow() {
        let err = parse("0\n1\n1\na\nSa\n").unwrap_err();
        assert_eq!(err.line, 5);
        assert_eq!(err.kind, SyntaxErrorKind::MissingArrow);
    }

    #[test]
    fn reports_long_symbol_names() {
        let err = parse("1\n0\n0\nExpr\n").unwrap_err();
        assert_eq!(err.line, 4);
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::InvalidSymbolName { .. }
        ));
    }

    #[test]
    fn reports_trailing_content() {
        let err = parse("0\n1\n1\na\nS->a\nS->aa\n").unwrap_err();
        assert_eq!(err.line, 6);
        assert_eq!(err.kind, SyntaxErrorKind::TrailingContent);
    }
}
