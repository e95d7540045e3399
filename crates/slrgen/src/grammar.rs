//! Grammar types.

use crate::{
    syntax::{self, SyntaxError},
    types::Map,
    util::display_fn,
};
use std::{fmt, fs, io, path::Path};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);

    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// Reserved symbol used as the left-hand side of the augmenting rule.
    pub const START: Self = Self(0);

    const OFFSET: u16 = 1;
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID(u16);
impl RuleID {
    /// The augmenting rule `$start -> Start`.
    pub const ACCEPT: Self = Self(0);

    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ACCEPT => write!(f, "R#Accept"),
            _ => write!(f, "R#{:03}", self.0),
        }
    }
}
impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID).unwrap())
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            crate::util::write_joined(f, ", ", self.iter().map(|t| g.terminal_name(t)))?;
            f.write_str("}")
        })
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.0.into()).collect(),
        }
    }
}

/// The type that represents a production rule in grammar.
///
/// An empty right-hand side denotes the empty production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// Return whether this rule is an empty production.
    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                return f.write_str(syntax::EPSILON);
            }
            crate::util::write_joined(f, " ", self.right.iter().map(|s| g.symbol_name(*s)))
        })
    }
}

/// The grammar definition used to derive the automaton.
#[derive(Debug)]
pub struct Grammar {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    rules: Map<RuleID, Rule>,
    start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#### terminals: ")?;
        crate::util::write_joined(f, ", ", self.terminals.values())?;
        f.write_str("\n#### nonterminals: ")?;
        crate::util::write_joined(f, ", ", self.nonterminals.values())?;
        let start = self.nonterminal_name(self.start_symbol);
        writeln!(f, "\n#### start: {}", start)?;
        writeln!(f, "#### rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "- [{}] {}", rule.id, rule.display(self))?;
        }
        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let source = syntax::parse(source)?;
        Grammar::define(|g| define_grammar_from_syntax(g, &source))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };
        def.terminals.insert(TerminalID::EOI, "$end".into());
        def.nonterminals
            .insert(NonterminalID::START, "$start".into());

        f(&mut def)?;

        def.end()
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// Return the terminal symbols, starting with the end of input.
    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.terminals
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
    }

    /// Return the nonterminal symbols, starting with the augmenting symbol.
    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &str)> + '_ {
        self.nonterminals
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
    }

    /// Return all grammar symbols: the terminals followed by the nonterminals.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self.terminals.keys().map(|t| SymbolID::T(*t));
        let nonterminals = self.nonterminals.keys().map(|n| SymbolID::N(*n));
        terminals.chain(nonterminals)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Return the rules whose left-hand side is `left`.
    pub fn rules_for(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left == left)
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.terminal(name).map(SymbolID::T).or_else(|| {
            self.nonterminals
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(id, _)| SymbolID::N(*id))
        })
    }

    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .iter()
            .find(|(_, t)| *t == name)
            .map(|(id, _)| *id)
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        &self.terminals[&id]
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        &self.nonterminals[&id]
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef,
    source: &syntax::GrammarSource,
) -> Result<(), GrammarDefError> {
    let mut symbols = Map::<&str, SymbolID>::default();

    for name in &source.nonterminals {
        let id = g
            .nonterminal(&name.value)
            .map_err(|e| e.at_line(name.line))?;
        symbols.insert(&name.value, SymbolID::N(id));
    }
    for name in &source.terminals {
        let id = g.terminal(&name.value).map_err(|e| e.at_line(name.line))?;
        symbols.insert(&name.value, SymbolID::T(id));
    }

    for production in &source.productions {
        let line = production.line;
        let left = match symbols.get(&*production.left) {
            Some(SymbolID::N(n)) => *n,
            Some(SymbolID::T(..)) => {
                return Err(GrammarDefError::from(format!(
                    "the terminal `{}' cannot be the left-hand side of a rule",
                    production.left
                ))
                .at_line(line))
            }
            None => {
                // 未登場の記号は非終端記号と解釈する
                let id = g
                    .nonterminal(&production.left)
                    .map_err(|e| e.at_line(line))?;
                symbols.insert(&production.left, SymbolID::N(id));
                id
            }
        };

        let mut right = vec![];
        for name in &production.right {
            let symbol = match symbols.get(&**name) {
                Some(symbol) => *symbol,
                None => {
                    // 未登場の記号は非終端記号と解釈する
                    let id = g.nonterminal(name).map_err(|e| e.at_line(line))?;
                    symbols.insert(name, SymbolID::N(id));
                    SymbolID::N(id)
                }
            };
            right.push(symbol);
        }

        g.rule(left, right).map_err(|e| e.at_line(line))?;
    }

    if let Some(SymbolID::N(start)) = symbols.get(syntax::DEFAULT_START_SYMBOL) {
        g.start_symbol(*start)?;
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let raw = allocate_id(&mut self.next_terminal_id, "terminals")?;
        let id = TerminalID(raw);
        self.terminals.insert(id, name.to_owned());

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let raw = allocate_id(&mut self.next_nonterminal_id, "nonterminals")?;
        let id = NonterminalID(raw);
        self.nonterminals.insert(id, name.to_owned());

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// An empty `right` declares the empty production.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err("unknown left-hand side of production rule".into());
        }

        let right: Vec<_> = right.into_iter().collect();
        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
            };
            if !known {
                return Err("unknown symbol in production rule".into());
            }
        }

        for rule in self.rules.values() {
            if rule.left == left && rule.right == right {
                return Err("Duplicate production rule detected".into());
            }
        }

        let raw = allocate_id(&mut self.next_rule_id, "rules")?;
        let id = RuleID(raw);
        self.rules.insert(id, Rule { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err("unknown start symbol".into());
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if name.is_empty() || name.starts_with('$') || name.contains(char::is_whitespace) {
            return Err(format!("incorrect symbol name: `{}'", name).into());
        }
        let exists = self.terminals.values().any(|t| t == name)
            || self.nonterminals.values().any(|n| n == name);
        if exists {
            return Err(format!("The symbol `{}' has already been declared", name).into());
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // 指定されていない場合は最初に登録されたnonterminal symbolを用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or_else(|| GrammarDefError::from("empty nonterminal symbols"))?,
        };

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
            start_symbol: start,
        })
    }
}

fn allocate_id(next: &mut u16, kind: &str) -> Result<u16, GrammarDefError> {
    let id = *next;
    *next = id.checked_add(1).ok_or_else(|| format!("too many {}", kind))?;
    Ok(id)
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(
        #[from]
        #[source]
        SyntaxError,
    ),

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl GrammarDefError {
    fn at_line(self, line: usize) -> Self {
        match self {
            Self::Other { msg } => Self::Other {
                msg: format!("line {}: {}", line, msg),
            },
            e => e,
        }
    }
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}
