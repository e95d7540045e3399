//! Construction of the SLR(1) automaton.

use crate::{
    derivation::Derivation,
    first_follow::FirstFollow,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet},
    item::{closure, goto, Instance, ItemSet},
    types::Map,
    util::display_fn,
};
use slrgen_runtime::{
    definition::{ParseAction, ParseTable},
    parser::{ParseError, Parser, Token},
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u16);
impl StateID {
    /// The state containing the augmenting rule with the marker at the beginning.
    pub const INITIAL: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    fn index(self) -> usize {
        self.0.into()
    }
}
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The action that the automaton in a state performs on a particular symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a terminal symbol and transition to the specified state.
    Shift(StateID),

    /// Transition to the specified state after reducing to a nonterminal symbol.
    Goto(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

#[derive(Debug, Clone)]
pub struct State {
    id: StateID,
    items: ItemSet,
    actions: Map<SymbolID, Action>,
}

impl State {
    pub fn id(&self) -> StateID {
        self.id
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn actions(&self) -> impl Iterator<Item = (SymbolID, Action)> + '_ {
        self.actions
            .iter()
            .map(|(symbol, action)| (*symbol, *action))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "#### State {:?}", self.id)?;
            writeln!(f, "## items")?;
            for item in self.items.iter() {
                writeln!(f, "- {}", item.display(g))?;
            }
            writeln!(f, "## actions")?;
            for (symbol, action) in &self.actions {
                let symbol = g.symbol_name(*symbol);
                match action {
                    Action::Shift(next) => writeln!(f, "- {} => shift({:?})", symbol, next)?,
                    Action::Goto(next) => writeln!(f, "- {} => goto({:?})", symbol, next)?,
                    Action::Reduce(rule) => {
                        writeln!(f, "- {} => reduce({})", symbol, g.rule(*rule).display(g))?
                    }
                    Action::Accept => writeln!(f, "- {} => accept", symbol)?,
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error(
        "shift/reduce conflict in state {} on `{}': shift({}) or reduce({})",
        state,
        symbol_name,
        shift,
        reduce_rule
    )]
    ShiftReduceConflict {
        state: StateID,
        symbol: TerminalID,
        symbol_name: String,
        shift: StateID,
        reduce: RuleID,
        reduce_rule: String,
    },

    #[error(
        "reduce/reduce conflict in state {} on `{}': reduce({}) or reduce({})",
        state,
        symbol_name,
        first_rule,
        second_rule
    )]
    ReduceReduceConflict {
        state: StateID,
        symbol: TerminalID,
        symbol_name: String,
        first: RuleID,
        first_rule: String,
        second: RuleID,
        second_rule: String,
    },

    #[error("too many states")]
    TooManyStates,
}

/// The SLR(1) automaton derived from a grammar.
#[derive(Debug)]
pub struct Automaton<'g> {
    grammar: &'g Grammar,
    states: Vec<State>,
}

impl fmt::Display for Automaton<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.states.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", state.display(self.grammar))?;
        }
        Ok(())
    }
}

impl<'g> Automaton<'g> {
    /// Build the automaton and its action table.
    ///
    /// Fails at the first cell claimed by two different actions.
    #[tracing::instrument(skip_all)]
    pub fn build(grammar: &'g Grammar) -> Result<Self, AutomatonError> {
        let mut states = canonical_collection(grammar)?;
        place_reductions(grammar, &mut states)?;
        tracing::debug!(states = states.len(), "built automaton");
        Ok(Self { grammar, states })
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn states(&self) -> &[State] {
        &self.states[..]
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn initial_state(&self) -> StateID {
        StateID::INITIAL
    }

    /// Return the action registered at the specified table cell.
    pub fn action(&self, state: StateID, symbol: SymbolID) -> Option<Action> {
        self.lookup(state, symbol)
    }

    fn lookup(&self, state: StateID, symbol: SymbolID) -> Option<Action> {
        self.states
            .get(state.index())
            .and_then(|state| state.actions.get(&symbol))
            .copied()
    }

    /// Recognize the token sequence, returning the applied rules.
    pub fn parse<I, E>(&self, tokens: I) -> Result<Derivation, ParseError<E>>
    where
        I: IntoIterator<Item = Result<TerminalID, E>>,
        E: fmt::Display,
    {
        let mut parser = Parser::new(self);
        let reductions = parser.collect_reductions(tokens)?;
        Ok(Derivation::new(reductions))
    }

    /// Recognize a string whose characters are the names of terminal symbols.
    ///
    /// Whitespace characters are skipped.
    pub fn parse_str(&self, input: &str) -> Result<Derivation, ParseError<UnknownSymbol>> {
        let tokens = input
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| self.input_symbol(ch));
        self.parse(tokens)
    }

    fn input_symbol(&self, ch: char) -> Result<TerminalID, UnknownSymbol> {
        let mut buf = [0; 4];
        match self.grammar.terminal(ch.encode_utf8(&mut buf)) {
            Some(t) if t != TerminalID::EOI => Ok(t),
            _ => Err(UnknownSymbol { symbol: ch }),
        }
    }
}

/// Explore every state reachable from the initial one.
#[tracing::instrument(skip_all)]
fn canonical_collection(g: &Grammar) -> Result<Vec<State>, AutomatonError> {
    let symbols: Vec<SymbolID> = g.symbols().collect();

    let initial = closure(g, [Instance::new(RuleID::ACCEPT)]);
    let mut index = Map::<ItemSet, StateID>::default();
    index.insert(initial.clone(), StateID::INITIAL);
    let mut states = vec![State {
        id: StateID::INITIAL,
        items: initial,
        actions: Map::default(),
    }];

    let mut pending = VecDeque::new();
    pending.push_back(StateID::INITIAL);

    while let Some(current) = pending.pop_front() {
        for &symbol in &symbols {
            let kernel = goto(g, &states[current.index()].items, symbol);
            if kernel.is_empty() {
                continue;
            }
            let items = closure(g, kernel);

            let next = match index.get(&items) {
                Some(id) => *id,
                None => {
                    let id = u16::try_from(states.len())
                        .map(StateID)
                        .map_err(|_| AutomatonError::TooManyStates)?;
                    tracing::trace!(state = ?id, from = ?current, ?symbol, "new state");
                    index.insert(items.clone(), id);
                    states.push(State {
                        id,
                        items,
                        actions: Map::default(),
                    });
                    pending.push_back(id);
                    id
                }
            };

            let action = match symbol {
                SymbolID::T(..) => Action::Shift(next),
                SymbolID::N(..) => Action::Goto(next),
            };
            states[current.index()].actions.insert(symbol, action);
        }
    }

    Ok(states)
}

/// Register the reduce actions of the complete items on their FOLLOW sets.
#[tracing::instrument(skip_all)]
fn place_reductions(g: &Grammar, states: &mut [State]) -> Result<(), AutomatonError> {
    let first_follow = FirstFollow::new(g);
    let mut follows = Map::<NonterminalID, TerminalSet>::default();

    for state in states {
        let complete: Vec<RuleID> = state
            .items
            .iter()
            .filter(|item| item.is_complete(g))
            .map(|item| item.rule)
            .collect();

        for rule in complete {
            let left = g.rule(rule).left();
            let follow = follows
                .entry(left)
                .or_insert_with(|| first_follow.follow(left));

            let action = if rule == RuleID::ACCEPT {
                Action::Accept
            } else {
                Action::Reduce(rule)
            };

            for t in follow.iter() {
                let symbol = SymbolID::T(t);
                match state.actions.get(&symbol).copied() {
                    None => {
                        state.actions.insert(symbol, action);
                    }
                    Some(existing) if existing == action => (),
                    Some(Action::Shift(shift)) | Some(Action::Goto(shift)) => {
                        tracing::debug!(state = ?state.id, ?symbol, "shift/reduce conflict");
                        return Err(AutomatonError::ShiftReduceConflict {
                            state: state.id,
                            symbol: t,
                            symbol_name: g.terminal_name(t).to_owned(),
                            shift,
                            reduce: rule,
                            reduce_rule: g.rule(rule).display(g).to_string(),
                        });
                    }
                    Some(Action::Reduce(first)) => {
                        tracing::debug!(state = ?state.id, ?symbol, "reduce/reduce conflict");
                        return Err(reduce_conflict(g, state.id, t, first, rule));
                    }
                    Some(Action::Accept) => {
                        tracing::debug!(state = ?state.id, ?symbol, "reduce/accept conflict");
                        return Err(reduce_conflict(g, state.id, t, RuleID::ACCEPT, rule));
                    }
                }
            }
        }
    }

    Ok(())
}

fn reduce_conflict(
    g: &Grammar,
    state: StateID,
    symbol: TerminalID,
    first: RuleID,
    second: RuleID,
) -> AutomatonError {
    AutomatonError::ReduceReduceConflict {
        state,
        symbol,
        symbol_name: g.terminal_name(symbol).to_owned(),
        first,
        first_rule: g.rule(first).display(g).to_string(),
        second,
        second_rule: g.rule(second).display(g).to_string(),
    }
}

impl ParseTable for Automaton<'_> {
    type State = StateID;
    type Symbol = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = RuleID;

    fn initial_state(&self) -> Self::State {
        StateID::INITIAL
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
        let symbol = SymbolID::T(lookahead.unwrap_or(TerminalID::EOI));
        match self.lookup(current, symbol)? {
            Action::Shift(next) => Some(ParseAction::Shift(next)),
            Action::Reduce(id) => {
                let rule = self.grammar.rule(id);
                Some(ParseAction::Reduce(id, rule.left(), rule.right().len()))
            }
            Action::Accept => Some(ParseAction::Accept),
            Action::Goto(..) => None,
        }
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        match self.lookup(current, SymbolID::N(symbol))? {
            Action::Goto(next) => Some(next),
            _ => None,
        }
    }
}

impl Token<TerminalID> for TerminalID {
    fn as_symbol(&self) -> TerminalID {
        *self
    }
}

/// A character in the input that does not name a terminal symbol.
#[derive(Debug, thiserror::Error)]
#[error("unknown symbol `{}'", symbol)]
pub struct UnknownSymbol {
    pub symbol: char,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    const EXAMPLE: &str = "1\n1\n2\nA\na\nS->Aa\nA->a\n";

    const ARITHMETIC: &str = "\
3
5
6
E
T
F
+
*
(
)
i
E->E+T
E->T
T->T*F
T->F
F->(E)
F->i
";

    fn rules(g: &Grammar, derivation: &Derivation) -> Vec<String> {
        derivation
            .reductions()
            .iter()
            .map(|r| g.rule(*r).display(g).to_string())
            .collect()
    }

    #[test]
    fn example_grammar() {
        let g = Grammar::from_str(EXAMPLE).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        assert_eq!(automaton.states().len(), 5);

        let derivation = automaton.parse_str("aa").unwrap();
        assert_eq!(rules(&g, &derivation), ["A -> a", "S -> A a"]);

        let err = automaton.parse_str("a").unwrap_err();
        assert!(matches!(err, ParseError::Rejected { position: 1 }));
        let err = automaton.parse_str("").unwrap_err();
        assert!(matches!(err, ParseError::Rejected { position: 0 }));
        let err = automaton.parse_str("aaa").unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn unknown_input_symbol_is_rejection() {
        let g = Grammar::from_str(EXAMPLE).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        let err = automaton.parse_str("ab").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Lexer(UnknownSymbol { symbol: 'b' })
        ));
        assert!(err.is_rejection());

        // nonterminal names are not input symbols
        assert!(automaton.parse_str("Aa").unwrap_err().is_rejection());
    }

    #[test]
    fn initial_state_holds_augmenting_item() {
        let g = Grammar::from_str(EXAMPLE).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        let initial = automaton.state(automaton.initial_state());
        assert_eq!(initial.id(), StateID::INITIAL);
        assert!(initial.items().contains(Instance::new(RuleID::ACCEPT)));

        let accepting = automaton
            .states()
            .iter()
            .filter(|state| state.actions().any(|(_, action)| action == Action::Accept))
            .count();
        assert_eq!(accepting, 1);
    }

    #[test]
    fn arithmetic_grammar() {
        let g = Grammar::from_str(ARITHMETIC).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        assert_eq!(automaton.states().len(), 12);

        let derivation = automaton.parse_str("i+i*i").unwrap();
        assert_eq!(
            rules(&g, &derivation),
            [
                "F -> i",
                "T -> F",
                "E -> T",
                "F -> i",
                "T -> F",
                "F -> i",
                "T -> T * F",
                "E -> E + T",
            ]
        );

        assert!(automaton.parse_str("(i+i)*i").is_ok());
        assert!(automaton.parse_str("i + i").is_ok());
        for input in ["i+", "+i", "(i", "i)", "ii", ""] {
            let err = automaton.parse_str(input).unwrap_err();
            assert!(err.is_rejection(), "{}: {}", input, err);
        }
    }

    // E -> E + E | a
    #[test]
    fn shift_reduce_conflict() {
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let a = g.terminal("a")?;
            let e = g.nonterminal("E")?;
            g.rule(e, [N(e), T(plus), N(e)])?;
            g.rule(e, [T(a)])?;
            Ok(())
        })
        .unwrap();

        match Automaton::build(&g) {
            Err(AutomatonError::ShiftReduceConflict {
                state,
                symbol_name,
                shift,
                reduce_rule,
                ..
            }) => {
                assert_eq!(state, StateID::from_raw(4));
                assert_eq!(symbol_name, "+");
                assert_eq!(shift, StateID::from_raw(3));
                assert_eq!(reduce_rule, "E -> E + E");
            }
            res => panic!("unexpected result: {:?}", res),
        }
    }

    // S -> A | B
    // A -> a
    // B -> a
    #[test]
    fn reduce_reduce_conflict() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;
            g.rule(s, [N(a_)])?;
            g.rule(s, [N(b_)])?;
            g.rule(a_, [T(a)])?;
            g.rule(b_, [T(a)])?;
            Ok(())
        })
        .unwrap();

        match Automaton::build(&g) {
            Err(AutomatonError::ReduceReduceConflict {
                symbol,
                first_rule,
                second_rule,
                ..
            }) => {
                assert_eq!(symbol, TerminalID::EOI);
                assert_eq!(first_rule, "A -> a");
                assert_eq!(second_rule, "B -> a");
            }
            res => panic!("unexpected result: {:?}", res),
        }
    }

    // S -> S | a
    #[test]
    fn reduce_accept_conflict() {
        let g = Grammar::from_str("0\n1\n2\na\nS->S\nS->a\n").unwrap();
        let unit = g.rules().nth(1).unwrap().id();

        match Automaton::build(&g) {
            Err(AutomatonError::ReduceReduceConflict {
                state,
                symbol,
                first,
                second,
                ..
            }) => {
                assert_eq!(state, StateID::from_raw(2));
                assert_eq!(symbol, TerminalID::EOI);
                assert_eq!(first, RuleID::ACCEPT);
                assert_eq!(second, unit);
            }
            res => panic!("unexpected result: {:?}", res),
        }
    }

    // S -> a S b | ε
    #[test]
    fn empty_production_reductions() {
        let g = Grammar::from_str("0\n2\n2\na\nb\nS->aSb\nS->ε\n").unwrap();
        let automaton = Automaton::build(&g).unwrap();

        let empty = g.rules().find(|rule| rule.is_empty()).unwrap().id();
        let b = g.terminal("b").unwrap();
        let mut count = 0;
        for state in automaton.states() {
            if state.items().contains(Instance::new(empty)) {
                count += 1;
                for t in [TerminalID::EOI, b] {
                    assert_eq!(
                        automaton.action(state.id(), T(t)),
                        Some(Action::Reduce(empty))
                    );
                }
            }
        }
        assert_eq!(count, 2);

        let derivation = automaton.parse_str("").unwrap();
        assert_eq!(rules(&g, &derivation), ["S -> ε"]);
        let derivation = automaton.parse_str("ab").unwrap();
        assert_eq!(rules(&g, &derivation), ["S -> ε", "S -> a S b"]);
        assert!(automaton.parse_str("aabb").is_ok());
        assert!(automaton.parse_str("aab").unwrap_err().is_rejection());
        assert!(automaton.parse_str("ba").unwrap_err().is_rejection());
    }

    #[test]
    fn build_is_deterministic() {
        let g = Grammar::from_str(ARITHMETIC).unwrap();
        let first = Automaton::build(&g).unwrap().to_string();
        let second = Automaton::build(&g).unwrap().to_string();
        assert_eq!(first, second);
        assert!(first.starts_with("#### State S#000\n"));
    }

    #[test]
    fn concurrent_parsing() {
        let g = Grammar::from_str(ARITHMETIC).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        let automaton = &automaton;

        std::thread::scope(|s| {
            let handles: Vec<_> = ["i", "i*i", "(i+i)*i", "i+"]
                .into_iter()
                .map(|input| s.spawn(move || automaton.parse_str(input).is_ok()))
                .collect();
            let results: Vec<bool> = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect();
            assert_eq!(results, [true, true, true, false]);
        });
    }
}
