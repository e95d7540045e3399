//! Parse table definition.

/// The trait for abstracting a built shift-reduce parse table.
pub trait ParseTable {
    /// The number to identify the state of the automaton.
    type State: Copy;

    /// The number to identify the terminal symbols.
    type Symbol: Copy;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy;

    /// The context value corresponding to the matched production rule.
    type Reduce: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of input.
    /// A `None` result means that the lookahead symbol is not acceptable in
    /// the current state.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>>;

    /// Return the state to transition after reducing to the nonterminal symbol.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;
    type Nonterminal = T::Nonterminal;
    type Reduce = T::Reduce;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }
}

impl<T: ?Sized> ParseTable for std::sync::Arc<T>
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;
    type Nonterminal = T::Nonterminal;
    type Reduce = T::Reduce;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<TState, TNonterminal, TReduce> {
    /// Read the lookahead symbol and transition to the specified state.
    Shift(TState),

    /// Pop the specified number of stack entries and push the
    /// left-hand nonterminal of the matched rule.
    Reduce(TReduce, TNonterminal, usize),

    /// The whole input has been recognized.
    Accept,
}
