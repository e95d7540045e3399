//! Parser.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

/// The shift-reduce parser driven based on a built parse table.
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    definition: TDef,
    stack: Vec<StackEntry<TTok, TDef::Nonterminal, TDef::State>>,
    parser_state: ParserState,
    peeked_token: Option<TTok>,
    reached_eoi: bool,
    position: usize,
}

struct StackEntry<TTok, TSym, TState> {
    item: ParseItem<TTok, TSym>,
    state: TState,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum ParserState {
    Reading,
    Accepted,
}

impl<TDef, TTok> fmt::Debug for Parser<TDef, TTok>
where
    TDef: ParseTable + fmt::Debug,
    TDef::State: fmt::Debug,
    TDef::Nonterminal: fmt::Debug,
    TTok: Token<TDef::Symbol> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states: Vec<_> = self.stack.iter().map(|entry| &entry.state).collect();
        let items: Vec<_> = self.stack.iter().map(|entry| &entry.item).collect();
        f.debug_struct("Parser")
            .field("definition", &self.definition)
            .field("parser_state", &self.parser_state)
            .field("state_stack", &states)
            .field("item_stack", &items)
            .field("peeked_token", &self.peeked_token)
            .field("position", &self.position)
            .finish()
    }
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            stack: vec![StackEntry {
                item: ParseItem::__Empty,
                state: initial_state,
            }],
            parser_state: ParserState::Reading,
            peeked_token: None,
            reached_eoi: false,
            position: 0,
        }
    }

    /// Return the number of tokens shifted so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Consume some tokens and drive the state machine
    /// until it matches a certain production rule.
    ///
    /// On reduction, `args` is filled with the stack items popped for the
    /// right-hand side of the matched rule.
    pub fn next_event<I, E>(
        &mut self,
        tokens: &mut I,
        args: &mut Vec<ParseItem<TTok, TDef::Nonterminal>>,
    ) -> Result<ParseEvent<TDef::Reduce>, ParseError<E>>
    where
        I: Iterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        if self.parser_state == ParserState::Accepted {
            return Err(ParseError::AlreadyAccepted);
        }

        loop {
            let current = self.stack.last().ok_or(ParseError::EmptyStack)?.state;

            if self.peeked_token.is_none() && !self.reached_eoi {
                match tokens.next().transpose().map_err(ParseError::Lexer)? {
                    Some(token) => self.peeked_token = Some(token),
                    None => self.reached_eoi = true,
                }
            }
            let lookahead = self.peeked_token.as_ref().map(|t| t.as_symbol());

            let position = self.position;
            let action = self
                .definition
                .action(current, lookahead)
                .ok_or(ParseError::Rejected { position })?;

            match action {
                ParseAction::Shift(next) => {
                    let token = self.peeked_token.take().ok_or(ParseError::UnexpectedEOI)?;
                    self.stack.push(StackEntry {
                        item: ParseItem::T(token),
                        state: next,
                    });
                    self.position += 1;
                }

                ParseAction::Reduce(reduce, lhs, n) => {
                    // the sentinel entry at the bottom is never popped.
                    let len = self.stack.len();
                    if n >= len {
                        return Err(ParseError::EmptyStack);
                    }
                    args.clear();
                    args.extend(self.stack.drain(len - n..).map(|entry| entry.item));

                    let exposed = self.stack.last().ok_or(ParseError::EmptyStack)?.state;
                    let next = self
                        .definition
                        .goto(exposed, lhs)
                        .ok_or(ParseError::MissingGoto)?;
                    self.stack.push(StackEntry {
                        item: ParseItem::N(lhs),
                        state: next,
                    });

                    return Ok(ParseEvent::Reduce(reduce));
                }

                ParseAction::Accept => {
                    if self.peeked_token.is_some() {
                        return Err(ParseError::Rejected {
                            position: self.position,
                        });
                    }
                    let entry = self.stack.pop().ok_or(ParseError::EmptyStack)?;
                    args.clear();
                    args.push(entry.item);

                    self.parser_state = ParserState::Accepted;
                    return Ok(ParseEvent::Accept);
                }
            }
        }
    }

    /// Drive the parser until the input is accepted, collecting the
    /// matched production rules in the order they were reduced.
    pub fn collect_reductions<I, E>(
        &mut self,
        tokens: I,
    ) -> Result<Vec<TDef::Reduce>, ParseError<E>>
    where
        I: IntoIterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        let mut tokens = tokens.into_iter();
        let mut args = vec![];
        let mut reductions = vec![];
        loop {
            match self.next_event(&mut tokens, &mut args)? {
                ParseEvent::Reduce(reduce) => reductions.push(reduce),
                ParseEvent::Accept => return Ok(reductions),
            }
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ParseItem<TTok, TSym> {
    T(TTok),
    N(TSym),

    #[doc(hidden)]
    __Empty,
}

impl<TTok, TSym> Default for ParseItem<TTok, TSym> {
    fn default() -> Self {
        Self::__Empty
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseEvent<TReduce> {
    Reduce(TReduce),
    Accept,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<L: fmt::Display> {
    #[error("from lexer: {}", _0)]
    Lexer(L),

    #[error("rejected at position {}", position)]
    Rejected { position: usize },

    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("missing goto transition")]
    MissingGoto,

    #[error("empty stack")]
    EmptyStack,

    #[error("already accepted")]
    AlreadyAccepted,
}

impl<L: fmt::Display> ParseError<L> {
    /// Return whether the input was found not to be a member of the language.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Lexer(..) | Self::Rejected { .. })
    }
}
