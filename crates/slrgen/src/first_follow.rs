//! Calculation of FIRST and FOLLOW set functions.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
};
use std::{collections::VecDeque, fmt};

/// The value of `First(..)`.
///
/// The empty-production marker is represented by the `nullable` flag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct First {
    pub terminals: TerminalSet,
    pub nullable: bool,
}

impl First {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(move |f| {
            f.write_str("{")?;
            let terminals = self.terminals.iter().map(|t| g.terminal_name(t));
            let epsilon = self.nullable.then_some(crate::syntax::EPSILON);
            crate::util::write_joined(f, ", ", terminals.chain(epsilon))?;
            f.write_str("}")
        })
    }
}

#[derive(Debug)]
pub struct FirstFollow<'g> {
    grammar: &'g Grammar,
    nulls: Set<NonterminalID>,
}

impl<'g> FirstFollow<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let nulls = nulls_set(grammar);
        Self { grammar, nulls }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Return whether the symbol derives the empty string.
    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(..) => false,
            SymbolID::N(n) => self.nulls.contains(&n),
        }
    }

    /// `First(symbol)`
    pub fn first(&self, symbol: SymbolID) -> First {
        let n = match symbol {
            SymbolID::T(t) => {
                return First {
                    terminals: Some(t).into_iter().collect(),
                    nullable: false,
                }
            }
            SymbolID::N(n) => n,
        };

        let mut terminals = TerminalSet::default();
        let mut expanded = Set::<RuleID>::default();
        let mut pending = VecDeque::new();
        for rule in self.grammar.rules_for(n) {
            expanded.insert(rule.id());
            pending.push_back(rule.id());
        }

        while let Some(rule) = pending.pop_front() {
            let rule = self.grammar.rule(rule);
            for symbol in rule.right() {
                match *symbol {
                    SymbolID::T(t) => {
                        terminals.insert(t);
                        break;
                    }
                    SymbolID::N(m) => {
                        for rule in self.grammar.rules_for(m) {
                            if expanded.insert(rule.id()) {
                                pending.push_back(rule.id());
                            }
                        }
                        if !self.nulls.contains(&m) {
                            break;
                        }
                    }
                }
            }
        }

        First {
            terminals,
            nullable: self.nulls.contains(&n),
        }
    }

    /// `First(Y1 Y2 ... Yn)`
    pub fn first_of(&self, symbols: &[SymbolID]) -> First {
        let mut res = First::default();
        for symbol in symbols {
            let first = self.first(*symbol);
            res.terminals.union_with(&first.terminals);
            if !first.nullable {
                return res;
            }
        }
        res.nullable = true;
        res
    }

    /// `Follow(n)`
    pub fn follow(&self, n: NonterminalID) -> TerminalSet {
        let mut follow = TerminalSet::default();

        // Follow(X) ⊇ Follow(A) for each `A -> α X β` with nullable β,
        // so the nonterminals whose FOLLOW sets are folded in are tracked explicitly.
        let mut visited = Set::<NonterminalID>::default();
        let mut pending = VecDeque::new();
        visited.insert(n);
        pending.push_back(n);

        while let Some(x) = pending.pop_front() {
            if x == NonterminalID::START {
                follow.insert(TerminalID::EOI);
                continue;
            }

            for rule in self.grammar.rules() {
                let right = rule.right();
                for (i, symbol) in right.iter().enumerate() {
                    if *symbol != SymbolID::N(x) {
                        continue;
                    }
                    let rest = self.first_of(&right[i + 1..]);
                    follow.union_with(&rest.terminals);
                    if rest.nullable && visited.insert(rule.left()) {
                        pending.push_back(rule.left());
                    }
                }
            }
        }

        follow
    }

    /// Return the FIRST sets of all nonterminals except the augmenting symbol.
    pub fn first_sets(&self) -> Map<NonterminalID, First> {
        self.grammar
            .nonterminals()
            .filter(|(n, _)| *n != NonterminalID::START)
            .map(|(n, _)| (n, self.first(SymbolID::N(n))))
            .collect()
    }

    /// Return the FOLLOW sets of all nonterminals except the augmenting symbol.
    pub fn follow_sets(&self) -> Map<NonterminalID, TerminalSet> {
        self.grammar
            .nonterminals()
            .filter(|(n, _)| *n != NonterminalID::START)
            .map(|(n, _)| (n, self.follow(n)))
            .collect()
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        crate::util::display_fn(move |f| {
            let g = self.grammar;
            writeln!(f, "#### first sets:")?;
            for (n, first) in self.first_sets() {
                writeln!(f, "- {} : {}", g.nonterminal_name(n), first.display(g))?;
            }
            writeln!(f, "#### follow sets:")?;
            for (n, follow) in self.follow_sets() {
                writeln!(f, "- {} : {}", g.nonterminal_name(n), follow.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // ruleからnullableであることが分かっている場合は追加する
    let mut nulls: Set<NonterminalID> = grammar
        .rules()
        .filter_map(|rule| rule.is_empty().then_some(rule.left()))
        .collect();

    // 値が更新されなくなるまで繰り返す
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            // 右辺のsymbolsがすべてnullableかどうか
            let is_rhs_nullable = rule
                .right()
                .iter()
                .all(|s| matches!(s, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    nulls
}
