//! The sequence of production rules applied while recognizing an input.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Derivation {
    reductions: Vec<RuleID>,
}

impl Derivation {
    pub fn new(reductions: Vec<RuleID>) -> Self {
        Self { reductions }
    }

    /// Return the rules in the order they were reduced.
    pub fn reductions(&self) -> &[RuleID] {
        &self.reductions[..]
    }

    /// Return the rules of the rightmost derivation, starting from the
    /// one applied to the start symbol.
    pub fn rightmost(&self) -> impl Iterator<Item = RuleID> + '_ {
        self.reductions.iter().rev().copied()
    }

    /// Expand the start symbol with the rules of the rightmost derivation.
    ///
    /// Returns `None` if a rule does not rewrite the rightmost nonterminal
    /// of the sentential form.
    pub fn replay(&self, g: &Grammar) -> Option<Vec<SymbolID>> {
        let mut form = vec![SymbolID::N(g.start_symbol())];
        for id in self.rightmost() {
            let rule = g.rule(id);
            let pos = form.iter().rposition(|s| matches!(s, SymbolID::N(..)))?;
            if form[pos] != SymbolID::N(rule.left()) {
                return None;
            }
            form.splice(pos..=pos, rule.right().iter().copied());
        }
        Some(form)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for id in self.rightmost() {
                writeln!(f, "{}", g.rule(id).display(g))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Automaton;

    // S -> a S b | c
    const NESTED: &str = "0\n3\n2\na\nb\nc\nS->aSb\nS->c\n";

    fn spell(g: &Grammar, form: &[SymbolID]) -> String {
        form.iter().map(|s| g.symbol_name(*s)).collect()
    }

    #[test]
    fn replay_reproduces_input() {
        let g = Grammar::from_str(NESTED).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        for input in ["c", "acb", "aacbb", "aaacbbb"] {
            let derivation = automaton.parse_str(input).unwrap();
            let form = derivation.replay(&g).unwrap();
            assert_eq!(spell(&g, &form), input);
        }
    }

    #[test]
    fn rightmost_order() {
        let g = Grammar::from_str(NESTED).unwrap();
        let automaton = Automaton::build(&g).unwrap();
        let derivation = automaton.parse_str("acb").unwrap();
        assert_eq!(derivation.display(&g).to_string(), "S -> a S b\nS -> c\n");
        let first = derivation.rightmost().next().unwrap();
        assert_eq!(g.rule(first).left(), g.start_symbol());
    }

    #[test]
    fn replay_rejects_mismatched_rules() {
        let g = Grammar::from_str("1\n1\n2\nA\na\nS->Aa\nA->a\n").unwrap();
        let ids: Vec<_> = g.rules().map(|r| r.id()).collect();

        // `A -> a` cannot rewrite the start symbol
        let derivation = Derivation::new(vec![ids[2]]);
        assert_eq!(derivation.replay(&g), None);

        // no nonterminal is left to rewrite
        let derivation = Derivation::new(vec![ids[2], ids[2], ids[1]]);
        assert_eq!(derivation.replay(&g), None);
    }

    #[test]
    fn empty_derivation_replays_start_symbol() {
        let g = Grammar::from_str(NESTED).unwrap();
        let form = Derivation::default().replay(&g).unwrap();
        assert_eq!(spell(&g, &form), "S");
    }
}
