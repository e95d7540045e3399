//! Dotted production rules and their closure.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    types::Set,
};
use std::{collections::VecDeque, fmt};

/// A production rule with a position marker, a.k.a. LR(0) item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instance {
    pub rule: RuleID,
    pub dot: u16,
}

impl Instance {
    /// Create the instance with the marker at the beginning of the rule.
    pub const fn new(rule: RuleID) -> Self {
        Self { rule, dot: 0 }
    }

    /// Return the symbol immediately after the marker.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        let right = g.rule(self.rule).right();
        right.get(usize::from(self.dot)).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.dot) >= g.rule(self.rule).right().len()
    }

    /// Return the instance with the marker moved over the next symbol.
    pub fn advance(&self, g: &Grammar) -> Option<Self> {
        if self.is_complete(g) {
            return None;
        }
        Some(Self {
            dot: self.dot + 1,
            ..*self
        })
    }

    // `"A -> x . y"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ->", g.nonterminal_name(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == usize::from(self.dot) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.is_complete(g) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A canonical set of instances.
///
/// The members are kept sorted and deduplicated, so that two sets with the
/// same members compare (and hash) equal regardless of the order in which
/// they were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: Vec<Instance>,
}

impl ItemSet {
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Instance>,
    {
        let mut items: Vec<_> = items.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = Instance> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: Instance) -> bool {
        self.items.binary_search(&item).is_ok()
    }
}

impl FromIterator<Instance> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Instance>,
    {
        Self::from_items(iter)
    }
}

/// Calculate the closure of the specified instances.
pub fn closure<I>(g: &Grammar, core: I) -> ItemSet
where
    I: IntoIterator<Item = Instance>,
{
    let mut items = Set::<Instance>::default();
    let mut pending = VecDeque::new();
    for item in core {
        if items.insert(item) {
            pending.push_back(item);
        }
    }

    while let Some(item) = pending.pop_front() {
        if let Some(SymbolID::N(n)) = item.next_symbol(g) {
            for rule in g.rules_for(n) {
                let new_item = Instance::new(rule.id());
                if items.insert(new_item) {
                    pending.push_back(new_item);
                }
            }
        }
    }

    ItemSet::from_items(items)
}

/// Calculate the kernel of the transition from `items` over `symbol`.
///
/// The returned instances are not closed.
pub fn goto(g: &Grammar, items: &ItemSet, symbol: SymbolID) -> Vec<Instance> {
    items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .filter_map(|item| item.advance(g))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    // S -> A a
    // A -> a | ε
    fn grammar() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            g.rule(s, [N(a_), T(a)])?;
            g.rule(a_, [T(a)])?;
            g.rule(a_, std::iter::empty())?;
            Ok(())
        })
        .unwrap()
    }

    fn rules(g: &Grammar) -> Vec<RuleID> {
        g.rules().map(|r| r.id()).collect()
    }

    #[test]
    fn closure_of_initial_item() {
        let g = grammar();
        let ids = rules(&g);
        let items = closure(&g, [Instance::new(RuleID::ACCEPT)]);
        assert_eq!(items.len(), 4);
        for id in ids {
            assert!(items.contains(Instance::new(id)));
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let g = grammar();
        let once = closure(&g, [Instance::new(RuleID::ACCEPT)]);
        let twice = closure(&g, once.iter());
        assert_eq!(once, twice);
    }

    #[test]
    fn item_set_is_order_independent() {
        let g = grammar();
        let ids = rules(&g);
        let forward = closure(&g, ids.iter().map(|id| Instance::new(*id)));
        let backward = closure(&g, ids.iter().rev().map(|id| Instance::new(*id)));
        assert_eq!(forward, backward);
        let (a, b) = (Instance::new(ids[0]), Instance::new(ids[1]));
        assert_eq!(ItemSet::from_items([b, a]), ItemSet::from_items([a, b, a]));
    }

    #[test]
    fn empty_rule_instance_is_complete() {
        let g = grammar();
        let empty = g.rules().find(|r| r.is_empty()).unwrap();
        let item = Instance::new(empty.id());
        assert!(item.is_complete(&g));
        assert_eq!(item.next_symbol(&g), None);
        assert_eq!(item.advance(&g), None);
        assert_eq!(item.display(&g).to_string(), "A -> .");
    }

    #[test]
    fn advance_stays_in_bounds() {
        let g = grammar();
        for rule in g.rules() {
            let mut item = Instance::new(rule.id());
            while let Some(next) = item.advance(&g) {
                assert!(usize::from(next.dot) <= rule.right().len());
                item = next;
            }
            assert!(item.is_complete(&g));
            assert_eq!(usize::from(item.dot), rule.right().len());
        }
    }

    #[test]
    fn goto_advances_matching_items() {
        let g = grammar();
        let initial = closure(&g, [Instance::new(RuleID::ACCEPT)]);
        let a = g.terminal("a").unwrap();

        let kernel = goto(&g, &initial, T(a));
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].display(&g).to_string(), "A -> a .");

        let s = match g.symbol("S") {
            Some(s) => s,
            None => panic!("missing S"),
        };
        let kernel = goto(&g, &initial, s);
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].display(&g).to_string(), "$start -> S .");

        assert!(goto(&g, &initial, T(crate::grammar::TerminalID::EOI)).is_empty());
    }

    #[test]
    fn display_marker_position() {
        let g = grammar();
        let rule = g.rules().nth(1).unwrap();
        let item = Instance::new(rule.id());
        assert_eq!(item.display(&g).to_string(), "S -> . A a");
        let item = item.advance(&g).unwrap();
        assert_eq!(item.display(&g).to_string(), "S -> A . a");
    }
}
