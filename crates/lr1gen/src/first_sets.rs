//! Calculation of first set function.

use crate::{
    grammar::{Grammar, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::display_fn,
};
use std::fmt;

/// The FIRST sets of every grammar symbol.
///
/// A set contains [`TerminalID::EPSILON`] iff the symbol is nullable.
#[derive(Debug)]
pub struct FirstSets {
    map: Map<SymbolID, TerminalSet>,
    rounds: usize,
}

impl FirstSets {
    /// Compute the FIRST sets by iterating to a fixed point.
    pub fn compute(grammar: &Grammar) -> Self {
        let span = tracing::debug_span!("first_sets");
        let _entered = span.enter();

        let mut map: Map<SymbolID, TerminalSet> = Map::default();

        // First(t) = {t}
        for terminal in grammar.terminals() {
            map.insert(
                SymbolID::T(terminal.id()),
                Some(terminal.id()).into_iter().collect(),
            );
        }

        // First(A) = {}
        for nonterminal in grammar.nonterminals() {
            map.insert(SymbolID::N(nonterminal.id()), TerminalSet::default());
        }

        // A -> Y1 Y2 ... Yk に対し First(Y1 Y2 ... Yk) を First(A) に追加する。
        // どの集合も増えなくなるまで繰り返す
        let mut rounds = 0;
        let mut changed = true;
        while changed {
            changed = false;
            rounds += 1;

            for rule in grammar.rules() {
                let added = first_of(&map, rule.right());
                let first = &mut map[&SymbolID::N(rule.left())];
                if !first.is_superset(&added) {
                    first.union_with(&added);
                    changed = true;
                }
            }
        }

        tracing::debug!("FIRST sets converged after {} round(s)", rounds);

        Self { map, rounds }
    }

    /// Return `First(symbol)`.
    pub fn get(&self, symbol: SymbolID) -> &TerminalSet {
        &self.map[&symbol]
    }

    /// Return whether the specified symbol can derive the empty string.
    pub fn nullable(&self, symbol: SymbolID) -> bool {
        self.map[&symbol].contains(TerminalID::EPSILON)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolID, &TerminalSet)> + '_ {
        self.map.iter().map(|(symbol, first)| (*symbol, first))
    }

    /// The number of passes over the production rules until nothing was added.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// `First(Y1 Y2 ... Yk)`
    ///
    /// The result contains `ε` iff the whole sequence is nullable.
    /// The sequence must not be empty.
    pub fn first_of_sequence(&self, symbols: &[SymbolID]) -> TerminalSet {
        debug_assert!(!symbols.is_empty(), "empty sequence");
        first_of(&self.map, symbols)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (symbol, first) in self.iter() {
                if matches!(symbol, SymbolID::T(..)) {
                    continue;
                }
                write!(f, "{} [", g.symbol_name(symbol))?;
                for t in first.iter() {
                    write!(f, " {}", g.terminal(t))?;
                }
                writeln!(f, " ]")?;
            }
            Ok(())
        })
    }
}

fn first_of(map: &Map<SymbolID, TerminalSet>, symbols: &[SymbolID]) -> TerminalSet {
    // The end marker is never decomposed.
    if let Some(SymbolID::T(TerminalID::EOI)) = symbols.first() {
        return Some(TerminalID::EOI).into_iter().collect();
    }

    let mut res = TerminalSet::default();
    let mut nullable = true;
    for symbol in symbols {
        let first = &map[symbol];
        res.union_with(first);
        if !first.contains(TerminalID::EPSILON) {
            nullable = false;
            break;
        }
    }

    if nullable {
        res.insert(TerminalID::EPSILON);
    } else {
        res.remove(TerminalID::EPSILON);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{NonterminalID, SymbolID::*};

    fn nullable_grammar() -> Grammar {
        // S -> A a | b
        // A -> ε
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            let x = g.nonterminal("A")?;
            g.rule(s, [N(x), T(a)])?;
            g.rule(s, [T(b)])?;
            g.rule(x, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap()
    }

    fn set(ts: &[TerminalID]) -> TerminalSet {
        ts.iter().copied().collect()
    }

    #[test]
    fn nullable_propagation() {
        let g = nullable_grammar();
        let first = FirstSets::compute(&g);
        eprintln!("{}", first.display(&g));

        let a = g.terminal_id("a").unwrap();
        let b = g.terminal_id("b").unwrap();
        let s = g.nonterminal_id("S").unwrap();
        let x = g.nonterminal_id("A").unwrap();

        assert_eq!(*first.get(N(x)), set(&[TerminalID::EPSILON]));
        assert_eq!(*first.get(N(s)), set(&[a, b]));
        assert_eq!(*first.get(N(NonterminalID::START)), set(&[a, b]));
        assert!(first.nullable(N(x)));
        assert!(!first.nullable(N(s)));
        assert_eq!(*first.get(T(a)), set(&[a]));
    }

    #[test]
    fn idempotence() {
        let g = nullable_grammar();
        let first1 = FirstSets::compute(&g);
        let first2 = FirstSets::compute(&g);
        assert_eq!(first1.rounds(), first2.rounds());
        assert!(first1.iter().eq(first2.iter()));
    }

    #[test]
    fn sequences() {
        let g = nullable_grammar();
        let first = FirstSets::compute(&g);

        let a = g.terminal_id("a").unwrap();
        let b = g.terminal_id("b").unwrap();
        let x = g.nonterminal_id("A").unwrap();
        let s = g.nonterminal_id("S").unwrap();

        assert_eq!(
            first.first_of_sequence(&[N(x)]),
            set(&[TerminalID::EPSILON])
        );
        assert_eq!(first.first_of_sequence(&[N(x), N(x)]), set(&[TerminalID::EPSILON]));
        assert_eq!(first.first_of_sequence(&[N(x), T(b), T(a)]), set(&[b]));
        assert_eq!(first.first_of_sequence(&[N(x), T(TerminalID::EOI)]), set(&[TerminalID::EOI]));
        assert_eq!(first.first_of_sequence(&[N(s), N(x)]), set(&[a, b]));
        assert_eq!(
            first.first_of_sequence(&[T(TerminalID::EOI), T(a)]),
            set(&[TerminalID::EOI])
        );
    }

    #[test]
    fn nested_nullable() {
        // E -> T X
        // X -> + T X | ε
        // T -> id | ( E )
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let id = g.terminal("id")?;
            let lparen = g.terminal("(")?;
            let rparen = g.terminal(")")?;
            let e = g.nonterminal("E")?;
            let x = g.nonterminal("X")?;
            let t = g.nonterminal("T")?;
            g.rule(e, [N(t), N(x)])?;
            g.rule(x, [T(plus), N(t), N(x)])?;
            g.rule(x, Vec::new())?;
            g.rule(t, [T(id)])?;
            g.rule(t, [T(lparen), N(e), T(rparen)])?;
            Ok(())
        })
        .unwrap();
        let first = FirstSets::compute(&g);

        let id = |name| g.terminal_id(name).unwrap();
        let n = |name| N(g.nonterminal_id(name).unwrap());

        assert_eq!(*first.get(n("E")), set(&[id("id"), id("(")]));
        assert_eq!(*first.get(n("X")), set(&[TerminalID::EPSILON, id("+")]));
        assert_eq!(
            first.first_of_sequence(&[n("X"), T(id(")"))]),
            set(&[id("+"), id(")")])
        );
    }
}
