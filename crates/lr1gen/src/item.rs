//! LR item cores.
//!
//! A core item is a production rule with a marker position, without any
//! lookahead. All of them are generated once per grammar together with the
//! links used by the closure and goto functions, so that the automaton
//! construction never has to rescan the grammar.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CoreItemID(u32);

impl CoreItemID {
    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CoreItemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C#{:03}", self.0)
    }
}

// X -> Y1 Y2 ... Yn という構文規則にマーカ位置を付与したもの
#[derive(Debug, Clone)]
pub struct CoreItem {
    id: CoreItemID,
    rule: RuleID,
    marker: u16,
    is_reduce: bool,
    /// The initial items of productions whose left-hand side is the symbol after the marker.
    equivalence: Vec<CoreItemID>,
    /// The symbol after the marker and the item reached by moving over it.
    advance: Option<(SymbolID, CoreItemID)>,
}

impl CoreItem {
    pub fn id(&self) -> CoreItemID {
        self.id
    }

    pub fn rule(&self) -> RuleID {
        self.rule
    }

    pub fn marker(&self) -> usize {
        self.marker.into()
    }

    /// Return whether the marker has reached the end of the production.
    pub fn is_reduce(&self) -> bool {
        self.is_reduce
    }

    /// The symbols before the marker.
    pub fn consumed<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        &g.rule(self.rule).right()[..self.marker()]
    }

    /// The symbols after the marker.
    pub fn remaining<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        &g.rule(self.rule).right()[self.marker()..]
    }

    /// Return the symbol just after the marker.
    pub fn next_symbol(&self) -> Option<SymbolID> {
        self.advance.map(|(symbol, _)| symbol)
    }

    pub fn equivalence(&self) -> &[CoreItemID] {
        &self.equivalence[..]
    }

    /// Return the item obtained by moving the marker over `symbol`,
    /// if `symbol` is the one expected next.
    pub fn advance(&self, symbol: SymbolID) -> Option<CoreItemID> {
        match self.advance {
            Some((expected, next)) if expected == symbol => Some(next),
            _ => None,
        }
    }

    // `"A -> a . B b"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ->", g.nonterminal(rule.left()))?;
            for symbol in self.consumed(g) {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            f.write_str(" .")?;
            for symbol in self.remaining(g) {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The arena of all core items in a grammar.
#[derive(Debug)]
pub struct CoreItems {
    items: Vec<CoreItem>,
    initials: Map<RuleID, CoreItemID>,
}

impl CoreItems {
    pub fn new(g: &Grammar) -> Self {
        let mut items = vec![];
        let mut initials = Map::default();
        let mut by_left: Map<NonterminalID, Vec<CoreItemID>> = Map::default();

        // A -> . a B, A -> a . B, A -> a B .
        for rule in g.rules() {
            let first = CoreItemID(items.len().try_into().expect("too many core items"));
            initials.insert(rule.id(), first);
            by_left.entry(rule.left()).or_default().push(first);

            let len = rule.right().len();
            for marker in 0..=len {
                let id = CoreItemID(items.len().try_into().expect("too many core items"));
                let advance = rule
                    .right()
                    .get(marker)
                    .map(|symbol| (*symbol, CoreItemID(id.0 + 1)));
                items.push(CoreItem {
                    id,
                    rule: rule.id(),
                    marker: marker.try_into().expect("too long production"),
                    is_reduce: marker == len,
                    equivalence: vec![],
                    advance,
                });
            }
        }

        for item in &mut items {
            if let Some((SymbolID::N(n), _)) = item.advance {
                item.equivalence = by_left.get(&n).cloned().unwrap_or_default();
            }
        }

        tracing::debug!("generated {} core items", items.len());

        Self { items, initials }
    }

    /// The item `S' -> . S`.
    pub fn start(&self) -> CoreItemID {
        self.initials[&RuleID::ACCEPT]
    }

    /// Return the item of the specified rule whose marker is at the beginning.
    pub fn initial(&self, rule: RuleID) -> CoreItemID {
        self.initials[&rule]
    }

    pub fn get(&self, id: CoreItemID) -> &CoreItem {
        &self.items[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreItem> + '_ {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for item in &self.items {
                write!(f, "{:?}: {}", item.id, item.display(g))?;
                if !item.equivalence.is_empty() {
                    write!(f, "  equivalence={:?}", item.equivalence)?;
                }
                if let Some((symbol, next)) = item.advance {
                    write!(f, "  {} => {:?}", g.symbol_name(symbol), next)?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}
