//! The implementation of canonical LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, SymbolID, TerminalID},
    item::{CoreItemID, CoreItems},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

/// The order in which grammar symbols are visited when the transitions
/// of a state are extracted.
///
/// The resulting automaton is the same regardless of the order, except for
/// the numbering of its states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SymbolOrder {
    /// Terminals then nonterminals, in declaration order.
    #[default]
    Declaration,

    /// The reverse of `Declaration`.
    Reversed,
}

#[derive(Debug, Default)]
pub struct Config {
    symbol_order: SymbolOrder,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            symbol_order: SymbolOrder::Declaration,
        }
    }

    /// Visit grammar symbols in declaration order.
    pub fn use_declaration_order(&mut self) -> &mut Self {
        self.symbol_order = SymbolOrder::Declaration;
        self
    }

    /// Visit grammar symbols in reverse declaration order.
    pub fn use_reversed_order(&mut self) -> &mut Self {
        self.symbol_order = SymbolOrder::Reversed;
        self
    }

    pub fn generate(&self, grammar: &Grammar) -> CanonicalCollection {
        AutomatonBuilder::with_config(grammar, self).build()
    }
}

/// LR(1) item, the pair of a core item and a lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub core: CoreItemID,
    pub lookahead: TerminalID,
}

/// A set of LR(1) items.
///
/// Being ordered, the set itself serves as the canonical fingerprint of a state.
pub type ItemSet = BTreeSet<LRItem>;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u32);

impl StateID {
    pub const START: Self = Self(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
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

#[derive(Debug)]
pub struct State {
    id: StateID,
    items: ItemSet,
    transitions: Map<SymbolID, StateID>,
}

impl State {
    pub fn id(&self) -> StateID {
        self.id
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, to)| (*symbol, *to))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }
}

/// The canonical collection of LR(1) states.
#[derive(Debug)]
pub struct CanonicalCollection {
    states: Map<StateID, State>,
    core_items: CoreItems,
}

impl CanonicalCollection {
    pub fn generate(grammar: &Grammar) -> Self {
        Config::new().generate(grammar)
    }

    /// The closure of `{[S' -> . S, $]}`.
    pub fn start(&self) -> &State {
        &self.states[&StateID::START]
    }

    pub fn state(&self, id: StateID) -> Option<&State> {
        self.states.get(&id)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn core_items(&self) -> &CoreItems {
        &self.core_items
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, state) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", state.id)?;
                writeln!(f, "## items")?;
                let mut items = state.items.iter().peekable();
                while let Some(item) = items.next() {
                    let core = self.core_items.get(item.core);
                    write!(f, "- {}  [{}", core.display(g), g.terminal(item.lookahead))?;
                    while let Some(next) = items.next_if(|next| next.core == item.core) {
                        write!(f, " {}", g.terminal(next.lookahead))?;
                    }
                    f.write_str("]\n")?;
                }

                if !state.transitions.is_empty() {
                    writeln!(f, "## transitions")?;
                    for (symbol, to) in state.transitions() {
                        writeln!(f, "- {} => {:02}", g.symbol_name(symbol), to)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Builds the canonical collection of a grammar with closure/goto.
#[derive(Debug)]
pub struct AutomatonBuilder<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
    core_items: CoreItems,
    symbol_order: SymbolOrder,
    states: Map<StateID, State>,
    index: Map<ItemSet, StateID>,
    pending: VecDeque<StateID>,
}

impl<'g> AutomatonBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_config(grammar, &Config::new())
    }

    pub fn with_config(grammar: &'g Grammar, config: &Config) -> Self {
        Self {
            grammar,
            first_sets: FirstSets::compute(grammar),
            core_items: CoreItems::new(grammar),
            symbol_order: config.symbol_order,
            states: Map::default(),
            index: Map::default(),
            pending: VecDeque::new(),
        }
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first_sets
    }

    pub fn core_items(&self) -> &CoreItems {
        &self.core_items
    }

    /// クロージャ展開
    ///
    /// For each `[A -> α . B β, a]` in the set, add `[B -> . γ, b]` for every
    /// production `B -> γ` and every `b` in `First(β a)`, until nothing is added.
    pub fn closure(&self, items: &mut ItemSet) {
        let mut pending: Vec<LRItem> = items.iter().copied().collect();
        let mut sequence = vec![];
        while let Some(item) = pending.pop() {
            let core = self.core_items.get(item.core);
            if core.equivalence().is_empty() {
                continue;
            }

            // [A -> α . B β, a] => First(β a)
            sequence.clear();
            sequence.extend_from_slice(&core.remaining(self.grammar)[1..]);
            sequence.push(SymbolID::T(item.lookahead));
            let lookaheads = self.first_sets.first_of_sequence(&sequence);
            debug_assert!(!lookaheads.contains(TerminalID::EPSILON));

            for &equivalent in core.equivalence() {
                for lookahead in lookaheads.iter() {
                    let added = LRItem {
                        core: equivalent,
                        lookahead,
                    };
                    if items.insert(added) {
                        pending.push(added);
                    }
                }
            }
        }
    }

    /// Move the marker of every item expecting `symbol` next.
    ///
    /// The result is not closed, and is empty if no item expects `symbol`.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        items
            .iter()
            .filter_map(|item| {
                let core = self.core_items.get(item.core).advance(symbol)?;
                Some(LRItem {
                    core,
                    lookahead: item.lookahead,
                })
            })
            .collect()
    }

    pub fn build(mut self) -> CanonicalCollection {
        let span = tracing::debug_span!("build_collection");
        let _entered = span.enter();

        let mut start = ItemSet::new();
        start.insert(LRItem {
            core: self.core_items.start(),
            lookahead: TerminalID::EOI,
        });
        self.closure(&mut start);
        self.register(start);

        let mut symbols: Vec<SymbolID> = self.grammar.symbols().collect();
        if self.symbol_order == SymbolOrder::Reversed {
            symbols.reverse();
        }

        // 新規に状態が生成されなくなるまで繰り返す
        while let Some(current) = self.pending.pop_front() {
            let mut transitions = Map::default();
            for &symbol in &symbols {
                let mut next = self.goto(&self.states[&current].items, symbol);
                if next.is_empty() {
                    continue;
                }
                self.closure(&mut next);

                let to = match self.index.get(&next) {
                    Some(&id) => id,
                    None => self.register(next),
                };
                transitions.insert(symbol, to);
            }
            self.states[&current].transitions = transitions;
        }

        tracing::debug!("canonical collection has {} states", self.states.len());

        CanonicalCollection {
            states: self.states,
            core_items: self.core_items,
        }
    }

    fn register(&mut self, items: ItemSet) -> StateID {
        let raw = u32::try_from(self.states.len()).expect("too many states");
        let id = StateID(raw);
        tracing::trace!("register state {:?} with {} items", id, items.len());

        self.index.insert(items.clone(), id);
        self.states.insert(
            id,
            State {
                id,
                items,
                transitions: Map::default(),
            },
        );
        self.pending.push_back(id);
        id
    }
}
