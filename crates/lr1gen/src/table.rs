//! Calculation of LR(1) parse table with conflict detection.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lr1::{CanonicalCollection, StateID},
    types::Map,
    util::{display_fn, write_columns},
};
use std::fmt;

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,

    /// Reject the lookahead symbol.
    Error,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(n) => write!(f, "shift({:02})", n),
            Self::Reduce(r) => write!(f, "reduce({})", r),
            Self::Accept => f.write_str("accept"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    /// One of the competing actions is `Accept`.
    Accept,
}

/// Two different actions claiming the same cell of the ACTION table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConflict {
    pub state: StateID,
    pub symbol: TerminalID,
    /// The action written to the cell first.
    pub first: Action,
    /// The action rejected because the cell was already occupied.
    pub second: Action,
}

impl TableConflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.first, self.second) {
            (Action::Accept, _) | (_, Action::Accept) => ConflictKind::Accept,
            (Action::Reduce(..), Action::Reduce(..)) => ConflictKind::ReduceReduce,
            _ => ConflictKind::ShiftReduce,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let kind = match self.kind() {
                ConflictKind::ShiftReduce => "shift/reduce",
                ConflictKind::ReduceReduce => "reduce/reduce",
                ConflictKind::Accept => "accept",
            };
            write!(
                f,
                "{} conflict in state {:02} on `{}':",
                kind,
                self.state,
                g.terminal(self.symbol)
            )?;
            for action in [self.first, self.second] {
                match action {
                    Action::Reduce(r) => write!(f, " reduce({})", g.rule(r).display(g))?,
                    action => write!(f, " {}", action)?,
                }
            }
            Ok(())
        })
    }
}

impl fmt::Display for TableConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {:02}, symbol {:?}: {} vs {}",
            self.state, self.symbol, self.first, self.second
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("detected {} conflict(s) in the parse table", .conflicts.len())]
    Conflicts { conflicts: Vec<TableConflict> },
}

impl TableError {
    pub fn conflicts(&self) -> &[TableConflict] {
        match self {
            Self::Conflicts { conflicts } => conflicts,
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseTableRow {
    actions: Map<TerminalID, Action>,
    gotos: Map<NonterminalID, StateID>,
}

impl ParseTableRow {
    pub fn actions(&self) -> impl Iterator<Item = (TerminalID, Action)> + '_ {
        self.actions.iter().map(|(t, action)| (*t, *action))
    }

    pub fn gotos(&self) -> impl Iterator<Item = (NonterminalID, StateID)> + '_ {
        self.gotos.iter().map(|(n, to)| (*n, *to))
    }
}

/// The ACTION/GOTO tables.
#[derive(Debug)]
pub struct ParseTable {
    states: Map<StateID, ParseTableRow>,
}

impl ParseTable {
    /// Derive the parse table from the canonical collection.
    ///
    /// Fails if any cell is claimed by two different actions, after all
    /// of the conflicts in the table have been collected.
    pub fn generate(collection: &CanonicalCollection) -> Result<Self, TableError> {
        let (table, conflicts) = Self::generate_with_conflicts(collection);
        if !conflicts.is_empty() {
            return Err(TableError::Conflicts { conflicts });
        }
        Ok(table)
    }

    /// Derive the parse table, keeping the first action written to each
    /// conflicting cell and reporting the rest.
    pub fn generate_with_conflicts(collection: &CanonicalCollection) -> (Self, Vec<TableConflict>) {
        let span = tracing::debug_span!("generate_table");
        let _entered = span.enter();

        let mut states = Map::default();
        let mut conflicts = vec![];
        for state in collection.states() {
            let mut row = ParseTableRow::default();

            // reduce, accept
            for item in state.items() {
                let core = collection.core_items().get(item.core);
                if !core.is_reduce() {
                    continue;
                }
                let action = match core.rule() {
                    RuleID::ACCEPT => Action::Accept,
                    rule => Action::Reduce(rule),
                };
                row.set_action(state.id(), item.lookahead, action, &mut conflicts);
            }

            // shift, goto
            for (symbol, to) in state.transitions() {
                match symbol {
                    SymbolID::T(t) => {
                        row.set_action(state.id(), t, Action::Shift(to), &mut conflicts);
                    }
                    SymbolID::N(n) => {
                        let prev = row.gotos.insert(n, to);
                        debug_assert!(prev.is_none(), "two transitions on the same symbol");
                    }
                }
            }

            states.insert(state.id(), row);
        }

        if !conflicts.is_empty() {
            tracing::debug!("detected {} conflict(s)", conflicts.len());
        }

        (Self { states }, conflicts)
    }

    /// Return `ACTION[state][symbol]`.
    ///
    /// Unknown states and symbols yield `Action::Error`.
    pub fn action(&self, state: StateID, symbol: TerminalID) -> Action {
        self.states
            .get(&state)
            .and_then(|row| row.actions.get(&symbol))
            .copied()
            .unwrap_or(Action::Error)
    }

    /// Return `GOTO[state][symbol]`, or `None` for the error entry.
    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states
            .get(&state)
            .and_then(|row| row.gotos.get(&symbol))
            .copied()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = (StateID, &ParseTableRow)> + '_ {
        self.states.iter().map(|(id, row)| (*id, row))
    }

    /// Render the tables with one row per state, the columns being the
    /// terminals, `$` and the nonterminals.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let terminals: Vec<TerminalID> = g
                .terminals()
                .map(|t| t.id())
                .filter(|t| *t != TerminalID::EOI && *t != TerminalID::EPSILON)
                .chain(Some(TerminalID::EOI))
                .collect();
            let nonterminals: Vec<NonterminalID> = g
                .nonterminals()
                .map(|n| n.id())
                .filter(|n| *n != NonterminalID::START)
                .collect();

            let mut rows = vec![];
            let mut header = vec!["state".to_owned()];
            header.extend(terminals.iter().map(|t| g.terminal(*t).to_string()));
            header.extend(nonterminals.iter().map(|n| g.nonterminal(*n).to_string()));
            rows.push(header);

            for (id, _) in self.rows() {
                let mut row = vec![id.to_string()];
                for t in &terminals {
                    row.push(match self.action(id, *t) {
                        Action::Shift(n) => format!("s{}", n),
                        Action::Reduce(r) => format!("r{}", r),
                        Action::Accept => "acc".to_owned(),
                        Action::Error => String::new(),
                    });
                }
                for n in &nonterminals {
                    row.push(self.goto(id, *n).map_or_else(String::new, |to| to.to_string()));
                }
                rows.push(row);
            }

            write_columns(f, &rows)
        })
    }
}

impl ParseTableRow {
    fn set_action(
        &mut self,
        state: StateID,
        symbol: TerminalID,
        action: Action,
        conflicts: &mut Vec<TableConflict>,
    ) {
        match self.actions.get(&symbol) {
            Some(&first) if first != action => {
                tracing::trace!(
                    "conflict in state {:?} on {:?}: {} / {}",
                    state,
                    symbol,
                    first,
                    action
                );
                conflicts.push(TableConflict {
                    state,
                    symbol,
                    first,
                    second: action,
                });
            }
            Some(..) => {}
            None => {
                self.actions.insert(symbol, action);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn rule_id(g: &Grammar, left: &str, right: &[&str]) -> RuleID {
        let left = g.nonterminal_id(left).unwrap();
        g.rules()
            .find(|rule| {
                rule.left() == left
                    && rule
                        .right()
                        .iter()
                        .map(|s| g.symbol_name(*s))
                        .eq(right.iter().copied())
            })
            .unwrap()
            .id()
    }

    #[test]
    fn minimal() {
        // S -> a
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let collection = CanonicalCollection::generate(&g);
        let table = ParseTable::generate(&collection).unwrap();
        eprintln!("{}", table.display(&g));

        let a = g.terminal_id("a").unwrap();
        let s = g.nonterminal_id("S").unwrap();
        let s0 = StateID::START;
        let s1 = StateID::from_raw(1);
        let s2 = StateID::from_raw(2);

        assert_eq!(table.state_count(), 3);
        assert_eq!(table.action(s0, a), Action::Shift(s1));
        assert_eq!(table.action(s1, TerminalID::EOI), Action::Reduce(rule_id(&g, "S", &["a"])));
        assert_eq!(table.action(s2, TerminalID::EOI), Action::Accept);
        assert_eq!(table.goto(s0, s), Some(s2));

        // error entries
        assert_eq!(table.action(s0, TerminalID::EOI), Action::Error);
        assert_eq!(table.action(s1, a), Action::Error);
        assert_eq!(table.goto(s1, s), None);

        // out of the domain
        assert_eq!(table.action(StateID::from_raw(42), a), Action::Error);
        assert_eq!(table.action(s0, TerminalID::EPSILON), Action::Error);
        assert_eq!(table.action(s0, TerminalID::from_raw(99)), Action::Error);
        assert_eq!(table.goto(StateID::from_raw(42), s), None);
    }

    #[test]
    fn table_display() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let collection = CanonicalCollection::generate(&g);
        let table = ParseTable::generate(&collection).unwrap();

        let rendered = table.display(&g).to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            lines,
            [
                "state | a  | $   | S",
                "0     | s1 |     | 2",
                "1     |    | r1",
                "2     |    | acc",
            ]
        );
    }

    #[test]
    fn shift_reduce_conflict() {
        // S -> i S | i S e | a
        let g = Grammar::define(|g| {
            let i = g.terminal("i")?;
            let e = g.terminal("e")?;
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(i), N(s)])?;
            g.rule(s, [T(i), N(s), T(e)])?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let collection = CanonicalCollection::generate(&g);
        let err = ParseTable::generate(&collection).unwrap_err();

        let e = g.terminal_id("e").unwrap();
        let if_then = rule_id(&g, "S", &["i", "S"]);

        let conflicts = err.conflicts();
        assert!(!conflicts.is_empty());
        for conflict in conflicts {
            eprintln!("{}", conflict.display(&g));
            assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
            assert_eq!(conflict.symbol, e);
            assert_eq!(conflict.first, Action::Reduce(if_then));
            assert!(matches!(conflict.second, Action::Shift(..)));
            assert!(collection.state(conflict.state).is_some());
        }

        // The first action stays in the cell.
        let (table, conflicts2) = ParseTable::generate_with_conflicts(&collection);
        assert_eq!(conflicts, &conflicts2[..]);
        for conflict in conflicts {
            assert_eq!(table.action(conflict.state, e), Action::Reduce(if_then));
        }
    }

    #[test]
    fn reduce_reduce_conflict() {
        // S -> A | B
        // A -> x
        // B -> x
        let g = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(s, [N(a)])?;
            g.rule(s, [N(b)])?;
            g.rule(a, [T(x)])?;
            g.rule(b, [T(x)])?;
            Ok(())
        })
        .unwrap();
        let collection = CanonicalCollection::generate(&g);
        let err = ParseTable::generate(&collection).unwrap_err();
        eprintln!("{}", err);

        let conflicts = err.conflicts();
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.kind(), ConflictKind::ReduceReduce);
        assert_eq!(conflict.symbol, TerminalID::EOI);
        assert_eq!(conflict.first, Action::Reduce(rule_id(&g, "A", &["x"])));
        assert_eq!(conflict.second, Action::Reduce(rule_id(&g, "B", &["x"])));
        assert_eq!(
            conflict.display(&g).to_string(),
            format!(
                "reduce/reduce conflict in state {:02} on `$': reduce(A -> x) reduce(B -> x)",
                conflict.state
            )
        );
    }

    #[test]
    fn nullable_grammar_has_no_conflicts() {
        // S -> A a | b
        // A -> ε
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            let x = g.nonterminal("A")?;
            g.rule(s, [N(x), T(a)])?;
            g.rule(s, [T(b)])?;
            g.rule(x, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap();
        let collection = CanonicalCollection::generate(&g);
        let table = ParseTable::generate(&collection).unwrap();

        let a = g.terminal_id("a").unwrap();
        let b = g.terminal_id("b").unwrap();
        let x = g.nonterminal_id("A").unwrap();

        // The empty production is reduced on the lookahead `a` only.
        let eps = rule_id(&g, "A", &[]);
        assert_eq!(table.action(StateID::START, a), Action::Reduce(eps));
        assert!(matches!(table.action(StateID::START, b), Action::Shift(..)));
        assert!(table.goto(StateID::START, x).is_some());
    }
}
