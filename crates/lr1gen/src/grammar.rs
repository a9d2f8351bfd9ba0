//! Grammar types.

use crate::{syntax as s, types::Map, util::display_fn};
use std::{borrow::Cow, fmt, fs, io, marker::PhantomData, path::Path};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input (`$`).
    pub const EOI: Self = Self::from_raw(0);

    /// Reserved symbol that stands for the empty string (`ε`).
    ///
    /// It never appears in a parsed string nor in a stored production;
    /// it is only used as a marker inside FIRST sets.
    pub const EPSILON: Self = Self::from_raw(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOI => write!(f, "T#End"),
            Self::EPSILON => write!(f, "T#Eps"),
            _ => write!(f, "T#{:03}", self.raw),
        }
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// The synthesized start symbol `S'` of the augmented grammar.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.raw),
        }
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Cow<'static, str>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl SymbolID {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::T(..))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented rule `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    ///
    /// An empty slice means the production derives `ε`.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminals[&self.left()])?;
            if self.right.is_empty() {
                write!(f, " {}", g.terminals[&TerminalID::EPSILON])?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{:>3}: {}", rule.id(), rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Load a grammar from a file containing the terminals, the nonterminals
    /// and the production rules, in this order.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    /// Load a grammar whose terminals, nonterminals and production rules
    /// are stored in separate files.
    pub fn from_files(
        terminals: impl AsRef<Path>,
        nonterminals: impl AsRef<Path>,
        rules: impl AsRef<Path>,
    ) -> Result<Grammar, GrammarDefError> {
        let terminals = fs::read_to_string(terminals).map_err(GrammarDefError::IO)?;
        let nonterminals = fs::read_to_string(nonterminals).map_err(GrammarDefError::IO)?;
        let rules = fs::read_to_string(rules).map_err(GrammarDefError::IO)?;
        let grammar = s::parse_parts(&terminals, &nonterminals, &rules)?;
        Grammar::define(|g| define_grammar_from_syntax(g, grammar))
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let grammar = s::parse(source)?;
        Grammar::define(|g| define_grammar_from_syntax(g, grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            names: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        for (id, name) in [(TerminalID::EOI, "$"), (TerminalID::EPSILON, "ε")] {
            def.terminals.insert(
                id,
                Terminal {
                    id,
                    name: Cow::Borrowed(name),
                },
            );
        }
        def.names.insert("$".into(), SymbolID::T(TerminalID::EOI));
        def.names.insert("ε".into(), SymbolID::T(TerminalID::EPSILON));
        def.names.insert("EPS".into(), SymbolID::T(TerminalID::EPSILON));

        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: Cow::Borrowed("$start"),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    /// Iterate over the production rules, in ascending order of their IDs.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    /// Return the start symbol of the original (non-augmented) grammar.
    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// Iterate over all grammar symbols: every terminal except `ε`
    /// followed by every nonterminal, both in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self
            .terminals
            .keys()
            .filter(|id| **id != TerminalID::EPSILON)
            .map(|id| SymbolID::T(*id));
        let nonterminals = self.nonterminals.keys().map(|id| SymbolID::N(*id));
        terminals.chain(nonterminals)
    }

    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// Return whether the grammar contains a production `n -> ε`.
    pub fn has_epsilon_production(&self, n: NonterminalID) -> bool {
        self.rules
            .values()
            .any(|rule| rule.left() == n && rule.right().is_empty())
    }
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef<'_>,
    grammar: s::GrammarFile,
) -> Result<(), GrammarDefError> {
    for name in &grammar.terminals {
        g.terminal(name)?;
    }
    for name in &grammar.nonterminals {
        g.nonterminal(name)?;
    }

    for s::RuleDesc {
        line,
        left,
        productions,
    } in &grammar.rules
    {
        let left = match g.lookup(left)? {
            SymbolID::N(n) => n,
            SymbolID::T(..) => {
                return Err(GrammarDefError::Syntax {
                    line: *line,
                    message: format!("the left-hand side `{}' is not a nonterminal", left),
                })
            }
        };

        for production in productions {
            let right = production
                .iter()
                .map(|symbol| g.lookup(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            g.rule(left, right)?;
        }
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    names: Map<String, SymbolID>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: Cow::Owned(name.to_owned()),
            },
        );
        self.names.insert(name.to_owned(), SymbolID::T(id));

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: Cow::Owned(name.to_owned()),
            },
        );
        self.names.insert(name.to_owned(), SymbolID::N(id));

        Ok(id)
    }

    /// Resolve a declared symbol by its name.
    ///
    /// `$` resolves to the end-of-input marker, `EPS` and `ε` to the empty string.
    pub fn lookup(&self, name: &str) -> Result<SymbolID, GrammarDefError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarDefError::UndeclaredSymbol {
                name: name.to_owned(),
            })
    }

    /// Specify a production rule into this grammer.
    ///
    /// Occurrences of `ε` in `right` are dropped, so `A -> ε` is stored
    /// as a production with an empty right-hand side.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        self.verify_nonterminal(left)?;

        let mut right_ = vec![];
        for symbol in right {
            match symbol {
                SymbolID::T(TerminalID::EPSILON) => continue,
                SymbolID::T(TerminalID::EOI) => {
                    return Err(GrammarDefError::ReservedSymbol { name: "$".into() })
                }
                SymbolID::T(t) if !self.terminals.contains_key(&t) => {
                    return Err(GrammarDefError::UndeclaredSymbol {
                        name: format!("{:?}", t),
                    })
                }
                SymbolID::T(..) => {}
                SymbolID::N(n) => self.verify_nonterminal(n)?,
            }
            right_.push(symbol);
        }

        for rule in self.rules.values() {
            if rule.left == left && rule.right == right_ {
                let mut display = self.nonterminals[&left].name().to_owned();
                display.push_str(" ->");
                for symbol in &right_ {
                    display.push(' ');
                    display.push_str(self.symbol_name(*symbol));
                }
                return Err(GrammarDefError::DuplicateRule { rule: display });
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right: right_,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        self.verify_nonterminal(symbol)?;
        self.start.replace(symbol);
        Ok(())
    }

    fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_name(name) {
            return Err(GrammarDefError::InvalidName { name: name.into() });
        }
        match self.names.get(name) {
            Some(SymbolID::T(TerminalID::EOI | TerminalID::EPSILON)) => {
                Err(GrammarDefError::ReservedSymbol { name: name.into() })
            }
            Some(..) => Err(GrammarDefError::DuplicateSymbol { name: name.into() }),
            None => Ok(()),
        }
    }

    fn verify_nonterminal(&self, id: NonterminalID) -> Result<(), GrammarDefError> {
        if id == NonterminalID::START {
            return Err(GrammarDefError::ReservedSymbol {
                name: self.nonterminals[&id].name().to_owned(),
            });
        }
        if !self.nonterminals.contains_key(&id) {
            return Err(GrammarDefError::UndeclaredSymbol {
                name: format!("{:?}", id),
            });
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // 指定されていない場合は最初に登録された構文規則の左辺を用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .rules
                .values()
                .next()
                .map(|rule| rule.left())
                .ok_or(GrammarDefError::EmptyGrammar)?,
        };

        let missing: Vec<String> = self
            .nonterminals
            .values()
            .filter(|n| n.id() != NonterminalID::START)
            .filter(|n| self.rules.values().all(|rule| rule.left() != n.id()))
            .map(|n| n.name().to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(GrammarDefError::MissingProduction { names: missing });
        }

        let mut start_name = format!("{}'", self.nonterminals[&start].name());
        while self.names.contains_key(&start_name) {
            start_name.push('\'');
        }
        self.nonterminals[&NonterminalID::START].name = Cow::Owned(start_name);

        self.rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        self.rules.sort_keys();

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("undeclared symbol: `{name}'")]
    UndeclaredSymbol { name: String },

    #[error(
        "the following nonterminals have no associated production rule: {}",
        .names.join(", ")
    )]
    MissingProduction { names: Vec<String> },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("the symbol `{name}' is reserved")]
    ReservedSymbol { name: String },

    #[error("incorrect symbol name: `{name}'")]
    InvalidName { name: String },

    #[error("duplicate production rule detected: `{rule}'")]
    DuplicateRule { rule: String },

    #[error("the grammar has no production rules")]
    EmptyGrammar,
}

fn verify_name(s: &str) -> bool {
    // The name must be a single token of the grammar file.
    !s.is_empty() && s != "->" && s != "|" && !s.chars().any(char::is_whitespace)
}
