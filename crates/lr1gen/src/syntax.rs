//! Syntax support for grammar definition files.
//!
//! A grammar is given as three parts:
//!
//! ```text
//! + * ( ) id
//! E T F
//! E -> E + T | T
//! T -> T * F | F
//! F -> ( E ) | id
//! ```
//!
//! the list of terminal symbols, the list of nonterminal symbols and the
//! production rules, one left-hand side per line. `EPS` denotes the empty
//! sequence. Blank lines and lines starting with `#` are ignored.

use crate::grammar::GrammarDefError;

#[derive(Debug, Default)]
pub struct GrammarFile {
    pub terminals: Vec<String>,
    pub nonterminals: Vec<String>,
    pub rules: Vec<RuleDesc>,
}

/// `LHS -> RHS1 | RHS2 | ...`
#[derive(Debug)]
pub struct RuleDesc {
    pub line: usize,
    pub left: String,
    pub productions: Vec<Vec<String>>,
}

/// Parse the three parts concatenated into a single source.
///
/// The first line is the list of terminals, the second the list of
/// nonterminals, and the remaining lines are the production rules.
pub fn parse(source: &str) -> Result<GrammarFile, GrammarDefError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut lines = significant_lines(source);
    let (_, terminals) = lines.next().ok_or_else(|| GrammarDefError::Syntax {
        line: 1,
        message: "missing the list of terminal symbols".into(),
    })?;
    let (nonterminals_line, nonterminals) =
        lines.next().ok_or_else(|| GrammarDefError::Syntax {
            line: source.lines().count().max(1),
            message: "missing the list of nonterminal symbols".into(),
        })?;
    if nonterminals.contains("->") {
        return Err(GrammarDefError::Syntax {
            line: nonterminals_line,
            message: "expected the list of nonterminal symbols, found a production rule".into(),
        });
    }

    let mut rules = vec![];
    for (line, rule) in lines {
        rules.push(parse_rule(line, rule)?);
    }

    Ok(GrammarFile {
        terminals: split_symbols(terminals),
        nonterminals: split_symbols(nonterminals),
        rules,
    })
}

/// Parse the three parts given separately, as read from their own files.
pub fn parse_parts(
    terminals: &str,
    nonterminals: &str,
    rules: &str,
) -> Result<GrammarFile, GrammarDefError> {
    let mut parsed = GrammarFile {
        terminals: significant_lines(terminals)
            .flat_map(|(_, line)| split_symbols(line))
            .collect(),
        nonterminals: significant_lines(nonterminals)
            .flat_map(|(_, line)| split_symbols(line))
            .collect(),
        rules: vec![],
    };
    for (line, rule) in significant_lines(rules) {
        parsed.rules.push(parse_rule(line, rule)?);
    }
    Ok(parsed)
}

fn significant_lines(source: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn split_symbols(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

fn parse_rule(line: usize, source: &str) -> Result<RuleDesc, GrammarDefError> {
    let syntax_error = |message: &str| GrammarDefError::Syntax {
        line,
        message: message.into(),
    };

    let (left, right) = source
        .split_once("->")
        .ok_or_else(|| syntax_error("missing `->' in the production rule"))?;

    let mut left_symbols = left.split_whitespace();
    let left = match (left_symbols.next(), left_symbols.next()) {
        (Some(left), None) => left.to_owned(),
        (None, _) => return Err(syntax_error("missing the left-hand side")),
        (Some(..), Some(..)) => {
            return Err(syntax_error("the left-hand side must be a single symbol"))
        }
    };

    let mut productions = vec![];
    for alternative in right.split('|') {
        let symbols = split_symbols(alternative);
        if symbols.is_empty() {
            return Err(syntax_error(
                "empty alternative (use `EPS' for the empty production)",
            ));
        }
        productions.push(symbols);
    }

    Ok(RuleDesc {
        line,
        left,
        productions,
    })
}
