use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lr1gen::{
    first_sets::FirstSets, grammar::Grammar, item::CoreItems, lr1::Config, table::ParseTable,
};
use std::{path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file, or the paths of the terminals,
    /// nonterminals and production rules files.
    #[arg(required = true, num_args = 1..=3)]
    inputs: Vec<PathBuf>,

    /// What to print to stdout.
    #[arg(long, value_enum, default_value_t = Dump::Table)]
    dump: Dump,

    /// Visit grammar symbols in reverse declaration order during the
    /// automaton construction.
    #[arg(long)]
    reverse_symbol_order: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Dump {
    Grammar,
    First,
    Items,
    States,
    Table,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = match &args.inputs[..] {
        [input] => Grammar::from_file(input)
            .with_context(|| format!("failed to load the grammar from {}", input.display()))?,
        [terminals, nonterminals, rules] => Grammar::from_files(terminals, nonterminals, rules)
            .context("failed to load the grammar from the separate files")?,
        _ => anyhow::bail!("expected one grammar file or three files (terminals, nonterminals, rules)"),
    };

    match args.dump {
        Dump::Grammar => {
            print!("{}", grammar);
            return Ok(());
        }
        Dump::First => {
            let started = Instant::now();
            let first_sets = FirstSets::compute(&grammar);
            tracing::info!(elapsed = ?started.elapsed(), "computed FIRST sets");
            print!("{}", first_sets.display(&grammar));
            return Ok(());
        }
        Dump::Items => {
            print!("{}", CoreItems::new(&grammar).display(&grammar));
            return Ok(());
        }
        Dump::States | Dump::Table => {}
    }

    let mut config = Config::new();
    if args.reverse_symbol_order {
        config.use_reversed_order();
    }

    let started = Instant::now();
    let collection = config.generate(&grammar);
    tracing::info!(
        elapsed = ?started.elapsed(),
        states = collection.len(),
        "generated the canonical collection"
    );
    if args.dump == Dump::States {
        print!("{}", collection.display(&grammar));
        return Ok(());
    }

    let started = Instant::now();
    let (table, conflicts) = ParseTable::generate_with_conflicts(&collection);
    tracing::info!(elapsed = ?started.elapsed(), "generated the parse table");
    print!("{}", table.display(&grammar));

    if !conflicts.is_empty() {
        for conflict in &conflicts {
            eprintln!("[warning] {}", conflict.display(&grammar));
        }
        let suffix = if conflicts.len() == 1 { "" } else { "s" };
        anyhow::bail!(
            "the grammar is not LR(1): {} conflict{} detected",
            conflicts.len(),
            suffix
        );
    }

    Ok(())
}
