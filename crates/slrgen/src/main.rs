use anyhow::Context as _;
use clap::Parser;
use slrgen::{automaton::Automaton, first_follow::FirstFollow, grammar::Grammar};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the grammar, FIRST/FOLLOW sets and the automaton.
    #[arg(long)]
    dump: bool,

    /// The path of grammar definition file.
    ///
    /// Read from the standard input if not specified.
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let input = match args.input.clone() {
        Some(input) => input,
        None => {
            prompt("grammar file: ")?;
            let line = lines
                .next()
                .transpose()
                .context("failed to read the grammar file path")?
                .unwrap_or_default();
            PathBuf::from(line.trim())
        }
    };

    let s = Instant::now();
    let grammar = Grammar::from_file(&input)
        .with_context(|| anyhow::anyhow!("errored during loading {}", input.display()))?;
    tracing::info!("load grammar: {:?} elapsed", s.elapsed());

    let empty_nonterminals: Vec<_> = grammar
        .nonterminals()
        .filter(|(id, _)| grammar.rules_for(*id).next().is_none())
        .map(|(_, name)| name)
        .collect();
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    let s = Instant::now();
    let automaton = Automaton::build(&grammar)
        .with_context(|| anyhow::anyhow!("errored during building {}", input.display()))?;
    tracing::info!("build automaton: {:?} elapsed", s.elapsed());

    if args.dump {
        println!("{}", grammar);
        println!("{}", FirstFollow::new(&grammar).display());
        println!("{}", automaton);
    }

    loop {
        prompt("> ")?;
        let line = match lines.next() {
            Some(line) => line.context("failed to read the input")?,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match automaton.parse_str(line) {
            Ok(derivation) => print!("{}", derivation.display(&grammar)),
            Err(err) if err.is_rejection() => {
                tracing::debug!("rejected: {}", err);
                println!("`{}' is not a member of the language", line);
            }
            Err(err) => return Err(err).context("the parser is in an inconsistent state"),
        }
    }

    Ok(())
}

fn prompt(message: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(message.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
