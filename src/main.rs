mod debug_report;

use hdparse::{Error, Parser, Settings, Sexp, SexpReader, train_events};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

fn main() {
    let command = match parse_args() {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match command {
        Command::Train(config) => run_train(&config),
        Command::Parse(config) => run_parse(&config),
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

enum Command {
    Train(TrainConfig),
    Parse(ParseConfig),
}

struct TrainConfig {
    treebank: PathBuf,
    output: Option<PathBuf>,
    settings: Option<PathBuf>,
}

struct ParseConfig {
    events: PathBuf,
    settings: Option<PathBuf>,
    /// `None` reads stdin.
    input: Option<PathBuf>,
    color: bool,
    verbose: bool,
}

fn load_settings(path: &Option<PathBuf>) -> Result<Settings, Error> {
    match path {
        Some(path) => Settings::load(path),
        None => Ok(Settings::new()),
    }
}

fn run_train(config: &TrainConfig) -> Result<(), Error> {
    let settings = load_settings(&config.settings)?;
    let text = std::fs::read_to_string(&config.treebank)?;
    let events = train_events(&text, &settings)?;
    match &config.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            events.write(&mut writer)?;
            writer.flush()?;
            log::info!("wrote {} events to {}", events.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            events.write(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn run_parse(config: &ParseConfig) -> Result<(), Error> {
    let settings = load_settings(&config.settings)?;
    let started = Instant::now();
    let mut parser = Parser::from_events(BufReader::new(File::open(&config.events)?), &settings)?;
    log::info!("models ready in {:?}", started.elapsed());

    let text = match &config.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut totals = debug_report::Totals::default();
    for (idx, sentence) in SexpReader::new(&text).enumerate() {
        let sentence: Sexp = sentence?;
        let number = idx + 1;
        match parser.parse_sentence(&sentence) {
            Ok(outcome) => {
                totals.record(&outcome);
                if config.verbose {
                    debug_report::print_sentence(number, &sentence, &outcome, config.color);
                } else {
                    match &outcome.tree {
                        Some(tree) => writeln!(out, "{tree}")?,
                        None => {
                            log::warn!("sentence {number}: no parse");
                            writeln!(out, "{sentence}")?;
                        }
                    }
                }
            }
            Err(err @ (Error::SentenceTooLong { .. } | Error::PoolExhausted { .. } | Error::MalformedEntry { .. })) => {
                log::warn!("sentence {number}: {err}");
                totals.skipped += 1;
                if !config.verbose {
                    writeln!(out, "{sentence}")?;
                }
            }
            Err(err) => return Err(err),
        }
    }
    if config.verbose {
        debug_report::print_totals(&totals, config.color);
    }
    log::info!(
        "{} sentences: {} parsed, {} relaxed, {} failed, {} skipped in {:?}",
        totals.sentences(),
        totals.parsed,
        totals.relaxed,
        totals.failed,
        totals.skipped,
        started.elapsed()
    );
    Ok(())
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(command) => command,
        None => return Err(format!("error: no command given\n\n{}", help_text())),
    };
    let rest: Vec<String> = args.collect();
    match command.as_str() {
        "-h" | "--help" => {
            print_help();
            std::process::exit(0);
        }
        "-V" | "--version" => {
            println!("hdparse {}", env!("CARGO_PKG_VERSION"));
            std::process::exit(0);
        }
        "train" => parse_train_args(rest).map(Command::Train),
        "parse" => parse_parse_args(rest).map(Command::Parse),
        other => Err(format!("error: unknown command '{other}'\n\n{}", help_text())),
    }
}

/// `--name value` or `--name=value`.
fn option_value(arg: &str, name: &str, args: &mut impl Iterator<Item = String>) -> Result<Option<String>, String> {
    if arg == name {
        return args.next().map(Some).ok_or_else(|| format!("error: {name} expects a value"));
    }
    Ok(arg.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')).map(str::to_string))
}

fn parse_train_args(rest: Vec<String>) -> Result<TrainConfig, String> {
    let mut treebank: Option<PathBuf> = None;
    let mut output = None;
    let mut settings = None;
    let mut args = rest.into_iter();
    while let Some(arg) = args.next() {
        if let Some(value) = option_value(&arg, "--settings", &mut args)? {
            settings = Some(PathBuf::from(value));
        } else if let Some(value) = option_value(&arg, "-o", &mut args)? {
            output = Some(PathBuf::from(value));
        } else if let Some(value) = option_value(&arg, "--output", &mut args)? {
            output = Some(PathBuf::from(value));
        } else if arg.starts_with('-') {
            return Err(format!("error: unknown option '{arg}'"));
        } else if treebank.is_some() {
            return Err("error: treebank provided multiple times".to_string());
        } else {
            treebank = Some(PathBuf::from(arg));
        }
    }
    let treebank = treebank.ok_or_else(|| format!("error: train needs a treebank file\n\n{}", help_text()))?;
    Ok(TrainConfig { treebank, output, settings })
}

fn parse_parse_args(rest: Vec<String>) -> Result<ParseConfig, String> {
    let mut events = None;
    let mut settings = None;
    let mut input: Option<Option<PathBuf>> = None;
    let mut color = io::stdout().is_terminal();
    let mut verbose = false;
    let mut args = rest.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--color" => color = true,
            "--no-color" => color = false,
            "-v" | "--verbose" => verbose = true,
            "-" => {
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(None);
            }
            _ => {
                if let Some(value) = option_value(&arg, "--events", &mut args)? {
                    events = Some(PathBuf::from(value));
                } else if let Some(value) = option_value(&arg, "--settings", &mut args)? {
                    settings = Some(PathBuf::from(value));
                } else if arg.starts_with('-') {
                    return Err(format!("error: unknown option '{arg}'"));
                } else if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                } else {
                    input = Some(Some(PathBuf::from(arg)));
                }
            }
        }
    }
    let events = events.ok_or_else(|| format!("error: parse needs --events <file>\n\n{}", help_text()))?;
    Ok(ParseConfig { events, settings, input: input.flatten(), color, verbose })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "hdparse {version}

Head-driven lexicalized statistical parser.

Usage:
  hdparse train <treebank> [-o <events>] [--settings <file>]
  hdparse parse --events <file> [OPTIONS] [<sentences> | -]

Train options:
  -o, --output <events>      Write observed events here instead of stdout.
  --settings <file>          Properties file with parser.* settings.

Parse options:
  --events <file>            Observed-events file written by `train`.
  --settings <file>          Properties file with parser.* settings.
  -v, --verbose              Per-sentence chart report instead of bare trees.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.

Sentences are s-expressions, one per sentence: (word ...), where a word may
be written (word tag) or (word (tag ...)) to restrict its tags. Input is
read from the given file, or stdin when it is omitted or `-`.

Environment:
  RUST_LOG                   Log filter (default: info).
  HDPARSE_DEBUG_CHART        Trace every chart cell as it is pruned.

Exit codes:
  0  Success.
  1  Runtime error (unreadable files, malformed events or settings).
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
