use hdparse::{ParseOutcome, Sexp};
use std::time::Duration;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Running counts over every sentence of one `parse` run.
#[derive(Debug, Default)]
pub struct Totals {
    pub parsed: usize,
    pub relaxed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub items: usize,
    pub elapsed: Duration,
}

impl Totals {
    pub fn record(&mut self, outcome: &ParseOutcome) {
        match (&outcome.tree, outcome.relaxed) {
            (Some(_), true) => {
                self.parsed += 1;
                self.relaxed += 1;
            }
            (Some(_), false) => self.parsed += 1,
            (None, _) => self.failed += 1,
        }
        self.items += outcome.stats.added;
        self.elapsed += outcome.stats.elapsed;
    }

    pub fn sentences(&self) -> usize {
        self.parsed + self.failed + self.skipped
    }
}

pub fn print_sentence(number: usize, sentence: &Sexp, outcome: &ParseOutcome, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Sentence {number}: {sentence}"), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match &outcome.tree {
        Some(tree) => {
            println!("  {}", palette.bold(palette.paint(tree.to_string(), ansi::GREEN)));
            println!(
                "  {} {}  {} {}  {} {}",
                palette.dim("log p:"),
                palette.paint(format!("{:.4}", outcome.log_prob.unwrap_or(f64::NEG_INFINITY)), ansi::YELLOW),
                palette.dim("│ beam:"),
                palette.paint(format!("{:.1}", outcome.prune_factor.unwrap_or_default()), ansi::BLUE),
                palette.dim("│ relaxed:"),
                if outcome.relaxed { palette.paint("yes", ansi::YELLOW) } else { palette.dim("no") }
            );
        }
        None => {
            println!("{}", palette.dim("  No parse"));
            println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
            println!("  • A word has no tag seen in training (try (word TAG))");
            println!("  • Every derivation needs an event with zero probability");
            println!("  • The beam pruned the only derivations (raise parser.decoder.maxPruneFactor)");
            println!("\n{}", palette.dim("  Tip: Set HDPARSE_DEBUG_CHART=1 RUST_LOG=trace to see every cell"));
        }
    }

    let stats = &outcome.stats;
    println!("\n{}", palette.paint("━━━ Chart ━━━", ansi::GRAY));
    println!(
        "  {} {}  │  {} {}  │  {} {}",
        palette.dim("added:"),
        palette.paint(stats.added.to_string(), ansi::GREEN),
        palette.dim("replaced:"),
        palette.paint(stats.replaced.to_string(), ansi::BLUE),
        palette.dim("peak live:"),
        palette.paint(stats.peak_items.to_string(), ansi::CYAN),
    );
    println!(
        "  {} {}  │  {} {}  │  {} {}  │  {} {}",
        palette.dim("rejected (equivalent):"),
        palette.paint(stats.rejected_equivalent.to_string(), ansi::YELLOW),
        palette.dim("rejected (beam):"),
        palette.paint(stats.rejected_beam.to_string(), ansi::YELLOW),
        palette.dim("pruned:"),
        palette.paint(stats.pruned.to_string(), ansi::YELLOW),
        palette.dim("limited:"),
        palette.paint(stats.limited.to_string(), ansi::YELLOW),
    );

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!("  Total: {}", palette.paint(format!("{:?}", stats.elapsed), ansi::GREEN));
    println!();
}

pub fn print_totals(totals: &Totals, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("{}", palette.paint("━━━ Summary ━━━", ansi::GRAY));
    println!(
        "  {} {}  │  {} {}  │  {} {}  │  {} {}",
        palette.dim("parsed:"),
        palette.paint(totals.parsed.to_string(), ansi::GREEN),
        palette.dim("relaxed:"),
        palette.paint(totals.relaxed.to_string(), ansi::YELLOW),
        palette.dim("failed:"),
        palette.paint(totals.failed.to_string(), ansi::YELLOW),
        palette.dim("skipped:"),
        palette.dim(totals.skipped.to_string()),
    );
    println!(
        "  {} {}  │  {} {}",
        palette.dim("items:"),
        palette.paint(totals.items.to_string(), ansi::BLUE),
        palette.dim("decoding:"),
        palette.paint(format!("{:?}", totals.elapsed), ansi::GREEN),
    );
    println!();
}
