use crate::error::{Error, Result};
use crate::sexp::{Sexp, Symbol};
use std::io::BufRead;

/// Feed every non-blank line of `reader`, parsed as one s-expression, to `f`
/// together with its 1-based line number.
pub(crate) fn for_each_entry<R: BufRead>(reader: R, mut f: impl FnMut(usize, Sexp) -> Result<()>) -> Result<()> {
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sexp = Sexp::parse(&line).map_err(|e| match e {
            Error::Syntax { message, .. } => Error::malformed(line_no, message),
            other => other,
        })?;
        f(line_no, sexp).map_err(|e| e.at_line(line_no))?;
    }
    Ok(())
}

/// Split `(name key c0 [c1])` into its parts; `num_counts` is 1 or 2.
pub(crate) fn split_entry(entry: &Sexp, num_counts: usize) -> Result<(Symbol, &Sexp, [f64; 2])> {
    let items = entry.expect_list(2 + num_counts, "counts entry")?;
    let name = items[0].expect_symbol("event name")?;
    let mut counts = [0.0; 2];
    for (slot, item) in counts.iter_mut().zip(&items[2..]) {
        let text = item.expect_symbol("count")?;
        *slot = text
            .as_str()
            .parse::<f64>()
            .map_err(|_| Error::malformed(0, format!("count `{text}` is not a number")))?;
    }
    Ok((name, &items[1], counts))
}
