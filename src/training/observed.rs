use crate::counts::{CountsTable, for_each_entry, split_entry};
use crate::error::Result;
use crate::trainer_event::{GapEvent, GenerationEvent, HeadEvent, ModifierEvent, PriorEvent, TrainerEvent};
use std::io::{BufRead, Write};

/// Counts of every generation event seen in a treebank, one table per kind.
#[derive(Debug, Clone, Default)]
pub struct ObservedEvents {
    pub heads: CountsTable<HeadEvent>,
    pub modifiers: CountsTable<ModifierEvent>,
    pub gaps: CountsTable<GapEvent>,
    pub priors: CountsTable<PriorEvent>,
}

impl ObservedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: TrainerEvent, count: f64) {
        match event {
            TrainerEvent::Head(e) => self.heads.add_count(e, count),
            TrainerEvent::Gap(e) => self.gaps.add_count(e, count),
            TrainerEvent::Prior(e) => self.priors.add_count(e, count),
            TrainerEvent::Modifier(e) => self.modifiers.add_count(e, count),
        };
    }

    pub fn add_all(&mut self, other: &ObservedEvents) {
        self.heads.add_all(&other.heads);
        self.modifiers.add_all(&other.modifiers);
        self.gaps.add_all(&other.gaps);
        self.priors.add_all(&other.priors);
    }

    /// Drop every event seen fewer than `threshold` times.
    pub fn prune(&mut self, threshold: f64) {
        self.heads.remove_items_below(threshold);
        self.modifiers.remove_items_below(threshold);
        self.gaps.remove_items_below(threshold);
        self.priors.remove_items_below(threshold);
    }

    pub fn len(&self) -> usize {
        self.heads.len() + self.modifiers.len() + self.gaps.len() + self.priors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.heads.output(HeadEvent::NAME, writer)?;
        self.modifiers.output(ModifierEvent::NAME, writer)?;
        self.gaps.output(GapEvent::NAME, writer)?;
        self.priors.output(PriorEvent::NAME, writer)
    }

    /// Read lines of all four kinds in any order.
    pub fn read<R: BufRead>(reader: R) -> Result<ObservedEvents> {
        let mut events = ObservedEvents::new();
        for_each_entry(reader, |_, entry| {
            let (name, key, [count, _]) = split_entry(&entry, 1)?;
            events.add(TrainerEvent::from_named_sexp(name, key)?, count);
            Ok(())
        })?;
        log::info!(
            "read {} head, {} modifier, {} gap and {} prior events",
            events.heads.len(),
            events.modifiers.len(),
            events.gaps.len(),
            events.priors.len()
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::sexp::{Symbol, symbols};
    use crate::subcat::Subcat;
    use crate::trainer_event::Side;
    use crate::word::Word;
    use std::io::Cursor;
    use std::sync::Arc;

    fn word(w: &str, t: &str) -> Arc<Word> {
        Arc::new(Word::new(Symbol::new(w), Symbol::new(t)))
    }

    fn sample() -> ObservedEvents {
        let mut events = ObservedEvents::new();
        let head = HeadEvent::new(
            word("barked", "VBD"),
            Symbol::new("S"),
            Symbol::new("VP"),
            Subcat::from_labels([Symbol::new("NP-A")]),
            Subcat::new(),
        );
        events.add(TrainerEvent::Head(head.clone()), 1.0);
        events.add(TrainerEvent::Head(head), 2.0);
        events.add(TrainerEvent::Prior(PriorEvent::new(word("dog", "NN"), Symbol::new("NN"))), 1.0);
        events.add(
            TrainerEvent::Modifier(ModifierEvent {
                mod_head_word: Arc::new(Word::stop()),
                head_word: word("barked", "VBD"),
                modifier: symbols::stop(),
                previous_mods: vec![Symbol::new("NP-A")],
                previous_words: vec![Word::new(Symbol::new("dog"), Symbol::new("NN"))],
                parent: Symbol::new("S"),
                head: Symbol::new("VP"),
                subcat: Subcat::new(),
                prev_punc: None,
                prev_conj: None,
                is_conj_p_conj: false,
                verb_intervening: false,
                head_adjacent: false,
                side: Side::Left,
            }),
            1.0,
        );
        events
    }

    #[test]
    fn write_then_read() {
        let events = sample();
        let mut out = Vec::new();
        events.write(&mut out).unwrap();
        let back = ObservedEvents::read(Cursor::new(out)).unwrap();
        assert_eq!(back.len(), events.len());
        for (e, c) in events.heads.iter() {
            assert_eq!(back.heads.count(e), c);
        }
        for (e, c) in events.modifiers.iter() {
            assert_eq!(back.modifiers.count(e), c);
        }
    }

    #[test]
    fn prune_applies_to_every_table() {
        let mut events = sample();
        events.prune(2.0);
        assert_eq!(events.heads.len(), 1);
        assert!(events.priors.is_empty());
        assert!(events.modifiers.is_empty());
    }

    #[test]
    fn rejects_unknown_kinds() {
        let err = ObservedEvents::read(Cursor::new("(prior ((dog NN) NN) 1)\n(bogus (a b) 1)\n")).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { line: 2, .. }), "{err:?}");
    }
}
