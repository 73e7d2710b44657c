//! Tuning values.
//!
//! Settings come from a properties file (`key = value`, `#` or `!` comments).
//! Every key has a built-in default, so an empty file is valid. Values are
//! checked once when the file is loaded ([`Settings::validate`]) and then
//! read through typed snapshots: [`DecoderSettings`] and [`TrainerSettings`].
//!
//! A [`SettingsHandle`] shares one `Settings` between threads. Replacing the
//! settings bumps its version; decoders compare versions at the start of each
//! sentence and re-read their snapshot when it changed.

use crate::error::{Error, Result};
use crate::shift::ShifterKind;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Setting names.
pub mod keys {
    pub const PRUNE_FACTOR: &str = "parser.decoder.pruneFactor";
    pub const USE_PRUNE_FACTOR: &str = "parser.decoder.usePruneFactor";
    pub const MAX_PRUNE_FACTOR: &str = "parser.decoder.maxPruneFactor";
    pub const PRUNE_FACTOR_INCREMENT: &str = "parser.decoder.pruneFactorIncrement";
    pub const RELAX_CONSTRAINTS: &str = "parser.decoder.relaxConstraintsAfterBeamWidening";
    pub const USE_CELL_LIMIT: &str = "parser.decoder.useCellLimit";
    pub const CELL_LIMIT: &str = "parser.decoder.cellLimit";
    pub const MAX_SENTENCE_LENGTH: &str = "parser.decoder.maxSentenceLength";
    pub const USE_COMMA_CONSTRAINT: &str = "parser.decoder.useCommaConstraint";
    pub const NP_PRUNE_HACK: &str = "parser.chart.collinsNPPruneHack";
    pub const ITEM_POOL_SIZE: &str = "parser.chart.itemPoolSize";
    pub const SHIFTER_CLASS: &str = "parser.shifterClass";
    pub const NUM_PREV_MODS: &str = "parser.trainer.numPrevMods";
    pub const NUM_PREV_WORDS: &str = "parser.trainer.numPrevWords";
    pub const COUNT_THRESHOLD: &str = "parser.trainer.countThreshold";
    pub const UNKNOWN_WORD_THRESHOLD: &str = "parser.trainer.unknownWordThreshold";
    pub const BASE_NPS_CANNOT_CONTAIN_VERBS: &str = "parser.baseNPsCannotContainVerbs";
    pub const DOWNCASE_WORDS: &str = "parser.downcaseWords";
    pub const HEAD_TABLE_FILE: &str = "parser.headTableFile";

    pub(super) const ALL: &[&str] = &[
        PRUNE_FACTOR,
        USE_PRUNE_FACTOR,
        MAX_PRUNE_FACTOR,
        PRUNE_FACTOR_INCREMENT,
        RELAX_CONSTRAINTS,
        USE_CELL_LIMIT,
        CELL_LIMIT,
        MAX_SENTENCE_LENGTH,
        USE_COMMA_CONSTRAINT,
        NP_PRUNE_HACK,
        ITEM_POOL_SIZE,
        SHIFTER_CLASS,
        NUM_PREV_MODS,
        NUM_PREV_WORDS,
        COUNT_THRESHOLD,
        UNKNOWN_WORD_THRESHOLD,
        BASE_NPS_CANNOT_CONTAIN_VERBS,
        DOWNCASE_WORDS,
        HEAD_TABLE_FILE,
    ];
}

// --- Raw settings -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// All defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut settings = Settings::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split) = line.find(['=', ':']) else {
                return Err(Error::syntax(idx + 1, format!("expected `key = value`, found `{line}`")));
            };
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            if key.is_empty() {
                return Err(Error::syntax(idx + 1, "missing key before `=`"));
            }
            if !keys::ALL.contains(&key) {
                log::debug!("ignoring unrecognised setting `{key}`");
            }
            settings.values.insert(key.to_string(), value.to_string());
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Settings::from_reader(text.as_bytes())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Settings::from_reader(std::io::BufReader::new(file))
    }

    /// Set `key`, replacing any previous value. Not validated until
    /// [`Settings::validate`] or a typed snapshot is taken.
    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(Error::config(key, format!("expected true or false, found `{v}`"))),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(x),
                _ => Err(Error::config(key, format!("expected a number, found `{v}`"))),
            },
        }
    }

    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse::<usize>().map_err(|_| Error::config(key, format!("expected a count, found `{v}`"))),
        }
    }

    /// Check every known key by taking both typed snapshots.
    pub fn validate(&self) -> Result<()> {
        self.decoder()?;
        self.trainer()?;
        Ok(())
    }

    pub fn shifter(&self) -> ShifterKind {
        ShifterKind::from_name_or_default(self.get(keys::SHIFTER_CLASS).unwrap_or("default"))
    }

    pub fn decoder(&self) -> Result<DecoderSettings> {
        let prune_factor = positive(keys::PRUNE_FACTOR, self.get_f64(keys::PRUNE_FACTOR, 4.0)?)?;
        let max_prune_factor = positive(keys::MAX_PRUNE_FACTOR, self.get_f64(keys::MAX_PRUNE_FACTOR, 6.0)?)?;
        let increment = positive(keys::PRUNE_FACTOR_INCREMENT, self.get_f64(keys::PRUNE_FACTOR_INCREMENT, 1.0)?)?;
        let cell_limit = self.get_usize(keys::CELL_LIMIT, 10)?;
        if cell_limit == 0 {
            return Err(Error::config(keys::CELL_LIMIT, "must be at least 1"));
        }
        let item_pool_size = self.get_usize(keys::ITEM_POOL_SIZE, 50_000)?;
        if item_pool_size == 0 {
            return Err(Error::config(keys::ITEM_POOL_SIZE, "must be at least 1"));
        }
        let ln10 = std::f64::consts::LN_10;
        Ok(DecoderSettings {
            prune_factor: prune_factor * ln10,
            use_prune_factor: self.get_bool(keys::USE_PRUNE_FACTOR, true)?,
            max_prune_factor: max_prune_factor * ln10,
            prune_factor_increment: increment * ln10,
            relax_constraints: self.get_bool(keys::RELAX_CONSTRAINTS, true)?,
            use_cell_limit: self.get_bool(keys::USE_CELL_LIMIT, false)?,
            cell_limit,
            max_sentence_length: self.get_usize(keys::MAX_SENTENCE_LENGTH, 100)?,
            use_comma_constraint: self.get_bool(keys::USE_COMMA_CONSTRAINT, false)?,
            np_prune_hack: self.get_bool(keys::NP_PRUNE_HACK, true)?,
            item_pool_size,
            shifter: self.shifter(),
            base_nps_cannot_contain_verbs: self.get_bool(keys::BASE_NPS_CANNOT_CONTAIN_VERBS, true)?,
            downcase_words: self.get_bool(keys::DOWNCASE_WORDS, false)?,
        })
    }

    pub fn trainer(&self) -> Result<TrainerSettings> {
        let num_prev_mods = self.get_usize(keys::NUM_PREV_MODS, 1)?;
        if num_prev_mods == 0 {
            return Err(Error::config(keys::NUM_PREV_MODS, "must be at least 1"));
        }
        let num_prev_words = self.get_usize(keys::NUM_PREV_WORDS, 1)?;
        if num_prev_words == 0 {
            return Err(Error::config(keys::NUM_PREV_WORDS, "must be at least 1"));
        }
        let count_threshold = self.get_f64(keys::COUNT_THRESHOLD, 0.0)?;
        if count_threshold < 0.0 {
            return Err(Error::config(keys::COUNT_THRESHOLD, "must not be negative"));
        }
        Ok(TrainerSettings {
            num_prev_mods,
            num_prev_words,
            count_threshold,
            unknown_word_threshold: self.get_usize(keys::UNKNOWN_WORD_THRESHOLD, 2)?,
            shifter: self.shifter(),
            base_nps_cannot_contain_verbs: self.get_bool(keys::BASE_NPS_CANNOT_CONTAIN_VERBS, true)?,
            downcase_words: self.get_bool(keys::DOWNCASE_WORDS, false)?,
            head_table_file: self.get(keys::HEAD_TABLE_FILE).filter(|p| !p.is_empty()).map(PathBuf::from),
        })
    }
}

fn positive(key: &str, value: f64) -> Result<f64> {
    if value > 0.0 { Ok(value) } else { Err(Error::config(key, format!("must be positive, found {value}"))) }
}

// --- Typed snapshots ----------------------------------------------------------

/// Decoder tuning. Beam widths are in natural-log units.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderSettings {
    pub prune_factor: f64,
    pub use_prune_factor: bool,
    pub max_prune_factor: f64,
    pub prune_factor_increment: f64,
    pub relax_constraints: bool,
    pub use_cell_limit: bool,
    pub cell_limit: usize,
    pub max_sentence_length: usize,
    pub use_comma_constraint: bool,
    pub np_prune_hack: bool,
    pub item_pool_size: usize,
    pub shifter: ShifterKind,
    pub base_nps_cannot_contain_verbs: bool,
    pub downcase_words: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        match Settings::new().decoder() {
            Ok(settings) => settings,
            Err(_) => unreachable!("built-in decoder defaults are valid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerSettings {
    pub num_prev_mods: usize,
    pub num_prev_words: usize,
    pub count_threshold: f64,
    pub unknown_word_threshold: usize,
    pub shifter: ShifterKind,
    pub base_nps_cannot_contain_verbs: bool,
    pub downcase_words: bool,
    pub head_table_file: Option<PathBuf>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        match Settings::new().trainer() {
            Ok(settings) => settings,
            Err(_) => unreachable!("built-in trainer defaults are valid"),
        }
    }
}

// --- Shared handle ------------------------------------------------------------

/// Versioned, shareable settings.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<Settings>>>,
    version: Arc<AtomicU64>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        SettingsHandle { current: Arc::new(RwLock::new(Arc::new(settings))), version: Arc::new(AtomicU64::new(0)) }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Current settings and the version they belong to.
    pub fn snapshot(&self) -> (u64, Arc<Settings>) {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        (self.version(), Arc::clone(&guard))
    }

    /// Validate and install `settings`; readers see the new version from now on.
    pub fn replace(&self, settings: Settings) -> Result<u64> {
        settings.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(settings);
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("settings replaced (version {version})");
        Ok(version)
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        SettingsHandle::new(Settings::new())
    }
}
