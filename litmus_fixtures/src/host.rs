//! Simulated editing host.
//!
//! A minimal stand-in for the engine under test: a handful of editable fields,
//! text sources with styled runs, a clipboard, and a background spellchecker
//! that tags misspelled words some time after a paste. Plain-text fields
//! flatten pasted runs; the content-editable field keeps run boundaries, and a
//! spelling marker there stops at the first boundary inside the word.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use litmus_core::{Clock, SharedClock, TokioClock};

use crate::frames::AnimationFrames;

/// Editable destination fields.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Input,
    TextArea,
    ContentEditable,
}

impl Field {
    /// Element tag name used in report messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Field::Input => "INPUT",
            Field::TextArea => "TEXTAREA",
            Field::ContentEditable => "DIV",
        }
    }

    /// Plain-text controls drop styling on paste.
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Field::Input | Field::TextArea)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Character range covered by a spelling marker.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MarkerRange {
    pub from: usize,
    pub length: usize,
}

impl MarkerRange {
    pub fn new(from: usize, length: usize) -> Self {
        Self { from, length }
    }
}

/// Handle to a registered text source.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceId(usize);

/// Text split into styled runs, parsed from markup such as `fo<b>o ba</b>r`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    markup: String,
    runs: Vec<String>,
}

impl Fragment {
    /// Parses markup where `<b>` and `</b>` are the only recognised tags.
    pub fn from_markup(markup: &str) -> Self {
        let mut runs = Vec::new();
        let mut current = String::new();
        let mut rest = markup;

        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("<b>").or_else(|| rest.strip_prefix("</b>")) {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
                rest = tail;
                continue;
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                current.push(c);
            }
            rest = chars.as_str();
        }
        if !current.is_empty() {
            runs.push(current);
        }

        Self {
            markup: markup.to_string(),
            runs,
        }
    }

    /// Markup as given.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Text of each run.
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Concatenated text.
    pub fn text(&self) -> String {
        self.runs.concat()
    }
}

/// Finds misspelled words and clips each marker at the first run boundary.
pub fn spelling_markers(runs: &[String], dictionary: &HashSet<String>) -> Vec<MarkerRange> {
    let mut boundaries = Vec::with_capacity(runs.len());
    let mut offset = 0;
    for run in runs {
        offset += run.chars().count();
        boundaries.push(offset);
    }

    let chars: Vec<char> = runs.concat().chars().collect();
    let mut markers = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_alphabetic() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_alphabetic() {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect::<String>().to_lowercase();
        if dictionary.contains(&word) {
            continue;
        }
        let end = boundaries
            .iter()
            .copied()
            .find(|b| *b > start && *b < i)
            .unwrap_or(i);
        markers.push(MarkerRange::new(start, end - start));
    }
    markers
}

/// Host tuning.
#[derive(Clone, Debug)]
pub struct HostOptions {
    /// Delay between a paste and its spelling markers when checking is asynchronous
    pub spellcheck_latency: Duration,
    /// Correctly spelled words; everything else is marked
    pub dictionary: HashSet<String>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            spellcheck_latency: Duration::from_millis(5),
            dictionary: HashSet::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FieldState {
    runs: Vec<String>,
    markers: Vec<MarkerRange>,
    generation: u64,
}

#[derive(Debug, Default)]
struct HostState {
    sources: Vec<Fragment>,
    fields: HashMap<Field, FieldState>,
    clipboard: Option<Fragment>,
    focus: Option<Field>,
    async_spellchecking: bool,
    hidden: bool,
}

/// Shared handle to the simulated host. Clones see the same state.
#[derive(Clone)]
pub struct SimulatedHost {
    state: Arc<Mutex<HostState>>,
    options: Arc<HostOptions>,
    clock: SharedClock,
    frames: Arc<AnimationFrames>,
}

impl SimulatedHost {
    /// Creates a host on the tokio clock.
    pub fn new(options: HostOptions) -> Self {
        Self::with_clock(options, Arc::new(TokioClock::new()))
    }

    /// Creates a host whose spellchecker and frames use `clock`.
    pub fn with_clock(options: HostOptions, clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState::default())),
            options: Arc::new(options),
            frames: Arc::new(AnimationFrames::new(clock.clone())),
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    /// Animation frame scheduler served by `display()`.
    pub fn frames(&self) -> Arc<AnimationFrames> {
        self.frames.clone()
    }

    /// Registers a text source.
    pub fn add_source(&self, markup: &str) -> SourceId {
        let mut state = self.state();
        state.sources.push(Fragment::from_markup(markup));
        SourceId(state.sources.len() - 1)
    }

    /// Markup of a source, if registered.
    pub fn source_markup(&self, source: SourceId) -> Option<String> {
        self.state()
            .sources
            .get(source.0)
            .map(|f| f.markup().to_string())
    }

    /// Copies a source to the clipboard. Returns false for unknown sources.
    pub fn copy(&self, source: SourceId) -> bool {
        let mut state = self.state();
        match state.sources.get(source.0).cloned() {
            Some(fragment) => {
                state.clipboard = Some(fragment);
                true
            }
            None => false,
        }
    }

    /// Empties a field and drops its markers.
    pub fn clear(&self, field: Field) {
        let mut state = self.state();
        let entry = state.fields.entry(field).or_default();
        entry.runs.clear();
        entry.markers.clear();
        entry.generation += 1;
    }

    pub fn focus(&self, field: Field) {
        self.state().focus = Some(field);
    }

    pub fn focused(&self) -> Option<Field> {
        self.state().focus
    }

    pub fn set_async_spellchecking(&self, enabled: bool) {
        self.state().async_spellchecking = enabled;
    }

    /// Pastes the clipboard into the focused field and schedules spellchecking.
    ///
    /// Returns false if nothing is focused or the clipboard is empty.
    pub fn paste(&self) -> bool {
        let (field, runs, generation, asynchronous) = {
            let mut state = self.state();
            let (Some(field), Some(clip)) = (state.focus, state.clipboard.clone()) else {
                return false;
            };
            let asynchronous = state.async_spellchecking;
            let entry = state.fields.entry(field).or_default();
            if field.is_plain_text() {
                let mut text = entry.runs.concat();
                text.push_str(&clip.text());
                entry.runs = vec![text];
            } else {
                entry.runs.extend(clip.runs().iter().cloned());
            }
            entry.markers.clear();
            entry.generation += 1;
            (field, entry.runs.clone(), entry.generation, asynchronous)
        };

        let markers = spelling_markers(&runs, &self.options.dictionary);
        if asynchronous {
            let host = self.clone();
            let latency = self.options.spellcheck_latency;
            tokio::spawn(async move {
                host.clock.sleep(latency).await;
                host.apply_markers(field, generation, markers);
            });
        } else {
            self.apply_markers(field, generation, markers);
        }
        true
    }

    fn apply_markers(&self, field: Field, generation: u64, markers: Vec<MarkerRange>) {
        let mut state = self.state();
        let entry = state.fields.entry(field).or_default();
        // a newer edit superseded this check
        if entry.generation != generation {
            return;
        }
        tracing::debug!("Spellchecker marked {} ranges in {}", markers.len(), field);
        entry.markers = markers;
    }

    /// Current text of a field.
    pub fn text(&self, field: Field) -> String {
        self.state()
            .fields
            .get(&field)
            .map(|f| f.runs.concat())
            .unwrap_or_default()
    }

    /// Markers currently shown in a field.
    pub fn markers(&self, field: Field) -> Vec<MarkerRange> {
        self.state()
            .fields
            .get(&field)
            .map(|f| f.markers.clone())
            .unwrap_or_default()
    }

    /// True if the focused field shows exactly this marker.
    pub fn has_marker_in_focus(&self, range: MarkerRange) -> bool {
        let state = self.state();
        state
            .focus
            .and_then(|field| state.fields.get(&field))
            .map(|f| f.markers.contains(&range))
            .unwrap_or(false)
    }

    /// Hides the fixture root.
    pub fn hide(&self) {
        self.state().hidden = true;
    }

    pub fn is_hidden(&self) -> bool {
        self.state().hidden
    }
}
