//! Best-effort extraction of the cultural-context breakdown from a free-text model reply.
//!
//! The model is asked for three labelled lines (`CONTEXT:`, `WORD1:`, `WORD2:`) but nothing
//! forces it to comply, so every step here degrades to an empty or default value instead of
//! failing. Word lines are picked by an ordered list of line strategies; the first strategy
//! that claims a line wins and later strategies only fill the remaining slots.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const DEFAULT_TONE: &str = "colloquial";
const MAX_ANNOTATIONS: usize = 2;
const MIN_DASHES_FOR_UNLABELED: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub context: String,
    pub tone: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub word: String,
    pub meaning: String,
    pub note: String,
}

impl Default for Explanation {
    fn default() -> Self {
        Self {
            context: String::new(),
            tone: DEFAULT_TONE.to_string(),
            annotations: Vec::new(),
        }
    }
}

impl Explanation {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.annotations.is_empty()
    }
}

static MARKDOWN_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`#]").expect("markdown noise pattern"));
static CONTEXT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-•>]\s*|\d+[.)]\s*)?context\s*:\s*").expect("context label pattern")
});
static WORD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-•>]\s*|\d+[.)]\s*)?word\s*[12]\s*:").expect("word label pattern")
});
static LINE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-•>]\s*|\d+[.)]\s*)?(?:word\s*\d*\s*:\s*)?")
        .expect("line prefix pattern")
});
static TRAILING_TONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)\s*$").expect("tone pattern"));
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").expect("separator pattern"));

/// Claims a line as a word annotation candidate.
type LineStrategy = fn(&str) -> Option<&str>;

/// Word-line strategies in priority order.
const WORD_STRATEGIES: &[LineStrategy] = &[labeled_word, dashed_word];

fn labeled_context(line: &str) -> Option<&str> {
    CONTEXT_LABEL.find(line).map(|found| &line[found.end()..])
}

fn labeled_word(line: &str) -> Option<&str> {
    WORD_LABEL.is_match(line).then_some(line)
}

fn dashed_word(line: &str) -> Option<&str> {
    let dashes = line
        .chars()
        .filter(|ch| matches!(ch, '-' | '–' | '—'))
        .count();
    (dashes >= MIN_DASHES_FOR_UNLABELED).then_some(line)
}

pub fn parse(raw: &str) -> Explanation {
    let cleaned = MARKDOWN_NOISE.replace_all(raw, "");
    let lines = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    let labeled = lines
        .iter()
        .enumerate()
        .find_map(|(idx, &line)| labeled_context(line).map(|body| (idx, body)));
    let (context_idx, context, tone) = match labeled {
        Some((idx, body)) => {
            let (context, tone) = split_tone(body);
            (Some(idx), context, tone)
        }
        None => match lines.first() {
            Some(&line) => (Some(0), line.to_string(), DEFAULT_TONE.to_string()),
            None => (None, String::new(), DEFAULT_TONE.to_string()),
        },
    };

    let annotations = select_word_lines(&lines, context_idx)
        .into_iter()
        .filter_map(|idx| parse_annotation(lines[idx]))
        .collect();

    Explanation {
        context,
        tone,
        annotations,
    }
}

fn select_word_lines(lines: &[&str], context_idx: Option<usize>) -> Vec<usize> {
    let mut selected = Vec::new();
    for strategy in WORD_STRATEGIES {
        for (idx, &line) in lines.iter().enumerate() {
            if selected.len() >= MAX_ANNOTATIONS {
                break;
            }
            if Some(idx) == context_idx || selected.contains(&idx) {
                continue;
            }
            if strategy(line).is_some() {
                selected.push(idx);
            }
        }
    }
    selected.sort_unstable();
    selected
}

fn split_tone(body: &str) -> (String, String) {
    let body = body.trim();
    let Some(caps) = TRAILING_TONE.captures(body) else {
        return (body.to_string(), DEFAULT_TONE.to_string());
    };
    let start = caps.get(0).map(|whole| whole.start()).unwrap_or(body.len());
    let tone = caps.get(1).map(|group| group.as_str().trim()).unwrap_or("");
    let tone = if tone.is_empty() { DEFAULT_TONE } else { tone };
    (body[..start].trim().to_string(), tone.to_string())
}

fn parse_annotation(line: &str) -> Option<Annotation> {
    let body = LINE_PREFIX.replace(line, "");
    let segments = SEPARATOR
        .split(body.trim())
        .map(str::trim)
        .collect::<Vec<_>>();
    if segments.len() < 2 {
        return None;
    }
    let word = segments[0];
    let meaning = segments[1];
    if word.is_empty() || meaning.is_empty() {
        return None;
    }
    let note = segments[2..]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" - ");
    let note = if note.is_empty() {
        meaning.to_string()
    } else {
        note
    };
    Some(Annotation {
        word: word.to_string(),
        meaning: meaning.to_string(),
        note,
    })
}
