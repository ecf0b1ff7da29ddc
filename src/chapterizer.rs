use crate::message::Message;
use crate::timestamp::is_epoch_zero;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChapterMode {
    None,
    #[default]
    Count,
    Time,
    Both,
}

#[derive(Debug, Clone, Copy)]
pub struct ChapterSettings {
    pub mode: ChapterMode,
    pub messages_per_chapter: usize,
    pub time_gap_hours: f64,
}

impl Default for ChapterSettings {
    fn default() -> Self {
        ChapterSettings {
            mode: ChapterMode::Count,
            messages_per_chapter: 100,
            time_gap_hours: 6.0,
        }
    }
}

/// A contiguous group of messages. `index` is positional and reassigned on
/// every rebuild; anything stored externally must resolve through a
/// contained message's `sequence_index` instead.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub index: usize,
    pub title: String,
    /// Indices into the session's message vector (identical to the
    /// messages' sequence indices).
    pub range: Range<usize>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Chapter {
    pub fn contains_sequence_index(&self, sequence_index: usize) -> bool {
        self.range.contains(&sequence_index)
    }

    pub fn messages<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        &messages[self.range.clone()]
    }
}

/// Groups an ordered message sequence into chapters. Every mode covers the
/// input exactly once, in order.
pub fn chapterize(messages: &[Message], settings: &ChapterSettings) -> Vec<Chapter> {
    if messages.is_empty() {
        return Vec::new();
    }

    let boundaries = match settings.mode {
        ChapterMode::None => vec![0],
        ChapterMode::Count => count_boundaries(messages.len(), settings.messages_per_chapter),
        ChapterMode::Time => time_boundaries(messages, settings.time_gap_hours),
        ChapterMode::Both => both_boundaries(
            messages,
            settings.messages_per_chapter,
            settings.time_gap_hours,
        ),
    };

    build_chapters(messages, &boundaries)
}

fn count_boundaries(len: usize, per_chapter: usize) -> Vec<usize> {
    let per_chapter = per_chapter.max(1);
    (0..len).step_by(per_chapter).collect()
}

/// A boundary goes immediately before any message whose gap since the
/// previous message exceeds the threshold. The first message never creates
/// one. An unparseable timestamp normalized to epoch zero never triggers a
/// gap itself, but the following message may see an enormous one; this is
/// inherited behavior.
fn time_boundaries(messages: &[Message], gap_hours: f64) -> Vec<usize> {
    let mut boundaries = vec![0];
    for i in 1..messages.len() {
        if gap_exceeded(&messages[i - 1], &messages[i], gap_hours) {
            boundaries.push(i);
        }
    }
    boundaries
}

/// A boundary triggers on whichever condition fires first; both counters
/// reset together at each boundary.
fn both_boundaries(messages: &[Message], per_chapter: usize, gap_hours: f64) -> Vec<usize> {
    let per_chapter = per_chapter.max(1);
    let mut boundaries = vec![0];
    let mut chapter_start = 0;
    for i in 1..messages.len() {
        if i - chapter_start >= per_chapter || gap_exceeded(&messages[i - 1], &messages[i], gap_hours)
        {
            boundaries.push(i);
            chapter_start = i;
        }
    }
    boundaries
}

fn gap_exceeded(prev: &Message, next: &Message, gap_hours: f64) -> bool {
    let gap_seconds = (next.send_timestamp - prev.send_timestamp).num_seconds();
    gap_seconds as f64 > gap_hours * 3600.0
}

fn build_chapters(messages: &[Message], boundaries: &[usize]) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(boundaries.len());
    for (index, &start) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(index + 1)
            .copied()
            .unwrap_or(messages.len());
        let first = &messages[start];
        let last = &messages[end - 1];
        chapters.push(Chapter {
            index,
            title: format!("Chapter {}", index + 1),
            range: start..end,
            start_time: timestamp_if_known(&first.send_timestamp),
            end_time: timestamp_if_known(&last.send_timestamp),
        });
    }
    chapters
}

fn timestamp_if_known(ts: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    if is_epoch_zero(ts) { None } else { Some(*ts) }
}
