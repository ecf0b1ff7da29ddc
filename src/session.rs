use crate::chapterizer::{Chapter, ChapterSettings, chapterize};
use crate::message::{Message, Transcript};
use crate::renderer::{ChatRenderer, RenderOptions};
use crate::settings::Settings;
use crate::transform::TextTransform;
use log::debug;
use std::collections::HashMap;

/// One open reader over a transcript.
///
/// Owns the chapter list and render state that the source system kept in a
/// process-wide singleton. Chapters are destroyed and rebuilt whenever the
/// chapter settings change; the generation counter lets late callbacks from
/// a torn-down render detect that their session state is gone.
pub struct ReaderSession {
    transcript: Transcript,
    settings: Settings,
    chapters: Vec<Chapter>,
    generation: u64,
    open: bool,
}

impl ReaderSession {
    pub fn new(transcript: Transcript, settings: Settings) -> Self {
        let chapters = chapterize(&transcript.messages, &settings.chapter_settings());
        debug!(
            "Opened reader session {} with {} messages in {} chapters",
            transcript.session_id,
            transcript.messages.len(),
            chapters.len()
        );
        ReaderSession {
            transcript,
            settings,
            chapters,
            generation: 0,
            open: true,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.transcript.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.transcript.messages
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current rebuild generation. A stored generation that no longer
    /// matches means the chapter list it referred to is gone.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.open && generation == self.generation
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
        self.generation += 1;
    }

    /// Applies new chapter settings and rebuilds the chapter list. Message
    /// content is never touched; only the grouping changes.
    pub fn update_chapter_settings(&mut self, chapter: ChapterSettings) {
        self.settings.chapter_mode = chapter.mode;
        self.settings.messages_per_chapter = chapter.messages_per_chapter;
        self.settings.time_gap_hours = chapter.time_gap_hours;
        self.rebuild_chapters();
    }

    pub fn rebuild_chapters(&mut self) {
        self.generation += 1;
        self.chapters = chapterize(
            &self.transcript.messages,
            &self.settings.chapter_settings(),
        );
        debug!(
            "Rebuilt {} chapters (generation {})",
            self.chapters.len(),
            self.generation
        );
    }

    /// Overrides chapter titles from a positional name map.
    pub fn apply_chapter_names(&mut self, names: &HashMap<usize, String>) {
        for chapter in &mut self.chapters {
            if let Some(name) = names.get(&chapter.index) {
                chapter.title = name.clone();
            }
        }
    }

    /// Locates the chapter containing a message, the stable way to resolve
    /// externally stored references after a rebuild.
    pub fn chapter_of_sequence_index(&self, sequence_index: usize) -> Option<usize> {
        self.chapters
            .iter()
            .find(|c| c.contains_sequence_index(sequence_index))
            .map(|c| c.index)
    }

    /// Renders every chapter with the session's settings.
    pub fn render_chapters(
        &self,
        renderer: &ChatRenderer,
        transform: &dyn TextTransform,
    ) -> Vec<String> {
        let opts = RenderOptions {
            user_name: &self.transcript.user_name,
            character_name: &self.transcript.character_name,
            character_key: &self.transcript.character_key,
            show_sender_name: self.settings.show_sender_names,
            dialogue_enabled: self.settings.dialogue_enabled,
            show_images: self.settings.show_images,
            transform,
        };
        self.chapters
            .iter()
            .map(|chapter| renderer.render_chapter(chapter, &self.transcript.messages, &opts))
            .collect()
    }
}
