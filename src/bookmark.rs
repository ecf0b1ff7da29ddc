use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub message_sequence_index: usize,
    pub label: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Last-read position for one chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub chapter_index: usize,
    #[serde(default)]
    pub scroll_offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
    #[serde(default)]
    pub progress_percent: f32,
    pub message_sequence_index: usize,
    pub last_read: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ReadingPosition>,
    /// Custom chapter titles, keyed by positional chapter index. The key is
    /// not stable across re-chapterization; see DESIGN.md for the stable-key
    /// follow-up.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub chapter_names: HashMap<usize, String>,
}

/// Per-session bookmark and reading-position store, keyed by the stable
/// chat-session id.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkStore {
    sessions: HashMap<String, SessionRecord>,
    #[serde(skip)]
    file_path: Option<String>,
}

impl BookmarkStore {
    pub fn ephemeral() -> Self {
        Self {
            sessions: HashMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &str) -> Self {
        Self {
            sessions: HashMap::new(),
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&str>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load bookmarks from {}: {}", path, e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(file_path);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut store: Self = serde_json::from_str(&content)?;
            store.file_path = Some(file_path.to_string());
            Ok(store)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                }
                let content = serde_json::to_string_pretty(self)?;
                fs::write(path, content)?;
                Ok(())
            }
            None => {
                // Ephemeral stores don't save to disk
                Ok(())
            }
        }
    }

    pub fn add_bookmark(&mut self, session_id: &str, message_sequence_index: usize, label: &str) {
        let record = self.sessions.entry(session_id.to_string()).or_default();
        record.bookmarks.push(Bookmark {
            message_sequence_index,
            label: label.to_string(),
            created_at: chrono::Utc::now(),
        });
        record
            .bookmarks
            .sort_by_key(|b| b.message_sequence_index);
        self.save_logged();
    }

    pub fn remove_bookmark(&mut self, session_id: &str, message_sequence_index: usize) {
        if let Some(record) = self.sessions.get_mut(session_id) {
            record
                .bookmarks
                .retain(|b| b.message_sequence_index != message_sequence_index);
            self.save_logged();
        }
    }

    pub fn bookmarks_for(&self, session_id: &str) -> &[Bookmark] {
        self.sessions
            .get(session_id)
            .map(|r| r.bookmarks.as_slice())
            .unwrap_or(&[])
    }

    pub fn update_position(&mut self, session_id: &str, position: ReadingPosition) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .position = Some(position);
        self.save_logged();
    }

    pub fn position_for(&self, session_id: &str) -> Option<&ReadingPosition> {
        self.sessions.get(session_id)?.position.as_ref()
    }

    pub fn set_chapter_name(&mut self, session_id: &str, chapter_index: usize, name: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .chapter_names
            .insert(chapter_index, name.to_string());
        self.save_logged();
    }

    pub fn chapter_names_for(&self, session_id: &str) -> HashMap<usize, String> {
        self.sessions
            .get(session_id)
            .map(|r| r.chapter_names.clone())
            .unwrap_or_default()
    }

    pub fn most_recent_session(&self) -> Option<(&String, &ReadingPosition)> {
        self.sessions
            .iter()
            .filter_map(|(id, record)| record.position.as_ref().map(|p| (id, p)))
            .max_by_key(|(_, position)| position.last_read)
    }

    fn save_logged(&self) {
        if self.file_path.is_some() {
            if let Err(e) = self.save() {
                log::error!("Failed to save bookmarks: {}", e);
            }
        }
    }
}
