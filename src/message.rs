use crate::timestamp::normalize_timestamp;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::ChatError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageImage {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

/// One parsed chat message. Immutable once parsed; `sequence_index` is the
/// position in the original chat history and is the only stable identity
/// across re-chapterization and re-render.
#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub is_user: bool,
    pub is_system: bool,
    pub text: String,
    pub send_timestamp: DateTime<Utc>,
    pub sequence_index: usize,
    pub extra_images: Vec<MessageImage>,
    pub images_replace_text: bool,
}

/// A full parsed chat transcript plus the identity the stores key on.
#[derive(Debug)]
pub struct Transcript {
    pub user_name: String,
    pub character_name: String,
    pub character_key: String,
    pub session_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    user_name: String,
    character_name: String,
    #[serde(default)]
    character_key: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    name: String,
    #[serde(default)]
    is_user: bool,
    #[serde(default)]
    is_system: bool,
    text: String,
    #[serde(default)]
    sent: Option<Value>,
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    variant_index: Option<usize>,
    #[serde(default)]
    images: Vec<MessageImage>,
    #[serde(default)]
    images_replace_text: bool,
}

impl Transcript {
    /// Parses a JSON-lines transcript: one header record, then one message
    /// record per line. Malformed message lines are skipped with a warning;
    /// a single bad record never aborts the parse.
    pub fn parse(content: &str) -> Result<Transcript, ChatError> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines.next().ok_or(ChatError::MissingHeader)?;
        let header: RawHeader =
            serde_json::from_str(header_line).map_err(|_| ChatError::MissingHeader)?;

        let mut messages = Vec::new();
        for (line_no, line) in lines.enumerate() {
            match serde_json::from_str::<RawMessage>(line) {
                Ok(raw) => {
                    let sequence_index = messages.len();
                    messages.push(raw.into_message(sequence_index));
                }
                Err(e) => {
                    warn!("Skipping malformed message record on line {}: {e}", line_no + 2);
                }
            }
        }

        if messages.is_empty() {
            return Err(ChatError::EmptyTranscript);
        }

        let session_id = header.session_id.clone().unwrap_or_else(|| {
            derive_session_id(&header.character_name, &messages[0].send_timestamp)
        });

        let character_key = header
            .character_key
            .unwrap_or_else(|| header.character_name.to_lowercase().replace(' ', "_"));

        Ok(Transcript {
            user_name: header.user_name,
            character_name: header.character_name,
            character_key,
            session_id,
            messages,
        })
    }

    pub fn load(path: &Path) -> Result<Transcript, ChatError> {
        let content = fs::read_to_string(path).map_err(|source| ChatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }
}

impl RawMessage {
    fn into_message(self, sequence_index: usize) -> Message {
        // The selected swipe variant replaces the canonical text.
        let text = match (self.variants.is_empty(), self.variant_index) {
            (false, Some(idx)) if idx < self.variants.len() => self.variants[idx].clone(),
            _ => self.text,
        };

        let send_timestamp = match &self.sent {
            Some(Value::String(s)) => normalize_timestamp(s),
            Some(Value::Number(n)) => normalize_timestamp(&n.to_string()),
            _ => normalize_timestamp(""),
        };

        Message {
            name: self.name,
            is_user: self.is_user,
            is_system: self.is_system,
            text,
            send_timestamp,
            sequence_index,
            extra_images: self.images,
            images_replace_text: self.images_replace_text,
        }
    }
}

/// Stable session identity when the header carries none: digest of the
/// character name and the first message's timestamp.
fn derive_session_id(character_name: &str, first_timestamp: &DateTime<Utc>) -> String {
    let digest = md5::compute(format!("{}{}", character_name, first_timestamp.timestamp()));
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::is_epoch_zero;

    const HEADER: &str = r#"{"user_name":"Alice","character_name":"Bob"}"#;

    fn transcript(lines: &[&str]) -> Transcript {
        let content = format!("{HEADER}\n{}", lines.join("\n"));
        Transcript::parse(&content).unwrap()
    }

    #[test]
    fn test_basic_parse() {
        let t = transcript(&[
            r#"{"name":"Bob","text":"hello","sent":"2024-06-19T14:20:00Z"}"#,
            r#"{"name":"Alice","is_user":true,"text":"hi","sent":1718806900000}"#,
        ]);
        assert_eq!(t.messages.len(), 2);
        assert_eq!(t.messages[0].sequence_index, 0);
        assert!(t.messages[1].is_user);
        assert_eq!(t.messages[1].send_timestamp.timestamp(), 1_718_806_900);
    }

    #[test]
    fn test_malformed_line_skipped() {
        let t = transcript(&[
            r#"{"name":"Bob","text":"first"}"#,
            r#"{not json at all"#,
            r#"{"name":"Bob","text":"second"}"#,
        ]);
        assert_eq!(t.messages.len(), 2);
        assert_eq!(t.messages[1].text, "second");
        assert_eq!(t.messages[1].sequence_index, 1);
    }

    #[test]
    fn test_variant_selection() {
        let t = transcript(&[
            r#"{"name":"Bob","text":"canonical","variants":["one","two"],"variant_index":1}"#,
        ]);
        assert_eq!(t.messages[0].text, "two");
    }

    #[test]
    fn test_variant_index_out_of_range_keeps_canonical() {
        let t = transcript(&[
            r#"{"name":"Bob","text":"canonical","variants":["one"],"variant_index":5}"#,
        ]);
        assert_eq!(t.messages[0].text, "canonical");
    }

    #[test]
    fn test_missing_timestamp_is_epoch_zero() {
        let t = transcript(&[r#"{"name":"Bob","text":"no clock"}"#]);
        assert!(is_epoch_zero(&t.messages[0].send_timestamp));
    }

    #[test]
    fn test_session_id_is_stable() {
        let a = transcript(&[r#"{"name":"Bob","text":"x","sent":"2024-06-19T14:20:00Z"}"#]);
        let b = transcript(&[r#"{"name":"Bob","text":"y","sent":"2024-06-19T14:20:00Z"}"#]);
        assert_eq!(a.session_id, b.session_id);
    }

    #[test]
    fn test_header_session_id_wins() {
        let content = format!(
            "{}\n{}",
            r#"{"user_name":"A","character_name":"B","session_id":"fixed"}"#,
            r#"{"name":"B","text":"x"}"#
        );
        let t = Transcript::parse(&content).unwrap();
        assert_eq!(t.session_id, "fixed");
    }

    #[test]
    fn test_empty_transcript_is_error() {
        assert!(matches!(
            Transcript::parse(HEADER),
            Err(ChatError::EmptyTranscript)
        ));
        assert!(matches!(
            Transcript::parse(""),
            Err(ChatError::MissingHeader)
        ));
    }
}
