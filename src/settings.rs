use crate::chapterizer::{ChapterMode, ChapterSettings};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "chatokrat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMode {
    #[default]
    Scroll,
    Paginated,
}

impl ReadingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingMode::Scroll => "scroll",
            ReadingMode::Paginated => "paginated",
        }
    }
}

/// How exported documents carry their images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// Local image files are inlined as data URLs; a file that cannot be
    /// read falls back to its original reference.
    #[default]
    Embed,
    /// References are kept as-is.
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_font_size")]
    pub font_size: u16,

    #[serde(default = "default_line_height")]
    pub line_height: f32,

    #[serde(default = "default_content_width")]
    pub content_width: u16,

    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default)]
    pub chapter_mode: ChapterMode,

    #[serde(default = "default_messages_per_chapter")]
    pub messages_per_chapter: usize,

    #[serde(default = "default_time_gap_hours")]
    pub time_gap_hours: f64,

    #[serde(default = "default_true")]
    pub dialogue_enabled: bool,

    #[serde(default = "default_true")]
    pub show_sender_names: bool,

    #[serde(default = "default_true")]
    pub show_images: bool,

    #[serde(default)]
    pub image_mode: ImageMode,

    #[serde(default)]
    pub reading_mode: ReadingMode,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    "Oceanic Next".to_string()
}

fn default_font_size() -> u16 {
    16
}

fn default_line_height() -> f32 {
    1.6
}

fn default_content_width() -> u16 {
    760
}

fn default_font_family() -> String {
    "Georgia, serif".to_string()
}

fn default_messages_per_chapter() -> usize {
    100
}

fn default_time_gap_hours() -> f64 {
    6.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            font_size: default_font_size(),
            line_height: default_line_height(),
            content_width: default_content_width(),
            font_family: default_font_family(),
            chapter_mode: ChapterMode::default(),
            messages_per_chapter: default_messages_per_chapter(),
            time_gap_hours: default_time_gap_hours(),
            dialogue_enabled: true,
            show_sender_names: true,
            show_images: true,
            image_mode: ImageMode::default(),
            reading_mode: ReadingMode::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the given path, or the default config location.
    /// Unreadable or unparseable files fall back to defaults with a logged
    /// error; a missing file is created with defaults.
    pub fn load(path: Option<&PathBuf>) -> Settings {
        let path = match path {
            Some(explicit) => explicit.clone(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using default settings");
                    return Settings::default();
                }
            },
        };

        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Settings::default();
            settings.save_to(&path);
            return settings;
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(mut settings) => {
                    debug!("Loaded settings from {path:?}");
                    if settings.version < CURRENT_VERSION {
                        migrate_settings(&mut settings);
                        settings.save_to(&path);
                    }
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Settings::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Settings::default()
            }
        }
    }

    pub fn save_to(&self, path: &PathBuf) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create config directory {parent:?}: {e}");
                    return;
                }
            }
        }
        match serde_yaml::to_string(self) {
            Ok(content) => match fs::write(path, content) {
                Ok(()) => debug!("Saved settings to {path:?}"),
                Err(e) => error!("Failed to save settings to {path:?}: {e}"),
            },
            Err(e) => error!("Failed to serialize settings: {e}"),
        }
    }

    pub fn chapter_settings(&self) -> ChapterSettings {
        ChapterSettings {
            mode: self.chapter_mode,
            messages_per_chapter: self.messages_per_chapter.max(1),
            time_gap_hours: if self.time_gap_hours > 0.0 {
                self.time_gap_hours
            } else {
                default_time_gap_hours()
            },
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn default_bookmarks_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join("bookmarks.json"))
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // Future migrations go here:
    // if settings.version < 2 {
    //     migrate_v1_to_v2(settings);
    // }

    settings.version = CURRENT_VERSION;
}
