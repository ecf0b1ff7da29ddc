// Export modules for use in tests
pub mod bookmark;
pub mod chapterizer;
pub mod choices;
pub mod dialogue;
pub mod embedded;
pub mod error;
pub mod export;
pub mod macros;
pub mod markdown;
pub mod message;
pub mod outline;
pub mod renderer;
pub mod search;
pub mod session;
pub mod settings;
pub mod text_utils;
pub mod theme;
pub mod timestamp;
pub mod transform;

// Re-export the main pipeline entry points
pub use chapterizer::{Chapter, ChapterMode, ChapterSettings, chapterize};
pub use message::{Message, Transcript};
pub use renderer::{ChatRenderer, RenderOptions};
pub use session::ReaderSession;
pub use settings::Settings;
