use anyhow::{Context, Result};
use chatokrat::bookmark::BookmarkStore;
use chatokrat::chapterizer::ChapterMode;
use chatokrat::export::{ExportInput, HtmlExporter};
use chatokrat::message::Transcript;
use chatokrat::outline::render_outline;
use chatokrat::renderer::ChatRenderer;
use chatokrat::search::search_chapters;
use chatokrat::session::ReaderSession;
use chatokrat::settings::{Settings, default_bookmarks_path};
use chatokrat::transform::{NoopTransform, RegexRuleSet, TextTransform};
use clap::Parser;
use log::{LevelFilter, info};
use simplelog::{Config, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chatokrat",
    version,
    about = "Render a chat transcript into a chaptered, searchable HTML book"
)]
struct Cli {
    /// Chat transcript (JSON lines: header record, then one message per line)
    input: PathBuf,

    /// Output HTML file (defaults to the input name with an .html extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run a search over the transcript instead of exporting
    #[arg(long)]
    search: Option<String>,

    /// Chapter mode: none, count, time or both
    #[arg(long)]
    chapter_mode: Option<String>,

    /// Messages per chapter for count/both modes
    #[arg(long)]
    messages_per_chapter: Option<usize>,

    /// Time gap in hours for time/both modes
    #[arg(long)]
    time_gap_hours: Option<f64>,

    /// Theme name override
    #[arg(long)]
    theme: Option<String>,

    /// Transform rules file (JSON array of {find, replace, scope})
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Settings file (defaults to the per-user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a debug log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log_file {
        let log_file = File::create(log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
            .context("Failed to initialize logger")?;
    }

    let mut settings = Settings::load(cli.config.as_ref());
    apply_overrides(&mut settings, &cli)?;

    let transcript = Transcript::load(&cli.input)
        .with_context(|| format!("Failed to load transcript {}", cli.input.display()))?;
    info!(
        "Loaded {} messages for session {}",
        transcript.messages.len(),
        transcript.session_id
    );

    let transform: Box<dyn TextTransform> = match &cli.rules {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rules file {}", path.display()))?;
            let rules = RegexRuleSet::from_json(&json)
                .with_context(|| format!("Failed to parse rules file {}", path.display()))?;
            info!("Loaded {} transform rules", rules.len());
            Box::new(rules)
        }
        None => Box::new(NoopTransform),
    };

    let mut session = ReaderSession::new(transcript, settings);

    let store_path = default_bookmarks_path();
    let store = BookmarkStore::load_or_ephemeral(store_path.as_deref().and_then(|p| p.to_str()));
    let chapter_names = store.chapter_names_for(session.session_id());
    session.apply_chapter_names(&chapter_names);

    if let Some(query) = &cli.search {
        run_search(&session, query);
        return Ok(());
    }

    let renderer = ChatRenderer::new();
    let chapter_html = session.render_chapters(&renderer, transform.as_ref());
    let outline = render_outline(
        session.chapters(),
        store.bookmarks_for(session.session_id()),
    );

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("html"));
    let base_dir = cli.input.parent().map(|p| p.to_path_buf());

    let exporter = HtmlExporter::new();
    exporter.export_to_file(
        &ExportInput {
            session: &session,
            chapter_html: &chapter_html,
            outline_html: &outline,
            height_channel: "chatokrat-frame-height",
            base_dir: base_dir.as_deref(),
        },
        &output,
    )?;

    println!(
        "Exported {} chapters to {}",
        session.chapters().len(),
        output.display()
    );
    Ok(())
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) -> Result<()> {
    if let Some(mode) = &cli.chapter_mode {
        settings.chapter_mode = match mode.as_str() {
            "none" => ChapterMode::None,
            "count" => ChapterMode::Count,
            "time" => ChapterMode::Time,
            "both" => ChapterMode::Both,
            other => anyhow::bail!("Unknown chapter mode '{other}' (expected none, count, time or both)"),
        };
    }
    if let Some(per_chapter) = cli.messages_per_chapter {
        settings.messages_per_chapter = per_chapter;
    }
    if let Some(gap) = cli.time_gap_hours {
        settings.time_gap_hours = gap;
    }
    if let Some(theme) = &cli.theme {
        settings.theme = theme.clone();
    }
    Ok(())
}

fn run_search(session: &ReaderSession, query: &str) {
    let results = search_chapters(session.chapters(), session.messages(), query);
    println!("{} match(es) for \"{query}\"", results.total);
    for hit in &results.hits {
        let chapter_title = session
            .chapters()
            .get(hit.chapter_index)
            .map(|c| c.title.as_str())
            .unwrap_or("?");
        println!(
            "  [{}] message {}: {}",
            chapter_title, hit.sequence_index, hit.context_text
        );
    }
    if results.total > results.hits.len() {
        println!("  … {} more not shown", results.total - results.hits.len());
    }
}
