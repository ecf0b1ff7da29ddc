use crate::settings::Settings;

/// Color palette for the exported document, as CSS hex values.
#[derive(Debug, Clone)]
pub struct ReaderPalette {
    pub name: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub border: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub user_accent: &'static str,
    pub character_accent: &'static str,
    pub dialogue: &'static str,
    pub link: &'static str,
    pub code_bg: &'static str,
    pub highlight: &'static str,
}

// Oceanic Next theme
pub static OCEANIC_NEXT: ReaderPalette = ReaderPalette {
    name: "Oceanic Next",
    background: "#1B2B34",
    surface: "#343D46",
    border: "#4F5B66",
    text: "#C0C5CE",
    muted: "#65737E",
    user_accent: "#99C794",
    character_accent: "#6699CC",
    dialogue: "#FAC863",
    link: "#5FB3B3",
    code_bg: "#343D46",
    highlight: "#FAC863",
};

// Catppuccin Mocha theme
pub static CATPPUCCIN_MOCHA: ReaderPalette = ReaderPalette {
    name: "Catppuccin Mocha",
    background: "#1E1E2E",
    surface: "#313244",
    border: "#45475A",
    text: "#CDD6F4",
    muted: "#6C7086",
    user_accent: "#A6E3A1",
    character_accent: "#89B4FA",
    dialogue: "#F9E2AF",
    link: "#94E2D5",
    code_bg: "#313244",
    highlight: "#F9E2AF",
};

static ALL_PALETTES: &[&ReaderPalette] = &[&OCEANIC_NEXT, &CATPPUCCIN_MOCHA];

pub fn all_palettes() -> &'static [&'static ReaderPalette] {
    ALL_PALETTES
}

pub fn palette_by_name(name: &str) -> &'static ReaderPalette {
    all_palettes()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .copied()
        .unwrap_or(&OCEANIC_NEXT)
}

impl ReaderPalette {
    /// Renders the palette plus typography settings as CSS custom
    /// properties for the export document.
    pub fn css_variables(&self, settings: &Settings) -> String {
        format!(
            ":root {{\n  --bg: {};\n  --surface: {};\n  --border: {};\n  --text: {};\n  --muted: {};\n  --user-accent: {};\n  --character-accent: {};\n  --dialogue: {};\n  --link: {};\n  --code-bg: {};\n  --highlight: {};\n  --font-size: {}px;\n  --line-height: {};\n  --content-width: {}px;\n  --font-family: {};\n}}",
            self.background,
            self.surface,
            self.border,
            self.text,
            self.muted,
            self.user_accent,
            self.character_accent,
            self.dialogue,
            self.link,
            self.code_bg,
            self.highlight,
            settings.font_size,
            settings.line_height,
            settings.content_width,
            settings.font_family,
        )
    }
}
