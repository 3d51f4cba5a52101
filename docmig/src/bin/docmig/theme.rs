use colored::Color;

/// Colors of the docmig CLI. Help output maps the same roles onto clap styles.
pub struct Palette {
    pub ok: Color,
    pub failure: Color,
    pub caution: Color,
    pub heading: Color,
    pub progress: Color,
    pub command: Color,
    pub placeholder: Color,
    pub label: Color,
    pub text: Color,
}

pub const PALETTE: Palette = Palette {
    ok: Color::Green,
    failure: Color::Red,
    caution: Color::Yellow,
    heading: Color::BrightBlue,
    progress: Color::Cyan,
    command: Color::Magenta,
    placeholder: Color::BrightBlack,
    label: Color::BrightCyan,
    text: Color::White,
};

pub const OK_ICON: &str = "✓";
pub const FAILURE_ICON: &str = "✗";
pub const CAUTION_ICON: &str = "⚠";
pub const STEP_ICON: &str = "→";
pub const HINT_ICON: &str = "•";
pub const PROGRESS_ICON: &str = "⟳";

/// What a marker record says about one migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Applied,
    RolledBack,
    /// Marker holding nothing but its id, written by an older tool.
    Bare,
}

impl MarkerState {
    pub fn icon(self) -> &'static str {
        match self {
            MarkerState::Applied => "✓",
            MarkerState::RolledBack => "↺",
            MarkerState::Bare => "?",
        }
    }

    pub fn color(self) -> Color {
        match self {
            MarkerState::Applied => PALETTE.ok,
            MarkerState::RolledBack => PALETTE.command,
            MarkerState::Bare => PALETTE.caution,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerState::Applied => "applied",
            MarkerState::RolledBack => "rolled back",
            MarkerState::Bare => "id only",
        }
    }
}
