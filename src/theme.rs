use std::str::FromStr;

use tuirealm::ratatui::style::Color;

use crate::types::Priority;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ThemePreset {
    #[default]
    Default,
    Light,
    HighContrast,
    Mono,
}

impl ThemePreset {
    pub const ALL: [Self; 4] = [Self::Default, Self::Light, Self::HighContrast, Self::Mono];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Light => "light",
            Self::HighContrast => "high-contrast",
            Self::Mono => "mono",
        }
    }
}

impl FromStr for ThemePreset {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "light" | "day" => Ok(Self::Light),
            "high-contrast" | "high_contrast" | "contrast" => Ok(Self::HighContrast),
            "mono" | "monochrome" => Ok(Self::Mono),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub base: BasePalette,
    pub priority: PriorityPalette,
    pub board: BoardPalette,
    pub dialog: DialogPalette,
}

#[derive(Debug, Clone, Copy)]
pub struct BasePalette {
    pub text: Color,
    pub text_muted: Color,
    pub header: Color,
    pub accent: Color,
    pub success: Color,
    pub danger: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct PriorityPalette {
    pub low: Color,
    pub medium: Color,
    pub high: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct BoardPalette {
    pub border: Color,
    pub focused_border: Color,
    pub selected_bg: Color,
    pub overdue: Color,
    pub due_date: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct DialogPalette {
    pub border: Color,
    pub field_focused: Color,
    pub button_focused_bg: Color,
    pub button_focused_fg: Color,
    pub error: Color,
}

impl Theme {
    pub fn from_preset(preset: ThemePreset) -> Self {
        match preset {
            ThemePreset::Default => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::DarkGray,
                    header: Color::Cyan,
                    accent: Color::Magenta,
                    success: Color::Green,
                    danger: Color::Red,
                },
                priority: PriorityPalette {
                    low: Color::Blue,
                    medium: Color::Yellow,
                    high: Color::LightRed,
                },
                board: BoardPalette {
                    border: Color::DarkGray,
                    focused_border: Color::Cyan,
                    selected_bg: Color::Rgb(54, 48, 72),
                    overdue: Color::Red,
                    due_date: Color::Gray,
                },
                dialog: DialogPalette {
                    border: Color::Cyan,
                    field_focused: Color::Yellow,
                    button_focused_bg: Color::Blue,
                    button_focused_fg: Color::White,
                    error: Color::LightRed,
                },
            },
            ThemePreset::Light => Self {
                base: BasePalette {
                    text: Color::Rgb(32, 38, 51),
                    text_muted: Color::Rgb(95, 105, 122),
                    header: Color::Rgb(37, 99, 235),
                    accent: Color::Rgb(2, 132, 199),
                    success: Color::Rgb(22, 163, 74),
                    danger: Color::Rgb(185, 28, 28),
                },
                priority: PriorityPalette {
                    low: Color::Rgb(14, 116, 144),
                    medium: Color::Rgb(202, 138, 4),
                    high: Color::Rgb(185, 28, 28),
                },
                board: BoardPalette {
                    border: Color::Rgb(196, 208, 224),
                    focused_border: Color::Rgb(37, 99, 235),
                    selected_bg: Color::Rgb(227, 237, 255),
                    overdue: Color::Rgb(185, 28, 28),
                    due_date: Color::Rgb(95, 105, 122),
                },
                dialog: DialogPalette {
                    border: Color::Rgb(37, 99, 235),
                    field_focused: Color::Rgb(202, 138, 4),
                    button_focused_bg: Color::Rgb(37, 99, 235),
                    button_focused_fg: Color::White,
                    error: Color::Rgb(185, 28, 28),
                },
            },
            ThemePreset::HighContrast => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::Gray,
                    header: Color::LightCyan,
                    accent: Color::LightBlue,
                    success: Color::LightGreen,
                    danger: Color::LightRed,
                },
                priority: PriorityPalette {
                    low: Color::LightBlue,
                    medium: Color::LightYellow,
                    high: Color::LightRed,
                },
                board: BoardPalette {
                    border: Color::Gray,
                    focused_border: Color::LightCyan,
                    selected_bg: Color::Rgb(60, 60, 60),
                    overdue: Color::LightRed,
                    due_date: Color::Gray,
                },
                dialog: DialogPalette {
                    border: Color::LightCyan,
                    field_focused: Color::LightYellow,
                    button_focused_bg: Color::LightBlue,
                    button_focused_fg: Color::Black,
                    error: Color::LightRed,
                },
            },
            ThemePreset::Mono => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::DarkGray,
                    header: Color::White,
                    accent: Color::White,
                    success: Color::White,
                    danger: Color::White,
                },
                priority: PriorityPalette {
                    low: Color::DarkGray,
                    medium: Color::Gray,
                    high: Color::White,
                },
                board: BoardPalette {
                    border: Color::DarkGray,
                    focused_border: Color::White,
                    selected_bg: Color::Rgb(50, 50, 50),
                    overdue: Color::White,
                    due_date: Color::Gray,
                },
                dialog: DialogPalette {
                    border: Color::White,
                    field_focused: Color::White,
                    button_focused_bg: Color::White,
                    button_focused_fg: Color::Black,
                    error: Color::White,
                },
            },
        }
    }

    pub fn priority_color(&self, priority: Priority) -> Color {
        match priority {
            Priority::Low => self.priority.low,
            Priority::Medium => self.priority.medium,
            Priority::High => self.priority.high,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_preset(ThemePreset::Default)
    }
}
