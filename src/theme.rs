//! Overlay styling: per-kind colors, emphasis effects and label chips.

use lexi_draw::Color;

use crate::annotation::AnnotationKind;
use crate::color_utils::{hsv_color, palette_hue};

/// Theme choice, dark or light label chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

/// Which emphasis style the hover layer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Hover,
    Focus,
    Discovered,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub choice: ThemeChoice,
    /// Box outline width in display pixels
    pub stroke_width: f32,
    /// Opacity of the box fill tint
    pub fill_alpha: f32,
    /// Emphasis outline width
    pub emphasis_width: f32,
    /// How far the glow extends past the box
    pub glow_radius: f32,
    pub label_size: f32,
    /// Padding inside a label chip
    pub label_padding: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            choice: ThemeChoice::Dark,
            stroke_width: 2.0,
            fill_alpha: 0.15,
            emphasis_width: 3.0,
            glow_radius: 6.0,
            label_size: 14.0,
            label_padding: 4.0,
        }
    }

    pub fn light() -> Self {
        Self {
            choice: ThemeChoice::Light,
            ..Self::dark()
        }
    }

    /// Outline color for an annotation kind.
    pub fn kind_color(&self, kind: AnnotationKind) -> Color {
        let kinds = AnnotationKind::all();
        let index = kinds.iter().position(|k| *k == kind).unwrap_or(0);
        hsv_color(palette_hue(index, kinds.len()), 0.75, 0.95)
    }

    pub fn kind_fill(&self, kind: AnnotationKind) -> Color {
        self.kind_color(kind).with_alpha(self.fill_alpha)
    }

    pub fn emphasis_color(&self, emphasis: Emphasis) -> Color {
        match emphasis {
            Emphasis::Hover => Color::rgb(1.0, 0.85, 0.2),
            Emphasis::Focus => Color::rgb(0.3, 0.6, 0.9),
            Emphasis::Discovered => Color::rgb(0.3, 0.85, 0.45),
        }
    }

    pub fn glow_color(&self, emphasis: Emphasis) -> Color {
        self.emphasis_color(emphasis).with_alpha(0.35)
    }

    pub fn label_background(&self) -> Color {
        match self.choice {
            ThemeChoice::Dark => Color::new(0.1, 0.1, 0.1, 0.8),
            ThemeChoice::Light => Color::new(0.97, 0.97, 0.97, 0.9),
        }
    }

    pub fn label_text(&self) -> Color {
        match self.choice {
            ThemeChoice::Dark => Color::rgb(0.95, 0.95, 0.95),
            ThemeChoice::Light => Color::rgb(0.1, 0.1, 0.1),
        }
    }

    /// Secondary text (translations) in tooltips.
    pub fn secondary_text(&self) -> Color {
        match self.choice {
            ThemeChoice::Dark => Color::rgb(0.7, 0.7, 0.7),
            ThemeChoice::Light => Color::rgb(0.4, 0.4, 0.4),
        }
    }

    /// Fill shown in place of an image that failed to load.
    pub fn placeholder_color(&self) -> Color {
        match self.choice {
            ThemeChoice::Dark => Color::rgb(0.2, 0.2, 0.2),
            ThemeChoice::Light => Color::rgb(0.88, 0.88, 0.88),
        }
    }

    pub fn placeholder_border(&self) -> Color {
        match self.choice {
            ThemeChoice::Dark => Color::rgb(0.4, 0.4, 0.4),
            ThemeChoice::Light => Color::rgb(0.7, 0.7, 0.7),
        }
    }
}
