//! Light and dark themes for the control panel.

use eframe::egui::{
    self, style::WidgetVisuals, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals,
};

/// Colours of one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color32,
    pub panel: Color32,
    pub input: Color32,
    pub border: Color32,
    pub text: Color32,
    pub text_muted: Color32,
    pub hover: Color32,
}

pub const DARK: Palette = Palette {
    background: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    panel: Color32::from_rgb(0x1f, 0x1f, 0x1f),
    input: Color32::from_rgb(0x2a, 0x2a, 0x2a),
    border: Color32::from_rgb(0x44, 0x44, 0x44),
    text: Color32::from_rgb(0xe0, 0xe0, 0xe0),
    text_muted: Color32::from_rgb(0x88, 0x88, 0x88),
    hover: Color32::from_rgb(0x3a, 0x3a, 0x3a),
};

pub const LIGHT: Palette = Palette {
    background: Color32::from_rgb(0xf5, 0xf5, 0xf5),
    panel: Color32::from_rgb(0xff, 0xff, 0xff),
    input: Color32::from_rgb(0xf0, 0xf0, 0xf0),
    border: Color32::from_rgb(0xc0, 0xc0, 0xc0),
    text: Color32::from_rgb(0x1a, 0x1a, 0x1a),
    text_muted: Color32::from_rgb(0x66, 0x66, 0x66),
    hover: Color32::from_rgb(0xdd, 0xdd, 0xdd),
};

/// Accent colours shared by both themes.
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x4a, 0x9e, 0xff);
    pub const GREEN: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
    /// Entries holding rejected input.
    pub const RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
}

/// Switches between the light and dark theme.
pub fn apply(ctx: &egui::Context, dark_mode: bool) {
    let palette = if dark_mode { DARK } else { LIGHT };
    let base = if dark_mode {
        Visuals::dark()
    } else {
        Visuals::light()
    };
    ctx.set_visuals(visuals(base, palette));
    configure_fonts_and_spacing(ctx);
}

fn widget(mut w: WidgetVisuals, fill: Color32, text: Color32, border: Color32) -> WidgetVisuals {
    w.bg_fill = fill;
    w.weak_bg_fill = fill;
    w.fg_stroke = Stroke::new(1.0, text);
    w.bg_stroke = Stroke::new(1.0, border);
    w.rounding = Rounding::same(4.0);
    w
}

fn visuals(mut visuals: Visuals, p: Palette) -> Visuals {
    visuals.window_fill = p.panel;
    visuals.panel_fill = p.panel;
    visuals.faint_bg_color = p.background;
    visuals.extreme_bg_color = p.input;

    let w = &mut visuals.widgets;
    w.noninteractive = widget(w.noninteractive, p.input, p.text_muted, p.border);
    w.inactive = widget(w.inactive, p.input, p.text, p.border);
    w.hovered = widget(w.hovered, p.hover, p.text, accent::BLUE);
    w.active = widget(w.active, accent::BLUE, Color32::WHITE, accent::BLUE);
    w.open = widget(w.open, p.input, p.text, p.border);

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(0.3);
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);
    visuals
}

fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.text_styles = [
        (TextStyle::Small, FontId::new(10.0, FontFamily::Monospace)),
        (TextStyle::Body, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Heading, FontId::new(14.0, FontFamily::Monospace)),
        (TextStyle::Monospace, FontId::new(12.0, FontFamily::Monospace)),
    ]
    .into();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    ctx.set_style(style);
}

/// Capture button; green while its mode runs.
pub fn capture_button(text: &str, running: bool) -> egui::Button<'_> {
    let label = egui::RichText::new(text).strong();
    let button = if running {
        egui::Button::new(label.color(Color32::WHITE)).fill(accent::GREEN)
    } else {
        egui::Button::new(label)
    };
    button.rounding(Rounding::same(4.0))
}

pub fn section_header(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(11.0).strong()
}

pub fn form_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0)
}

pub fn stat_value(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.0).color(accent::BLUE)
}
