use std::collections::BTreeMap;
use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::FieldValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Resolve a CSS colour name (`"pink"`) or hex code (`"#1f77b4"`).
pub fn parse_color(text: &str) -> Option<Color32> {
    let text = text.trim();
    let rgb: Srgb<u8> = if text.starts_with('#') {
        Srgb::<u8>::from_str(text).ok()?
    } else {
        palette::named::from_str(&text.to_ascii_lowercase())?
    };
    Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue))
}

// ---------------------------------------------------------------------------
// Ordinal colour scale: category → Color32
// ---------------------------------------------------------------------------

/// Maps category keys to colours, like an ordinal scale with an explicit
/// domain and range.
#[derive(Debug, Clone)]
pub struct ColorScale {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorScale {
    /// Pair each domain entry with the colour at the same position.
    /// Unparseable colour names fall back to generated hues.
    pub fn ordinal(domain: &[String], range: &[String]) -> Self {
        let fallback = generate_palette(domain.len());
        let mapping = domain
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let color = range
                    .get(i)
                    .and_then(|name| {
                        let parsed = parse_color(name);
                        if parsed.is_none() {
                            log::warn!("unknown colour '{name}' for '{key}'");
                        }
                        parsed
                    })
                    .unwrap_or(fallback[i]);
                (key.clone(), color)
            })
            .collect();

        ColorScale {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// One generated hue per category.
    pub fn generated(domain: &[&str]) -> Self {
        let mapping = domain
            .iter()
            .zip(generate_palette(domain.len()))
            .map(|(k, c)| (k.to_string(), c))
            .collect();
        ColorScale {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a category.
    pub fn color_for(&self, key: &str) -> Color32 {
        self.mapping
            .get(key)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Colour for a key value; non-text keys get the default colour.
    pub fn color_for_value(&self, key: &FieldValue) -> Color32 {
        key.as_text()
            .map(|k| self.color_for(k))
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (category → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(k, c)| (k.clone(), *c))
            .collect()
    }
}
