use serde::{Deserialize, Serialize};

/// The two chart shapes the service is willing to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChartType::Bar => "Bar",
            ChartType::Line => "Line",
        }
    }

    /// Axis captions used when a chart is synthesized from bare key=value data.
    pub fn default_axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            ChartType::Bar => ("Category", "Value"),
            ChartType::Line => ("Time", "Value"),
        }
    }
}

/// Brand color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Fd,
    Bnr,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Fd => "fd",
            ColorScheme::Bnr => "bnr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fd" => Some(ColorScheme::Fd),
            "bnr" => Some(ColorScheme::Bnr),
            _ => None,
        }
    }

    pub fn all() -> Vec<ColorScheme> {
        vec![ColorScheme::Fd, ColorScheme::Bnr]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ColorScheme::Fd => "FD (Financieele Dagblad)",
            ColorScheme::Bnr => "BNR (BNR Nieuwsradio)",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ColorScheme::Fd => Palette {
                primary: "#379596",
                content: "#191919",
                background: "#ffeadb",
            },
            ColorScheme::Bnr => Palette {
                primary: "#ffd200",
                content: "#000000",
                background: "#ffffff",
            },
        }
    }
}

/// Colors for one scheme, as `#rrggbb` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    /// Ink for text, ticks and axis lines.
    pub content: &'static str,
    pub background: &'static str,
}

/// Parse `#rgb` or `#rrggbb` into its components.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.is_ascii() {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_scheme_round_trips_through_str() {
        for scheme in ColorScheme::all() {
            assert_eq!(ColorScheme::from_str(scheme.as_str()), Some(scheme));
        }
        assert_eq!(ColorScheme::from_str(" BNR "), Some(ColorScheme::Bnr));
        assert_eq!(ColorScheme::from_str("purple"), None);
    }

    #[test]
    fn test_default_scheme_is_fd() {
        assert_eq!(ColorScheme::default(), ColorScheme::Fd);
    }

    #[test]
    fn test_palettes_parse_as_rgb() {
        for scheme in ColorScheme::all() {
            let palette = scheme.palette();
            assert!(hex_to_rgb(palette.primary).is_some());
            assert!(hex_to_rgb(palette.content).is_some());
            assert!(hex_to_rgb(palette.background).is_some());
        }
        assert_eq!(hex_to_rgb("#379596"), Some((0x37, 0x95, 0x96)));
        assert_eq!(hex_to_rgb("#000"), Some((0, 0, 0)));
        assert_eq!(hex_to_rgb("#12345"), None);
    }

    #[test]
    fn test_axis_labels_follow_chart_type() {
        assert_eq!(ChartType::Bar.default_axis_labels(), ("Category", "Value"));
        assert_eq!(ChartType::Line.default_axis_labels(), ("Time", "Value"));
    }

    #[test]
    fn test_chart_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChartType::Line).unwrap();
        assert_eq!(json, "\"line\"");
        let scheme: ColorScheme = serde_json::from_str("\"bnr\"").unwrap();
        assert_eq!(scheme, ColorScheme::Bnr);
    }
}
