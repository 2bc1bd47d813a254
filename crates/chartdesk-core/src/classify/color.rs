use crate::chart::ColorScheme;
use crate::patterns::{first_match, COLOR_SCHEME_RULES};

/// Brand scheme signalled by `message`, BNR taking precedence over FD.
///
/// `None` means there was no signal and the caller picks its own default.
pub fn classify_color_scheme(message: &str) -> Option<ColorScheme> {
    first_match(&COLOR_SCHEME_RULES, &message.to_lowercase())
}
