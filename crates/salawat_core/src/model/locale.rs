//! Display locale for count rendering.
//!
//! The app ships English and Arabic text; counts follow the active language.

use serde::{Deserialize, Serialize};

const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];
const ARABIC_THOUSANDS_SEPARATOR: char = '\u{066C}';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLocale {
    /// ASCII digits grouped with `,`.
    #[default]
    English,
    /// Arabic-Indic digits grouped with `٬`.
    Arabic,
}

impl DisplayLocale {
    /// Maps a language tag to a display locale.
    ///
    /// `ar` and any `ar-*`/`ar_*` tag select Arabic; everything else is English.
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        let language = normalized
            .split(['-', '_'])
            .next()
            .unwrap_or_default();
        if language == "ar" {
            Self::Arabic
        } else {
            Self::English
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Arabic => "ar",
        }
    }

    /// Groups canonical decimal text into thousands.
    ///
    /// Input must be ASCII decimal digits; other characters pass through.
    pub fn group_digits(self, digits: &str) -> String {
        let separator = match self {
            Self::English => ',',
            Self::Arabic => ARABIC_THOUSANDS_SEPARATOR,
        };

        let len = digits.len();
        let mut out = String::with_capacity(len + len / 3 * 2);
        for (index, ch) in digits.chars().enumerate() {
            if index > 0 && (len - index) % 3 == 0 {
                out.push(separator);
            }
            out.push(self.localize_digit(ch));
        }
        out
    }

    fn localize_digit(self, ch: char) -> char {
        match (self, ch.to_digit(10)) {
            (Self::Arabic, Some(value)) => ARABIC_INDIC_DIGITS[value as usize],
            _ => ch,
        }
    }
}
