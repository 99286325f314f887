//! Wish content validation.

use crate::config::LimitsConfig;
use serde::Deserialize;
use time::OffsetDateTime;

/// Theme applied when the creator picks none.
pub const DEFAULT_THEME: &str = "default";

/// A wish as submitted by a creator, before it gets a slug or a row id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWish {
    pub title: Option<String>,
    pub message: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub max_views: Option<i64>,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl NewWish {
    /// Validate content against the configured limits.
    ///
    /// A wish with neither `expires_at` nor `max_views` would never die, so
    /// at least one of the two is required at creation time.
    pub fn validate(&self, limits: &LimitsConfig) -> crate::Result<()> {
        if self.message.trim().is_empty() {
            return Err(crate::Error::EmptyMessage);
        }
        check_len("message", &self.message, limits.max_message_chars)?;
        if let Some(title) = &self.title {
            check_len("title", title, limits.max_title_chars)?;
        }
        check_len("theme", &self.theme, limits.max_theme_chars)?;

        if self.expires_at.is_none() && self.max_views.is_none() {
            return Err(crate::Error::MissingExpiry);
        }
        if let Some(max_views) = self.max_views {
            if max_views < 1 || max_views > limits.max_views_cap {
                return Err(crate::Error::InvalidMaxViews {
                    value: max_views,
                    max: limits.max_views_cap,
                });
            }
        }
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> crate::Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(crate::Error::FieldTooLong { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wish() -> NewWish {
        NewWish {
            title: Some("Happy Birthday".to_string()),
            message: "Have a great day!".to_string(),
            theme: DEFAULT_THEME.to_string(),
            expires_at: None,
            max_views: Some(1),
        }
    }

    #[test]
    fn valid_wish_passes() {
        wish().validate(&LimitsConfig::default()).unwrap();
    }

    #[test]
    fn requires_at_least_one_limit() {
        let mut w = wish();
        w.max_views = None;
        w.expires_at = None;
        assert!(matches!(
            w.validate(&LimitsConfig::default()),
            Err(crate::Error::MissingExpiry)
        ));
    }

    #[test]
    fn expires_at_alone_is_enough() {
        let mut w = wish();
        w.max_views = None;
        w.expires_at = Some(OffsetDateTime::now_utc());
        w.validate(&LimitsConfig::default()).unwrap();
    }

    #[test]
    fn rejects_blank_message() {
        let mut w = wish();
        w.message = "   ".to_string();
        assert!(matches!(
            w.validate(&LimitsConfig::default()),
            Err(crate::Error::EmptyMessage)
        ));
    }

    #[test]
    fn rejects_oversized_message() {
        let limits = LimitsConfig::default();
        let mut w = wish();
        w.message = "x".repeat(limits.max_message_chars + 1);
        assert!(matches!(
            w.validate(&limits),
            Err(crate::Error::FieldTooLong { field: "message", .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_max_views() {
        let limits = LimitsConfig::default();
        let mut w = wish();
        w.max_views = Some(0);
        assert!(w.validate(&limits).is_err());
        w.max_views = Some(limits.max_views_cap + 1);
        assert!(w.validate(&limits).is_err());
        w.max_views = Some(limits.max_views_cap);
        w.validate(&limits).unwrap();
    }
}
