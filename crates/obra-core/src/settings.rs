//! Application settings model

use serde::{Deserialize, Serialize};

/// Client-side application settings.
///
/// Loaded once on startup and saved on every change. These are best-effort
/// caches of UI state, never sources of truth: losing them costs a re-upload
/// of the logo or a re-registration prompt, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    /// Business logo shown in the app header, as a data URL
    pub logo: Option<String>,
    /// Whether this installation already registered a push endpoint
    pub push_registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert!(settings.logo.is_none());
        assert!(!settings.push_registered);
    }
}
