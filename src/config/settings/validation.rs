// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{RecallError, Result};

use super::Settings;

impl Settings {
    /// Reject settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        let recall = &self.recall;
        let limits = [
            ("recall.ring_capacity", recall.ring_capacity),
            ("recall.flush_threshold", recall.flush_threshold),
            ("recall.max_resident_segments", recall.max_resident_segments),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(RecallError::Config(format!("{} must be at least 1", name)));
            }
        }

        if self.image.request_timeout_secs == 0 {
            return Err(RecallError::Config(
                "image.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(url) = &self.image.rkey_server_url {
            url::Url::parse(url).map_err(|e| {
                RecallError::Config(format!("Invalid image.rkey_server_url {}: {}", url, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut settings = Settings::default();
        settings.recall.flush_threshold = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("recall.flush_threshold"));

        let mut settings = Settings::default();
        settings.recall.max_resident_segments = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bad_rkey_url_rejected() {
        let mut settings = Settings::default();
        settings.image.rkey_server_url = Some("not a url".to_string());
        assert!(settings.validate().is_err());
    }
}
