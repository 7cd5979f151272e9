// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Dotted-key access to settings, e.g. `recall.flush_threshold`

use serde_json::Value;

use crate::error::{RecallError, Result};

use super::Settings;

fn unknown(key: &str) -> RecallError {
    RecallError::InvalidInput(format!("Unknown setting: {}", key))
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |value, part| value.get(part))
}

/// A raw command-line value: JSON when it parses, a plain string otherwise
fn parse_raw(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl Settings {
    /// Current value of a setting
    pub fn get_key(&self, key: &str) -> Result<Value> {
        let root = serde_json::to_value(self)?;
        lookup(&root, key).cloned().ok_or_else(|| unknown(key))
    }

    /// Set one setting, checking its type and the resulting settings
    pub fn set_key(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut root = serde_json::to_value(&*self)?;

        let (section, leaf) = key.rsplit_once('.').ok_or_else(|| unknown(key))?;
        let slot = section
            .split('.')
            .try_fold(&mut root, |value, part| value.get_mut(part))
            .and_then(|parent| parent.get_mut(leaf))
            .filter(|slot| !slot.is_object())
            .ok_or_else(|| unknown(key))?;
        *slot = parse_raw(raw);

        let updated: Settings = serde_json::from_value(root).map_err(|e| {
            RecallError::InvalidInput(format!("Invalid value for {}: {}", key, e))
        })?;
        updated.validate()?;

        *self = updated;
        Ok(())
    }
}
