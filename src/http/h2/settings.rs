//! HTTP/2 settings management
//!
//! This module implements HTTP/2 SETTINGS parameters as defined in
//! RFC 7540 Section 6.5: the settings table each side of a connection keeps,
//! its protocol defaults, and the changelog produced when a SETTINGS frame
//! is applied.

use super::error::{Error, Result};
use super::{DEFAULT_HEADER_TABLE_SIZE, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE};
use std::collections::BTreeMap;
use std::fmt;

/// Largest legal SETTINGS_MAX_FRAME_SIZE (2^24 - 1)
pub const MAX_MAX_FRAME_SIZE: u32 = 0x00FF_FFFF;

/// Largest legal flow-control window (2^31 - 1)
pub const MAX_WINDOW_SIZE: u32 = 0x7FFF_FFFF;

/// HTTP/2 settings parameters (RFC 7540 Section 6.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum SettingsParameter {
    /// SETTINGS_HEADER_TABLE_SIZE (0x1)
    /// Allows the sender to inform the remote endpoint of the maximum size
    /// of the header compression table
    HeaderTableSize = 0x1,

    /// SETTINGS_ENABLE_PUSH (0x2)
    /// Used to disable server push
    EnablePush = 0x2,

    /// SETTINGS_MAX_CONCURRENT_STREAMS (0x3)
    /// Indicates the maximum number of concurrent streams
    MaxConcurrentStreams = 0x3,

    /// SETTINGS_INITIAL_WINDOW_SIZE (0x4)
    /// Indicates the sender's initial window size for stream-level flow control
    InitialWindowSize = 0x4,

    /// SETTINGS_MAX_FRAME_SIZE (0x5)
    /// Indicates the size of the largest frame payload
    MaxFrameSize = 0x5,

    /// SETTINGS_MAX_HEADER_LIST_SIZE (0x6)
    /// Advises peer of the maximum size of header list
    MaxHeaderListSize = 0x6,
}

impl SettingsParameter {
    /// Convert to u16
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Create from u16
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x1 => Some(SettingsParameter::HeaderTableSize),
            0x2 => Some(SettingsParameter::EnablePush),
            0x3 => Some(SettingsParameter::MaxConcurrentStreams),
            0x4 => Some(SettingsParameter::InitialWindowSize),
            0x5 => Some(SettingsParameter::MaxFrameSize),
            0x6 => Some(SettingsParameter::MaxHeaderListSize),
            _ => None,
        }
    }

    /// Get parameter name
    pub fn name(&self) -> &'static str {
        match self {
            SettingsParameter::HeaderTableSize => "SETTINGS_HEADER_TABLE_SIZE",
            SettingsParameter::EnablePush => "SETTINGS_ENABLE_PUSH",
            SettingsParameter::MaxConcurrentStreams => "SETTINGS_MAX_CONCURRENT_STREAMS",
            SettingsParameter::InitialWindowSize => "SETTINGS_INITIAL_WINDOW_SIZE",
            SettingsParameter::MaxFrameSize => "SETTINGS_MAX_FRAME_SIZE",
            SettingsParameter::MaxHeaderListSize => "SETTINGS_MAX_HEADER_LIST_SIZE",
        }
    }

    /// Check a value against the range RFC 7540 Section 6.5.2 allows
    pub fn validate(&self, value: u32) -> Result<()> {
        match self {
            SettingsParameter::EnablePush if value > 1 => Err(Error::InvalidSettings(format!(
                "{} must be 0 or 1, got {}",
                self.name(),
                value
            ))),
            SettingsParameter::InitialWindowSize if value > MAX_WINDOW_SIZE => {
                Err(Error::InvalidSettings(format!(
                    "Initial window size {} exceeds maximum (2^31-1)",
                    value
                )))
            }
            SettingsParameter::MaxFrameSize
                if !(DEFAULT_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) =>
            {
                Err(Error::InvalidSettings(format!(
                    "Max frame size {} outside valid range (16384-16777215)",
                    value
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SettingsParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u16())
    }
}

/// One entry of the changelog returned by [`Settings::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingChange {
    /// Raw setting identifier
    pub id: u16,
    /// Value before the update (`None` = unconstrained / never set)
    pub old_value: Option<u32>,
    /// Value after the update
    pub new_value: u32,
}

impl SettingChange {
    /// Known parameter this change refers to
    pub fn parameter(&self) -> Option<SettingsParameter> {
        SettingsParameter::from_u16(self.id)
    }
}

impl fmt::Display for SettingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameter() {
            Some(param) => write!(f, "{}", param.name())?,
            None => write!(f, "UNKNOWN_SETTING (0x{:x})", self.id)?,
        }
        write!(f, " to {} (was ", self.new_value)?;
        match self.old_value {
            Some(old) => write!(f, "{})", old),
            None => write!(f, "-)"),
        }
    }
}

/// HTTP/2 settings table
///
/// Maps setting identifiers to values. An absent key means the parameter is
/// unconstrained. Identifiers this engine does not know are stored like any
/// other so a later lookup by number still finds them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<u16, u32>,
}

impl Settings {
    /// Create empty settings
    pub fn new() -> Self {
        Settings {
            values: BTreeMap::new(),
        }
    }

    /// Create the protocol default settings (RFC 7540 Section 6.5.2)
    ///
    /// MAX_CONCURRENT_STREAMS and MAX_HEADER_LIST_SIZE stay unconstrained.
    pub fn default_settings() -> Self {
        let mut settings = Settings::new();
        settings.set(SettingsParameter::HeaderTableSize, DEFAULT_HEADER_TABLE_SIZE);
        settings.set(SettingsParameter::EnablePush, 1);
        settings.set(SettingsParameter::InitialWindowSize, DEFAULT_INITIAL_WINDOW_SIZE);
        settings.set(SettingsParameter::MaxFrameSize, DEFAULT_MAX_FRAME_SIZE);
        settings
    }

    /// Current value of a parameter
    pub fn get(&self, param: SettingsParameter) -> Option<u32> {
        self.get_raw(param.as_u16())
    }

    /// Current value by raw identifier
    pub fn get_raw(&self, id: u16) -> Option<u32> {
        self.values.get(&id).copied()
    }

    /// Set a single parameter
    pub fn set(&mut self, param: SettingsParameter, value: u32) {
        self.values.insert(param.as_u16(), value);
    }

    /// Overwrite each given key and report what changed
    ///
    /// Pairs are applied in order, so a key repeated within one frame ends
    /// up with its last value and every occurrence appears in the changelog.
    pub fn apply(&mut self, params: &[(u16, u32)]) -> Vec<SettingChange> {
        params
            .iter()
            .map(|&(id, value)| SettingChange {
                id,
                old_value: self.values.insert(id, value),
                new_value: value,
            })
            .collect()
    }

    /// All entries as `(id, value)` pairs, ordered by identifier
    pub fn to_params(&self) -> Vec<(u16, u32)> {
        self.values.iter().map(|(&id, &value)| (id, value)).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get header table size (with default)
    pub fn get_header_table_size(&self) -> u32 {
        self.get(SettingsParameter::HeaderTableSize)
            .unwrap_or(DEFAULT_HEADER_TABLE_SIZE)
    }

    /// Get enable push (with default)
    pub fn get_enable_push(&self) -> bool {
        self.get(SettingsParameter::EnablePush).map_or(true, |v| v != 0)
    }

    /// Get max concurrent streams (None = unlimited)
    pub fn get_max_concurrent_streams(&self) -> Option<u32> {
        self.get(SettingsParameter::MaxConcurrentStreams)
    }

    /// Get initial window size (with default)
    pub fn get_initial_window_size(&self) -> u32 {
        self.get(SettingsParameter::InitialWindowSize)
            .unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Get max frame size (with default)
    pub fn get_max_frame_size(&self) -> u32 {
        self.get(SettingsParameter::MaxFrameSize)
            .unwrap_or(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Get max header list size (None = unlimited)
    pub fn get_max_header_list_size(&self) -> Option<u32> {
        self.get(SettingsParameter::MaxHeaderListSize)
    }

    /// Validate every known parameter in the table
    pub fn validate(&self) -> Result<()> {
        Self::validate_params(&self.to_params())
    }

    /// Validate raw pairs before they are applied
    pub fn validate_params(params: &[(u16, u32)]) -> Result<()> {
        for &(id, value) in params {
            if let Some(param) = SettingsParameter::from_u16(id) {
                param.validate(value)?;
            }
        }
        Ok(())
    }
}

/// Builder for HTTP/2 settings
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Create a new settings builder
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings::new(),
        }
    }

    /// Set header table size
    pub fn header_table_size(mut self, size: u32) -> Self {
        self.settings.set(SettingsParameter::HeaderTableSize, size);
        self
    }

    /// Set enable push
    pub fn enable_push(mut self, enable: bool) -> Self {
        self.settings.set(SettingsParameter::EnablePush, u32::from(enable));
        self
    }

    /// Set max concurrent streams
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.settings.set(SettingsParameter::MaxConcurrentStreams, max);
        self
    }

    /// Set initial window size
    pub fn initial_window_size(mut self, size: u32) -> Self {
        self.settings.set(SettingsParameter::InitialWindowSize, size);
        self
    }

    /// Set max frame size
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.settings.set(SettingsParameter::MaxFrameSize, size);
        self
    }

    /// Set max header list size
    pub fn max_header_list_size(mut self, size: u32) -> Self {
        self.settings.set(SettingsParameter::MaxHeaderListSize, size);
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_parameter_conversion() {
        assert_eq!(SettingsParameter::HeaderTableSize.as_u16(), 0x1);
        assert_eq!(SettingsParameter::EnablePush.as_u16(), 0x2);

        assert_eq!(
            SettingsParameter::from_u16(0x1),
            Some(SettingsParameter::HeaderTableSize)
        );
        assert_eq!(
            SettingsParameter::from_u16(0x6),
            Some(SettingsParameter::MaxHeaderListSize)
        );
        assert_eq!(SettingsParameter::from_u16(0x8), None);
        assert_eq!(SettingsParameter::from_u16(0xff), None);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default_settings();
        assert_eq!(settings.get_header_table_size(), 4096);
        assert!(settings.get_enable_push());
        assert_eq!(settings.get_initial_window_size(), 65535);
        assert_eq!(settings.get_max_frame_size(), 16384);
        assert_eq!(settings.get_max_concurrent_streams(), None);
        assert_eq!(settings.get_max_header_list_size(), None);
    }

    #[test]
    fn test_apply_changes_only_given_key() {
        let mut settings = Settings::default_settings();
        let before = settings.clone();

        let changes = settings.apply(&[(SettingsParameter::MaxFrameSize.as_u16(), 16384)]);
        assert_eq!(
            changes,
            vec![SettingChange {
                id: 0x5,
                old_value: Some(16384),
                new_value: 16384,
            }]
        );
        assert_eq!(settings, before);

        let changes = settings.apply(&[(SettingsParameter::MaxFrameSize.as_u16(), 32768)]);
        assert_eq!(changes[0].old_value, Some(16384));
        assert_eq!(settings.get_max_frame_size(), 32768);

        let changes = settings.apply(&[(SettingsParameter::MaxFrameSize.as_u16(), 65536)]);
        assert_eq!(changes[0].old_value, Some(32768));
        assert_eq!(settings.get_max_frame_size(), 65536);

        assert_eq!(settings.get_header_table_size(), 4096);
        assert!(settings.get_enable_push());
        assert_eq!(settings.get_initial_window_size(), 65535);
        assert_eq!(settings.get_max_concurrent_streams(), None);
    }

    #[test]
    fn test_apply_unconstrained_and_unknown() {
        let mut settings = Settings::default_settings();
        let changes = settings.apply(&[(0x3, 100), (0xab, 9)]);

        assert_eq!(changes[0].old_value, None);
        assert_eq!(changes[0].to_string(), "SETTINGS_MAX_CONCURRENT_STREAMS to 100 (was -)");
        assert_eq!(changes[1].parameter(), None);
        assert_eq!(changes[1].to_string(), "UNKNOWN_SETTING (0xab) to 9 (was -)");

        assert_eq!(settings.get_max_concurrent_streams(), Some(100));
        assert_eq!(settings.get_raw(0xab), Some(9));
    }

    #[test]
    fn test_settings_builder() {
        let settings = SettingsBuilder::new()
            .header_table_size(8192)
            .enable_push(false)
            .max_concurrent_streams(100)
            .initial_window_size(65535)
            .build()
            .unwrap();

        assert_eq!(settings.get_header_table_size(), 8192);
        assert!(!settings.get_enable_push());
        assert_eq!(settings.get_max_concurrent_streams(), Some(100));
        assert_eq!(settings.get_initial_window_size(), 65535);
        assert_eq!(
            settings.to_params(),
            vec![(0x1, 8192), (0x2, 0), (0x3, 100), (0x4, 65535)]
        );
    }

    #[test]
    fn test_settings_validation() {
        let settings = SettingsBuilder::new()
            .initial_window_size(65535)
            .max_frame_size(16384)
            .build();
        assert!(settings.is_ok());

        let settings = SettingsBuilder::new().initial_window_size(0x80000000).build();
        assert!(settings.is_err());

        let settings = SettingsBuilder::new().max_frame_size(1024).build();
        assert!(settings.is_err());

        let settings = SettingsBuilder::new().max_frame_size(16777216).build();
        assert!(settings.is_err());

        assert!(Settings::validate_params(&[(0x2, 2)]).is_err());
        assert!(Settings::validate_params(&[(0x2, 0), (0x77, u32::MAX)]).is_ok());
    }
}
