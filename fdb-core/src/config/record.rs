//! Binary configuration record
//!
//! A postcard-encoded, versioned copy of [`StorageConfig`] for boards that
//! keep their storage layout in a reserved flash sector or in OTP rather
//! than compiled in.

use super::{ConfigError, StorageConfig, CONFIG_VERSION};

/// Upper bound for an encoded record
pub const MAX_RECORD_SIZE: usize = 64;

impl StorageConfig {
    /// Encode into `buf`, returning the used prefix
    pub fn to_record<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Decode a record produced by [`to_record`](Self::to_record)
    ///
    /// Rejects records written by a different config version.
    pub fn from_record(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: StorageConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if config.version != CONFIG_VERSION {
            warn!(
                "Config record version mismatch: found {}, expected {}",
                config.version,
                CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch {
                found: config.version,
            });
        }

        Ok(config)
    }
}
