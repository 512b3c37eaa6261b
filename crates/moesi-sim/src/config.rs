//! System configuration loading: JSON files plus command-line overrides.

use std::fs;
use std::path::Path;

use moesi_core::{CacheConfig, CacheId, SystemConfig, DEFAULT_INDEX_BITS, DEFAULT_LINE_COUNT};

use crate::errors::SimError;

/// Flag values that replace fields of the loaded configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replace the cache list with this many uniform caches, IDs from 0.
    pub caches: Option<u8>,
    /// Lines per cache, applied to every cache.
    pub lines: Option<u32>,
    /// Index bits per cache, applied to every cache.
    pub index_bits: Option<u8>,
    /// System-wide block size.
    pub block_size: Option<u32>,
    /// System-wide address width.
    pub address_bits: Option<u8>,
}

impl ConfigOverrides {
    /// Applies every set override to `config`.
    pub fn apply(&self, config: &mut SystemConfig) {
        if let Some(count) = self.caches {
            let template = config.caches.first().copied();
            config.caches = (0..count)
                .map(|id| CacheConfig {
                    id: CacheId(id),
                    line_count: template.map_or(DEFAULT_LINE_COUNT, |cache| cache.line_count),
                    index_bits: template.map_or(DEFAULT_INDEX_BITS, |cache| cache.index_bits),
                })
                .collect();
        }
        for cache in &mut config.caches {
            if let Some(lines) = self.lines {
                cache.line_count = lines;
            }
            if let Some(index_bits) = self.index_bits {
                cache.index_bits = index_bits;
            }
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(address_bits) = self.address_bits {
            config.address_bits = address_bits;
        }
    }
}

/// Reads a configuration from `path`, or starts from the default, then
/// applies `overrides`.
///
/// Missing JSON fields take their default values.
///
/// # Errors
///
/// Returns [`SimError::Io`] or [`SimError::Json`] when the file cannot be
/// read or decoded. Geometry is validated later, when the system is built.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<SystemConfig, SimError> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| SimError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| SimError::Json {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => SystemConfig::default(),
    };
    overrides.apply(&mut config);
    log::debug!("loaded config: {config:?}");
    Ok(config)
}

/// The default configuration as pretty-printed JSON.
///
/// # Errors
///
/// Propagates serializer failures, which do not occur for this type.
pub fn default_config_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&SystemConfig::default())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use moesi_core::{CacheId, SystemConfig, DEFAULT_BLOCK_SIZE};

    use super::{default_config_json, load_config, ConfigOverrides};
    use crate::errors::SimError;

    #[test]
    fn no_file_and_no_overrides_is_the_default() {
        let config = load_config(None, &ConfigOverrides::default()).expect("default config");
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn cache_count_override_keeps_the_first_cache_shape() {
        let overrides = ConfigOverrides {
            caches: Some(3),
            lines: Some(16),
            block_size: Some(8),
            ..ConfigOverrides::default()
        };
        let config = load_config(None, &overrides).expect("config");
        assert_eq!(config.caches.len(), 3);
        assert_eq!(config.caches[2].id, CacheId(2));
        assert!(config.caches.iter().all(|cache| cache.line_count == 16));
        assert_eq!(config.block_size, 8);
    }

    #[test]
    fn json_fields_default_when_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("system.json");
        fs::write(
            &path,
            r#"{"address_bits": 12, "caches": [{"id": 5, "line_count": 4, "index_bits": 1}]}"#,
        )
        .expect("write config");

        let config = load_config(Some(&path), &ConfigOverrides::default()).expect("config");
        assert_eq!(config.address_bits, 12);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.caches[0].id, CacheId(5));
    }

    #[test]
    fn unreadable_and_malformed_files_are_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_config(Some(&missing), &ConfigOverrides::default()),
            Err(SimError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").expect("write config");
        assert!(matches!(
            load_config(Some(&broken), &ConfigOverrides::default()),
            Err(SimError::Json { .. })
        ));
    }

    #[test]
    fn default_json_decodes_back() {
        let json = default_config_json().expect("serializable");
        let decoded: SystemConfig = serde_json::from_str(&json).expect("decodable");
        assert_eq!(decoded, SystemConfig::default());
    }
}
