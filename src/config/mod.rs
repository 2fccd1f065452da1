use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
mod types;

pub use types::*;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub fn load_user_config() -> Result<Config> {
    let config_dir = get_config_directory()?;

    // 确保配置目录存在
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;

    let mut config = load_config_from(&config_dir.join("config.toml"))?;
    apply_api_key_override(&mut config, std::env::var(API_KEY_ENV).ok());
    validate(&config)?;
    Ok(config)
}

/// Reads the config at `config_file_path`, writing defaults first if it is missing.
/// An unparsable file is moved aside to `config.bak` and replaced by defaults.
pub fn load_config_from(config_file_path: &Path) -> Result<Config> {
    if !config_file_path.exists() {
        create_default_config(config_file_path)?;
    }

    let config_content = fs::read_to_string(config_file_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_file_path))?;

    let config: Result<Config, toml::de::Error> = toml::from_str(&config_content);
    match config {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            // 解析失败，自动备份原配置并重建
            let bak_path = config_file_path.with_extension("bak");
            fs::rename(config_file_path, &bak_path)
                .with_context(|| format!("Failed to backup old config to {:?}", bak_path))?;
            create_default_config(config_file_path)?;
            let config_content = fs::read_to_string(config_file_path).with_context(|| {
                format!("Failed to read new config file: {:?}", config_file_path)
            })?;
            let config: Config = toml::from_str(&config_content)
                .with_context(|| "Failed to parse new config file")?;
            eprintln!(
                "Config parse error: {}. Old config has been backed up to {:?}, new config created.",
                e, bak_path
            );
            Ok(config)
        }
    }
}

/// Replaces the configured keys with a comma-separated list from the environment.
pub fn apply_api_key_override(config: &mut Config, env_value: Option<String>) {
    let Some(raw) = env_value else {
        return;
    };
    let keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if !keys.is_empty() {
        config.gemini.api_keys = keys;
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be greater than zero");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }
    if config.gemini.api_keys.is_empty() {
        anyhow::bail!("gemini.api_keys must contain at least one key");
    }
    if config.gemini.max_attempts == 0 {
        anyhow::bail!("gemini.max_attempts must be at least 1");
    }
    Ok(())
}

fn get_config_directory() -> Result<PathBuf> {
    if let Some(config_dir) = dirs::config_dir() {
        Ok(config_dir.join("quizgen"))
    } else {
        anyhow::bail!("Could not determine config directory")
    }
}

fn create_default_config(config_path: &Path) -> Result<()> {
    let default_cfg = Config::default();
    // 序列化为 TOML
    let default_content = toml::to_string_pretty(&default_cfg)
        .map_err(|e| anyhow::anyhow!("Failed to serialize default config: {}", e))?;
    fs::write(config_path, default_content)
        .with_context(|| format!("Failed to write default config to {:?}", config_path))?;
    eprintln!("Created default config file at: {:?}", config_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = load_config_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.chunk_overlap, 200);
        assert_eq!(cfg.llm.model, "gemini-2.0-flash");
    }

    #[test]
    fn unparsable_file_is_backed_up_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let cfg = load_config_from(&path).unwrap();

        assert!(path.with_extension("bak").exists());
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn edited_values_are_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.chunking.chunk_size = 400;
        cfg.chunking.chunk_overlap = 50;
        cfg.log_level = LogLevel::Debug;
        fs::write(&path, toml::to_string_pretty(&cfg).unwrap()).unwrap();

        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.chunking.chunk_size, 400);
        assert_eq!(loaded.chunking.chunk_overlap, 50);
        assert_eq!(log::Level::from(loaded.log_level), log::Level::Debug);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut cfg = Config::default();
        cfg.chunking.chunk_overlap = cfg.chunking.chunk_size;
        assert!(validate(&cfg).is_err());

        cfg.chunking.chunk_overlap = 10;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn env_keys_override_configured_keys() {
        let mut cfg = Config::default();
        apply_api_key_override(&mut cfg, Some("key-a, key-b,,".to_string()));
        assert_eq!(cfg.gemini.api_keys, vec!["key-a", "key-b"]);

        apply_api_key_override(&mut cfg, Some("  ".to_string()));
        assert_eq!(cfg.gemini.api_keys, vec!["key-a", "key-b"]);

        apply_api_key_override(&mut cfg, None);
        assert_eq!(cfg.gemini.api_keys.len(), 2);
    }
}
