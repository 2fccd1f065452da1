use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct ApiKey {
    key: String,
    disabled_until: Option<DateTime<Utc>>,
}

/// Round-robin pool of Gemini API keys. Rate-limited keys sit out until the next UTC midnight.
#[derive(Debug, Clone)]
pub struct GeminiKeyManager {
    keys: Arc<Mutex<Vec<ApiKey>>>,
    next_key_index: Arc<Mutex<usize>>,
}

impl GeminiKeyManager {
    pub fn new(api_keys: Vec<String>) -> Self {
        let keys = api_keys
            .into_iter()
            .map(|key| ApiKey {
                key,
                disabled_until: None,
            })
            .collect();
        Self {
            keys: Arc::new(Mutex::new(keys)),
            next_key_index: Arc::new(Mutex::new(0)),
        }
    }

    pub fn get_key(&self) -> Result<String> {
        self.get_key_at(Utc::now())
    }

    fn get_key_at(&self, now: DateTime<Utc>) -> Result<String> {
        let mut keys_guard = self
            .keys
            .lock()
            .map_err(|_| anyhow!("API key pool lock poisoned"))?;

        // Re-enable any keys whose cooldown has expired.
        for api_key in keys_guard.iter_mut() {
            if let Some(disabled_until) = api_key.disabled_until {
                if now >= disabled_until {
                    api_key.disabled_until = None;
                    log::info!("Re-enabling API key ending in ...{}", key_suffix(&api_key.key));
                }
            }
        }

        if keys_guard.is_empty() {
            return Err(anyhow!("No API keys configured."));
        }

        let mut next_idx = self
            .next_key_index
            .lock()
            .map_err(|_| anyhow!("API key index lock poisoned"))?;
        let start_idx = *next_idx % keys_guard.len();

        for i in 0..keys_guard.len() {
            let idx = (start_idx + i) % keys_guard.len();
            if keys_guard[idx].disabled_until.is_none() {
                *next_idx = idx + 1;
                return Ok(keys_guard[idx].key.clone());
            }
        }

        Err(anyhow!(
            "All API keys are currently rate-limited or disabled."
        ))
    }

    pub fn disable_key(&self, key_to_disable: &str) {
        self.disable_key_at(key_to_disable, Utc::now());
    }

    fn disable_key_at(&self, key_to_disable: &str, now: DateTime<Utc>) {
        let Ok(mut keys) = self.keys.lock() else {
            log::error!("API key pool lock poisoned; cannot disable key");
            return;
        };
        if let Some(api_key) = keys.iter_mut().find(|k| k.key == key_to_disable) {
            let tomorrow = (now.date_naive() + chrono::Duration::days(1)).and_time(NaiveTime::MIN);
            let tomorrow_utc = DateTime::<Utc>::from_naive_utc_and_offset(tomorrow, Utc);
            api_key.disabled_until = Some(tomorrow_utc);
            log::warn!(
                "Disabling API key ending in ...{} until {}",
                key_suffix(&api_key.key),
                tomorrow_utc
            );
        }
    }
}

/// Last four characters of a key, for logs.
pub fn key_suffix(key: &str) -> String {
    let tail: Vec<char> = key.chars().rev().take(4).collect();
    tail.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(keys: &[&str]) -> GeminiKeyManager {
        GeminiKeyManager::new(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn keys_rotate_round_robin() {
        let km = manager(&["a", "b", "c"]);
        let picked: Vec<String> = (0..4).map(|_| km.get_key().unwrap()).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn disabled_keys_are_skipped() {
        let km = manager(&["a", "b"]);
        km.disable_key("a");
        assert_eq!(km.get_key().unwrap(), "b");
        assert_eq!(km.get_key().unwrap(), "b");
    }

    #[test]
    fn all_disabled_is_an_error() {
        let km = manager(&["a"]);
        km.disable_key("a");
        assert!(km.get_key().is_err());
    }

    #[test]
    fn disabled_key_returns_after_midnight() {
        let km = manager(&["a"]);
        let now = Utc::now();
        km.disable_key_at("a", now);
        assert!(km.get_key_at(now).is_err());
        let later = now + chrono::Duration::days(2);
        assert_eq!(km.get_key_at(later).unwrap(), "a");
    }

    #[test]
    fn empty_pool_is_an_error() {
        assert!(manager(&[]).get_key().is_err());
    }

    #[test]
    fn suffix_keeps_order() {
        assert_eq!(key_suffix("abcdef123"), "f123");
        assert_eq!(key_suffix("ab"), "ab");
    }
}
