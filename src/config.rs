//! Runtime configuration.

use std::env;

use config::{Config as ConfigSource, File};
use serde::Deserialize;

/// Tunables for the embedding application; none of this is consulted by the
/// core runtime itself (mailboxes are unbounded, actors tick on their own
/// `MultiWaiter`), but every real crate in this lineage ships a loadable
/// config the way `riker`'s own `config::load_config` does, so this one
/// does too.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub debug: bool,
    pub log_level: String,
    pub scheduler_tick_millis: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            debug: true,
            log_level: "info".to_string(),
            scheduler_tick_millis: 50,
        }
    }
}

/// Loads [`RuntimeConfig`] from a TOML document named by the
/// `ACTORRT_CONF` environment variable (default `config/actorrt.toml`),
/// falling back to [`RuntimeConfig::default`] if the file is absent.
pub fn load_config() -> RuntimeConfig {
    let path = env::var("ACTORRT_CONF").unwrap_or_else(|_| "config/actorrt.toml".into());

    let source = ConfigSource::builder()
        .set_default("debug", true)
        .expect("static default")
        .set_default("log_level", "info")
        .expect("static default")
        .set_default("scheduler_tick_millis", 50)
        .expect("static default")
        .add_source(File::with_name(&path).required(false))
        .build();

    match source.and_then(|c| c.try_deserialize()) {
        Ok(config) => config,
        Err(_) => RuntimeConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_usable_with_zero_configuration() {
        let config = RuntimeConfig::default();
        assert!(config.debug);
        assert_eq!(config.log_level, "info");
    }
}
