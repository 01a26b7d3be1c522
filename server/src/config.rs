use pendulum_shared::LayoutConfig;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Pause between a collision stop and the synchronized restart
    pub cooldown_ms: u64,
    pub layout: LayoutConfig,
    pub max_connections: usize,
    /// Longest accepted pendulum id on the query channel (bytes)
    pub max_id_len: usize,
    /// Seed for id generation; None draws from OS entropy
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            cooldown_ms: 5000,
            layout: LayoutConfig::default(),
            max_connections: 1000,
            max_id_len: 64,
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PENDULUM_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `PENDULUM_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(addr) = lookup("PENDULUM_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        parse_into(&lookup, "PENDULUM_COOLDOWN_MS", &mut config.cooldown_ms)?;
        parse_into(&lookup, "PENDULUM_MAX_CONNECTIONS", &mut config.max_connections)?;
        parse_into(&lookup, "PENDULUM_MAX_ID_LEN", &mut config.max_id_len)?;
        parse_into(&lookup, "PENDULUM_ANCHOR_X_OFFSET", &mut config.layout.x_offset)?;
        parse_into(&lookup, "PENDULUM_ANCHOR_SPACING", &mut config.layout.spacing)?;
        parse_into(&lookup, "PENDULUM_CEILING_Y", &mut config.layout.ceiling_y)?;
        parse_into(&lookup, "PENDULUM_LENGTH_SCALE", &mut config.layout.scale)?;
        parse_into(
            &lookup,
            "PENDULUM_COLLISION_THRESHOLD",
            &mut config.layout.collision_threshold,
        )?;
        if let Some(raw) = lookup("PENDULUM_RNG_SEED") {
            let seed = raw
                .trim()
                .parse()
                .map_err(|_| format!("PENDULUM_RNG_SEED: cannot parse {:?}", raw))?;
            config.rng_seed = Some(seed);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.trim().is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.max_id_len == 0 {
            return Err("max_id_len must be > 0".to_string());
        }
        if self.cooldown_ms > MAX_COOLDOWN_MS {
            return Err(format!(
                "cooldown_ms must be <= {} (one hour), got {}",
                MAX_COOLDOWN_MS, self.cooldown_ms
            ));
        }
        self.layout.validate()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Upper bound for the post-collision pause.
pub const MAX_COOLDOWN_MS: u64 = 60 * 60 * 1000;

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), String> {
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| format!("{}: cannot parse {:?}", key, raw))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cooldown(), Duration::from_secs(5));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3001");
        assert_eq!(config.layout, LayoutConfig::default());
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn environment_overrides_layout_and_cooldown() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PENDULUM_COOLDOWN_MS", "250"),
            ("PENDULUM_ANCHOR_SPACING", "80"),
            ("PENDULUM_COLLISION_THRESHOLD", "12.5"),
            ("PENDULUM_RNG_SEED", "7"),
        ]))
        .unwrap();
        assert_eq!(config.cooldown_ms, 250);
        assert_eq!(config.layout.spacing, 80.0);
        assert_eq!(config.layout.collision_threshold, 12.5);
        assert_eq!(config.layout.scale, 10.0);
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PENDULUM_COOLDOWN_MS", "soon")]))
            .unwrap_err();
        assert!(err.contains("PENDULUM_COOLDOWN_MS"));
    }

    #[test]
    fn zero_connections_invalid() {
        let config = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_cooldown_invalid() {
        let config = ServerConfig::from_lookup(lookup_from(&[(
            "PENDULUM_COOLDOWN_MS",
            "18446744073709551615",
        )]))
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("cooldown_ms"));

        let at_limit = ServerConfig {
            cooldown_ms: MAX_COOLDOWN_MS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn invalid_layout_fails_server_validation() {
        let mut config = ServerConfig::default();
        config.layout.scale = -1.0;
        assert!(config.validate().is_err());
    }
}
