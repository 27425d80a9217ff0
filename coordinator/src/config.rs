//! ATM configuration.

use std::time::Duration;

use cashpoint_common::Denomination;

/// One note cassette: a denomination and its starting note count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CassetteConfig {
    /// Face value of the notes in this cassette.
    pub face_value: u32,
    /// Notes loaded at start-up.
    pub count: u32,
}

impl CassetteConfig {
    /// Create a cassette config.
    pub fn new(face_value: u32, count: u32) -> Self {
        Self { face_value, count }
    }
}

/// Inventory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Loaded cassettes, in any order.
    pub cassettes: Vec<CassetteConfig>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            cassettes: vec![
                CassetteConfig::new(Denomination::FIFTY.value(), 10),
                CassetteConfig::new(Denomination::TWENTY.value(), 30),
                CassetteConfig::new(Denomination::TEN.value(), 30),
                CassetteConfig::new(Denomination::FIVE.value(), 20),
            ],
        }
    }
}

impl InventoryConfig {
    /// Parse a cassette list such as `50:10,20:30,10:30,5:20`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut cassettes = Vec::new();

        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (face, count) = part
                .split_once(':')
                .ok_or_else(|| format!("Cassette '{}' must be FACE:COUNT", part))?;
            let face_value = face
                .trim()
                .parse()
                .map_err(|_| format!("Invalid face value in '{}'", part))?;
            let count = count
                .trim()
                .parse()
                .map_err(|_| format!("Invalid note count in '{}'", part))?;
            cassettes.push(CassetteConfig::new(face_value, count));
        }

        let config = Self { cassettes };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cassettes.is_empty() {
            return Err("At least one cassette is required".to_string());
        }

        if self.cassettes.iter().any(|c| c.face_value == 0) {
            return Err("Face value cannot be 0".to_string());
        }

        let mut faces: Vec<u32> = self.cassettes.iter().map(|c| c.face_value).collect();
        faces.sort_unstable();
        faces.dedup();
        if faces.len() != self.cassettes.len() {
            return Err("Each denomination may only be loaded once".to_string());
        }

        // Dispensability is checked against the smallest face alone.
        let smallest = faces[0];
        if let Some(face) = faces.iter().find(|f| *f % smallest != 0) {
            return Err(format!(
                "Face value {} is not a multiple of the smallest face value {}",
                face, smallest
            ));
        }

        Ok(())
    }
}

/// Main ATM configuration.
#[derive(Debug, Clone)]
pub struct AtmConfig {
    /// ATM identifier used in logs.
    pub atm_id: Option<String>,
    /// Cassettes loaded at start-up.
    pub inventory: InventoryConfig,
    /// Upper bound on a single account service call.
    pub remote_timeout: Duration,
    /// Log level.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            atm_id: None,
            inventory: InventoryConfig::default(),
            remote_timeout: Duration::from_secs(5),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AtmConfig {
    /// Load configuration from environment variables.
    ///
    /// Malformed values are ignored and the default is kept, except for
    /// `ATM_CASSETTES`, whose parse error is returned.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("ATM_ID") {
            config.atm_id = Some(id);
        }

        if let Ok(cassettes) = std::env::var("ATM_CASSETTES") {
            config.inventory = InventoryConfig::parse(&cassettes)?;
        }

        if let Ok(timeout) = std::env::var("ATM_REMOTE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.remote_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(json) = std::env::var("ATM_JSON_LOGS") {
            config.json_logs = matches!(json.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_timeout.is_zero() {
            return Err("Remote timeout cannot be zero".to_string());
        }

        self.inventory.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AtmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inventory.cassettes.len(), 4);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AtmConfig::default();
        config.remote_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_cassettes() {
        let config = InventoryConfig::parse("50:10, 20:30,10:30,5:20").unwrap();
        assert_eq!(config, InventoryConfig::default());

        assert!(InventoryConfig::parse("").is_err());
        assert!(InventoryConfig::parse("50").is_err());
        assert!(InventoryConfig::parse("50:x").is_err());
        assert!(InventoryConfig::parse("0:10").is_err());
        assert!(InventoryConfig::parse("20:1,20:2").is_err());
        assert!(InventoryConfig::parse("50:10,20:10").is_err());
        assert!(InventoryConfig::parse("100:5,50:10,20:10").is_err());
        assert!(InventoryConfig::parse("100:5,20:10,10:3").is_ok());
    }
}
