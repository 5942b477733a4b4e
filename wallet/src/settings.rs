//! Security settings (Face ID and Safety PIN toggles)
//!
//! Stored as TOML under `~/.handypay/security.toml` unless the host app
//! passes its own path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::AuthSettings;
use crate::biometric::BiometricConfig;
use crate::pin::{PinAuth, PinConfig, PinError, SecurePin, StoredPin, StoredPinVerifier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default)]
    pub face_id_enabled: bool,

    #[serde(default)]
    pub safety_pin_enabled: bool,

    #[serde(default)]
    pub pin_config: PinConfig,

    /// Hash and attempt counter of the Safety PIN, if one was set
    #[serde(default)]
    pub safety_pin: Option<StoredPin>,

    #[serde(default = "default_biometric_prompt")]
    pub biometric_prompt: BiometricConfig,
}

fn default_biometric_prompt() -> BiometricConfig {
    BiometricConfig {
        title: "HandyPay".to_string(),
        subtitle: "Confirm it's you".to_string(),
        ..BiometricConfig::default()
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            face_id_enabled: false,
            safety_pin_enabled: false,
            pin_config: PinConfig::default(),
            safety_pin: None,
            biometric_prompt: default_biometric_prompt(),
        }
    }
}

impl SecuritySettings {
    /// Load from the default location, creating it on first run
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Self::settings_path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        if path.exists() {
            log::info!("Loading security settings from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let settings: SecuritySettings = toml::from_str(&contents)?;
            settings.validate()?;
            Ok(settings)
        } else {
            log::info!("Creating default security settings at {}", path.display());
            let settings = SecuritySettings::default();
            settings.save_to(path)?;
            Ok(settings)
        }
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(Self::settings_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string_pretty(self)?)?;
        log::debug!("Security settings saved to {}", path.display());
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::home_dir().ok_or(SettingsError::NoHomeDir)?;
        path.push(".handypay");
        path.push("security.toml");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pin_config.min_length == 0 || self.pin_config.min_length > self.pin_config.max_length {
            return Err(SettingsError::InvalidPinLength {
                min: self.pin_config.min_length,
                max: self.pin_config.max_length,
            });
        }

        if self.pin_config.max_attempts == 0 {
            return Err(SettingsError::InvalidMaxAttempts);
        }

        if self.safety_pin_enabled && self.safety_pin.is_none() {
            return Err(SettingsError::MissingSafetyPin);
        }

        Ok(())
    }

    /// Toggles as seen by the authentication resolver
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            biometric_enabled: self.face_id_enabled,
            pin_enabled: self.safety_pin_enabled && self.safety_pin.is_some(),
        }
    }

    /// Hash `pin` and turn the Safety PIN on
    pub fn set_safety_pin(&mut self, pin: &SecurePin) -> Result<(), SettingsError> {
        self.safety_pin = Some(PinAuth::hash_pin(pin, &self.pin_config)?);
        self.safety_pin_enabled = true;
        Ok(())
    }

    pub fn clear_safety_pin(&mut self) {
        self.safety_pin = None;
        self.safety_pin_enabled = false;
    }

    /// Verifier over the stored Safety PIN, `None` if no PIN is set
    pub fn pin_verifier(&self) -> Option<Arc<StoredPinVerifier>> {
        self.safety_pin
            .clone()
            .map(|stored| Arc::new(StoredPinVerifier::new(stored)))
    }

    /// Copy the verifier's attempt counter into `safety_pin` so a lockout
    /// survives [`Self::save`] and a restart
    ///
    /// Ignored when the verifier belongs to a PIN that has since been replaced.
    pub async fn store_pin_state(&mut self, verifier: &StoredPinVerifier) {
        let state = verifier.snapshot().await;
        match &mut self.safety_pin {
            Some(current) if current.hash == state.hash => *current = state,
            _ => log::debug!("Ignoring PIN state from a replaced Safety PIN"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Invalid PIN length range {min}..={max}")]
    InvalidPinLength { min: usize, max: usize },

    #[error("PIN max attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("Safety PIN is enabled but no PIN is stored")]
    MissingSafetyPin,

    #[error("PIN error: {0}")]
    Pin(#[from] PinError),
}
