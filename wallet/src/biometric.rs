//! Device biometric collaborator
//!
//! The wallet never talks to LocalAuthentication or BiometricPrompt directly.
//! The host app supplies a [`BiometricAuthenticator`] that answers two
//! questions: what the device can do ([`BiometricAuthenticator::check_capability`])
//! and whether the user passes a prompt ([`BiometricAuthenticator::authenticate_async`]).

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    #[error("Biometric authentication not available on this device")]
    NotAvailable,

    #[error("Biometric authentication not enrolled")]
    NotEnrolled,

    #[error("Biometric authentication failed")]
    AuthenticationFailed,

    #[error("Biometric authentication was cancelled by user")]
    UserCancelled,

    #[error("Biometric authentication timed out")]
    Timeout,

    #[error("Biometric authentication locked out")]
    Lockout,

    #[error("Platform error: {0}")]
    PlatformError(String),
}

/// Biometric authentication types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiometricType {
    /// Face recognition (Face ID, Face Unlock)
    Face,
    /// Fingerprint (Touch ID, Fingerprint Scanner)
    Fingerprint,
    /// Iris scan
    Iris,
    /// Multiple types available
    Multiple,
}

impl BiometricType {
    /// Name shown in settings toggles and prompts
    pub fn label(&self) -> &'static str {
        match self {
            BiometricType::Face => "Face ID",
            BiometricType::Fingerprint => "Touch ID",
            BiometricType::Iris => "Iris",
            BiometricType::Multiple => "Biometrics",
        }
    }
}

/// Biometric capability information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricCapability {
    /// Device offers a local authentication prompt (biometric or passcode)
    pub available: bool,
    /// Biometrics are enrolled
    pub enrolled: bool,
    /// Type of biometric authentication
    pub biometric_type: Option<BiometricType>,
    /// Hardware support
    pub hardware_present: bool,
}

impl BiometricCapability {
    /// Capability of a device with no local authentication at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Hardware present and a biometric enrolled
    pub fn enrolled(biometric_type: BiometricType) -> Self {
        Self {
            available: true,
            enrolled: true,
            biometric_type: Some(biometric_type),
            hardware_present: true,
        }
    }

    /// Prompt available but nothing enrolled, so only the passcode can answer it
    pub fn passcode_only() -> Self {
        Self {
            available: true,
            enrolled: false,
            biometric_type: None,
            hardware_present: true,
        }
    }

    /// Whether a biometric prompt can actually be satisfied by a biometric
    pub fn can_use_biometric(&self) -> bool {
        self.available && self.enrolled
    }
}

/// Biometric prompt configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricConfig {
    /// Title shown in authentication prompt
    pub title: String,
    /// Subtitle or description
    pub subtitle: String,
    /// Description text
    pub description: String,
    /// Allow the OS passcode as an alternative credential
    pub allow_fallback: bool,
    /// Timeout in seconds, enforced by the platform prompt
    pub timeout_secs: u64,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            title: "Authenticate".to_string(),
            subtitle: "Confirm it's you".to_string(),
            description: "Authenticate to continue".to_string(),
            allow_fallback: false,
            timeout_secs: 30,
        }
    }
}

impl BiometricConfig {
    /// Copy of this config for a single prompt
    pub fn for_prompt(&self, message: &str, allow_fallback: bool) -> Self {
        Self {
            description: message.to_string(),
            allow_fallback,
            ..self.clone()
        }
    }
}

/// Future returned by [`BiometricAuthenticator::authenticate_async`]
pub type BiometricFuture = Pin<Box<dyn Future<Output = Result<(), BiometricError>> + Send>>;

/// Platform-agnostic biometric authentication interface
pub trait BiometricAuthenticator: Send + Sync {
    /// Check if biometric authentication is available
    fn check_capability(&self) -> Result<BiometricCapability, BiometricError>;

    /// Show the prompt and resolve once the user responds
    fn authenticate_async(&self, config: &BiometricConfig) -> BiometricFuture;
}

/// Scriptable biometric authenticator for tests and hosts without a native bridge
pub struct MockBiometricAuth {
    capability: BiometricCapability,
    result: Result<(), BiometricError>,
    prompts: Mutex<Vec<BiometricConfig>>,
}

impl MockBiometricAuth {
    /// Enrolled Face ID device where every prompt succeeds
    pub fn success() -> Self {
        Self::with_result(Ok(()))
    }

    /// Enrolled Face ID device where every prompt fails
    pub fn failure() -> Self {
        Self::with_result(Err(BiometricError::AuthenticationFailed))
    }

    /// Enrolled Face ID device where the user dismisses every prompt
    pub fn cancelled() -> Self {
        Self::with_result(Err(BiometricError::UserCancelled))
    }

    /// Enrolled Face ID device answering every prompt with `result`
    pub fn with_result(result: Result<(), BiometricError>) -> Self {
        Self {
            capability: BiometricCapability::enrolled(BiometricType::Face),
            result,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Override the reported capability
    pub fn with_capability(mut self, capability: BiometricCapability) -> Self {
        self.capability = capability;
        self
    }

    /// Every prompt shown so far, oldest first
    pub fn prompts(&self) -> Vec<BiometricConfig> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of prompts shown so far
    pub fn prompt_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl BiometricAuthenticator for MockBiometricAuth {
    fn check_capability(&self) -> Result<BiometricCapability, BiometricError> {
        Ok(self.capability.clone())
    }

    fn authenticate_async(&self, config: &BiometricConfig) -> BiometricFuture {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(config.clone());
        let result = self.result.clone();
        Box::pin(async move { result })
    }
}

/// Authenticator for hosts with no local authentication (desktop builds, CI)
pub struct UnsupportedBiometricAuth;

impl BiometricAuthenticator for UnsupportedBiometricAuth {
    fn check_capability(&self) -> Result<BiometricCapability, BiometricError> {
        Ok(BiometricCapability::none())
    }

    fn authenticate_async(&self, _config: &BiometricConfig) -> BiometricFuture {
        Box::pin(async { Err(BiometricError::NotAvailable) })
    }
}
