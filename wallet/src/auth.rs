//! Authentication for sensitive actions
//!
//! Payouts, payment links and settings changes are gated by one of: the
//! device biometric, the device passcode, the Safety PIN, or nothing when the
//! user has configured none of them. [`select_factor`] picks the factor and
//! [`Authenticator`] runs it, then reports exactly one of
//! `on_success` / `on_error` / `on_cancel`.
//!
//! The resolver never retries and owns no timeout. Callers must not start a
//! second authentication on the same surface while one is pending.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::biometric::{BiometricAuthenticator, BiometricCapability, BiometricConfig, BiometricError};
use crate::pin::{PinEntry, PinError, PinVerifier};

/// Why an authentication attempt did not verify
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unavailable")]
    BiometricUnavailable,

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("incorrect pin")]
    IncorrectPin,

    #[error("pin not configured")]
    PinNotConfigured,

    #[error(transparent)]
    Pin(#[from] PinError),
}

/// Result of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failed(AuthError),
    Cancelled,
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }

    /// Failure reason as shown to the user
    pub fn reason(&self) -> Option<String> {
        match self {
            AuthOutcome::Failed(error) => Some(error.to_string()),
            _ => None,
        }
    }
}

impl From<Result<(), BiometricError>> for AuthOutcome {
    fn from(result: Result<(), BiometricError>) -> Self {
        match result {
            Ok(()) => AuthOutcome::Success,
            Err(BiometricError::UserCancelled) => AuthOutcome::Cancelled,
            Err(BiometricError::NotAvailable | BiometricError::NotEnrolled) => {
                AuthOutcome::Failed(AuthError::BiometricUnavailable)
            }
            Err(e) => AuthOutcome::Failed(AuthError::AuthenticationFailed(e.to_string())),
        }
    }
}

/// The factor used for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFactor {
    DeviceBiometric,
    DevicePasscode,
    AppPin,
    None,
}

/// User choices from the security settings screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// "Face ID" toggle
    pub biometric_enabled: bool,
    /// "Safety PIN" toggle
    pub pin_enabled: bool,
}

/// Pick the factor for `settings` on a device with `capability`
///
/// First match wins:
/// 1. biometric enabled, available and enrolled: [`AuthFactor::DeviceBiometric`]
/// 2. biometric disabled but the device has a prompt: [`AuthFactor::DevicePasscode`]
/// 3. Safety PIN enabled: [`AuthFactor::AppPin`]
/// 4. otherwise [`AuthFactor::None`]
pub fn select_factor(settings: &AuthSettings, capability: &BiometricCapability) -> AuthFactor {
    if settings.biometric_enabled && capability.available && capability.enrolled {
        AuthFactor::DeviceBiometric
    } else if !settings.biometric_enabled && capability.available {
        AuthFactor::DevicePasscode
    } else if settings.pin_enabled {
        AuthFactor::AppPin
    } else {
        AuthFactor::None
    }
}

/// Receives the single terminal report of an attempt
pub trait AuthCallbacks {
    fn on_success(&self) {}
    fn on_error(&self, _error: &AuthError) {}
    fn on_cancel(&self) {}
}

/// Callbacks that ignore every report
pub struct NoCallbacks;

impl AuthCallbacks for NoCallbacks {}

type Callback = Box<dyn Fn() + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&AuthError) + Send + Sync>;

/// Closure-backed [`AuthCallbacks`]; unset handlers do nothing
#[derive(Default)]
pub struct FnCallbacks {
    on_success: Option<Callback>,
    on_error: Option<ErrorCallback>,
    on_cancel: Option<Callback>,
}

impl FnCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&AuthError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_cancel<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_cancel = Some(Box::new(f));
        self
    }
}

impl AuthCallbacks for FnCallbacks {
    fn on_success(&self) {
        if let Some(f) = &self.on_success {
            f();
        }
    }

    fn on_error(&self, error: &AuthError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    fn on_cancel(&self) {
        if let Some(f) = &self.on_cancel {
            f();
        }
    }
}

/// Runs the chosen factor against caller-owned collaborators
#[derive(Clone)]
pub struct Authenticator {
    biometric: Arc<dyn BiometricAuthenticator>,
    pin_entry: Option<Arc<dyn PinEntry>>,
    pin_verifier: Option<Arc<dyn PinVerifier>>,
    prompt_config: BiometricConfig,
}

impl Authenticator {
    pub fn new(biometric: Arc<dyn BiometricAuthenticator>) -> Self {
        Self {
            biometric,
            pin_entry: None,
            pin_verifier: None,
            prompt_config: BiometricConfig::default(),
        }
    }

    /// Enable the Safety PIN branch
    pub fn with_pin(mut self, entry: Arc<dyn PinEntry>, verifier: Arc<dyn PinVerifier>) -> Self {
        self.pin_entry = Some(entry);
        self.pin_verifier = Some(verifier);
        self
    }

    /// Title and timeout used for device prompts
    pub fn with_prompt_config(mut self, config: BiometricConfig) -> Self {
        self.prompt_config = config;
        self
    }

    /// Authenticate with the factor [`select_factor`] picks, then run `action` on success
    pub async fn authenticate<A, C>(
        &self,
        settings: &AuthSettings,
        capability: &BiometricCapability,
        prompt: &str,
        action: A,
        callbacks: &C,
    ) -> AuthOutcome
    where
        A: FnOnce(),
        C: AuthCallbacks + ?Sized,
    {
        let factor = select_factor(settings, capability);
        log::debug!(
            "Selected {:?} (biometric_enabled={}, pin_enabled={}, available={}, enrolled={})",
            factor,
            settings.biometric_enabled,
            settings.pin_enabled,
            capability.available,
            capability.enrolled
        );
        self.authenticate_with_factor(factor, capability, prompt, action, callbacks)
            .await
    }

    /// [`Self::authenticate`] using the collaborator's own capability probe
    ///
    /// A failing probe is treated as a device with no local authentication.
    pub async fn authenticate_probed<A, C>(
        &self,
        settings: &AuthSettings,
        prompt: &str,
        action: A,
        callbacks: &C,
    ) -> AuthOutcome
    where
        A: FnOnce(),
        C: AuthCallbacks + ?Sized,
    {
        let capability = match self.biometric.check_capability() {
            Ok(capability) => capability,
            Err(e) => {
                log::warn!("Biometric capability probe failed: {}", e);
                BiometricCapability::none()
            }
        };
        self.authenticate(settings, &capability, prompt, action, callbacks)
            .await
    }

    /// Authenticate with an explicitly requested factor
    ///
    /// Device factors the hardware cannot serve fail with
    /// [`AuthError::BiometricUnavailable`] without showing a prompt.
    pub async fn authenticate_with_factor<A, C>(
        &self,
        factor: AuthFactor,
        capability: &BiometricCapability,
        prompt: &str,
        action: A,
        callbacks: &C,
    ) -> AuthOutcome
    where
        A: FnOnce(),
        C: AuthCallbacks + ?Sized,
    {
        let outcome = match factor {
            AuthFactor::DeviceBiometric if !capability.can_use_biometric() => {
                AuthOutcome::Failed(AuthError::BiometricUnavailable)
            }
            AuthFactor::DevicePasscode if !capability.available => {
                AuthOutcome::Failed(AuthError::BiometricUnavailable)
            }
            AuthFactor::DeviceBiometric => self.prompt_device(prompt, false).await,
            AuthFactor::DevicePasscode => self.prompt_device(prompt, true).await,
            AuthFactor::AppPin => self.prompt_pin(prompt).await,
            AuthFactor::None => AuthOutcome::Success,
        };

        match &outcome {
            AuthOutcome::Success => {
                log::info!("Authenticated with {:?}", factor);
                action();
                callbacks.on_success();
            }
            AuthOutcome::Failed(error) => {
                log::info!("Authentication with {:?} failed: {}", factor, error);
                callbacks.on_error(error);
            }
            AuthOutcome::Cancelled => {
                log::info!("Authentication with {:?} cancelled", factor);
                callbacks.on_cancel();
            }
        }

        outcome
    }

    async fn prompt_device(&self, prompt: &str, allow_passcode_fallback: bool) -> AuthOutcome {
        let config = self.prompt_config.for_prompt(prompt, allow_passcode_fallback);
        self.biometric.authenticate_async(&config).await.into()
    }

    async fn prompt_pin(&self, prompt: &str) -> AuthOutcome {
        let (Some(entry), Some(verifier)) = (&self.pin_entry, &self.pin_verifier) else {
            return AuthOutcome::Failed(AuthError::PinNotConfigured);
        };

        let Some(pin) = entry.request_pin(prompt).await else {
            return AuthOutcome::Cancelled;
        };

        match verifier.verify_pin(&pin).await {
            Ok(true) => AuthOutcome::Success,
            Ok(false) | Err(PinError::IncorrectPin) => AuthOutcome::Failed(AuthError::IncorrectPin),
            Err(e) => AuthOutcome::Failed(AuthError::Pin(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::{BiometricType, MockBiometricAuth};
    use crate::pin::{MockPinEntry, PinAuth, PinConfig, SecurePin, StoredPinVerifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(biometric_enabled: bool, pin_enabled: bool) -> AuthSettings {
        AuthSettings {
            biometric_enabled,
            pin_enabled,
        }
    }

    fn verifier(pin: &str) -> Arc<StoredPinVerifier> {
        let pin = SecurePin::new(pin.to_string()).unwrap();
        Arc::new(StoredPinVerifier::new(
            PinAuth::hash_pin(&pin, &PinConfig::default()).unwrap(),
        ))
    }

    #[test]
    fn test_select_factor_table() {
        let enrolled = BiometricCapability::enrolled(BiometricType::Face);
        let passcode = BiometricCapability::passcode_only();
        let none = BiometricCapability::none();

        assert_eq!(select_factor(&settings(true, true), &enrolled), AuthFactor::DeviceBiometric);
        assert_eq!(select_factor(&settings(false, true), &enrolled), AuthFactor::DevicePasscode);
        assert_eq!(select_factor(&settings(false, false), &passcode), AuthFactor::DevicePasscode);
        // Enabled but not enrolled: neither device branch applies
        assert_eq!(select_factor(&settings(true, true), &passcode), AuthFactor::AppPin);
        assert_eq!(select_factor(&settings(true, false), &passcode), AuthFactor::None);
        assert_eq!(select_factor(&settings(false, true), &none), AuthFactor::AppPin);
        assert_eq!(select_factor(&settings(false, false), &none), AuthFactor::None);
    }

    #[test]
    fn test_biometric_error_normalization() {
        assert_eq!(AuthOutcome::from(Ok::<(), BiometricError>(())), AuthOutcome::Success);
        assert_eq!(
            AuthOutcome::from(Err(BiometricError::UserCancelled)),
            AuthOutcome::Cancelled
        );
        assert_eq!(
            AuthOutcome::from(Err(BiometricError::NotEnrolled)).reason().as_deref(),
            Some("unavailable")
        );
        assert_eq!(
            AuthOutcome::from(Err(BiometricError::Lockout)),
            AuthOutcome::Failed(AuthError::AuthenticationFailed(
                "Biometric authentication locked out".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_explicit_biometric_on_unenrolled_device() {
        let mock = Arc::new(MockBiometricAuth::success());
        let auth = Authenticator::new(mock.clone());
        let ran = AtomicUsize::new(0);

        let outcome = auth
            .authenticate_with_factor(
                AuthFactor::DeviceBiometric,
                &BiometricCapability::passcode_only(),
                "Enable Face ID",
                || {
                    ran.fetch_add(1, Ordering::SeqCst);
                },
                &NoCallbacks,
            )
            .await;

        assert_eq!(outcome, AuthOutcome::Failed(AuthError::BiometricUnavailable));
        assert_eq!(outcome.reason().as_deref(), Some("unavailable"));
        assert_eq!(mock.prompt_count(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pin_branch_without_pin_collaborators() {
        let auth = Authenticator::new(Arc::new(MockBiometricAuth::success()));
        let outcome = auth
            .authenticate(
                &settings(false, true),
                &BiometricCapability::none(),
                "Confirm",
                || {},
                &NoCallbacks,
            )
            .await;
        assert_eq!(outcome, AuthOutcome::Failed(AuthError::PinNotConfigured));
    }

    #[tokio::test]
    async fn test_incorrect_pin_then_retry() {
        let entry = Arc::new(MockPinEntry::new([Some("0000"), Some("8642")]));
        let auth = Authenticator::new(Arc::new(MockBiometricAuth::success()))
            .with_pin(entry.clone(), verifier("8642"));
        let user = settings(false, true);
        let device = BiometricCapability::none();

        let first = auth
            .authenticate(&user, &device, "Safety PIN", || {}, &NoCallbacks)
            .await;
        assert_eq!(first.reason().as_deref(), Some("incorrect pin"));

        // Retrying is the caller's job
        let second = auth
            .authenticate(&user, &device, "Safety PIN", || {}, &NoCallbacks)
            .await;
        assert!(second.is_success());
        assert_eq!(entry.request_count(), 2);
    }

    #[tokio::test]
    async fn test_pin_lockout_is_reported() {
        let pin = SecurePin::new("8642".to_string()).unwrap();
        let config = PinConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let verifier = Arc::new(StoredPinVerifier::new(PinAuth::hash_pin(&pin, &config).unwrap()));
        let auth = Authenticator::new(Arc::new(MockBiometricAuth::success()))
            .with_pin(Arc::new(MockPinEntry::submitting("1111")), verifier);

        let outcome = auth
            .authenticate(
                &settings(false, true),
                &BiometricCapability::none(),
                "Safety PIN",
                || {},
                &NoCallbacks,
            )
            .await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::Pin(PinError::AttemptsExceeded))
        );
    }

    #[tokio::test]
    async fn test_probed_uses_collaborator_capability() {
        let mock = Arc::new(
            MockBiometricAuth::success().with_capability(BiometricCapability::passcode_only()),
        );
        let auth = Authenticator::new(mock.clone());

        let outcome = auth
            .authenticate_probed(&settings(false, false), "Confirm payout", || {}, &NoCallbacks)
            .await;

        assert!(outcome.is_success());
        assert!(mock.prompts()[0].allow_fallback);
    }

    #[tokio::test]
    async fn test_fn_callbacks() {
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_clone = errors.clone();
        let callbacks = FnCallbacks::new().on_error(move |error| {
            assert_eq!(error, &AuthError::AuthenticationFailed(
                "Biometric authentication failed".to_string()
            ));
            errors_clone.fetch_add(1, Ordering::SeqCst);
        });

        let auth = Authenticator::new(Arc::new(MockBiometricAuth::failure()));
        auth.authenticate(
            &settings(true, false),
            &BiometricCapability::enrolled(BiometricType::Face),
            "Confirm",
            || {},
            &callbacks,
        )
        .await;

        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
