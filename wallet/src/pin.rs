//! Safety PIN authentication
//!
//! The Safety PIN is the app-level factor used when the device has no local
//! authentication the user wants to rely on. PINs are hashed with Argon2id and
//! guarded by an attempt counter with a timed lockout.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::ZeroizeOnDrop;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Invalid PIN format")]
    InvalidFormat,

    #[error("PIN too short (minimum {0} digits)")]
    TooShort(usize),

    #[error("PIN too long (maximum {0} digits)")]
    TooLong(usize),

    #[error("PIN must contain only digits")]
    NonNumeric,

    #[error("Incorrect PIN")]
    IncorrectPin,

    #[error("PIN attempts exceeded - try again later")]
    AttemptsExceeded,

    #[error("Hash error")]
    HashError,
}

/// PIN configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Minimum PIN length (default: 4)
    pub min_length: usize,
    /// Maximum PIN length (default: 6)
    pub max_length: usize,
    /// Maximum failed attempts before lockout (default: 5)
    pub max_attempts: u32,
    /// Lockout duration in seconds (default: 300 = 5 minutes)
    pub lockout_duration_secs: u64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 6,
            max_attempts: 5,
            lockout_duration_secs: 300,
        }
    }
}

/// Secure PIN wrapper that zeros memory on drop
#[derive(ZeroizeOnDrop)]
pub struct SecurePin(String);

impl SecurePin {
    pub fn new(pin: String) -> Result<Self, PinError> {
        if pin.is_empty() {
            return Err(PinError::InvalidFormat);
        }

        if !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(PinError::NonNumeric);
        }

        Ok(Self(pin))
    }

    pub fn from_number(pin: u32) -> Self {
        Self(pin.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Never print the digits.
impl std::fmt::Debug for SecurePin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecurePin(len={})", self.0.len())
    }
}

/// Stored PIN data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPin {
    /// Argon2 hash of the PIN (PHC string, includes the salt)
    pub hash: String,
    /// Failed attempt counter
    pub failed_attempts: u32,
    /// Unix seconds of the last failed attempt (for lockout)
    pub last_failed_attempt: Option<u64>,
    pub config: PinConfig,
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// PIN hashing and verification
pub struct PinAuth;

impl PinAuth {
    /// Hash a PIN for storage
    pub fn hash_pin(pin: &SecurePin, config: &PinConfig) -> Result<StoredPin, PinError> {
        if pin.len() < config.min_length {
            return Err(PinError::TooShort(config.min_length));
        }
        if pin.len() > config.max_length {
            return Err(PinError::TooLong(config.max_length));
        }

        let salt = SaltString::generate(&mut rand::thread_rng());

        let hash = Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|_| PinError::HashError)?
            .to_string();

        Ok(StoredPin {
            hash,
            failed_attempts: 0,
            last_failed_attempt: None,
            config: config.clone(),
        })
    }

    /// Verify PIN against stored hash, updating the attempt counter
    pub fn verify_pin(pin: &SecurePin, stored: &mut StoredPin) -> Result<(), PinError> {
        Self::verify_pin_at(pin, stored, now_secs())
    }

    fn verify_pin_at(pin: &SecurePin, stored: &mut StoredPin, now: u64) -> Result<(), PinError> {
        if stored.failed_attempts >= stored.config.max_attempts {
            if let Some(last_failed) = stored.last_failed_attempt {
                let lockout_end = last_failed.saturating_add(stored.config.lockout_duration_secs);
                if now < lockout_end {
                    return Err(PinError::AttemptsExceeded);
                }
            }
            // Lockout expired
            stored.failed_attempts = 0;
            stored.last_failed_attempt = None;
        }

        let parsed_hash = PasswordHash::new(&stored.hash).map_err(|_| PinError::HashError)?;

        if Argon2::default()
            .verify_password(pin.as_bytes(), &parsed_hash)
            .is_ok()
        {
            stored.failed_attempts = 0;
            stored.last_failed_attempt = None;
            Ok(())
        } else {
            stored.failed_attempts += 1;
            stored.last_failed_attempt = Some(now);

            if stored.failed_attempts >= stored.config.max_attempts {
                log::warn!(
                    "Safety PIN locked for {}s after {} failed attempts",
                    stored.config.lockout_duration_secs,
                    stored.failed_attempts
                );
                Err(PinError::AttemptsExceeded)
            } else {
                Err(PinError::IncorrectPin)
            }
        }
    }

    /// Generate random PIN of 1 to 9 digits
    pub fn generate_random_pin(length: usize) -> SecurePin {
        let length = length.clamp(1, 9) as u32;
        let low = if length == 1 { 0 } else { 10_u32.pow(length - 1) };
        let pin_num = rand::thread_rng().gen_range(low..10_u32.pow(length));
        SecurePin::from_number(pin_num)
    }

    /// Check if PIN is weak (e.g., 1234, 0000)
    pub fn is_weak_pin(pin: &SecurePin) -> bool {
        let s = pin.as_str();

        if "0123456789".contains(s) || "9876543210".contains(s) {
            return true;
        }

        let first = s.chars().next();
        if s.chars().all(|c| Some(c) == first) {
            return true;
        }

        let weak_pins = ["1212", "1004", "2000", "6969", "4321"];
        weak_pins.contains(&s)
    }

    /// Get remaining attempts before lockout
    pub fn remaining_attempts(stored: &StoredPin) -> u32 {
        stored
            .config
            .max_attempts
            .saturating_sub(stored.failed_attempts)
    }

    /// Get lockout time remaining in seconds
    pub fn lockout_remaining(stored: &StoredPin) -> Option<u64> {
        if stored.failed_attempts < stored.config.max_attempts {
            return None;
        }

        let last_failed = stored.last_failed_attempt?;
        let lockout_end = last_failed.saturating_add(stored.config.lockout_duration_secs);
        let now = now_secs();
        (now < lockout_end).then(|| lockout_end - now)
    }
}

/// Boxed future used by the PIN collaborators
pub type PinFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Checks a candidate PIN
pub trait PinVerifier: Send + Sync {
    /// `Ok(true)` when the PIN matches, `Ok(false)` when it does not
    fn verify_pin<'a>(&'a self, candidate: &'a SecurePin) -> PinFuture<'a, Result<bool, PinError>>;
}

/// The caller's PIN-entry sheet
pub trait PinEntry: Send + Sync {
    /// Resolves once the user submits a PIN, or with `None` if the sheet is dismissed
    fn request_pin<'a>(&'a self, prompt: &'a str) -> PinFuture<'a, Option<SecurePin>>;
}

/// [`PinVerifier`] backed by a locally stored Argon2 hash
pub struct StoredPinVerifier {
    stored: tokio::sync::Mutex<StoredPin>,
}

impl StoredPinVerifier {
    pub fn new(stored: StoredPin) -> Self {
        Self {
            stored: tokio::sync::Mutex::new(stored),
        }
    }

    /// Current stored state, including the attempt counter, for persisting
    pub async fn snapshot(&self) -> StoredPin {
        self.stored.lock().await.clone()
    }

    pub fn into_inner(self) -> StoredPin {
        self.stored.into_inner()
    }
}

impl PinVerifier for StoredPinVerifier {
    fn verify_pin<'a>(&'a self, candidate: &'a SecurePin) -> PinFuture<'a, Result<bool, PinError>> {
        Box::pin(async move {
            let mut guard = self.stored.lock().await;
            let mut stored = guard.clone();
            let candidate = SecurePin(candidate.as_str().to_string());

            // Argon2 is memory-hard; keep it off the async workers.
            let (result, stored) = tokio::task::spawn_blocking(move || {
                let result = PinAuth::verify_pin(&candidate, &mut stored);
                (result, stored)
            })
            .await
            .map_err(|e| {
                log::error!("PIN verification task failed: {}", e);
                PinError::HashError
            })?;
            *guard = stored;

            match result {
                Ok(()) => Ok(true),
                Err(PinError::IncorrectPin) => Ok(false),
                Err(e) => Err(e),
            }
        })
    }
}

/// Scripted PIN sheet: answers requests from a queue, then behaves as dismissed
pub struct MockPinEntry {
    answers: Mutex<VecDeque<Option<String>>>,
    requests: AtomicUsize,
}

impl MockPinEntry {
    /// Each entry is one request: `Some(pin)` submits, `None` dismisses
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<&'static str>>,
    {
        Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|answer| answer.map(str::to_string))
                    .collect(),
            ),
            requests: AtomicUsize::new(0),
        }
    }

    /// Sheet that submits `pin` once
    pub fn submitting(pin: &'static str) -> Self {
        Self::new([Some(pin)])
    }

    /// Sheet the user always dismisses
    pub fn dismissed() -> Self {
        Self::new([])
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PinEntry for MockPinEntry {
    fn request_pin<'a>(&'a self, _prompt: &'a str) -> PinFuture<'a, Option<SecurePin>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .flatten();
        Box::pin(async move { answer.and_then(|pin| SecurePin::new(pin).ok()) })
    }
}
