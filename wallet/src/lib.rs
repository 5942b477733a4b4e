//! HandyPay wallet core
//!
//! Client-side logic shared by the HandyPay screens:
//! - Day-bucketed transaction and payout history
//! - One resolver for gating sensitive actions behind Face ID, the device
//!   passcode or the Safety PIN
//! - Argon2-hashed Safety PIN with attempt lockout
//! - Security settings persisted as TOML

pub mod auth;
pub mod biometric;
pub mod history;
pub mod pin;
pub mod settings;
pub mod transaction;

pub use auth::{
    select_factor, AuthCallbacks, AuthError, AuthFactor, AuthOutcome, AuthSettings,
    Authenticator, FnCallbacks, NoCallbacks,
};
pub use biometric::{
    BiometricAuthenticator, BiometricCapability, BiometricConfig, BiometricError,
    BiometricFuture, BiometricType, MockBiometricAuth, UnsupportedBiometricAuth,
};
pub use history::{
    bucket_label, group_by_date, group_by_date_local, Bucket, GroupedHistory, HistoryError,
    InvalidTimestampPolicy, RawTimestamp, SkippedRecord, TimestampedRecord,
};
pub use pin::{
    MockPinEntry, PinAuth, PinConfig, PinEntry, PinError, PinFuture, PinVerifier, SecurePin,
    StoredPin, StoredPinVerifier,
};
pub use settings::{SecuritySettings, SettingsError};
pub use transaction::{
    format_amount, summarize, CurrencySummary, PaymentMethod, PayoutRecord, PayoutStatus,
    TransactionRecord, TransactionStatus,
};
