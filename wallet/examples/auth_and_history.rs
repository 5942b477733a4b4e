//! Example: gating a payout and rendering grouped history

use std::sync::Arc;

use chrono::{Duration, Utc};
use wallet::{
    group_by_date, AuthOutcome, Authenticator, FnCallbacks, InvalidTimestampPolicy,
    MockBiometricAuth, MockPinEntry, PaymentMethod, SecurePin, SecuritySettings,
    TransactionRecord, TransactionStatus, UnsupportedBiometricAuth,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== HandyPay Authentication and History Example ===\n");

    // 1. Security settings with a Safety PIN and Face ID off
    println!("1. Setting up Safety PIN...");
    let mut settings = SecuritySettings::default();
    settings.set_safety_pin(&SecurePin::new("4826".to_string())?)?;
    println!("   Resolver settings: {:?}\n", settings.auth_settings());

    let callbacks = FnCallbacks::new()
        .on_success(|| println!("   ✅ Authorized"))
        .on_error(|e| println!("   ❌ Failed: {}", e))
        .on_cancel(|| println!("   ↩️  Cancelled"));

    // 2. Device with no local authentication falls through to the Safety PIN
    println!("2. Confirming payout on a device without biometrics...");
    let verifier = settings.pin_verifier().ok_or("Safety PIN not set")?;
    let authenticator = Authenticator::new(Arc::new(UnsupportedBiometricAuth))
        .with_prompt_config(settings.biometric_prompt.clone())
        .with_pin(
            Arc::new(MockPinEntry::new([Some("0000"), Some("4826")])),
            verifier.clone(),
        );

    for attempt in 1..=2 {
        let outcome = authenticator
            .authenticate_probed(
                &settings.auth_settings(),
                "Enter your Safety PIN to confirm the payout",
                || println!("   💸 Payout requested"),
                &callbacks,
            )
            .await;
        println!("   Attempt #{}: {:?}", attempt, outcome);
        if outcome == AuthOutcome::Success {
            break;
        }
    }
    settings.store_pin_state(&verifier).await;
    if let Some(stored) = &settings.safety_pin {
        println!("   Failed attempts on record: {}", stored.failed_attempts);
    }

    // 3. Face ID enabled on an enrolled device
    println!("\n3. Confirming payment link with Face ID...");
    settings.face_id_enabled = true;
    let authenticator = Authenticator::new(Arc::new(MockBiometricAuth::success()))
        .with_prompt_config(settings.biometric_prompt.clone());
    authenticator
        .authenticate_probed(
            &settings.auth_settings(),
            "Confirm payment link",
            || println!("   🔗 Payment link created"),
            &callbacks,
        )
        .await;

    // 4. Grouped history
    println!("\n4. Transaction history:");
    let now = Utc::now();
    let record = |id: &str, age: Duration, amount: u64| TransactionRecord {
        id: id.to_string(),
        created_at: (now - age).to_rfc3339(),
        amount,
        currency: "usd".to_string(),
        status: TransactionStatus::Completed,
        description: None,
        payment_method: PaymentMethod::Qr,
    };
    let records = vec![
        record("pi_1", Duration::minutes(5), 1250),
        record("pi_2", Duration::days(1), 4000),
        record("pi_3", Duration::days(6), 999),
        record("pi_4", Duration::hours(1), 300),
    ];

    let grouped = group_by_date(records, &now, InvalidTimestampPolicy::Skip)?;
    for bucket in &grouped.buckets {
        println!("   {}", bucket.label);
        for tx in &bucket.items {
            println!("     {}  {}", tx.id, tx.formatted_amount());
        }
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
