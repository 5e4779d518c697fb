//! OTP notification dispatch.
//!
//! Handlers receive a `Notifier` explicitly instead of publishing to a
//! process-wide event emitter, so tests can substitute a recorder and
//! delivery failures surface at the call site.

use async_trait::async_trait;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpChannel {
    Email,
    Sms,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OtpNotification {
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub otp: String,
    pub channel: OtpChannel,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(&self, notification: &OtpNotification) -> Result<(), EngineError>;
}

/// Drops notifications on the floor. Useful in tests and local setups
/// without delivery credentials; the passcode still lands in the logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_otp(&self, notification: &OtpNotification) -> Result<(), EngineError> {
        tracing::info!(
            "otp notification suppressed for {} via {:?}",
            notification.email,
            notification.channel
        );
        Ok(())
    }
}
