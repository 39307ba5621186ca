//! Receiver settings surface
//!
//! Settings are plain in-memory state (no persistence backend is part of this crate); a
//! host application that wants persistence loads its own config and calls the setters.
//! `name`/`password`/`port` changes are observed by the mDNS advertiser task via a
//! [`tokio::sync::watch`] channel and trigger an immediate TXT re-publish. `port` changes
//! additionally require the caller to restart the listener; rebinding a live listener is
//! outside this crate's scope. The remaining fields are read by the pipeline assembler
//! only at the next `SETUP`.

use tokio::sync::watch;

/// Runtime-reconfigurable receiver settings
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverSettings {
    /// mDNS instance name and digest-auth realm
    pub name: String,

    /// Shared secret; digest auth is required when non-empty
    pub password: String,

    /// RTSP listen port
    pub port: u16,

    /// Jitter buffer depth, in milliseconds
    pub latency_ms: u32,

    /// Time to wait for a missing packet before issuing a retransmit request
    pub rtx_delay_ms: i32,

    /// Minimum spacing between repeated retransmit requests for the same gap
    pub rtx_retry_period_ms: i32,

    /// Disable clock-sync packets to the audio sink
    pub hack_sync: bool,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            name: "Melo".to_string(),
            password: String::new(),
            port: 5000,
            latency_ms: 1000,
            rtx_delay_ms: 500,
            rtx_retry_period_ms: 100,
            hack_sync: false,
        }
    }
}

impl ReceiverSettings {
    /// Create settings with a custom name, defaults otherwise
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether digest authentication should be required
    #[must_use]
    pub fn password_required(&self) -> bool {
        !self.password.is_empty()
    }

    /// Set the RTSP listen port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the jitter buffer depth, in milliseconds
    #[must_use]
    pub fn latency_ms(mut self, latency_ms: u32) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Backwards-compatible alias used by receiver construction helpers
pub type ReceiverConfig = ReceiverSettings;

/// Sender half of the settings change channel
///
/// Cloning a handle and calling [`SettingsHandle::update`] publishes a new snapshot to
/// every [`watch::Receiver`] held by the advertiser task and any other subscriber.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: watch::Sender<ReceiverSettings>,
}

impl SettingsHandle {
    /// Create a new settings channel seeded with `initial`
    #[must_use]
    pub fn new(initial: ReceiverSettings) -> (Self, watch::Receiver<ReceiverSettings>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    /// Current settings snapshot
    #[must_use]
    pub fn current(&self) -> ReceiverSettings {
        self.tx.borrow().clone()
    }

    /// Subscribe for change notifications
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReceiverSettings> {
        self.tx.subscribe()
    }

    /// Replace the settings wholesale, notifying subscribers
    pub fn update(&self, settings: ReceiverSettings) {
        let _ = self.tx.send(settings);
    }

    /// Update the name, notifying subscribers (mDNS republish)
    pub fn set_name(&self, name: impl Into<String>) {
        self.tx.send_modify(|s| s.name = name.into());
    }

    /// Update the password, notifying subscribers (mDNS republish)
    pub fn set_password(&self, password: impl Into<String>) {
        self.tx.send_modify(|s| s.password = password.into());
    }

    /// Update the port, notifying subscribers (mDNS republish; listener restart is the
    /// caller's responsibility)
    pub fn set_port(&self, port: u16) {
        self.tx.send_modify(|s| s.port = port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let settings = ReceiverSettings::default();
        assert_eq!(settings.name, "Melo");
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.latency_ms, 1000);
        assert_eq!(settings.rtx_delay_ms, 500);
        assert_eq!(settings.rtx_retry_period_ms, 100);
        assert!(!settings.hack_sync);
        assert!(!settings.password_required());
    }

    #[test]
    fn password_required_tracks_emptiness() {
        let mut settings = ReceiverSettings::default();
        assert!(!settings.password_required());
        settings.password = "secret".to_string();
        assert!(settings.password_required());
    }

    #[tokio::test]
    async fn update_notifies_subscriber() {
        let (handle, mut rx) = SettingsHandle::new(ReceiverSettings::default());
        handle.set_name("Living Room");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().name, "Living Room");
    }
}
