//! `_raop._tcp` mDNS service advertisement

use std::collections::HashMap;
use std::sync::Arc;

use mdns_sd::{Error as MdnsError, ServiceDaemon, ServiceInfo};
use tokio::sync::{RwLock, mpsc};

/// Errors from service advertisement
#[derive(Debug, thiserror::Error)]
pub enum AdvertiserError {
    /// mDNS error
    #[error("mDNS error: {0}")]
    Mdns(#[from] MdnsError),

    /// Service not registered
    #[error("service not registered")]
    NotRegistered,

    /// Service already registered
    #[error("service already registered")]
    AlreadyRegistered,

    /// The advertiser's background task has exited
    #[error("advertiser task is no longer running")]
    TaskGone,
}

/// Hardware address fallback used when no real interface MAC can be found.
///
/// Matches what a real AirPort Express reports when it cannot read its own MAC; the
/// value itself carries no meaning beyond being a stable, recognizable placeholder.
pub const DEFAULT_HW_ADDR: [u8; 6] = [0x00, 0x51, 0x52, 0x53, 0x54, 0x55];

/// Format a hardware address as the 12 lowercase hex digits used in the RAOP instance
/// name (`<hwaddr>@<name>`), with no separators.
#[must_use]
pub fn format_hw_addr(hw_addr: &[u8; 6]) -> String {
    hw_addr.iter().map(|b| format!("{b:02x}")).collect()
}

/// Derive a stable, locally-administered hardware address from the machine hostname.
///
/// There's no portable way to read a real interface MAC without platform-specific code,
/// so the instance identity is pinned to a hash of the hostname instead; this keeps the
/// mDNS instance name stable across restarts on the same machine.
#[must_use]
pub fn stable_hw_addr() -> [u8; 6] {
    let seed = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "raop-receiver".to_string());

    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }

    let bytes = hash.to_be_bytes();
    let mut hw_addr = [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]];
    hw_addr[0] |= 0x02; // locally-administered bit
    hw_addr[0] &= 0xFE; // unicast
    hw_addr
}

/// Build the TXT record for `_raop._tcp` advertisement.
///
/// The key set is fixed by the RAOP service-discovery contract; every receiver
/// advertises the same capability set regardless of active stream state, except `pw`
/// which tracks whether a password is currently configured.
#[must_use]
pub fn build_txt_record(password_set: bool) -> HashMap<String, String> {
    let mut txt = HashMap::new();
    txt.insert("txtvers".into(), "1".into());
    txt.insert("ch".into(), "2".into());
    txt.insert("cn".into(), "0,1".into());
    txt.insert("ek".into(), "1".into());
    txt.insert("et".into(), "0,1".into());
    txt.insert("md".into(), "0,1,2".into());
    txt.insert("pw".into(), password_set.to_string());
    txt.insert("sm".into(), "false".into());
    txt.insert("sr".into(), "44100".into());
    txt.insert("ss".into(), "16".into());
    txt.insert("sv".into(), "false".into());
    txt.insert("tp".into(), "TCP,UDP".into());
    txt.insert("vn".into(), "3".into());
    txt
}

/// Configuration for RAOP service advertisement
#[derive(Debug, Clone)]
pub struct AdvertiserConfig {
    /// Friendly name shown to users (e.g., "Living Room Speaker")
    pub name: String,
    /// RTSP port to advertise
    pub port: u16,
    /// Whether a password is currently required to connect
    pub password_set: bool,
    /// Hardware address used in the instance name and as an identity anchor
    pub hw_addr: [u8; 6],
}

impl AdvertiserConfig {
    /// Instance name for this configuration: `<hwaddr-hex>@<name>`
    #[must_use]
    pub fn instance_name(&self) -> String {
        format!("{}@{}", format_hw_addr(&self.hw_addr), self.name)
    }
}

/// RAOP service advertiser
///
/// Handles mDNS advertisement lifecycle including registration, TXT updates on
/// name/password/port changes, and graceful unregistration.
pub struct RaopAdvertiser {
    config: AdvertiserConfig,
    daemon: ServiceDaemon,
    service_fullname: Option<String>,
}

impl RaopAdvertiser {
    const SERVICE_TYPE: &'static str = "_raop._tcp.local.";

    /// Create a new advertiser
    ///
    /// # Errors
    ///
    /// Returns error if the mDNS daemon cannot be initialized.
    pub fn new(config: AdvertiserConfig) -> Result<Self, AdvertiserError> {
        let daemon = ServiceDaemon::new()?;
        Ok(Self {
            config,
            daemon,
            service_fullname: None,
        })
    }

    /// Register the service on the network
    ///
    /// # Errors
    ///
    /// Returns error if the service is already registered or mDNS registration fails.
    pub fn register(&mut self) -> Result<(), AdvertiserError> {
        if self.service_fullname.is_some() {
            return Err(AdvertiserError::AlreadyRegistered);
        }

        let instance_name = self.config.instance_name();
        let hostname = format!(
            "{}.local.",
            self.config.name.replace(' ', "-").to_lowercase()
        );
        let txt = build_txt_record(self.config.password_set);

        let service_info = ServiceInfo::new(
            Self::SERVICE_TYPE,
            &instance_name,
            &hostname,
            "",
            self.config.port,
            txt,
        )?;

        self.daemon.register(service_info.clone())?;
        self.service_fullname = Some(service_info.get_fullname().to_string());

        tracing::info!(name = %instance_name, port = self.config.port, "raop service registered");
        Ok(())
    }

    /// Unregister the service from the network
    ///
    /// # Errors
    ///
    /// Returns error if the service is not registered or mDNS unregistration fails.
    pub fn unregister(&mut self) -> Result<(), AdvertiserError> {
        let fullname = self
            .service_fullname
            .take()
            .ok_or(AdvertiserError::NotRegistered)?;
        self.daemon.unregister(&fullname)?;
        tracing::info!(name = %fullname, "raop service unregistered");
        Ok(())
    }

    /// Apply a config change (name, password, or port) by re-registering.
    ///
    /// # Errors
    ///
    /// Returns error if re-registration fails.
    pub fn republish(&mut self, config: AdvertiserConfig) -> Result<(), AdvertiserError> {
        self.config = config;
        if self.service_fullname.is_some() {
            self.unregister()?;
        }
        self.register()
    }
}

impl Drop for RaopAdvertiser {
    fn drop(&mut self) {
        if self.service_fullname.is_some() {
            let _ = self.unregister();
        }
    }
}

/// Commands for async advertiser control
#[derive(Debug)]
enum AdvertiserCommand {
    Republish(AdvertiserConfig),
    Shutdown,
}

/// Async-friendly RAOP advertiser
///
/// Wraps the synchronous `mdns-sd` advertiser in a background task and exposes async
/// methods to republish the TXT record when the receiver's name, password, or port
/// changes while started.
pub struct AsyncRaopAdvertiser {
    command_tx: mpsc::Sender<AdvertiserCommand>,
    config: Arc<RwLock<AdvertiserConfig>>,
}

impl AsyncRaopAdvertiser {
    /// Create and start the advertiser
    ///
    /// # Errors
    ///
    /// Returns error if the advertiser cannot be created.
    pub async fn start(config: AdvertiserConfig) -> Result<Self, AdvertiserError> {
        let (command_tx, mut command_rx) = mpsc::channel(16);
        let config = Arc::new(RwLock::new(config));
        let initial = config.read().await.clone();

        tokio::task::spawn_blocking(move || {
            let mut advertiser = match RaopAdvertiser::new(initial) {
                Ok(a) => a,
                Err(e) => {
                    tracing::error!("failed to create raop advertiser: {e}");
                    return;
                }
            };

            if let Err(e) = advertiser.register() {
                tracing::error!("failed to register raop service: {e}");
                return;
            }

            while let Some(cmd) = command_rx.blocking_recv() {
                match cmd {
                    AdvertiserCommand::Republish(new_config) => {
                        if let Err(e) = advertiser.republish(new_config) {
                            tracing::warn!("failed to republish raop service: {e}");
                        }
                    }
                    AdvertiserCommand::Shutdown => break,
                }
            }

            let _ = advertiser.unregister();
        });

        Ok(Self { command_tx, config })
    }

    /// Republish the service with updated settings (name, password, or port changed).
    ///
    /// # Errors
    ///
    /// Returns error if the advertiser task has already exited.
    pub async fn republish(&self, new_config: AdvertiserConfig) -> Result<(), AdvertiserError> {
        *self.config.write().await = new_config.clone();
        self.command_tx
            .send(AdvertiserCommand::Republish(new_config))
            .await
            .map_err(|_| AdvertiserError::TaskGone)
    }

    /// Currently-published configuration
    pub async fn config(&self) -> AdvertiserConfig {
        self.config.read().await.clone()
    }

    /// Shut down the advertiser and unregister the service
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(AdvertiserCommand::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hw_addr_as_lowercase_no_separator() {
        let hw_addr = [0x58, 0x55, 0xca, 0x1a, 0xe2, 0x88];
        assert_eq!(format_hw_addr(&hw_addr), "5855ca1ae288");
    }

    #[test]
    fn formats_hw_addr_with_zeros() {
        let hw_addr = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        assert_eq!(format_hw_addr(&hw_addr), "001122334455");
    }

    #[test]
    fn stable_hw_addr_is_locally_administered_and_unicast() {
        let hw_addr = stable_hw_addr();
        assert_ne!(hw_addr, [0u8; 6]);
        assert_eq!(hw_addr[0] & 0x02, 0x02);
        assert_eq!(hw_addr[0] & 0x01, 0x00);
        assert_eq!(stable_hw_addr(), hw_addr, "must be deterministic");
    }

    #[test]
    fn instance_name_joins_hw_addr_and_name() {
        let config = AdvertiserConfig {
            name: "Living Room".to_string(),
            port: 5000,
            password_set: false,
            hw_addr: [0x58, 0x55, 0xca, 0x1a, 0xe2, 0x88],
        };
        assert_eq!(config.instance_name(), "5855ca1ae288@Living Room");
    }

    #[test]
    fn txt_record_has_exact_key_set() {
        let txt = build_txt_record(false);
        assert_eq!(txt.get("txtvers").map(String::as_str), Some("1"));
        assert_eq!(txt.get("ch").map(String::as_str), Some("2"));
        assert_eq!(txt.get("cn").map(String::as_str), Some("0,1"));
        assert_eq!(txt.get("ek").map(String::as_str), Some("1"));
        assert_eq!(txt.get("et").map(String::as_str), Some("0,1"));
        assert_eq!(txt.get("md").map(String::as_str), Some("0,1,2"));
        assert_eq!(txt.get("pw").map(String::as_str), Some("false"));
        assert_eq!(txt.get("sm").map(String::as_str), Some("false"));
        assert_eq!(txt.get("sr").map(String::as_str), Some("44100"));
        assert_eq!(txt.get("ss").map(String::as_str), Some("16"));
        assert_eq!(txt.get("sv").map(String::as_str), Some("false"));
        assert_eq!(txt.get("tp").map(String::as_str), Some("TCP,UDP"));
        assert_eq!(txt.get("vn").map(String::as_str), Some("3"));
        assert_eq!(txt.len(), 13);
    }

    #[test]
    fn txt_record_pw_tracks_password_presence() {
        let txt = build_txt_record(true);
        assert_eq!(txt.get("pw").map(String::as_str), Some("true"));
    }

    #[test]
    fn register_then_unregister_round_trips() {
        let config = AdvertiserConfig {
            name: "Test Receiver".to_string(),
            port: 5123,
            password_set: false,
            hw_addr: DEFAULT_HW_ADDR,
        };
        let Ok(mut advertiser) = RaopAdvertiser::new(config) else {
            return;
        };
        if advertiser.register().is_err() {
            return;
        }
        assert!(advertiser.register().is_err(), "double register must fail");
        assert!(advertiser.unregister().is_ok());
        assert!(matches!(
            advertiser.unregister(),
            Err(AdvertiserError::NotRegistered)
        ));
    }
}
