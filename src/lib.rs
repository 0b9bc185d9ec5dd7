//! Client for IKEA Trådfri gateways.
//!
//! Lamps, groups and remote controls are read and written over one secure
//! session per gateway. Writes to a lamp are checked for reachability first
//! and verified by reading the lamp back.
//!
//! # Example
//!
//! ```rust,no_run
//! use tradfri_client::{settings::read_settings, Client, Transport};
//!
//! async fn dim_everything<T: Transport>(transport: T) -> tradfri_client::Result<()> {
//!     let settings = read_settings().map_err(|e| tradfri_client::Error::Config(e.to_string()))?;
//!     let mut client = Client::new(settings.hub, transport);
//!
//!     client.connect().await?;
//!
//!     for device in client.get_devices().await? {
//!         if device.lighting().is_some() {
//!             let response = client.set_brightness(device.id(), 64).await?;
//!             log::info!("{}: {}", device.name(), response);
//!         }
//!     }
//!
//!     client.disconnect().await
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module has an in-memory gateway that can stand in for the
//! secure transport:
//!
//! ```rust,ignore
//! use tradfri_client::testing::{lamp, SimulatedHub};
//!
//! let hub = SimulatedHub::new("secret");
//! hub.add_device(lamp(65537, "Desk")).await;
//!
//! let mut client = Client::new(HubSettings::new("127.0.0.1", "secret"), hub.clone());
//! client.connect().await?;
//! ```

mod error;
pub mod protocols;
pub mod settings;
pub mod testing;
pub mod tradfri;

pub use error::{Error, Result};
pub use protocols::transport::{Method, Request, Transport, TransportResponse};
pub use settings::HubSettings;
pub use tradfri::{
    client::{Client, SessionState},
    color::{Chromaticity, Color, Preset},
    device::{Device, DeviceInfo, DeviceKind, DeviceType, LampState, Lighting, PowerSource},
    group::Group,
    response::{ControllerResponse, ResponseOrigin, StatusCode},
};
