//! Wire shapes of the gateway's JSON bodies.
//!
//! Every key on the wire is a bare LwM2M / IPSO object or resource ID. The
//! structs here map those IDs onto named fields in both directions, the
//! typed device model is built from them in `device` and `group`.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

pub mod keys {
    /// Device collection
    pub const DEVICES: u32 = 15001;
    /// Group collection
    pub const GROUPS: u32 = 15004;

    pub const NAME: &str = "9001";
    pub const CREATED_AT: &str = "9002";
    pub const ID: &str = "9003";
    pub const REACHABLE: &str = "9019";
    pub const LAST_SEEN: &str = "9020";
    pub const DEVICE_INFO: &str = "3";
    pub const LIGHT_CONTROL: &str = "3311";
    pub const SWITCH_CONTROL: &str = "15009";
    pub const GROUP_MEMBERS: &str = "9018";
    pub const HS_ACCESSORY_LINK: &str = "15002";

    pub const RGB: &str = "5706";
    pub const COLOR_X: &str = "5709";
    pub const COLOR_Y: &str = "5710";
    pub const ON_OFF: &str = "5850";
    pub const DIMMER: &str = "5851";
}

pub fn collection_path(resource: u32) -> String {
    format!("{resource}/")
}

pub fn resource_path(resource: u32, id: u32) -> String {
    format!("{resource}/{id}")
}

/// Device information object (LwM2M object 3).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DeviceInfoAttributes {
    #[serde(rename = "0")]
    pub manufacturer: String,

    #[serde(rename = "1")]
    pub model_number: String,

    #[serde(rename = "2")]
    pub serial_number: String,

    #[serde(rename = "3")]
    pub firmware_version: String,

    #[serde(rename = "6")]
    pub power_source: u8,

    #[serde(rename = "9")]
    pub battery_level: Option<u8>,
}

/// Light control object (IPSO object 3311).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LightingAttributes {
    #[serde(rename = "5706")]
    pub rgb: Option<String>,

    /// Absent on white-only bulbs
    #[serde(rename = "5709")]
    pub color_x: Option<u16>,

    #[serde(rename = "5710")]
    pub color_y: Option<u16>,

    #[serde(rename = "5850")]
    pub on_off: u8,

    #[serde(rename = "5851")]
    pub dimmer: u8,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DeviceAttributes {
    #[serde(rename = "9001")]
    pub name: String,

    #[serde(rename = "9002")]
    pub created_at: i64,

    #[serde(rename = "9003")]
    pub id: u32,

    #[serde(rename = "9019")]
    pub reachable: u8,

    #[serde(rename = "9020")]
    pub last_seen: i64,

    #[serde(rename = "3")]
    pub info: DeviceInfoAttributes,

    #[serde(rename = "3311")]
    pub lighting: Option<Vec<LightingAttributes>>,

    /// Only remote controls carry a switch object. Its content is ignored.
    #[serde(rename = "15009")]
    pub switch: Option<serde_json::Value>,
}

impl DeviceAttributes {
    pub fn light_control(&self) -> Option<&LightingAttributes> {
        self.lighting.as_ref().and_then(|lighting| lighting.first())
    }

    pub fn has_switch_control(&self) -> bool {
        self.switch.is_some()
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AccessoryLink {
    #[serde(rename = "9003")]
    pub ids: Vec<u32>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GroupMembers {
    #[serde(rename = "15002")]
    pub link: AccessoryLink,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GroupAttributes {
    #[serde(rename = "9001")]
    pub name: String,

    #[serde(rename = "9002")]
    pub created_at: i64,

    #[serde(rename = "9003")]
    pub id: u32,

    #[serde(rename = "5850")]
    pub on_off: u8,

    #[serde(rename = "5851")]
    pub dimmer: u8,

    #[serde(rename = "9018")]
    pub members: GroupMembers,
}

impl GroupAttributes {
    pub fn member_ids(&self) -> &[u32] {
        &self.members.link.ids
    }
}

/// Fields written by a lighting PUT. Unset fields are left out of the body
/// so the lamp keeps its current value for them.
#[derive(Builder, Serialize, Debug, Clone, Default, PartialEq)]
#[builder(setter(into, strip_option), default)]
pub struct LightingUpdate {
    #[serde(rename = "5706", skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,

    #[serde(rename = "5709", skip_serializing_if = "Option::is_none")]
    pub color_x: Option<u16>,

    #[serde(rename = "5710", skip_serializing_if = "Option::is_none")]
    pub color_y: Option<u16>,

    #[serde(rename = "5850", skip_serializing_if = "Option::is_none")]
    pub on_off: Option<u8>,

    #[serde(rename = "5851", skip_serializing_if = "Option::is_none")]
    pub dimmer: Option<u8>,
}

#[derive(Serialize, Debug, Clone)]
struct LightingRequest<'a> {
    #[serde(rename = "3311")]
    light_control: [&'a LightingUpdate; 1],
}

impl LightingUpdate {
    /// `{"3311":[{...}]}`
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&LightingRequest {
            light_control: [self],
        })
    }
}
