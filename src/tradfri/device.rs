use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::Result,
    protocols::transport::decode_payload,
    tradfri::{
        codec::{DeviceAttributes, DeviceInfoAttributes, LightingAttributes},
        color::{parse_rgb, Chromaticity, Color},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LampState {
    Off = 0,
    On = 1,
}

impl LampState {
    pub fn from_wire(value: u8) -> Self {
        if value == 0 {
            LampState::Off
        } else {
            LampState::On
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl From<bool> for LampState {
    fn from(on: bool) -> Self {
        if on {
            LampState::On
        } else {
            LampState::Off
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    Unknown,
    Lamp,
    RemoteController,
}

/// Power source as enumerated by the LwM2M device object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PowerSource {
    DcPower,
    InternalBattery,
    ExternalBattery,
    /// Not part of LwM2M, reported by the remote controls
    Battery,
    PowerOverEthernet,
    Usb,
    AcPower,
    Solar,
    Unknown(u8),
}

impl From<u8> for PowerSource {
    fn from(value: u8) -> Self {
        match value {
            0 => PowerSource::DcPower,
            1 => PowerSource::InternalBattery,
            2 => PowerSource::ExternalBattery,
            3 => PowerSource::Battery,
            4 => PowerSource::PowerOverEthernet,
            5 => PowerSource::Usb,
            6 => PowerSource::AcPower,
            7 => PowerSource::Solar,
            other => PowerSource::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub power_source: PowerSource,
    pub battery_level: Option<u8>,
}

impl From<DeviceInfoAttributes> for DeviceInfo {
    fn from(info: DeviceInfoAttributes) -> Self {
        DeviceInfo {
            manufacturer: info.manufacturer,
            model_number: info.model_number,
            serial_number: info.serial_number,
            firmware_version: info.firmware_version,
            power_source: PowerSource::from(info.power_source),
            battery_level: info.battery_level,
        }
    }
}

/// Power state and brightness of a lamp or a group.
///
/// Brightness 0 always means off, and any positive brightness switches an
/// off light on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Dimmer {
    state: LampState,
    brightness: u8,
}

impl Dimmer {
    /// Takes both values as reported, the hub may report a dimmed light as off.
    pub fn from_wire(on_off: u8, dimmer: u8) -> Self {
        Dimmer {
            state: LampState::from_wire(on_off),
            brightness: dimmer,
        }
    }

    pub fn state(&self) -> LampState {
        self.state
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_state(&mut self, state: LampState) {
        self.state = state;
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;

        if brightness == 0 {
            self.state = LampState::Off;
        } else if self.state == LampState::Off {
            self.state = LampState::On;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lighting {
    #[serde(flatten)]
    dimmer: Dimmer,
    color: Option<Color>,
}

impl Lighting {
    fn from_attributes(attributes: &LightingAttributes) -> Self {
        // A garbled RGB attribute falls back to the value derived from x/y
        let rgb = attributes
            .rgb
            .as_deref()
            .and_then(|rgb| parse_rgb(rgb).ok());

        let color = match (attributes.color_x, attributes.color_y) {
            (Some(x), Some(y)) => Some(Color::from_chromaticity(Chromaticity::new(x, y), rgb)),
            _ => None,
        };

        Lighting {
            dimmer: Dimmer::from_wire(attributes.on_off, attributes.dimmer),
            color,
        }
    }

    pub fn state(&self) -> LampState {
        self.dimmer.state()
    }

    pub fn brightness(&self) -> u8 {
        self.dimmer.brightness()
    }

    /// `None` for lamps that report no chromaticity, such as white-only bulbs
    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn set_state(&mut self, state: LampState) {
        self.dimmer.set_state(state);
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.dimmer.set_brightness(brightness);
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DeviceKind {
    Generic,
    Lamp(Lighting),
    RemoteController,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Device {
    id: u32,
    name: String,
    created_at: DateTime<Utc>,
    reachable: bool,
    last_seen: DateTime<Utc>,
    info: DeviceInfo,
    kind: DeviceKind,
    #[serde(skip)]
    raw_payload: String,
}

pub(crate) fn timestamp_to_datetime(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

impl Device {
    /// Decodes a device body. The kind is picked from the objects present:
    /// a light control makes a lamp, a switch control a remote controller,
    /// anything else stays a generic device.
    pub fn parse(payload: &str) -> Result<Self> {
        let attributes: DeviceAttributes = decode_payload(payload)?;

        Ok(Device::from_attributes(attributes, payload))
    }

    pub fn from_attributes(attributes: DeviceAttributes, payload: &str) -> Self {
        let kind = if let Some(lighting) = attributes.light_control() {
            DeviceKind::Lamp(Lighting::from_attributes(lighting))
        } else if attributes.has_switch_control() {
            DeviceKind::RemoteController
        } else {
            DeviceKind::Generic
        };

        Device {
            id: attributes.id,
            name: attributes.name,
            created_at: timestamp_to_datetime(attributes.created_at),
            reachable: attributes.reachable != 0,
            last_seen: timestamp_to_datetime(attributes.last_seen),
            info: DeviceInfo::from(attributes.info),
            kind,
            raw_payload: payload.to_string(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    /// Body exactly as the gateway sent it
    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    pub fn device_type(&self) -> DeviceType {
        match self.kind {
            DeviceKind::Generic => DeviceType::Unknown,
            DeviceKind::Lamp(_) => DeviceType::Lamp,
            DeviceKind::RemoteController => DeviceType::RemoteController,
        }
    }

    pub fn lighting(&self) -> Option<&Lighting> {
        match &self.kind {
            DeviceKind::Lamp(lighting) => Some(lighting),
            _ => None,
        }
    }

    pub fn lighting_mut(&mut self) -> Option<&mut Lighting> {
        match &mut self.kind {
            DeviceKind::Lamp(lighting) => Some(lighting),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:?}, \"{}\", Available={}",
            self.id,
            self.device_type(),
            self.name,
            self.reachable
        )?;

        if let Some(lighting) = self.lighting() {
            write!(
                f,
                ", State={:?}, Dim={}",
                lighting.state(),
                lighting.brightness()
            )?;

            if let Some(color) = lighting.color() {
                write!(f, ", {color}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, tradfri::device::DeviceType};

    const LAMP: &str = r#"{"9001":"Desk","9002":1500000000,"9003":65537,"9019":1,"9020":1500001000,
        "3":{"0":"IKEA of Sweden","1":"TRADFRI bulb E27 WS opal 980lm","2":"","3":"1.2.214","6":1},
        "3311":[{"5709":30140,"5710":26909,"5850":0,"5851":180}]}"#;

    const REMOTE: &str = r#"{"9001":"Remote","9003":65536,"9019":1,
        "3":{"0":"IKEA of Sweden","1":"TRADFRI remote control","6":3,"9":87},
        "15009":[{"9003":0}]}"#;

    #[test]
    fn lamp_off_state_wins_over_brightness() {
        let device = Device::parse(LAMP).unwrap();
        let lighting = device.lighting().unwrap();

        assert_eq!(device.device_type(), DeviceType::Lamp);
        assert_eq!(lighting.state(), LampState::Off);
        assert_eq!(lighting.brightness(), 180);
        assert_eq!(
            lighting.color().map(Color::chromaticity),
            Some(Chromaticity::new(30140, 26909))
        );
        assert_eq!(device.created_at().timestamp(), 1500000000);
        assert_eq!(device.info().power_source, PowerSource::InternalBattery);
        assert_eq!(device.raw_payload(), LAMP);
    }

    #[test]
    fn switch_object_makes_a_remote_controller() {
        let device = Device::parse(REMOTE).unwrap();

        assert_eq!(device.device_type(), DeviceType::RemoteController);
        assert_eq!(device.info().power_source, PowerSource::Battery);
        assert_eq!(device.info().battery_level, Some(87));
        assert!(device.lighting().is_none());
    }

    #[test]
    fn unknown_shapes_decode_as_generic_devices() {
        let device = Device::parse(r#"{"9001":"Motion sensor","9003":65540,"3":{"6":9},"3300":[{}]}"#).unwrap();

        assert_eq!(device.device_type(), DeviceType::Unknown);
        assert_eq!(device.kind(), &DeviceKind::Generic);
        assert_eq!(device.info().power_source, PowerSource::Unknown(9));
        assert!(!device.reachable());

        let empty = Device::parse("{}").unwrap();
        assert_eq!(empty.device_type(), DeviceType::Unknown);
        assert_eq!(empty.created_at().timestamp(), 0);
    }

    #[test]
    fn white_only_lamp_has_no_color() {
        let device =
            Device::parse(r#"{"9001":"Hallway","9003":65541,"9019":1,"3311":[{"5850":1,"5851":10}]}"#)
                .unwrap();
        let lighting = device.lighting().unwrap();

        assert_eq!(device.device_type(), DeviceType::Lamp);
        assert_eq!(lighting.brightness(), 10);
        assert!(lighting.color().is_none());
        assert_eq!(
            device.to_string(),
            "65541,Lamp, \"Hallway\", Available=true, State=On, Dim=10"
        );
    }

    #[test]
    fn lamp_with_half_a_chromaticity_has_no_color() {
        let device = Device::parse(r#"{"9003":65542,"3311":[{"5706":"f1e0b5","5709":30140}]}"#).unwrap();

        assert!(device.lighting().unwrap().color().is_none());
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(matches!(Device::parse("not json"), Err(Error::Decode(_))));
        assert!(matches!(Device::parse("[1, 2]"), Err(Error::Decode(_))));
    }

    #[test]
    fn brightness_zero_switches_off() {
        let mut dimmer = Dimmer::from_wire(1, 100);

        dimmer.set_brightness(0);

        assert_eq!(dimmer.state(), LampState::Off);
        assert_eq!(dimmer.brightness(), 0);
    }

    #[test]
    fn positive_brightness_switches_on() {
        let mut dimmer = Dimmer::from_wire(0, 0);

        dimmer.set_brightness(12);

        assert_eq!(dimmer.state(), LampState::On);
    }

    #[test]
    fn positive_brightness_keeps_on_state() {
        let mut device = Device::parse(LAMP).unwrap();
        let lighting = device.lighting_mut().unwrap();

        lighting.set_state(LampState::On);
        lighting.set_brightness(40);
        assert_eq!(lighting.state(), LampState::On);

        lighting.set_brightness(255);
        assert_eq!(lighting.state(), LampState::On);
        assert_eq!(lighting.brightness(), 255);
    }

    #[test]
    fn display_includes_lighting() {
        let device = Device::parse(LAMP).unwrap();

        assert!(device
            .to_string()
            .starts_with("65537,Lamp, \"Desk\", Available=true, State=Off, Dim=180"));
    }
}
