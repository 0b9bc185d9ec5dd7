use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    protocols::transport::decode_payload,
    tradfri::{
        codec::GroupAttributes,
        device::{timestamp_to_datetime, Device, Dimmer, LampState},
    },
};

/// Outcome of reading one group member.
pub type MemberResult = (u32, Result<Device, Error>);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Group {
    id: u32,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    dimmer: Dimmer,
    devices: Vec<Device>,
}

impl Group {
    pub fn parse_attributes(payload: &str) -> Result<GroupAttributes> {
        Ok(decode_payload(payload)?)
    }

    /// Builds a group from its attributes and the result of reading every
    /// member. Members that could not be read are left out, in order.
    pub fn from_attributes(
        attributes: GroupAttributes,
        members: impl IntoIterator<Item = MemberResult>,
    ) -> Self {
        let devices = members
            .into_iter()
            .filter_map(|(id, member)| match member {
                Ok(device) => Some(device),
                Err(e) => {
                    log::warn!(
                        "Dropping member {} from group {}: {}",
                        id,
                        attributes.id,
                        e
                    );
                    None
                }
            })
            .collect();

        Group {
            id: attributes.id,
            name: attributes.name,
            created_at: timestamp_to_datetime(attributes.created_at),
            dimmer: Dimmer::from_wire(attributes.on_off, attributes.dimmer),
            devices,
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

    pub fn state(&self) -> LampState {
        self.dimmer.state()
    }

    pub fn brightness(&self) -> u8 {
        self.dimmer.brightness()
    }

    pub fn set_state(&mut self, state: LampState) {
        self.dimmer.set_state(state);
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.dimmer.set_brightness(brightness);
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}, Group:\"{}\", State={:?}, Brightness={},",
            self.id,
            self.name,
            self.state(),
            self.brightness()
        )?;
        write!(f, "\tDevices:")?;

        for device in &self.devices {
            write!(f, "\n\t\t{device}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocols::transport::TransportResponse, tradfri::response::ControllerResponse};

    const GROUP: &str = r#"{"9001":"Living room","9002":1500000000,"9003":131073,"5850":1,"5851":0,
        "9018":{"15002":{"9003":[65537,65538,65539]}},"9039":196610}"#;

    fn lamp(id: u32) -> Device {
        Device::parse(&format!(
            r#"{{"9001":"Lamp {id}","9003":{id},"9019":1,"3311":[{{"5850":1,"5851":100}}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn unreadable_members_are_dropped() {
        let attributes = Group::parse_attributes(GROUP).unwrap();
        let ids = attributes.member_ids().to_vec();

        let members = vec![
            (ids[0], Ok(lamp(ids[0]))),
            (
                ids[1],
                Err(Error::Request {
                    path: "15001/65538".to_string(),
                    response: ControllerResponse::from_transport(TransportResponse::new(132, None)),
                }),
            ),
            (ids[2], Ok(lamp(ids[2]))),
        ];

        let group = Group::from_attributes(attributes, members);

        assert_eq!(group.id(), 131073);
        assert_eq!(group.name(), "Living room");
        let member_ids: Vec<u32> = group.devices().iter().map(Device::id).collect();
        assert_eq!(member_ids, vec![65537, 65539]);
    }

    #[test]
    fn group_dimmer_follows_lamp_rules() {
        let attributes = Group::parse_attributes(GROUP).unwrap();
        let mut group = Group::from_attributes(attributes, Vec::new());

        // Reported verbatim: on with brightness 0
        assert_eq!(group.state(), LampState::On);

        group.set_brightness(0);
        assert_eq!(group.state(), LampState::Off);

        group.set_brightness(80);
        assert_eq!(group.state(), LampState::On);
        assert_eq!(group.brightness(), 80);
    }

    #[test]
    fn group_without_members_object() {
        let attributes = Group::parse_attributes(r#"{"9001":"Empty","9003":131074}"#).unwrap();

        assert!(attributes.member_ids().is_empty());
    }
}
