//! Test utilities
//!
//! [`SimulatedHub`] is an in-memory gateway implementing [`Transport`]. It
//! answers the device and group resources like a real gateway does and can
//! be told to misbehave: clamp brightness, answer writes with an error code,
//! stall, or drop the connection.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use color_eyre::Result;
use eyre::eyre;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::{
    protocols::transport::{Method, Request, Transport, TransportResponse},
    settings::HubSettings,
    tradfri::{codec::keys, response::StatusCode},
};

#[derive(Debug, Default)]
struct HubState {
    psk: String,
    open: bool,
    devices: BTreeMap<u32, Value>,
    groups: BTreeMap<u32, Value>,
    requests: Vec<Request>,
    max_brightness: Option<u8>,
    put_status: Option<StatusCode>,
    ignore_puts: bool,
    stall: bool,
    fail: bool,
}

/// Handle to a simulated gateway. Clones share the same state, so a test can
/// keep one handle while the client owns another.
#[derive(Clone, Debug, Default)]
pub struct SimulatedHub {
    state: Arc<RwLock<HubState>>,
}

pub fn lamp(id: u32, name: &str) -> Value {
    json!({
        (keys::NAME): name,
        (keys::CREATED_AT): 1_500_000_000,
        (keys::ID): id,
        (keys::REACHABLE): 1,
        (keys::LAST_SEEN): 1_500_000_000,
        (keys::DEVICE_INFO): {
            "0": "IKEA of Sweden",
            "1": "TRADFRI bulb E27 WS opal 980lm",
            "2": "",
            "3": "1.2.214",
            "6": 1
        },
        (keys::LIGHT_CONTROL): [{
            (keys::COLOR_X): 30140,
            (keys::COLOR_Y): 26909,
            (keys::ON_OFF): 1,
            (keys::DIMMER): 254,
            (keys::ID): 0
        }]
    })
}

pub fn remote_control(id: u32, name: &str) -> Value {
    json!({
        (keys::NAME): name,
        (keys::CREATED_AT): 1_500_000_000,
        (keys::ID): id,
        (keys::REACHABLE): 1,
        (keys::LAST_SEEN): 1_500_000_000,
        (keys::DEVICE_INFO): {
            "0": "IKEA of Sweden",
            "1": "TRADFRI remote control",
            "6": 3,
            "9": 87
        },
        (keys::SWITCH_CONTROL): [{ (keys::ID): 0 }]
    })
}

pub fn group(id: u32, name: &str, members: &[u32]) -> Value {
    json!({
        (keys::NAME): name,
        (keys::CREATED_AT): 1_500_000_000,
        (keys::ID): id,
        (keys::ON_OFF): 1,
        (keys::DIMMER): 254,
        (keys::GROUP_MEMBERS): {
            (keys::HS_ACCESSORY_LINK): {
                (keys::ID): members
            }
        }
    })
}

fn response(status: StatusCode, payload: Option<String>) -> TransportResponse {
    TransportResponse::new(status.code(), payload)
}

impl SimulatedHub {
    pub fn new(psk: &str) -> Self {
        SimulatedHub {
            state: Arc::new(RwLock::new(HubState {
                psk: psk.to_string(),
                ..Default::default()
            })),
        }
    }

    pub async fn add_device(&self, device: Value) {
        let id = device[keys::ID].as_u64().unwrap_or_default() as u32;
        self.state.write().await.devices.insert(id, device);
    }

    pub async fn add_group(&self, group: Value) {
        let id = group[keys::ID].as_u64().unwrap_or_default() as u32;
        self.state.write().await.groups.insert(id, group);
    }

    pub async fn remove_device(&self, id: u32) {
        self.state.write().await.devices.remove(&id);
    }

    pub async fn set_reachable(&self, id: u32, reachable: bool) {
        if let Some(device) = self.state.write().await.devices.get_mut(&id) {
            device[keys::REACHABLE] = json!(u8::from(reachable));
        }
    }

    /// Lamps never go brighter than `max`, like bulbs with a limited range.
    pub async fn clamp_brightness(&self, max: u8) {
        self.state.write().await.max_brightness = Some(max);
    }

    /// Answer every PUT with `status` without touching any device.
    pub async fn answer_puts_with(&self, status: StatusCode) {
        self.state.write().await.put_status = Some(status);
    }

    /// Acknowledge PUTs with 2.04 but never apply them.
    pub async fn ignore_puts(&self, ignore: bool) {
        self.state.write().await.ignore_puts = ignore;
    }

    /// Stop answering requests.
    pub async fn stall(&self, stall: bool) {
        self.state.write().await.stall = stall;
    }

    /// Fail every request as if the connection was lost.
    pub async fn fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.open
    }

    pub async fn device(&self, id: u32) -> Option<Value> {
        self.state.read().await.devices.get(&id).cloned()
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<Request> {
        self.state.read().await.requests.clone()
    }

    pub async fn writes(&self) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|request| request.method == Method::Put)
            .collect()
    }

    pub async fn clear_requests(&self) {
        self.state.write().await.requests.clear();
    }
}

impl HubState {
    fn get(&self, resource: u32, id: Option<u32>) -> Result<TransportResponse> {
        let collection = match resource {
            keys::DEVICES => &self.devices,
            keys::GROUPS => &self.groups,
            _ => return Ok(response(StatusCode::NotFound, None)),
        };

        let body = match id {
            None => serde_json::to_string(&collection.keys().collect::<Vec<_>>())?,
            Some(id) => match collection.get(&id) {
                Some(value) => serde_json::to_string(value)?,
                None => return Ok(response(StatusCode::NotFound, None)),
            },
        };

        Ok(response(StatusCode::Content, Some(body)))
    }

    fn put(&mut self, resource: u32, id: Option<u32>, payload: &str) -> Result<TransportResponse> {
        let (keys::DEVICES, Some(id)) = (resource, id) else {
            return Ok(response(StatusCode::MethodNotAllowed, None));
        };

        if let Some(status) = self.put_status {
            return Ok(response(status, None));
        }

        let Ok(body) = serde_json::from_str::<Value>(payload) else {
            return Ok(response(StatusCode::BadRequest, None));
        };
        let Some(update) = body[keys::LIGHT_CONTROL][0].as_object() else {
            return Ok(response(StatusCode::BadRequest, None));
        };

        let max_brightness = self.max_brightness;
        let ignore = self.ignore_puts;

        let Some(device) = self.devices.get_mut(&id) else {
            return Ok(response(StatusCode::NotFound, None));
        };
        let Some(light) = device[keys::LIGHT_CONTROL][0].as_object_mut() else {
            return Ok(response(StatusCode::MethodNotAllowed, None));
        };

        if !ignore {
            for (key, value) in update {
                let value = match (key.as_str(), max_brightness, value.as_u64()) {
                    (keys::DIMMER, Some(max), Some(level)) => json!(level.min(u64::from(max))),
                    _ => value.clone(),
                };
                light.insert(key.clone(), value);
            }
        }

        Ok(response(StatusCode::Changed, None))
    }
}

fn parse_path(path: &str) -> Option<(u32, Option<u32>)> {
    let mut segments = path.trim_matches('/').split('/');
    let resource = segments.next()?.parse().ok()?;
    let id = match segments.next() {
        Some(id) => Some(id.parse().ok()?),
        None => None,
    };

    Some((resource, id))
}

#[async_trait]
impl Transport for SimulatedHub {
    async fn open(&mut self, settings: &HubSettings) -> Result<()> {
        let mut state = self.state.write().await;

        if settings.psk != state.psk {
            return Err(eyre!("DTLS handshake with {} failed: bad PSK", settings.addr));
        }

        state.open = true;

        Ok(())
    }

    async fn request(&mut self, request: &Request) -> Result<TransportResponse> {
        let mut state = self.state.write().await;

        if !state.open {
            return Err(eyre!("Session is not open"));
        }

        state.requests.push(request.clone());

        if state.fail {
            return Err(eyre!("Connection reset by peer"));
        }

        if state.stall {
            drop(state);
            return std::future::pending().await;
        }

        let Some((resource, id)) = parse_path(&request.path) else {
            return Ok(response(StatusCode::BadRequest, None));
        };

        match (request.method, request.payload.as_deref()) {
            (Method::Get, _) => state.get(resource, id),
            (Method::Put, Some(payload)) => state.put(resource, id, payload),
            (Method::Put, None) => Ok(response(StatusCode::BadRequest, None)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.state.write().await.open = false;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_paths() {
        assert_eq!(parse_path("15001/"), Some((15001, None)));
        assert_eq!(parse_path("15001/65537"), Some((15001, Some(65537))));
        assert_eq!(parse_path("15001/abc"), None);
        assert_eq!(parse_path("lights"), None);
    }

    #[tokio::test]
    async fn puts_merge_into_the_light_control() {
        let hub = SimulatedHub::new("secret");
        hub.add_device(lamp(65537, "Desk")).await;
        hub.clamp_brightness(200).await;

        let mut transport = hub.clone();
        transport
            .open(&HubSettings::new("127.0.0.1", "secret"))
            .await
            .unwrap();

        let answer = transport
            .request(&Request::put("15001/65537", r#"{"3311":[{"5851":255,"5850":0}]}"#))
            .await
            .unwrap();

        assert_eq!(answer.code, StatusCode::Changed.code());

        let device = hub.device(65537).await.unwrap();
        assert_eq!(device["3311"][0]["5851"], json!(200));
        assert_eq!(device["3311"][0]["5850"], json!(0));
        assert_eq!(device["3311"][0]["5709"], json!(30140));
    }

    #[tokio::test]
    async fn bad_psk_fails_to_open() {
        let mut hub = SimulatedHub::new("secret");

        assert!(hub
            .open(&HubSettings::new("127.0.0.1", "wrong"))
            .await
            .is_err());
        assert!(!hub.is_open().await);
    }
}
