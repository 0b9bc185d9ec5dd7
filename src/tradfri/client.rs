use crate::{
    error::{Error, Result},
    protocols::transport::{decode_payload, Request, Transport, TransportResponse},
    settings::HubSettings,
    tradfri::{
        codec::{collection_path, keys, resource_path, LightingUpdate, LightingUpdateBuilder},
        color::{format_rgb, kelvin_to_chromaticity, parse_rgb, Chromaticity, Color},
        device::{Device, LampState, Lighting},
        group::Group,
        response::{ControllerResponse, StatusCode},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// One secure session to one gateway.
///
/// Every operation waits for its answer before returning, and `&mut self`
/// keeps a second request from being issued on the same session meanwhile.
/// A session that failed is not reopened automatically, call
/// [`Client::connect`] again.
pub struct Client<T> {
    settings: HubSettings,
    transport: T,
    state: SessionState,
}

impl<T: Transport> Client<T> {
    pub fn new(settings: HubSettings, transport: T) -> Self {
        Client {
            settings,
            transport,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Opens the session and performs the first read the gateway needs
    /// before it considers the DTLS handshake complete.
    pub async fn connect(&mut self) -> Result<()> {
        self.settings.validate()?;

        if self.state == SessionState::Connected {
            return Ok(());
        }

        self.transport
            .open(&self.settings)
            .await
            .map_err(Error::Transport)?;

        let handshake = Request::get(collection_path(keys::DEVICES));
        let result = match self.exchange(&handshake).await {
            // Any answer completes the handshake, even an error code
            Ok(response) if !(response.timed_out || response.rejected || response.cancelled) => {
                log::debug!(
                    "Connected to {}:{} ({})",
                    self.settings.addr,
                    self.settings.port,
                    response
                );
                self.state = SessionState::Connected;
                return Ok(());
            }
            Ok(response) => Err(Error::Request {
                path: handshake.path,
                response,
            }),
            Err(e) => Err(e),
        };

        if let Err(close_error) = self.transport.close().await {
            log::warn!("Failed to close transport: {:?}", close_error);
        }

        result
    }

    /// Releases the secure channel.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }

        self.state = SessionState::Disconnected;
        self.transport.close().await.map_err(Error::Transport)
    }

    async fn exchange(&mut self, request: &Request) -> Result<ControllerResponse> {
        log::debug!("{} {}", request.method, request.path);

        let timeout = self.settings.request_timeout();
        let response = match tokio::time::timeout(timeout, self.transport.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.state = SessionState::Disconnected;
                return Err(Error::Transport(e));
            }
            Err(_) => {
                log::warn!(
                    "{} {} timed out after {:?}",
                    request.method,
                    request.path,
                    timeout
                );
                TransportResponse::timed_out()
            }
        };

        Ok(ControllerResponse::from_transport(response))
    }

    async fn send(&mut self, request: &Request) -> Result<ControllerResponse> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }

        self.exchange(request).await
    }

    async fn read(&mut self, path: String) -> Result<String> {
        let response = self.send(&Request::get(path.as_str())).await?;

        if !response.is_success() {
            return Err(Error::Request { path, response });
        }

        Ok(response.payload.unwrap_or_default())
    }

    pub async fn list_device_ids(&mut self) -> Result<Vec<u32>> {
        let body = self.read(collection_path(keys::DEVICES)).await?;

        Ok(decode_payload(&body)?)
    }

    pub async fn list_group_ids(&mut self) -> Result<Vec<u32>> {
        let body = self.read(collection_path(keys::GROUPS)).await?;

        Ok(decode_payload(&body)?)
    }

    pub async fn get_device(&mut self, id: u32) -> Result<Device> {
        let body = self.read(resource_path(keys::DEVICES, id)).await?;

        Device::parse(&body)
    }

    /// Reads every device the gateway knows. Devices that cannot be read are
    /// skipped.
    pub async fn get_devices(&mut self) -> Result<Vec<Device>> {
        let ids = self.list_device_ids().await?;
        let mut devices = Vec::with_capacity(ids.len());

        for id in ids {
            match self.get_device(id).await {
                Ok(device) => devices.push(device),
                Err(e) if e.is_session_failure() => return Err(e),
                Err(e) => log::warn!("Skipping device {}: {}", id, e),
            }
        }

        Ok(devices)
    }

    /// Reads a group and then each of its members, one request at a time.
    pub async fn get_group(&mut self, id: u32) -> Result<Group> {
        let body = self.read(resource_path(keys::GROUPS, id)).await?;
        let attributes = Group::parse_attributes(&body)?;

        let mut members = Vec::with_capacity(attributes.member_ids().len());
        for &member_id in attributes.member_ids() {
            match self.get_device(member_id).await {
                Err(e) if e.is_session_failure() => return Err(e),
                result => members.push((member_id, result)),
            }
        }

        Ok(Group::from_attributes(attributes, members))
    }

    pub async fn get_groups(&mut self) -> Result<Vec<Group>> {
        let ids = self.list_group_ids().await?;
        let mut groups = Vec::with_capacity(ids.len());

        for id in ids {
            match self.get_group(id).await {
                Ok(group) => groups.push(group),
                Err(e) if e.is_session_failure() => return Err(e),
                Err(e) => log::warn!("Skipping group {}: {}", id, e),
            }
        }

        Ok(groups)
    }

    async fn is_reachable(&mut self, id: u32) -> Result<bool> {
        match self.get_device(id).await {
            Ok(device) => Ok(device.reachable()),
            Err(e) if e.is_session_failure() => Err(e),
            Err(e) => {
                log::debug!("Liveness check for device {} failed: {}", id, e);
                Ok(false)
            }
        }
    }

    /// Writes a lighting update and reads the lamp back.
    ///
    /// `converged` decides whether the read-back lamp holds the written
    /// value. Only a `Changed` answer is verified, every other answer is
    /// returned as is.
    async fn write_lighting<F>(
        &mut self,
        id: u32,
        update: LightingUpdate,
        converged: F,
    ) -> Result<ControllerResponse>
    where
        F: Fn(&Lighting) -> bool,
    {
        if !self.is_reachable(id).await? {
            log::warn!("Device {} is unreachable, nothing was written", id);
            return Ok(ControllerResponse::device_unreachable());
        }

        let request = Request::put(resource_path(keys::DEVICES, id), update.to_payload()?);
        let response = self.send(&request).await?;

        if response.status != StatusCode::Changed || !response.is_success() {
            return Ok(response);
        }

        let verified = match self.get_device(id).await {
            Ok(device) => device.lighting().is_some_and(&converged),
            Err(e) if e.is_session_failure() => return Err(e),
            Err(e) => {
                log::debug!("Verification read of device {} failed: {}", id, e);
                false
            }
        };

        if verified {
            Ok(response)
        } else {
            log::warn!("Device {} did not converge to {:?}", id, update);
            Ok(ControllerResponse::not_modified())
        }
    }

    pub async fn set_brightness(&mut self, id: u32, brightness: u8) -> Result<ControllerResponse> {
        let update = LightingUpdateBuilder::default().dimmer(brightness).build()?;

        self.write_lighting(id, update, |lighting| lighting.brightness() == brightness)
            .await
    }

    pub async fn set_state(&mut self, id: u32, state: LampState) -> Result<ControllerResponse> {
        let update = LightingUpdateBuilder::default()
            .on_off(state.to_wire())
            .build()?;

        self.write_lighting(id, update, |lighting| lighting.state() == state)
            .await
    }

    pub async fn set_color_xy(
        &mut self,
        id: u32,
        chromaticity: Chromaticity,
    ) -> Result<ControllerResponse> {
        let update = LightingUpdateBuilder::default()
            .color_x(chromaticity.x)
            .color_y(chromaticity.y)
            .build()?;

        self.write_lighting(id, update, |lighting| {
            lighting
                .color()
                .is_some_and(|color| color.chromaticity() == chromaticity)
        })
        .await
    }

    pub async fn set_color(&mut self, id: u32, color: &Color) -> Result<ControllerResponse> {
        self.set_color_xy(id, color.chromaticity()).await
    }

    pub async fn set_color_temperature(
        &mut self,
        id: u32,
        temperature: u16,
    ) -> Result<ControllerResponse> {
        let chromaticity = kelvin_to_chromaticity(temperature)?;

        self.set_color_xy(id, chromaticity).await
    }

    /// Accepts `rrggbb` in any case, with or without `#`. The lamp is sent
    /// the lowercase form.
    pub async fn set_color_rgb(&mut self, id: u32, hex: &str) -> Result<ControllerResponse> {
        let rgb = parse_rgb(hex)?;
        let update = LightingUpdateBuilder::default().rgb(format_rgb(rgb)).build()?;

        self.write_lighting(id, update, |lighting| {
            lighting.color().is_some_and(|color| color.rgb() == rgb)
        })
        .await
    }
}
