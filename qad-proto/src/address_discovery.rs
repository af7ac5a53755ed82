//! Address discovery types from
//! <https://datatracker.ietf.org/doc/draft-ietf-quic-address-discovery/>

use bytes::{Buf, BufMut};
use tracing::debug;

use crate::{
    coding::{BufExt, BufMutExt},
    transport_parameters::Error,
    VarInt,
};

/// Transport parameter id advertising an endpoint's [`Role`]
pub const TRANSPORT_PARAMETER_ID: VarInt = VarInt(0x9f81a176);

/// The role of each participant.
///
/// When enabled, this is reported as a transport parameter.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Role {
    /// Is able to report observer addresses to other peers, but it's not interested in receiving
    /// reports about its own address.
    SendOnly,
    /// Is interested on reports about its own observed address, but will not report back to other
    /// peers.
    ReceiveOnly,
    /// Will both report and receive reports of observed addresses.
    Both,
    /// Address discovery is disabled.
    #[default]
    Disabled,
}

impl TryFrom<VarInt> for Role {
    type Error = Error;

    fn try_from(value: VarInt) -> Result<Self, Self::Error> {
        match value.0 {
            0 => Ok(Self::SendOnly),
            1 => Ok(Self::ReceiveOnly),
            2 => Ok(Self::Both),
            _ => Err(Error::IllegalValue),
        }
    }
}

impl Role {
    /// Whether address discovery is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Whether this peer's role allows for address reporting to other peers.
    pub fn is_reporter(&self) -> bool {
        matches!(self, Self::SendOnly | Self::Both)
    }

    /// Whether this peer's role accepts observed address reports.
    pub fn receives_reports(&self) -> bool {
        matches!(self, Self::ReceiveOnly | Self::Both)
    }

    /// Whether this peer should report observed addresses to the other peer.
    pub fn should_report(&self, other: &Self) -> bool {
        self.is_reporter() && other.receives_reports()
    }

    /// Sets whether this peer should provide observed addresses to other peers.
    pub fn send_reports_to_peers(&mut self, provide: bool) -> &mut Self {
        *self = match (*self, provide) {
            (Self::ReceiveOnly, true) => Self::Both,
            (Self::Disabled, true) => Self::SendOnly,
            (Self::SendOnly, false) => Self::Disabled,
            (Self::Both, false) => Self::ReceiveOnly,
            (role, _) => role,
        };
        self
    }

    /// Sets whether this peer should accept received reports of observed addresses from other
    /// peers.
    pub fn receive_reports_from_peers(&mut self, receive: bool) -> &mut Self {
        *self = match (*self, receive) {
            (Self::SendOnly, true) => Self::Both,
            (Self::Disabled, true) => Self::ReceiveOnly,
            (Self::ReceiveOnly, false) => Self::Disabled,
            (Self::Both, false) => Self::SendOnly,
            (role, _) => role,
        };
        self
    }

    /// Gives the [`VarInt`] representing this [`Role`] as a transport parameter.
    pub fn as_transport_parameter(&self) -> Option<VarInt> {
        match self {
            Self::SendOnly => Some(VarInt(0)),
            Self::ReceiveOnly => Some(VarInt(1)),
            Self::Both => Some(VarInt(2)),
            Self::Disabled => None,
        }
    }

    /// Writes the transport parameter (id, length and value), or nothing when disabled.
    pub fn write_transport_parameter<W: BufMut>(&self, w: &mut W) {
        if let Some(value) = self.as_transport_parameter() {
            w.write(TRANSPORT_PARAMETER_ID);
            w.write_var(value.size() as u64);
            w.write(value);
        }
    }

    /// Reads the value of a received address discovery transport parameter.
    ///
    /// `value` holds exactly the parameter's value bytes, as delimited by its length.
    pub fn read_transport_parameter<R: Buf>(value: &mut R) -> Result<Self, Error> {
        let raw = value.get::<VarInt>()?;
        if value.has_remaining() {
            return Err(Error::Malformed);
        }
        Self::try_from(raw).map_err(|e| {
            debug!(%raw, "peer advertised unknown address discovery role");
            e
        })
    }
}
