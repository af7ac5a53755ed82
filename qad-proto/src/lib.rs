//! Wire format of the QUIC Address Discovery OBSERVED_ADDRESS frame
//!
//! qad-proto contains a deterministic, allocation-light codec for the frame by which an endpoint
//! tells its peer which address (IP and port) it observes that peer's packets coming from. It
//! contains no networking code and keeps no connection state: deciding when to send reports,
//! enforcing sequence number monotonicity and acting on received addresses are left to the
//! connection that embeds it.
//!
//! The most important type is [`ObservedAddr`], whose two variants map one-to-one onto the
//! [`FrameType::OBSERVED_IPV4_ADDR`] and [`FrameType::OBSERVED_IPV6_ADDR`] frame types.
//! [`frame::Iter`] walks a packet payload and routes both frame types to it, and
//! [`address_discovery::Role`] is the transport parameter peers use to negotiate the extension.

#![warn(missing_docs)]
#![cfg_attr(test, allow(dead_code))]

pub mod address_discovery;
#[doc(hidden)]
pub mod coding;
pub mod frame;
pub mod transport_parameters;
mod varint;

pub use varint::{VarInt, VarIntBoundsExceeded};

mod transport_error;
pub use crate::transport_error::{Code as TransportErrorCode, Error as TransportError};

pub use crate::frame::{AddressFamily, FrameType, ObservedAddr};

#[cfg(test)]
mod tests;

