//! OBSERVED_ADDRESS frame codec and the frame dispatch around it

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};

use bytes::{Buf, BufMut, Bytes};
use thiserror::Error;
use tracing::trace;

use crate::{
    coding::{self, BufExt, BufMutExt, UnexpectedEnd},
    transport_error::Error as TransportError,
    VarInt,
};

#[cfg(feature = "arbitrary")]
use arbitrary::Arbitrary;

/// A QUIC frame type
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FrameType(u64);

impl FrameType {
    /// Extract the raw frame type value
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<VarInt> for FrameType {
    fn from(x: VarInt) -> Self {
        Self(x.into_inner())
    }
}

impl From<FrameType> for u64 {
    fn from(x: FrameType) -> Self {
        x.0
    }
}

impl coding::Codec for FrameType {
    fn decode<B: Buf>(buf: &mut B) -> coding::Result<Self> {
        Ok(Self(buf.get_var()?))
    }
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.write_var(self.0);
    }
}

macro_rules! frame_types {
    {$($name:ident = $val:expr,)*} => {
        impl FrameType {
            $(#[allow(missing_docs)] pub const $name: FrameType = FrameType($val);)*
        }

        impl fmt::Debug for FrameType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    $($val => f.write_str(stringify!($name)),)*
                    _ => write!(f, "Type({:02x})", self.0)
                }
            }
        }

        impl fmt::Display for FrameType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    $($val => f.write_str(stringify!($name)),)*
                    _ => write!(f, "<unknown {:02x}>", self.0),
                }
            }
        }
    }
}

frame_types! {
    PADDING = 0x00,
    PING = 0x01,
    // ADDRESS DISCOVERY REPORT
    OBSERVED_IPV4_ADDR = 0x9f81a6,
    OBSERVED_IPV6_ADDR = 0x9f81a7,
}

/// Address family of an observed address, as selected by the frame type
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressFamily {
    /// 4-byte addresses, carried by [`FrameType::OBSERVED_IPV4_ADDR`]
    V4,
    /// 16-byte addresses, carried by [`FrameType::OBSERVED_IPV6_ADDR`]
    V6,
}

impl AddressFamily {
    /// The family denoted by `ty`, if it is one of the observed address frame types
    pub fn from_frame_type(ty: FrameType) -> Option<Self> {
        match ty {
            FrameType::OBSERVED_IPV4_ADDR => Some(Self::V4),
            FrameType::OBSERVED_IPV6_ADDR => Some(Self::V6),
            _ => None,
        }
    }

    /// The frame type announcing an address of this family
    pub fn frame_type(self) -> FrameType {
        match self {
            Self::V4 => FrameType::OBSERVED_IPV4_ADDR,
            Self::V6 => FrameType::OBSERVED_IPV6_ADDR,
        }
    }

    /// Number of raw address bytes on the wire
    pub fn address_len(self) -> usize {
        match self {
            Self::V4 => 4,
            Self::V6 => 16,
        }
    }
}

/// Field of an observed address frame
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Field {
    /// The varint sequence number
    SequenceNumber,
    /// The raw IP address bytes
    Address,
    /// The big-endian port
    Port,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SequenceNumber => "sequence number",
            Self::Address => "address",
            Self::Port => "port",
        })
    }
}

/// Reasons an observed address frame fails to parse
///
/// All of them should be treated as a connection error of type `FRAME_ENCODING_ERROR`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum Error {
    /// The input ended before `field` was complete
    #[error("unexpected end of frame while reading {field}")]
    UnexpectedEnd {
        /// The field being read
        field: Field,
    },
    /// The sequence number's length prefix claims more bytes than are present
    #[error("malformed varint in sequence number")]
    MalformedVarInt,
    /// The frame type does not denote an observed address
    #[error("{0} does not carry an observed address")]
    InvalidFrameType(FrameType),
}

impl Error {
    fn end(field: Field) -> impl FnOnce(UnexpectedEnd) -> Self {
        move |UnexpectedEnd| Self::UnexpectedEnd { field }
    }
}

impl From<Error> for TransportError {
    fn from(err: Error) -> Self {
        let mut te = Self::FRAME_ENCODING_ERROR(err.to_string());
        if let Error::InvalidFrameType(ty) = err {
            te.frame = Some(ty);
        }
        te
    }
}

/// Conveys what the sender observed as the source address of the receiver's packets
///
/// ([`FrameType::OBSERVED_IPV4_ADDR`], [`FrameType::OBSERVED_IPV6_ADDR`]).
///
/// The variant is the address family, so the frame type written on the wire always agrees with
/// the stored address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(Arbitrary))]
pub enum ObservedAddr {
    /// An observed IPv4 address
    V4 {
        /// Monotonically increasing integer within the same connection.
        seq_no: VarInt,
        /// Reported observed address.
        ip: Ipv4Addr,
        /// Reported observed port.
        port: u16,
    },
    /// An observed IPv6 address
    V6 {
        /// Monotonically increasing integer within the same connection.
        seq_no: VarInt,
        /// Reported observed address.
        ip: Ipv6Addr,
        /// Reported observed port.
        port: u16,
    },
}

impl ObservedAddr {
    /// Largest number of bytes an encoded frame can occupy
    pub const SIZE_BOUND: usize =
        VarInt(FrameType::OBSERVED_IPV6_ADDR.0).size() + VarInt::MAX_SIZE + 16 + 2;

    /// Build a report of the IPv4 address `remote`
    pub fn v4<N: Into<VarInt>>(seq_no: N, remote: SocketAddrV4) -> Self {
        Self::V4 {
            seq_no: seq_no.into(),
            ip: *remote.ip(),
            port: remote.port(),
        }
    }

    /// Build a report of the IPv6 address `remote`
    ///
    /// Flow info and scope id have no wire representation and are discarded.
    pub fn v6<N: Into<VarInt>>(seq_no: N, remote: SocketAddrV6) -> Self {
        Self::V6 {
            seq_no: seq_no.into(),
            ip: *remote.ip(),
            port: remote.port(),
        }
    }

    /// Build a report of `remote`, choosing the family from the address itself
    ///
    /// IPv4-mapped IPv6 addresses stay IPv6; callers wanting the 4-byte form should pass
    /// `SocketAddr::new(remote.ip().to_canonical(), remote.port())`.
    pub fn new<N: Into<VarInt>>(seq_no: N, remote: SocketAddr) -> Self {
        match remote {
            SocketAddr::V4(addr) => Self::v4(seq_no, addr),
            SocketAddr::V6(addr) => Self::v6(seq_no, addr),
        }
    }

    /// Sequence number of this report
    pub fn seq_no(&self) -> VarInt {
        match *self {
            Self::V4 { seq_no, .. } | Self::V6 { seq_no, .. } => seq_no,
        }
    }

    /// Reported observed address
    pub fn ip(&self) -> IpAddr {
        match *self {
            Self::V4 { ip, .. } => ip.into(),
            Self::V6 { ip, .. } => ip.into(),
        }
    }

    /// Reported observed port
    pub fn port(&self) -> u16 {
        match *self {
            Self::V4 { port, .. } | Self::V6 { port, .. } => port,
        }
    }

    /// Gives the [`SocketAddr`] reported in the frame.
    pub fn socket_addr(&self) -> SocketAddr {
        (self.ip(), self.port()).into()
    }

    /// Address family of the reported address
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::V4 { .. } => AddressFamily::V4,
            Self::V6 { .. } => AddressFamily::V6,
        }
    }

    /// Get the [`FrameType`] for this frame.
    pub fn frame_type(&self) -> FrameType {
        self.family().frame_type()
    }

    /// Compute the number of bytes needed to encode the frame, frame type included.
    pub fn size(&self) -> usize {
        let type_size = VarInt(self.frame_type().0).size();
        let seq_no_bytes = self.seq_no().size();
        let ip_bytes = self.family().address_len();
        let port_bytes = 2;
        type_size + seq_no_bytes + ip_bytes + port_bytes
    }

    /// Unconditionally write this frame to `buf`, frame type included.
    pub fn write<W: BufMut>(&self, buf: &mut W) {
        buf.write(self.frame_type());
        buf.write(self.seq_no());
        match *self {
            Self::V4 { ip, .. } => buf.write(ip),
            Self::V6 { ip, .. } => buf.write(ip),
        }
        buf.write::<u16>(self.port());
    }

    /// Serialize this frame into a freshly allocated buffer of exactly [`Self::size`] bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        self.write(&mut buf);
        buf
    }

    /// Parse the frame contents following an already consumed frame type.
    ///
    /// `ty` selects the address family and must be [`FrameType::OBSERVED_IPV4_ADDR`] or
    /// [`FrameType::OBSERVED_IPV6_ADDR`]. On success, returns the frame along with the number of
    /// bytes of `bytes` it occupies. `bytes` may extend past the end of the frame.
    pub fn parse(bytes: &[u8], ty: FrameType) -> Result<(Self, usize), Error> {
        let family = AddressFamily::from_frame_type(ty).ok_or(Error::InvalidFrameType(ty))?;
        let mut rest = bytes;
        let frame = Self::decode(&mut rest, family)?;
        Ok((frame, bytes.len() - rest.len()))
    }

    /// Reads the frame contents from the buffer.
    ///
    /// Should only be called when the frame type has been identified as
    /// [`FrameType::OBSERVED_IPV4_ADDR`] or [`FrameType::OBSERVED_IPV6_ADDR`]. On error, the
    /// amount of `bytes` consumed is unspecified.
    pub fn decode<R: Buf>(bytes: &mut R, family: AddressFamily) -> Result<Self, Error> {
        if !bytes.has_remaining() {
            return Err(Error::UnexpectedEnd {
                field: Field::SequenceNumber,
            });
        }
        // With at least one byte present, a varint can only fail by declaring more bytes than
        // remain
        let seq_no = bytes
            .get::<VarInt>()
            .map_err(|UnexpectedEnd| Error::MalformedVarInt)?;
        Ok(match family {
            AddressFamily::V4 => Self::V4 {
                seq_no,
                ip: bytes.get().map_err(Error::end(Field::Address))?,
                port: bytes.get().map_err(Error::end(Field::Port))?,
            },
            AddressFamily::V6 => Self::V6 {
                seq_no,
                ip: bytes.get().map_err(Error::end(Field::Address))?,
                port: bytes.get().map_err(Error::end(Field::Port))?,
            },
        })
    }
}

impl fmt::Display for ObservedAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(seq={}, {})",
            self.frame_type(),
            self.seq_no(),
            self.socket_addr()
        )
    }
}

/// A frame this crate knows how to decode
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Frame {
    /// A single PADDING byte
    Padding,
    /// PING
    Ping,
    /// OBSERVED_ADDRESS, either family
    ObservedAddr(ObservedAddr),
}

impl Frame {
    /// The frame type this frame is announced with on the wire
    pub fn ty(&self) -> FrameType {
        match self {
            Self::Padding => FrameType::PADDING,
            Self::Ping => FrameType::PING,
            Self::ObservedAddr(frame) => frame.frame_type(),
        }
    }
}

/// Iterator over the frames of a packet payload
///
/// Dispatches each frame type read from the wire to its decoder. After the first invalid frame the
/// rest of the payload is dropped.
pub struct Iter {
    bytes: Bytes,
    last_ty: Option<FrameType>,
}

impl Iter {
    /// Iterate over the frames in `payload`
    pub fn new(payload: Bytes) -> Result<Self, TransportError> {
        if payload.is_empty() {
            // "An endpoint MUST treat receipt of a packet containing no frames as a
            // connection error of type PROTOCOL_VIOLATION."
            // https://www.rfc-editor.org/rfc/rfc9000.html#name-frames-and-frame-types
            return Err(TransportError::PROTOCOL_VIOLATION(
                "packet payload is empty",
            ));
        }

        Ok(Self {
            bytes: payload,
            last_ty: None,
        })
    }

    fn try_next(&mut self) -> Result<Frame, IterErr> {
        self.last_ty = None;
        let ty = self.bytes.get::<FrameType>()?;
        self.last_ty = Some(ty);
        Ok(match ty {
            FrameType::PADDING => Frame::Padding,
            FrameType::PING => Frame::Ping,
            _ => match AddressFamily::from_frame_type(ty) {
                Some(family) => Frame::ObservedAddr(ObservedAddr::decode(&mut self.bytes, family)?),
                None => return Err(IterErr::InvalidFrameId),
            },
        })
    }
}

impl Iterator for Iter {
    type Item = Result<Frame, InvalidFrame>;
    fn next(&mut self) -> Option<Self::Item> {
        if !self.bytes.has_remaining() {
            return None;
        }
        match self.try_next() {
            Ok(x) => Some(Ok(x)),
            Err(e) => {
                trace!(
                    ty = ?self.last_ty,
                    reason = e.reason(),
                    dropped = self.bytes.remaining(),
                    "invalid frame"
                );
                // Corrupt frame, skip it and everything that follows
                self.bytes.clear();
                Some(Err(InvalidFrame {
                    ty: self.last_ty,
                    reason: e.reason(),
                }))
            }
        }
    }
}

/// A frame that could not be decoded
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidFrame {
    /// Type of the offending frame, if it could be read
    pub ty: Option<FrameType>,
    /// Why decoding failed
    pub reason: &'static str,
}

impl From<InvalidFrame> for TransportError {
    fn from(err: InvalidFrame) -> Self {
        let mut te = Self::FRAME_ENCODING_ERROR(err.reason);
        te.frame = err.ty;
        te
    }
}

#[derive(Debug)]
enum IterErr {
    UnexpectedEnd,
    InvalidFrameId,
    Malformed,
}

impl IterErr {
    fn reason(&self) -> &'static str {
        use IterErr::*;
        match *self {
            UnexpectedEnd => "unexpected end",
            InvalidFrameId => "invalid frame ID",
            Malformed => "malformed",
        }
    }
}

impl From<UnexpectedEnd> for IterErr {
    fn from(_: UnexpectedEnd) -> Self {
        Self::UnexpectedEnd
    }
}

impl From<Error> for IterErr {
    fn from(err: Error) -> Self {
        match err {
            Error::UnexpectedEnd { .. } => Self::UnexpectedEnd,
            Error::MalformedVarInt => Self::Malformed,
            Error::InvalidFrameType(_) => Self::InvalidFrameId,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coding::Codec;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    #[track_caller]
    fn frames(buf: Vec<u8>) -> Vec<Frame> {
        Iter::new(Bytes::from(buf))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    /// Strip the frame type from a serialized frame
    fn body(frame: &ObservedAddr) -> Vec<u8> {
        let buf = frame.to_vec();
        let type_len = VarInt(frame.frame_type().0).size();
        buf[type_len..].to_vec()
    }

    #[test]
    fn ipv4_roundtrip() {
        let frame = ObservedAddr::new(42u8, "192.168.1.1:8080".parse().unwrap());
        let buf = frame.to_vec();
        assert_eq!(buf, hex!("809f81a6 2a c0a80101 1f90"));

        let (parsed, consumed) =
            ObservedAddr::parse(&buf[4..], FrameType::OBSERVED_IPV4_ADDR).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(consumed, buf.len() - 4);
        assert_eq!(frame.size(), buf.len());
    }

    #[test]
    fn ipv6_roundtrip() {
        let frame = ObservedAddr::new(123u8, "[2001:db8::1]:8080".parse().unwrap());
        let buf = frame.to_vec();
        assert_eq!(&buf[..4], hex!("809f81a7"));
        assert_eq!(buf.len(), 4 + 2 + 16 + 2);

        let (parsed, consumed) =
            ObservedAddr::parse(&buf[4..], FrameType::OBSERVED_IPV6_ADDR).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(consumed, buf.len() - 4);
        assert_eq!(frame.size(), buf.len());
    }

    #[test]
    fn missing_address() {
        // A complete one byte sequence number with nothing after it
        assert_eq!(
            ObservedAddr::parse(&hex!("2a"), FrameType::OBSERVED_IPV4_ADDR),
            Err(Error::UnexpectedEnd {
                field: Field::Address
            })
        );
    }

    #[test]
    fn malformed_sequence_number() {
        assert_eq!(
            ObservedAddr::parse(&hex!("ffffffffff"), FrameType::OBSERVED_IPV4_ADDR),
            Err(Error::MalformedVarInt)
        );
        // Two byte varint missing its second byte
        assert_eq!(
            ObservedAddr::parse(&hex!("40"), FrameType::OBSERVED_IPV6_ADDR),
            Err(Error::MalformedVarInt)
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            ObservedAddr::parse(&[], FrameType::OBSERVED_IPV4_ADDR),
            Err(Error::UnexpectedEnd {
                field: Field::SequenceNumber
            })
        );
    }

    #[test]
    fn missing_port() {
        assert_eq!(
            ObservedAddr::parse(&hex!("01 0a000001 00"), FrameType::OBSERVED_IPV4_ADDR),
            Err(Error::UnexpectedEnd { field: Field::Port })
        );
    }

    #[test]
    fn frame_type_selects_family() {
        let v4 = ObservedAddr::new(1u8, "10.0.0.1:80".parse().unwrap());
        let (parsed, _) = ObservedAddr::parse(&body(&v4), FrameType::OBSERVED_IPV4_ADDR).unwrap();
        assert!(parsed.ip().is_ipv4());
        assert_eq!(parsed.family(), AddressFamily::V4);

        let v6 = ObservedAddr::new(1u8, "[::1]:80".parse().unwrap());
        let (parsed, _) = ObservedAddr::parse(&body(&v6), FrameType::OBSERVED_IPV6_ADDR).unwrap();
        assert!(parsed.ip().is_ipv6());
        assert_eq!(parsed.family(), AddressFamily::V6);
    }

    #[test]
    fn same_bytes_read_as_either_family() {
        // 22 bytes are enough for both readings; the frame type alone decides
        let bytes = hex!("05 00000000000000000000ffff0a000001 1234 ffff");
        let (v4, n4) = ObservedAddr::parse(&bytes, FrameType::OBSERVED_IPV4_ADDR).unwrap();
        assert_eq!(n4, 1 + 4 + 2);
        assert_eq!(v4.socket_addr(), "0.0.0.0:0".parse().unwrap());
        let (v6, n6) = ObservedAddr::parse(&bytes, FrameType::OBSERVED_IPV6_ADDR).unwrap();
        assert_eq!(n6, 1 + 16 + 2);
        assert_eq!(v6.socket_addr(), "[::ffff:10.0.0.1]:4660".parse().unwrap());
    }

    #[test]
    fn unknown_frame_type() {
        assert_eq!(
            ObservedAddr::parse(&hex!("01 0a000001 0050"), FrameType::PING),
            Err(Error::InvalidFrameType(FrameType::PING))
        );
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let frame = ObservedAddr::new(7u8, "1.2.3.4:5".parse().unwrap());
        let mut bytes = body(&frame);
        let len = bytes.len();
        bytes.extend_from_slice(&hex!("deadbeef"));
        assert_eq!(
            ObservedAddr::parse(&bytes, FrameType::OBSERVED_IPV4_ADDR),
            Ok((frame, len))
        );
    }

    #[test]
    fn truncation_at_every_offset() {
        for seq_no in [0, 63, 64, 16383, 16384, VarInt::MAX.0] {
            for addr in ["10.0.0.1:80", "[2001:db8::1]:443"] {
                let frame = ObservedAddr::new(VarInt(seq_no), addr.parse().unwrap());
                let ty = frame.frame_type();
                let bytes = body(&frame);
                let seq_len = frame.seq_no().size();
                for cut in 0..bytes.len() {
                    let err = ObservedAddr::parse(&bytes[..cut], ty).unwrap_err();
                    match cut {
                        0 => assert_eq!(
                            err,
                            Error::UnexpectedEnd {
                                field: Field::SequenceNumber
                            }
                        ),
                        n if n < seq_len => assert_eq!(err, Error::MalformedVarInt),
                        n if n < seq_len + frame.family().address_len() => {
                            assert_eq!(
                                err,
                                Error::UnexpectedEnd {
                                    field: Field::Address
                                }
                            )
                        }
                        _ => assert_eq!(err, Error::UnexpectedEnd { field: Field::Port }),
                    }
                }
            }
        }
    }

    #[test]
    fn short_sequence_number_is_malformed() {
        // A maximal sequence number cut after five bytes
        let frame = ObservedAddr::new(VarInt::MAX, "10.0.0.1:80".parse().unwrap());
        let bytes = body(&frame);
        assert_eq!(bytes[..5], hex!("ffffffffff"));
        assert_eq!(
            ObservedAddr::parse(&bytes[..5], FrameType::OBSERVED_IPV4_ADDR),
            Err(Error::MalformedVarInt)
        );
        assert_eq!(
            TransportError::from(Error::MalformedVarInt).code,
            crate::TransportErrorCode::FRAME_ENCODING_ERROR
        );
    }

    #[test]
    fn sizes() {
        let cases = [
            ("10.0.0.1:80", 0, 11),
            ("10.0.0.1:80", 16384, 14),
            ("[2001:db8::1]:443", 0, 23),
            ("[2001:db8::1]:443", VarInt::MAX.0, 30),
        ];
        for (addr, seq_no, expected) in cases {
            let frame = ObservedAddr::new(VarInt(seq_no), addr.parse().unwrap());
            assert_eq!(frame.size(), expected, "{frame}");
            assert_eq!(frame.to_vec().len(), expected, "{frame}");
        }
        assert_eq!(ObservedAddr::SIZE_BOUND, 30);
    }

    #[test]
    fn ipv4_mapped_stays_ipv6() {
        let frame = ObservedAddr::new(3u8, "[::ffff:192.0.2.1]:9".parse().unwrap());
        assert_eq!(frame.family(), AddressFamily::V6);
        assert_eq!(frame.frame_type(), FrameType::OBSERVED_IPV6_ADDR);
    }

    #[test]
    fn v6_builder_drops_scope() {
        let frame = ObservedAddr::v6(9u8, SocketAddrV6::new(Ipv6Addr::LOCALHOST, 80, 7, 3));
        let (parsed, _) =
            ObservedAddr::parse(&body(&frame), FrameType::OBSERVED_IPV6_ADDR).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(parsed.socket_addr(), "[::1]:80".parse().unwrap());
    }

    #[test]
    fn display() {
        let frame = ObservedAddr::new(42u8, "192.168.1.1:8080".parse().unwrap());
        assert_eq!(frame.to_string(), "OBSERVED_IPV4_ADDR(seq=42, 192.168.1.1:8080)");
        assert_eq!(FrameType::from(VarInt(0x1234)).to_string(), "<unknown 1234>");
    }

    #[test]
    fn iter_dispatches_both_families() {
        let v4 = ObservedAddr::new(1u8, "203.0.113.50:45678".parse().unwrap());
        let v6 = ObservedAddr::new(2u8, "[2001:db8::50]:45678".parse().unwrap());
        let mut buf = Vec::new();
        v4.write(&mut buf);
        FrameType::PING.encode(&mut buf);
        v6.write(&mut buf);
        buf.push(0);

        let decoded = frames(buf);
        assert_eq!(
            decoded,
            [
                Frame::ObservedAddr(v4),
                Frame::Ping,
                Frame::ObservedAddr(v6),
                Frame::Padding
            ]
        );
        assert_eq!(decoded[2].ty(), FrameType::OBSERVED_IPV6_ADDR);
    }

    #[test]
    fn iter_rejects_empty_payload() {
        let err = Iter::new(Bytes::new()).err().unwrap();
        assert_eq!(err.code, crate::TransportErrorCode::PROTOCOL_VIOLATION);
    }

    #[test]
    fn iter_stops_after_invalid_frame() {
        let frame = ObservedAddr::new(1u8, "10.0.0.1:80".parse().unwrap());
        let mut buf = frame.to_vec();
        buf.truncate(buf.len() - 1);
        buf.push(0x01);
        let mut iter = Iter::new(Bytes::from(buf)).unwrap();
        // The trailing PING byte is taken as part of the port, leaving the frame complete
        assert_matches!(iter.next(), Some(Ok(Frame::ObservedAddr(_))));
        assert_matches!(iter.next(), None);

        let mut buf = frame.to_vec();
        buf.truncate(buf.len() - 1);
        let mut iter = Iter::new(Bytes::from(buf)).unwrap();
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.ty, Some(FrameType::OBSERVED_IPV4_ADDR));
        assert_eq!(err.reason, "unexpected end");
        assert_matches!(iter.next(), None);

        let te = TransportError::from(err);
        assert_eq!(te.code, crate::TransportErrorCode::FRAME_ENCODING_ERROR);
        assert_eq!(te.frame, Some(FrameType::OBSERVED_IPV4_ADDR));
    }

    #[test]
    fn iter_unknown_frame_type() {
        let mut buf = Vec::new();
        FrameType::PING.encode(&mut buf);
        VarInt(0x3d7f90).encode(&mut buf);
        buf.extend_from_slice(&hex!("01 0a000001 0050"));
        let mut iter = Iter::new(Bytes::from(buf)).unwrap();
        assert_matches!(iter.next(), Some(Ok(Frame::Ping)));
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.ty, Some(FrameType::from(VarInt(0x3d7f90))));
        assert_eq!(err.reason, "invalid frame ID");
        assert_matches!(iter.next(), None);
    }

    #[test]
    fn iter_malformed_sequence_number() {
        let mut buf = Vec::new();
        FrameType::OBSERVED_IPV4_ADDR.encode(&mut buf);
        // Indicates a 2-byte varint, second byte missing
        buf.push(0x40);
        let mut iter = Iter::new(Bytes::from(buf)).unwrap();
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.reason, "malformed");
    }

    #[test]
    fn codec_error_into_transport_error() {
        let te = TransportError::from(Error::UnexpectedEnd { field: Field::Port });
        assert_eq!(te.code, crate::TransportErrorCode::FRAME_ENCODING_ERROR);
        assert_eq!(te.reason, "unexpected end of frame while reading port");
        assert_eq!(te.frame, None);

        let te = TransportError::from(Error::InvalidFrameType(FrameType::PING));
        assert_eq!(te.frame, Some(FrameType::PING));
    }
}
