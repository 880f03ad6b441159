//! DNS response extraction from captured frames.
//!
//! Frames are peeled layer by layer with zero-copy `pnet` views. The DNS QR
//! bit is checked on the raw header before the message is fully decoded, so
//! queries cost a few bounds checks.

use std::net::IpAddr;

use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::RData;
use hickory_proto::serialize::binary::BinDecodable;
use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::sll::SLLPacket;
use pnet::packet::udp::UdpPacket;

use crate::network::{Frame, LinkType};

/// Well-known DNS port.
pub const DNS_PORT: u16 = 53;

/// DNS header size in bytes.
const DNS_HEADER_SIZE: usize = 12;

/// UDP header size in bytes.
const UDP_HEADER_SIZE: usize = 8;

/// Size of the address family header on BSD loopback captures.
const NULL_HEADER_SIZE: usize = 4;

/// A resolved name observed in a DNS response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Answer {
    /// Owner name as it appeared on the wire, without the trailing root dot.
    pub name: String,
    pub address: IpAddr,
}

/// Extract every IP-bearing answer from a captured frame.
///
/// Returns an empty list for anything that is not a well-formed DNS response:
/// non-IP frames, non-UDP packets, other ports, queries and undecodable
/// messages.
pub fn extract_answers(frame: &Frame) -> Vec<Answer> {
    let answers = match frame.link_type {
        LinkType::Ethernet => EthernetPacket::new(&frame.data)
            .and_then(|eth| from_ethertype(eth.get_ethertype(), eth.payload())),
        LinkType::LinuxSll => SLLPacket::new(&frame.data)
            .and_then(|sll| from_ethertype(sll.get_protocol(), sll.payload())),
        LinkType::RawIp => from_ip(&frame.data),
        LinkType::Null => frame.data.get(NULL_HEADER_SIZE..).and_then(from_ip),
        LinkType::Unsupported(_) => None,
    };

    answers.unwrap_or_default()
}

fn from_ethertype(ethertype: EtherType, payload: &[u8]) -> Option<Vec<Answer>> {
    match ethertype {
        EtherTypes::Ipv4 => from_ipv4(payload),
        EtherTypes::Ipv6 => from_ipv6(payload),
        _ => None,
    }
}

/// Dispatch on the IP version nibble, for link types without an ethertype.
fn from_ip(packet: &[u8]) -> Option<Vec<Answer>> {
    match packet.first()? >> 4 {
        4 => from_ipv4(packet),
        6 => from_ipv6(packet),
        _ => None,
    }
}

fn from_ipv4(packet: &[u8]) -> Option<Vec<Answer>> {
    let ipv4 = Ipv4Packet::new(packet)?;
    if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return None;
    }
    // Only the first fragment carries the UDP header
    if ipv4.get_fragment_offset() != 0 {
        return None;
    }
    from_udp(ipv4.payload())
}

fn from_ipv6(packet: &[u8]) -> Option<Vec<Answer>> {
    let ipv6 = Ipv6Packet::new(packet)?;
    if ipv6.get_next_header() != IpNextHeaderProtocols::Udp {
        return None;
    }
    from_udp(ipv6.payload())
}

fn from_udp(segment: &[u8]) -> Option<Vec<Answer>> {
    let udp = UdpPacket::new(segment)?;
    if udp.get_source() != DNS_PORT && udp.get_destination() != DNS_PORT {
        return None;
    }

    // Trim link-layer padding using the UDP length field
    let payload = udp.payload();
    let declared = usize::from(udp.get_length()).saturating_sub(UDP_HEADER_SIZE);
    let payload = payload.get(..declared).unwrap_or(payload);

    Some(extract_from_payload(payload))
}

/// Whether a raw DNS message has its QR bit set.
fn is_response(payload: &[u8]) -> bool {
    payload.len() >= DNS_HEADER_SIZE && payload[2] & 0x80 != 0
}

/// Extract answers from a raw DNS message (the UDP payload).
pub fn extract_from_payload(payload: &[u8]) -> Vec<Answer> {
    if !is_response(payload) {
        return Vec::new();
    }

    Message::from_bytes(payload)
        .map(|message| answers_from_message(&message))
        .unwrap_or_default()
}

/// Collect the A/AAAA answers of a decoded response, in record order.
pub fn answers_from_message(message: &Message) -> Vec<Answer> {
    if message.message_type() != MessageType::Response {
        return Vec::new();
    }

    message
        .answers()
        .iter()
        .filter_map(|record| {
            let address = match record.data() {
                RData::A(a) => IpAddr::V4(a.0),
                RData::AAAA(aaaa) => IpAddr::V6(aaaa.0),
                _ => return None,
            };

            let name = record.name().to_ascii();
            let name = name.trim_end_matches('.');
            if name.is_empty() {
                return None;
            }

            Some(Answer {
                name: name.to_string(),
                address,
            })
        })
        .collect()
}
