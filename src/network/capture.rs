//! Packet capture abstraction.
//!
//! Provides a trait-based abstraction over packet capture to enable:
//! - Testing the pipeline without real network interfaces
//! - Different capture backends

use pcap::{Active, Capture, Linktype};
use tracing::{debug, warn};

use crate::error::{NetworkError, Result};

/// Kernel filter restricting capture to DNS traffic.
pub const DNS_FILTER: &str = "udp port 53";

/// Consecutive read failures after which the device is considered gone.
const MAX_CONSECUTIVE_ERRORS: u32 = 32;

/// Link-layer framing of captured frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkType {
    /// Ethernet II.
    Ethernet,
    /// Linux cooked capture (SLL), used by the `any` pseudo-device.
    LinuxSll,
    /// Bare IPv4/IPv6 packets, e.g. tunnels.
    RawIp,
    /// BSD loopback: 4-byte address family header.
    Null,
    /// Anything else; frames are never decoded.
    Unsupported(i32),
}

impl From<Linktype> for LinkType {
    fn from(link: Linktype) -> Self {
        // DLT values differ from LINKTYPE values for raw IP on some
        // platforms, so accept every known encoding.
        match link.0 {
            1 => Self::Ethernet,
            113 => Self::LinuxSll,
            12 | 14 | 101 | 228 | 229 => Self::RawIp,
            0 | 108 => Self::Null,
            other => Self::Unsupported(other),
        }
    }
}

/// A raw captured frame. Contents are decoded on demand by the extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub link_type: LinkType,
    pub data: Vec<u8>,
}

impl Frame {
    pub const fn new(link_type: LinkType, data: Vec<u8>) -> Self {
        Self { link_type, data }
    }

    pub const fn ethernet(data: Vec<u8>) -> Self {
        Self::new(LinkType::Ethernet, data)
    }
}

/// Trait for packet capture implementations.
pub trait PacketCapture: Send {
    /// Receive the next frame, blocking until one arrives.
    /// Returns None once the capture has ended; it never restarts.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Capture settings taken from configuration.
#[derive(Clone, Copy, Debug)]
pub struct CaptureSettings {
    pub snapshot_len: u32,
    pub promiscuous: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            snapshot_len: crate::config::MIN_SNAPSHOT_LEN,
            promiscuous: true,
        }
    }
}

/// Production packet capture using libpcap.
pub struct PcapCapture {
    handle: Capture<Active>,
    link_type: LinkType,
    consecutive_errors: u32,
}

impl PcapCapture {
    /// Open a live capture on `interface` and attach [`DNS_FILTER`].
    ///
    /// Reads block until a packet arrives; there is no read timeout.
    pub fn open(interface: &str, settings: &CaptureSettings) -> Result<Self> {
        let open_error = |e: pcap::Error| NetworkError::CaptureOpen {
            interface: interface.to_string(),
            reason: e.to_string(),
        };

        let mut handle = Capture::from_device(interface)
            .map_err(open_error)?
            .promisc(settings.promiscuous)
            .snaplen(i32::try_from(settings.snapshot_len).unwrap_or(i32::MAX))
            .immediate_mode(true)
            .timeout(0)
            .open()
            .map_err(open_error)?;

        handle
            .filter(DNS_FILTER, true)
            .map_err(|e| NetworkError::FilterRejected {
                filter: DNS_FILTER.to_string(),
                reason: e.to_string(),
            })?;

        let link_type = LinkType::from(handle.get_datalink());
        if let LinkType::Unsupported(dlt) = link_type {
            warn!(dlt, "unsupported link type, frames will not be decoded");
        }

        Ok(Self {
            handle,
            link_type,
            consecutive_errors: 0,
        })
    }
}

impl PacketCapture for PcapCapture {
    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.handle.next_packet() {
                Ok(packet) => {
                    self.consecutive_errors = 0;
                    return Some(Frame::new(self.link_type, packet.data.to_vec()));
                }
                Err(pcap::Error::TimeoutExpired) => {}
                Err(pcap::Error::NoMorePackets) => return None,
                Err(err) => {
                    self.consecutive_errors += 1;
                    debug!(error = %err, attempt = self.consecutive_errors, "capture read failed");
                    if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        warn!(error = %err, "capture device keeps failing, ending capture");
                        return None;
                    }
                }
            }
        }
    }
}
