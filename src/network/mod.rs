//! Network-related modules for interface selection and packet capture.

mod capture;
pub mod interface;

pub use capture::{
    CaptureSettings, DNS_FILTER, Frame, LinkType, PacketCapture, PcapCapture,
};
pub use interface::{
    DeviceListDiscovery, FlagDiscovery, InterfaceCandidate, InterfaceDiscovery,
    platform_discovery, select_interface,
};

#[cfg(test)]
pub(crate) use capture::tests::MockCapture;
