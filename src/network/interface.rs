//! Capture interface selection.
//!
//! Two discovery strategies share one selection policy:
//! - [`FlagDiscovery`] enumerates host interfaces through `pnet` and trusts
//!   their up/broadcast flags.
//! - [`DeviceListDiscovery`] enumerates capture devices through `pcap`, for
//!   platforms where interface flags are unreliable.
//!
//! [`platform_discovery`] picks the right one for the build target.

use std::net::IpAddr;

use pnet::datalink::{self, NetworkInterface};

use crate::error::{NetworkError, Result};

/// OS-independent view of an interface, as seen by the selection policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceCandidate {
    pub name: String,
    pub is_up: bool,
    pub is_broadcast: bool,
    pub addresses: Vec<IpAddr>,
}

impl From<&NetworkInterface> for InterfaceCandidate {
    fn from(iface: &NetworkInterface) -> Self {
        Self {
            name: iface.name.clone(),
            is_up: iface.is_up(),
            is_broadcast: iface.is_broadcast(),
            addresses: iface.ips.iter().map(|net| net.ip()).collect(),
        }
    }
}

impl From<&pcap::Device> for InterfaceCandidate {
    fn from(device: &pcap::Device) -> Self {
        Self {
            name: device.name.clone(),
            is_up: device.flags.is_up(),
            // pcap exposes no broadcast flag; the device-list policy ignores it
            is_broadcast: false,
            addresses: device.addresses.iter().map(|addr| addr.addr).collect(),
        }
    }
}

/// A way of finding the interface to capture on.
pub trait InterfaceDiscovery {
    /// Enumerate candidates in OS order.
    fn candidates(&self) -> Result<Vec<InterfaceCandidate>>;

    /// Whether `candidate` qualifies for capture.
    fn accepts(&self, candidate: &InterfaceCandidate) -> bool;
}

/// Flag-based enumeration: first up+broadcast interface with a non-loopback
/// IPv4 address.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlagDiscovery;

impl InterfaceDiscovery for FlagDiscovery {
    fn candidates(&self) -> Result<Vec<InterfaceCandidate>> {
        Ok(datalink::interfaces()
            .iter()
            .map(InterfaceCandidate::from)
            .collect())
    }

    fn accepts(&self, candidate: &InterfaceCandidate) -> bool {
        candidate.is_up
            && candidate.is_broadcast
            && candidate
                .addresses
                .iter()
                .any(|addr| matches!(addr, IpAddr::V4(v4) if !v4.is_loopback()))
    }
}

/// Capture-device enumeration: first device exposing any IPv4 address.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceListDiscovery;

impl InterfaceDiscovery for DeviceListDiscovery {
    fn candidates(&self) -> Result<Vec<InterfaceCandidate>> {
        let devices =
            pcap::Device::list().map_err(|e| NetworkError::InterfaceList(e.to_string()))?;
        Ok(devices.iter().map(InterfaceCandidate::from).collect())
    }

    fn accepts(&self, candidate: &InterfaceCandidate) -> bool {
        candidate.addresses.iter().any(IpAddr::is_ipv4)
    }
}

/// The discovery strategy for the current build target.
#[cfg(windows)]
pub fn platform_discovery() -> impl InterfaceDiscovery {
    DeviceListDiscovery
}

/// The discovery strategy for the current build target.
#[cfg(not(windows))]
pub fn platform_discovery() -> impl InterfaceDiscovery {
    FlagDiscovery
}

/// Pick the first qualifying interface in enumeration order.
///
/// When several interfaces qualify, which one wins depends only on the order
/// the OS reports them in.
pub fn select_interface(discovery: &impl InterfaceDiscovery) -> Result<String> {
    discovery
        .candidates()?
        .into_iter()
        .find(|candidate| discovery.accepts(candidate))
        .map(|candidate| candidate.name)
        .ok_or_else(|| NetworkError::NoInterface.into())
}
