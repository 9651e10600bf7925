//! LAN address discovery for building share URLs

use std::net::{IpAddr, Ipv4Addr};

use crate::config::ShareConfig;
use crate::share_id::ShareId;

/// Find the IPv4 address other devices on the LAN can reach us at
///
/// Walks the local interfaces and takes the first IPv4 address that is
/// neither loopback nor unspecified. Works without a default route.
///
/// # Returns
/// * The first usable interface address, or `127.0.0.1` if there is none
pub fn lan_ipv4() -> Ipv4Addr {
    let addrs = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|interface| interface.ip())
            .collect::<Vec<_>>(),
        Err(e) => {
            tracing::debug!("Interface lookup failed, using loopback: {}", e);
            Vec::new()
        }
    };

    select_lan_ipv4(addrs).unwrap_or_else(|| {
        tracing::debug!("No LAN IPv4 address bound, using loopback");
        Ipv4Addr::LOCALHOST
    })
}

/// Pick the first LAN-reachable IPv4 address from interface addresses
fn select_lan_ipv4<I>(addrs: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find_map(|addr| match addr {
        IpAddr::V4(v4) if is_lan_candidate(v4) => Some(v4),
        _ => None,
    })
}

fn is_lan_candidate(addr: Ipv4Addr) -> bool {
    !addr.is_loopback() && !addr.is_unspecified()
}

/// Host placed in share URLs: the configured override or the LAN address
///
/// Resolved on every call since interface addresses can change.
pub fn public_host(config: &ShareConfig) -> String {
    match &config.public_host {
        Some(host) => host.clone(),
        None => lan_ipv4().to_string(),
    }
}

/// Base URL (`scheme://host:port`) for links handed to other devices
pub fn base_url(config: &ShareConfig) -> String {
    format!("{}://{}:{}", config.scheme, public_host(config), config.port)
}

/// Absolute preview URL for a share
///
/// # Arguments
/// * `config` - Server configuration supplying scheme, host override and port
/// * `id` - Share to link to
///
/// # Returns
/// * `{scheme}://{host}:{port}/share/{id}`
pub fn share_url(config: &ShareConfig, id: &ShareId) -> String {
    format!("{}/share/{}", base_url(config), id)
}
