use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::config::Config;

const SYSMON_PORT: &str = "SYSMON_PORT";

const DEFAULT_PORT: u16 = 8080;

const SYSMON_ADDR: &str = "SYSMON_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

const SYSMON_STATIC_DIR: &str = "SYSMON_STATIC_DIR";

pub fn get_default_addr() -> SocketAddr {
    SocketAddr::new(DEFAULT_ADDR, DEFAULT_PORT)
}

pub fn get_port() -> Option<u16> {
    std::env::var(SYSMON_PORT).ok()?.parse().ok()
}

pub fn get_addr() -> Option<IpAddr> {
    std::env::var(SYSMON_ADDR).ok()?.parse().ok()
}

pub fn get_static_dir() -> Option<PathBuf> {
    std::env::var(SYSMON_STATIC_DIR).ok().map(PathBuf::from)
}

/// Apply `SYSMON_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(addr) = get_addr() {
        config.bind_addr.set_ip(addr);
    }
    if let Some(port) = get_port() {
        config.bind_addr.set_port(port);
    }
    if let Some(dir) = get_static_dir() {
        config.static_dir = dir;
    }
}
