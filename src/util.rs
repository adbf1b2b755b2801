use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

const ROUTERWATCH_PORT: &str = "ROUTERWATCH_PORT";

const DEFAULT_PORT: u16 = 9000;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

/// Port from the environment, if set and valid
pub fn get_port() -> Option<u16> {
    let port_from_env = std::env::var(ROUTERWATCH_PORT);
    port_from_env.ok().and_then(|res| res.parse().ok())
}

const ROUTERWATCH_ADDR: &str = "ROUTERWATCH_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

pub fn get_default_addr() -> IpAddr {
    DEFAULT_ADDR
}

pub fn get_addr() -> Option<IpAddr> {
    let addr_from_env = std::env::var(ROUTERWATCH_ADDR);
    addr_from_env.ok().and_then(|res| res.parse().ok())
}

const ROUTERWATCH_DB: &str = "ROUTERWATCH_DB";

const DEFAULT_DB_PATH: &str = "/tmp/routerwatch.db";

pub fn get_default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

pub fn get_db_path() -> Option<PathBuf> {
    std::env::var(ROUTERWATCH_DB)
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Kilobytes to megabytes, rounded to two decimals
pub fn kb_to_mb(kb: u64) -> f64 {
    (kb as f64 / 1024.0 * 100.0).round() / 100.0
}
