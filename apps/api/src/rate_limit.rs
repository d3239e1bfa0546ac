//! Per-client request quotas, keyed by peer IP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::errors::AppError;

pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// A keyed limiter allowing `limit` requests per minute per client.
/// A zero limit is treated as one.
pub fn per_minute(limit: u32) -> Arc<ClientRateLimiter> {
    let quota = Quota::per_minute(NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Peer address when the server was started with connect info; requests without
/// it (in-process callers) share one bucket.
pub fn client_ip(connect: Option<ConnectInfo<SocketAddr>>) -> IpAddr {
    connect
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub fn check(limiter: &ClientRateLimiter, ip: IpAddr) -> Result<(), AppError> {
    limiter
        .check_key(&ip)
        .map_err(|_| AppError::RateLimited(format!("Too many requests from {ip}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_per_client() {
        let limiter = per_minute(2);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(check(&limiter, a).is_ok());
        assert!(check(&limiter, a).is_ok());
        assert!(matches!(check(&limiter, a), Err(AppError::RateLimited(_))));
        assert!(check(&limiter, b).is_ok());
    }

    #[test]
    fn test_zero_limit_still_admits_one() {
        let limiter = per_minute(0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(check(&limiter, ip).is_ok());
        assert!(check(&limiter, ip).is_err());
    }

    #[test]
    fn test_client_ip_falls_back_without_connect_info() {
        assert_eq!(client_ip(None), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let addr: SocketAddr = "192.168.1.7:51000".parse().unwrap();
        assert_eq!(
            client_ip(Some(ConnectInfo(addr))),
            "192.168.1.7".parse::<IpAddr>().unwrap()
        );
    }
}
