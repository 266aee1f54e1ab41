use std::net::IpAddr;

use thiserror::Error;
use url::{Host, Url};

/// Why a feed URL was refused by `addfeed`.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme {0:?}, feeds must be http or https")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    /// Loopback, private, link-local or unspecified address
    #[error("{0} is a local or private address (set allow_private_urls to permit it)")]
    PrivateHost(String),
}

/// Check a feed URL before it is stored.
///
/// Only `http` and `https` are accepted. Unless `allow_private` is set,
/// `localhost` and literal loopback/private/link-local addresses are
/// refused. Host names are not resolved.
pub fn validate_feed_url(input: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(input.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }

    let host = url.host().ok_or(UrlValidationError::MissingHost)?;
    if allow_private {
        return Ok(url);
    }

    let local = match &host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost")
        }
        Host::Ipv4(addr) => is_local_address(IpAddr::V4(*addr)),
        Host::Ipv6(addr) => is_local_address(IpAddr::V6(*addr)),
    };

    if local {
        return Err(UrlValidationError::PrivateHost(host.to_string()));
    }
    Ok(url)
}

fn is_local_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_local_address(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
        }
    }
}
