//! Built-in resolver catalogue
//!
//! Free public services that report the caller's IPv4 address. Each entry
//! only differs in URL and in how the address is read from the body.

use cfddns_core::{Error, ResolverConfig, Result};

/// (name, url, JSON field path or `None` for plain text)
const BUILTINS: &[(&str, &str, Option<&str>)] = &[
    ("bigdatacloud", "https://api.bigdatacloud.net/data/client-ip", Some("ipString")),
    ("icanhazip", "http://icanhazip.com", None),
    ("ifconfigme", "https://ifconfig.me/ip", None),
    ("ipapico", "https://ipapi.co/ip", None),
    ("ipify", "https://api.ipify.org?format=text", None),
    ("myexternalip", "https://myexternalip.com/raw", None),
    ("myip", "https://api.myip.com", Some("ip")),
    ("whatismyipaddress", "http://ipv4bot.whatismyipaddress.com", None),
    ("wtfismyip", "https://wtfismyip.com/text", None),
];

fn to_config(entry: &(&str, &str, Option<&str>)) -> ResolverConfig {
    match entry {
        (name, url, Some(path)) => ResolverConfig::json(*name, *url, *path),
        (name, url, None) => ResolverConfig::text(*name, *url),
    }
}

/// Names of every built-in resolver, in default rotation order
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _, _)| *name)
}

/// Look up a built-in resolver by name (case-insensitive)
pub fn builtin(name: &str) -> Option<ResolverConfig> {
    BUILTINS
        .iter()
        .find(|(candidate, _, _)| candidate.eq_ignore_ascii_case(name.trim()))
        .map(to_config)
}

/// Every built-in resolver, in default rotation order
pub fn all() -> Vec<ResolverConfig> {
    BUILTINS.iter().map(to_config).collect()
}

/// Resolve a list of names into configurations, preserving order
///
/// Fails on the first unknown name.
pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Vec<ResolverConfig>> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            builtin(name).ok_or_else(|| {
                Error::config(format!(
                    "Unknown resolver '{}'. Known resolvers: {}",
                    name,
                    self::names().collect::<Vec<_>>().join(", ")
                ))
            })
        })
        .collect()
}
