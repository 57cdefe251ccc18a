//! Named string formats and datetime layouts
//!
//! `utf8`, `ascii` and `printable_ascii` inspect raw bytes. Every other format
//! needs valid UTF-8 text and fails on anything else.

use super::ScalarValidator;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use protorules_core::constraint::{Constraint, StringFormat};
use protorules_core::types::Scalar;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use url::Url;

// Compile patterns once; a failed compile makes the format unmatchable
static MAC_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{2}([:-])(?:[0-9A-Fa-f]{2}[:-]){4}[0-9A-Fa-f]{2}$"));

static LABEL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$"));

static RELATIVE_BASE: LazyLock<Result<Url, url::ParseError>> =
    LazyLock::new(|| Url::parse("http://base.invalid/"));

/// Validator for `format` and `datetime`
pub struct FormatValidator {
    name: String,
}

impl Default for FormatValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatValidator {
    /// Create a new format validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "format_validator".to_string(),
        }
    }
}

fn matches_static(pattern: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> bool {
    match &**pattern {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(error = %e, "format pattern failed to compile");
            false
        }
    }
}

fn is_mac(s: &str) -> bool {
    // one separator style throughout
    matches_static(&MAC_PATTERN, s) && !(s.contains(':') && s.contains('-'))
}

fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| matches_static(&LABEL_PATTERN, label))
}

fn is_fqdn(s: &str) -> bool {
    let trimmed = s.strip_suffix('.').unwrap_or(s);
    is_hostname(s)
        && trimmed.contains('.')
        && trimmed
            .rsplit('.')
            .next()
            .is_some_and(|tld| tld.chars().any(|c| c.is_ascii_alphabetic()))
}

fn is_host_port(s: &str) -> bool {
    let Some((host, port)) = s.rsplit_once(':') else {
        return false;
    };
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) || port.parse::<u16>().is_err()
    {
        return false;
    }
    match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
        None => host.parse::<Ipv4Addr>().is_ok() || is_hostname(host),
    }
}

fn is_uri_reference(s: &str) -> bool {
    if Url::parse(s).is_ok() {
        return true;
    }
    match &*RELATIVE_BASE {
        Ok(base) => Url::options().base_url(Some(base)).parse(s).is_ok(),
        Err(_) => false,
    }
}

fn is_boolean(s: &str) -> bool {
    matches!(
        s,
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "0" | "f" | "F" | "false" | "FALSE" | "False"
    )
}

fn uuid_version(s: &str) -> Option<usize> {
    // hyphenated form only
    if s.len() != 36 {
        return None;
    }
    uuid::Uuid::parse_str(s).ok().map(|u| u.get_version_num())
}

fn check_text(format: StringFormat, s: &str) -> bool {
    match format {
        StringFormat::Utf8 => true,
        StringFormat::Ascii => s.is_ascii(),
        StringFormat::PrintableAscii => s.bytes().all(|b| (0x20..=0x7e).contains(&b)),
        StringFormat::Boolean => is_boolean(s),
        StringFormat::Lowercase => !s.chars().any(char::is_uppercase),
        StringFormat::Uppercase => !s.chars().any(char::is_lowercase),
        StringFormat::Alpha => !s.is_empty() && s.chars().all(char::is_alphabetic),
        StringFormat::Numeric => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        StringFormat::Alphanumeric => !s.is_empty() && s.chars().all(char::is_alphanumeric),
        StringFormat::Ip => s.parse::<IpAddr>().is_ok(),
        StringFormat::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
        StringFormat::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
        StringFormat::Cidr => s.parse::<ipnet::IpNet>().is_ok(),
        StringFormat::Mac => is_mac(s),
        StringFormat::HostPort => is_host_port(s),
        StringFormat::Hostname => is_hostname(s),
        StringFormat::Fqdn => is_fqdn(s),
        StringFormat::Uri => Url::parse(s).is_ok(),
        StringFormat::UriReference => is_uri_reference(s),
        StringFormat::Url => Url::parse(s).is_ok_and(|u| u.has_host()),
        StringFormat::HttpUrl => Url::parse(s)
            .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host()),
        StringFormat::Base64 => base64::engine::general_purpose::STANDARD.decode(s).is_ok(),
        StringFormat::Base64Url => {
            base64::engine::general_purpose::URL_SAFE.decode(s).is_ok()
                || base64::engine::general_purpose::URL_SAFE_NO_PAD
                    .decode(s)
                    .is_ok()
        }
        StringFormat::Hex => !s.is_empty() && hex::decode(s).is_ok(),
        StringFormat::Json => serde_json::from_str::<serde_json::Value>(s).is_ok(),
        StringFormat::Timezone => s.parse::<chrono_tz::Tz>().is_ok(),
        StringFormat::Uuid => uuid_version(s).is_some(),
        StringFormat::Uuid3 => uuid_version(s) == Some(3),
        StringFormat::Uuid4 => uuid_version(s) == Some(4),
        StringFormat::Uuid5 => uuid_version(s) == Some(5),
    }
}

fn check_format(format: StringFormat, value: &Scalar) -> bool {
    match value {
        Scalar::Str(s) => check_text(format, s),
        Scalar::Bytes(b) => match format {
            StringFormat::Utf8 => std::str::from_utf8(b).is_ok(),
            StringFormat::Ascii => b.is_ascii(),
            StringFormat::PrintableAscii => b.iter().all(|c| (0x20..=0x7e).contains(c)),
            other => std::str::from_utf8(b).is_ok_and(|s| check_text(other, s)),
        },
        _ => false,
    }
}

/// Whether `s` parses under a chrono `strftime` layout
///
/// The layout may describe a zoned datetime, a naive datetime, a date or a
/// time of day.
#[must_use]
pub fn matches_layout(s: &str, layout: &str) -> bool {
    DateTime::parse_from_str(s, layout).is_ok()
        || NaiveDateTime::parse_from_str(s, layout).is_ok()
        || NaiveDate::parse_from_str(s, layout).is_ok()
        || NaiveTime::parse_from_str(s, layout).is_ok()
}

impl ScalarValidator for FormatValidator {
    fn handles(&self, rule: &Constraint) -> bool {
        matches!(rule, Constraint::Format(_) | Constraint::DateTime(_))
    }

    fn check(&self, rule: &Constraint, value: &Scalar) -> bool {
        match rule {
            Constraint::Format(format) => check_format(*format, value),
            Constraint::DateTime(layout) => value.as_str().is_some_and(|s| matches_layout(s, layout)),
            _ => true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
