//! Domain normalization and hostname validation

use sitehost_shared::MAX_DOMAIN_LEN;

/// Maximum length of a single DNS label
const MAX_LABEL_LEN: usize = 63;

/// Normalize a domain as submitted by an administrator.
///
/// Lowercases, strips any `scheme://` prefix and trailing slashes, and trims
/// whitespace until nothing changes, so the result is a fixed point:
/// `"HTTPS://Example.org/"` becomes `"example.org"`.
pub fn normalize_domain(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let mut domain = raw.trim().to_lowercase();

    while let Some(idx) = domain.find("://") {
        let scheme = &domain[..idx];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c)) {
            break;
        }
        domain = domain[idx + 3..].to_string();
    }

    domain.trim_end_matches('/').trim().to_string()
}

/// Validate a normalized domain against hostname grammar.
///
/// At least two labels; each label 1..=63 ASCII alphanumerics or hyphens and
/// never starting or ending with a hyphen; the TLD is alphanumeric and not
/// all digits.
pub fn is_valid_hostname(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return false;
    }

    match labels.last() {
        Some(tld) => {
            tld.chars().all(|c| c.is_ascii_alphanumeric()) && !tld.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Normalize a `Host` header value: lowercase, port and trailing dot removed
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.trim_end_matches('.').to_lowercase()
}
