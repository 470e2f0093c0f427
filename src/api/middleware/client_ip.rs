//! Client IP resolution for key verification

use axum::http::HeaderMap;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Resolve the client IP: an explicit value from the body first, then the
/// first `X-Forwarded-For` entry, then `X-Real-IP`
pub fn resolve_client_ip(explicit: Option<String>, headers: &HeaderMap) -> Option<String> {
    explicit
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            header_str(headers, FORWARDED_FOR)
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            header_str(headers, REAL_IP)
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_body_ip_wins() {
        let h = headers(&[(FORWARDED_FOR, "10.0.0.9")]);
        assert_eq!(
            resolve_client_ip(Some("192.168.1.4".to_string()), &h).as_deref(),
            Some("192.168.1.4")
        );
    }

    #[test]
    fn test_first_forwarded_entry() {
        let h = headers(&[(FORWARDED_FOR, " 203.0.113.7 , 10.0.0.1"), (REAL_IP, "10.0.0.2")]);
        assert_eq!(resolve_client_ip(None, &h).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[(REAL_IP, "198.51.100.3")]);
        assert_eq!(
            resolve_client_ip(Some("  ".to_string()), &h).as_deref(),
            Some("198.51.100.3")
        );
    }

    #[test]
    fn test_no_ip() {
        assert!(resolve_client_ip(None, &HeaderMap::new()).is_none());
    }
}
