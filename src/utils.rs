//! Utility functions for the proxy pool.

use crate::proxy::ProxyAddr;

/// Extract every `ip:port` pair found anywhere in `text`.
///
/// The IP and port may be separated by `:` or by whitespace, so both
/// `1.2.3.4:8080` and a tab-separated `1.2.3.4	8080` table row match.
/// Octets and ports are matched by digit count only (1-3 and 1-5 digits);
/// values are not range checked.
pub fn extract_ip_port(text: &str) -> Vec<ProxyAddr> {
    let bytes = text.as_bytes();
    let mut result = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match match_at(bytes, pos) {
            Some((addr, end)) => {
                result.push(addr);
                pos = end;
            }
            None => pos += 1,
        }
    }

    result
}

fn match_at(bytes: &[u8], start: usize) -> Option<(ProxyAddr, usize)> {
    let mut pos = start;

    for octet in 0..4 {
        let digits = count_digits(bytes, pos, 3);
        if digits == 0 {
            return None;
        }
        pos += digits;
        if octet < 3 {
            if bytes.get(pos) != Some(&b'.') {
                return None;
            }
            pos += 1;
        }
    }
    let ip_end = pos;

    let separators = bytes[pos..]
        .iter()
        .take_while(|b| **b == b':' || b.is_ascii_whitespace())
        .count();
    if separators == 0 {
        return None;
    }
    pos += separators;

    let port_digits = count_digits(bytes, pos, 5);
    if port_digits == 0 {
        return None;
    }
    let port_end = pos + port_digits;

    // Only ASCII bytes were consumed, so these slices sit on char boundaries.
    let host = String::from_utf8_lossy(&bytes[start..ip_end]).into_owned();
    let port = String::from_utf8_lossy(&bytes[pos..port_end]).into_owned();
    Some((ProxyAddr { host, port }, port_end))
}

fn count_digits(bytes: &[u8], pos: usize, max: usize) -> usize {
    bytes
        .get(pos..)
        .unwrap_or_default()
        .iter()
        .take(max)
        .take_while(|b| b.is_ascii_digit())
        .count()
}
