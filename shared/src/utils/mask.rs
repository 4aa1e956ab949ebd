//! Masking helpers for log output

/// Mask a delivery address (e-mail, phone number or URL) for logging
///
/// Keeps enough of the address to correlate log lines without exposing it.
pub fn mask_address(address: &str) -> String {
    if let Some((local, domain)) = address.split_once('@') {
        let head: String = local.chars().take(2).collect();
        return format!("{}****@{}", head, domain);
    }

    let chars: Vec<char> = address.chars().collect();
    if chars.len() >= 7 {
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", head, tail)
    } else {
        "****".to_string()
    }
}

/// Mask credentials embedded in a connection URL
pub fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > proto_end {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
