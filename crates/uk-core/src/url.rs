//! URL helpers
//!
//! These functions avoid allocations and work directly on string slices.

/// Hosts the content script acts on.
const KICK_HOSTS: [&str; 2] = ["kick.com", "www.kick.com"];

/// Top-level paths that are site sections rather than channels.
const RESERVED_SEGMENTS: [&str; 8] = [
    "category",
    "categories",
    "browse",
    "following",
    "search",
    "settings",
    "dashboard",
    "video",
];

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let colon_pos = url.find(':')?;
    if url[colon_pos..].starts_with("://") {
        Some(colon_pos + 3)
    } else {
        None
    }
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, without userinfo or port.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let scheme_end = get_scheme_end(url)?;
    let rest = &url[scheme_end..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let mut host = &rest[..end];
    if let Some(at_pos) = host.rfind('@') {
        host = &host[at_pos + 1..];
    }
    if let Some(colon) = host.find(':') {
        host = &host[..colon];
    }
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Extract the path portion of a URL ("/" when absent).
#[inline]
pub fn extract_path(url: &str) -> &str {
    let Some(scheme_end) = get_scheme_end(url) else {
        return "/";
    };
    let rest = &url[scheme_end..];
    let Some(path_start) = rest.find(['/', '?', '#']) else {
        return "/";
    };
    let rest = &rest[path_start..];
    if !rest.starts_with('/') {
        return "/";
    }
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

// =============================================================================
// Kick Paths
// =============================================================================

pub fn is_kick_host(host: &str) -> bool {
    KICK_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h))
}

/// First path segment of a site-relative link (`/foo/videos` -> `foo`).
/// Returns `None` for category links and other non-channel paths.
pub fn channel_from_href(href: &str) -> Option<&str> {
    let path = href.strip_prefix('/')?;
    let end = path.find(['/', '?', '#']).unwrap_or(path.len());
    let segment = &path[..end];
    if segment.is_empty() || RESERVED_SEGMENTS.iter().any(|r| segment.eq_ignore_ascii_case(r)) {
        return None;
    }
    Some(segment)
}

/// True for `https://kick.com/<segment>` (with or without `www.`).
pub fn is_stream_url(url: &str) -> bool {
    if !url.starts_with("https://") || !extract_host(url).is_some_and(is_kick_host) {
        return false;
    }
    // extract_path always starts with '/'
    extract_path(url)[1..].chars().next().is_some_and(|c| c != '/')
}

/// True when the page at `url` is served from a Kick host.
pub fn is_kick_url(url: &str) -> bool {
    extract_host(url).is_some_and(is_kick_host)
}
