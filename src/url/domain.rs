use url::Url;

/// Extracts the lowercase host from a parsed URL
///
/// Returns `None` when the URL has no host (e.g. `mailto:` or `dns:` targets).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use warc_sweep::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the dedup key for a target URI
///
/// The key is the host, lowercased, without a leading `www.` and without a
/// port. Anything that yields no host produces an empty string, which callers
/// treat as "unknown site".
///
/// # Examples
///
/// ```
/// use warc_sweep::url::domain_key;
///
/// assert_eq!(domain_key("http://WWW.Example.com:8080/x"), "example.com");
/// assert_eq!(domain_key("https://example.com/y"), "example.com");
/// assert_eq!(domain_key("not a url"), "");
/// ```
pub fn domain_key(uri: &str) -> String {
    let uri = uri.trim();
    let host = match Url::parse(uri) {
        Ok(url) => extract_domain(&url).unwrap_or_default(),
        Err(_) => authority_of(uri),
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    strip_port(host).to_string()
}

/// Best-effort authority extraction for strings the URL parser rejects
fn authority_of(uri: &str) -> String {
    let Some((_, rest)) = uri.split_once("://") else {
        return String::new();
    };

    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();

    if authority.chars().any(char::is_whitespace) {
        return String::new();
    }
    authority.to_lowercase()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals carry colons of their own
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or_default()
}
