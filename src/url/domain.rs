use url::Url;

/// Path of the robots exclusion file on every host
pub const ROBOTS_TXT_PATH: &str = "/robots.txt";

/// Returns the key used for per-host state (delay gates, robots cache)
///
/// The key is the lowercase host followed by the port when one is given
/// explicitly, so two servers on one machine are kept apart.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use colibri::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_key(&url), "example.com");
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), "127.0.0.1:8080");
/// ```
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Returns the robots.txt URL for the host of `url`
pub fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path(ROBOTS_TXT_PATH);
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}

/// Whether `url` points at the robots exclusion file itself
pub fn is_robots_txt(url: &Url) -> bool {
    url.path() == ROBOTS_TXT_PATH
}
