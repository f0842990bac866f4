use crate::UrlError;
use url::Url;

/// Query parameters that never change which products a page shows
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid"];

/// Builds the key under which a URL is recorded in the visited set
///
/// Two URLs that render the same listing map to the same key:
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host (done by the parser)
/// 3. Drop the fragment
/// 4. Remove a trailing slash from the path (except for root /)
/// 5. Drop tracking parameters and sort the remaining query pairs
///
/// # Examples
///
/// ```
/// use shelf_crawler::url::visit_key;
///
/// let key = visit_key("https://Shop.Example.com/list/?size=36&page=2#top").unwrap();
/// assert_eq!(key, "https://shop.example.com/list?page=2&size=36");
/// ```
pub fn visit_key(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
