//! Chooses between the JSON representation and the interactive HTML page.

use http::header::ACCEPT;
use http::HeaderMap;
use mediatype::names::APPLICATION;
use mediatype::names::HTML;
use mediatype::names::JSON;
use mediatype::names::TEXT;
use mediatype::names::_STAR;
use mediatype::MediaTypeList;
use mediatype::ReadParams;

/// `true` when the client prefers `text/html` over `application/json`.
///
/// Wildcard ranges count toward JSON, so a browser sending
/// `text/html,*/*;q=0.8` gets the page while a curl-style `*/*` client gets
/// JSON. An absent or unrecognized `Accept` header also means JSON.
pub(crate) fn prefers_html(headers: &HeaderMap) -> bool {
    let q = mediatype::Name::new("q").expect("valid name");

    let mut best_html: f32 = 0.0;
    let mut best_json: f32 = 0.0;
    for value in headers.get_all(ACCEPT).iter() {
        let Ok(accept) = value.to_str() else {
            continue;
        };
        for media_type in MediaTypeList::new(accept).flatten() {
            let weight = media_type
                .get_param(q)
                .and_then(|value| value.unquoted_str().parse::<f32>().ok())
                .unwrap_or(1.0);
            if media_type.ty == TEXT && media_type.subty == HTML {
                best_html = best_html.max(weight);
            } else if (media_type.ty == APPLICATION && media_type.subty == JSON)
                || (media_type.ty == _STAR && media_type.subty == _STAR)
                || (media_type.ty == APPLICATION && media_type.subty == _STAR)
            {
                best_json = best_json.max(weight);
            }
        }
    }

    best_html > best_json
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers
    }

    #[test]
    fn browsers_prefer_html() {
        assert!(prefers_html(&headers(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
    }

    #[test]
    fn api_clients_prefer_json() {
        assert!(!prefers_html(&headers("application/json")));
        assert!(!prefers_html(&headers("*/*")));
        assert!(!prefers_html(&headers("application/json, text/html;q=0.9")));
    }

    #[test]
    fn absent_or_garbage_accept_defaults_to_json() {
        assert!(!prefers_html(&HeaderMap::new()));
        assert!(!prefers_html(&headers("n o t a m i m e")));
    }

    #[test]
    fn plain_html_accept_prefers_html() {
        assert!(prefers_html(&headers("text/html")));
    }
}
