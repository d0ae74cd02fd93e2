use super::*;

#[test]
fn test_parse_origin() {
    let uri = Uri::parse_origin(b"/").unwrap();
    assert_eq!(uri.path(), "/");
    assert_eq!(uri.query(), "");

    let uri = Uri::parse_origin(b"/users/42").unwrap();
    assert_eq!(uri.path(), "/users/42");

    let uri = Uri::parse_origin(b"/search?q=rust&page=2").unwrap();
    assert_eq!(uri.path(), "/search");
    assert_eq!(uri.query(), "q=rust&page=2");

    let uri = Uri::parse_origin(b"/p?").unwrap();
    assert_eq!(uri.path(), "/p");
    assert_eq!(uri.query(), "");
}

#[test]
fn test_parse_origin_rejects() {
    assert_eq!(Uri::parse_origin(b"").unwrap_err(), UriError::NotOriginForm);
    assert_eq!(
        Uri::parse_origin(b"http://x/").unwrap_err(),
        UriError::NotOriginForm
    );
    assert_eq!(Uri::parse_origin(b"*").unwrap_err(), UriError::NotOriginForm);
    assert_eq!(
        Uri::parse_origin(b"/docs#intro").unwrap_err(),
        UriError::Fragment
    );
    assert_eq!(
        Uri::parse_origin(b"/a?b=1#f").unwrap_err(),
        UriError::Fragment
    );
    assert_eq!(
        Uri::parse_origin(b"/a b").unwrap_err(),
        UriError::InvalidPath
    );
    assert_eq!(
        Uri::parse_origin(b"/a?b\x7F").unwrap_err(),
        UriError::InvalidQuery
    );
}

#[test]
fn test_raw_pairs() {
    let uri = Uri::parse_origin(b"/s?a=1&b&c=&a=2").unwrap();
    let pairs: Vec<(&str, &str)> = uri.raw_pairs().collect();
    assert_eq!(pairs, [("a", "1"), ("b", ""), ("c", ""), ("a", "2")]);

    // raw form is used for splitting, no decoding
    let uri = Uri::parse_origin(b"/s?k%3Dey=v%26alue").unwrap();
    let pairs: Vec<(&str, &str)> = uri.raw_pairs().collect();
    assert_eq!(pairs, [("k%3Dey", "v%26alue")]);
}

#[test]
fn test_query_map() {
    let uri = Uri::parse_origin(b"/s?name=John%20Doe&tag=a&tag=b&flag").unwrap();
    let query = uri.query_map();

    assert_eq!(query.get("name"), Some("John Doe"));
    assert_eq!(query.at("tag"), ["a", "b"]);
    assert_eq!(query.get("flag"), Some(""));
    assert!(!query.contains("missing"));
    assert_eq!(query.len(), 3);

    // keys are case-sensitive
    assert!(!query.contains("Name"));
}

#[test]
fn test_percent_decode() {
    assert_eq!(percent_decode("plain").as_deref(), Some("plain"));
    assert_eq!(percent_decode("a%20b").as_deref(), Some("a b"));
    assert_eq!(percent_decode("%2Fetc%2f").as_deref(), Some("/etc/"));
    // '+' is not a space in RFC3986
    assert_eq!(percent_decode("a+b").as_deref(), Some("a+b"));

    assert_eq!(percent_decode("bad%2"), None);
    assert_eq!(percent_decode("bad%zz"), None);
    assert_eq!(percent_decode("%FF"), None);
}

#[test]
fn test_display() {
    let uri = Uri::parse_origin(b"/a/b?c=d").unwrap();
    assert_eq!(uri.to_string(), "/a/b?c=d");

    let uri = Uri::parse_origin(b"/a/b").unwrap();
    assert_eq!(uri.to_string(), "/a/b");
}
