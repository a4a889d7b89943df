use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is in a key path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode every segment of `key`, keeping `/` separators.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `{base}/{encoded key}` with exactly one slash between the two.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), encode_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(
            encode_key("t1/covers/1700000000000-abc-cover.png"),
            "t1/covers/1700000000000-abc-cover.png"
        );
        assert_eq!(encode_key("t1/My Show/ä.mp3"), "t1/My%20Show/%C3%A4.mp3");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:4000/media/", "t1/a.png"),
            "http://localhost:4000/media/t1/a.png"
        );
    }
}
