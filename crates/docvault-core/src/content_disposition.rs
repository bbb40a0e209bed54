//! `Content-Disposition` header values with RFC 5987 filename encoding.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in an RFC 5987 `ext-value`. Everything outside
/// this set, including `'`, `(`, `)` and `*`, is percent-encoded.
const RFC5987_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~');

/// Percent-encode `value` as UTF-8 for use in `filename*=UTF-8''...`.
pub fn encode_rfc5987(value: &str) -> String {
    utf8_percent_encode(value, RFC5987_ENCODE_SET).to_string()
}

/// Plain-ASCII stand-in for clients that ignore `filename*`.
fn ascii_fallback(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `attachment` disposition carrying both a quoted ASCII filename and the
/// RFC 5987 encoded original.
pub fn attachment(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        encode_rfc5987(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_characters_encoded() {
        assert_eq!(encode_rfc5987("it's (draft)*.pdf"), "it%27s%20%28draft%29%2A.pdf");
    }

    #[test]
    fn test_non_ascii_survives() {
        assert_eq!(encode_rfc5987("résumé.pdf"), "r%C3%A9sum%C3%A9.pdf");
        assert_eq!(encode_rfc5987("报告.txt"), "%E6%8A%A5%E5%91%8A.txt");
    }

    #[test]
    fn test_attachment_header() {
        let header = attachment("Straße \"final\".pdf");
        assert_eq!(
            header,
            "attachment; filename=\"Stra_e _final_.pdf\"; filename*=UTF-8''Stra%C3%9Fe%20%22final%22.pdf"
        );
    }

    #[test]
    fn test_unreserved_marks_untouched() {
        assert_eq!(encode_rfc5987("a-b_c.d!e~f"), "a-b_c.d!e~f");
    }
}
