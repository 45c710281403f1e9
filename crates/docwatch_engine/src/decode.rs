use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use url::Url;

use crate::FetchOutput;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("body of {url} is not valid {encoding}")]
    Malformed { url: String, encoding: String },
}

/// Decodes a fetched page body into a string.
///
/// Encoding is chosen by BOM, then the Content-Type charset, then a chardetng
/// guess hinted with the page's top-level domain.
pub fn decode_body(output: &FetchOutput) -> Result<String, DecodeError> {
    let bytes = output.bytes.as_slice();
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            output
                .metadata
                .content_type
                .as_deref()
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| guess_encoding(bytes, &output.metadata.final_url));

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            url: output.metadata.final_url.clone(),
            encoding: used.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn guess_encoding(bytes: &[u8], url: &str) -> &'static Encoding {
    let host = Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string));
    let tld = host
        .as_deref()
        .and_then(|host| host.rsplit('.').next())
        .map(str::as_bytes);
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(tld, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchMetadata;

    fn output(bytes: &[u8], content_type: Option<&str>) -> FetchOutput {
        FetchOutput {
            bytes: bytes.to_vec(),
            metadata: FetchMetadata {
                original_url: "https://docs.example.com/docs".into(),
                final_url: "https://docs.example.com/docs".into(),
                redirect_count: 0,
                content_type: content_type.map(str::to_string),
                byte_len: bytes.len() as u64,
            },
        }
    }

    #[test]
    fn charset_header_is_respected() {
        let decoded = decode_body(&output(b"caf\xe9", Some("text/html; charset=ISO-8859-1")));
        assert_eq!(decoded.unwrap(), "caf\u{e9}");
    }

    #[test]
    fn quoted_charset_is_accepted() {
        assert_eq!(
            charset_param("text/html; Charset=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_body(&output(
            b"\xEF\xBB\xBFhello",
            Some("text/html; charset=ISO-8859-1"),
        ));
        assert_eq!(decoded.unwrap(), "hello");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = decode_body(&output(b"ok \xff\xfe", Some("text/html; charset=utf-8")));
        assert!(matches!(err, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn plain_ascii_without_header_decodes() {
        let decoded = decode_body(&output(b"<p>plain</p>", None));
        assert_eq!(decoded.unwrap(), "<p>plain</p>");
    }
}
