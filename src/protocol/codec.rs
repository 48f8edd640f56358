//! Datagram Codec
//!
//! Text encoding of requests and replies.
//!
//! ```text
//! request   := "STATUS" | key | id ":" key
//! reply     := value | id ":" value
//! ```

use std::str;

use crate::error::{CdnError, Result};

/// Largest datagram any service reads.
pub const MAX_DATAGRAM: usize = 1024;
/// Liveness probe payload.
pub const STATUS_PROBE: &str = "STATUS";
/// Liveness probe answer.
pub const STATUS_UP: &str = "UP";

// == Request ==
/// Inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Liveness probe
    Status,
    /// Point lookup, optionally correlated
    Lookup { id: Option<u64>, key: u64 },
}

impl Request {
    /// Correlated lookup.
    pub fn lookup(id: u64, key: u64) -> Self {
        Request::Lookup { id: Some(id), key }
    }

    /// Parses a datagram payload. Surrounding whitespace is ignored.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = str::from_utf8(payload)
            .map_err(|_| CdnError::MalformedRequest("payload is not UTF-8".to_string()))?
            .trim();

        if text == STATUS_PROBE {
            return Ok(Request::Status);
        }

        match text.split_once(':') {
            Some((id, key)) => Ok(Request::Lookup {
                id: Some(parse_number(id, "correlation id")?),
                key: parse_number(key, "key")?,
            }),
            None => Ok(Request::Lookup {
                id: None,
                key: parse_number(text, "key")?,
            }),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Request::Status => STATUS_PROBE.as_bytes().to_vec(),
            Request::Lookup { id: Some(id), key } => format!("{}:{}", id, key).into_bytes(),
            Request::Lookup { id: None, key } => key.to_string().into_bytes(),
        }
    }
}

// == Reply ==
/// Outbound value, echoing the request's correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: Option<u64>,
    pub value: String,
}

impl Reply {
    pub fn new(id: Option<u64>, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    /// Parses a reply. The value is kept verbatim.
    ///
    /// A leading `digits:` prefix is read as the correlation id; anything else is an
    /// uncorrelated value.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = str::from_utf8(payload)
            .map_err(|_| CdnError::MalformedRequest("reply is not UTF-8".to_string()))?;

        if let Some((id, value)) = text.split_once(':') {
            if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(id) = id.parse() {
                    return Ok(Reply::new(Some(id), value));
                }
            }
        }
        Ok(Reply::new(None, text))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self.id {
            Some(id) => format!("{}:{}", id, self.value).into_bytes(),
            None => self.value.clone().into_bytes(),
        }
    }
}

fn parse_number(text: &str, what: &str) -> Result<u64> {
    text.trim()
        .parse()
        .map_err(|_| CdnError::MalformedRequest(format!("invalid {} '{}'", what, text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_key() {
        assert_eq!(
            Request::parse(b"42").unwrap(),
            Request::Lookup { id: None, key: 42 }
        );
    }

    #[test]
    fn test_parse_trailing_newline() {
        assert_eq!(
            Request::parse(b"42\n").unwrap(),
            Request::Lookup { id: None, key: 42 }
        );
    }

    #[test]
    fn test_parse_correlated_key() {
        assert_eq!(Request::parse(b"7:42").unwrap(), Request::lookup(7, 42));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(Request::parse(b"STATUS").unwrap(), Request::Status);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let payloads: [&[u8]; 7] = [b"abc", b"", b"-1", b"1.5", b"x:42", b"7:", &[0xff, 0xfe]];
        for payload in payloads {
            assert!(
                matches!(Request::parse(payload), Err(CdnError::MalformedRequest(_))),
                "payload {:?} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_request_encoding() {
        assert_eq!(Request::lookup(3, 99).encode(), b"3:99".to_vec());
        assert_eq!(Request::Lookup { id: None, key: 5 }.encode(), b"5".to_vec());
        assert_eq!(Request::Status.encode(), b"STATUS".to_vec());
    }

    #[test]
    fn test_reply_with_id() {
        let reply = Reply::parse(b"12:abcDEF").unwrap();
        assert_eq!(reply, Reply::new(Some(12), "abcDEF"));
    }

    #[test]
    fn test_reply_without_id() {
        assert_eq!(Reply::parse(b"zzz0000000").unwrap(), Reply::new(None, "zzz0000000"));
        assert_eq!(Reply::parse(b"ab:cd").unwrap(), Reply::new(None, "ab:cd"));
    }

    #[test]
    fn test_reply_value_keeps_colons() {
        let reply = Reply::parse(b"1:a:b").unwrap();
        assert_eq!(reply, Reply::new(Some(1), "a:b"));
    }

    #[test]
    fn test_reply_encoding() {
        assert_eq!(Reply::new(Some(4), "v").encode(), b"4:v".to_vec());
        assert_eq!(Reply::new(None, "v").encode(), b"v".to_vec());
    }
}
