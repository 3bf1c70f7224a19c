//! # JSON Stream Splitter
//!
//! The wireless channel is a raw byte stream with no message delimiter.
//! Requests are recovered by parsing as many complete JSON values as the
//! buffer holds; an incomplete trailing value stays buffered for the next
//! read.

use serde_json::Value;
use shared_types::{Envelope, WireError};

#[derive(Debug)]
pub struct JsonStreamSplitter {
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl JsonStreamSplitter {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Bytes waiting for the rest of a value.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append `bytes` and return every envelope completed by them, in order.
    ///
    /// A syntax error discards the whole buffer since there is no boundary
    /// to resynchronize on.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Envelope, WireError>> {
        self.buffer.extend_from_slice(bytes);

        let mut decoded = Vec::new();
        let mut consumed = 0;
        {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(value)) => {
                        consumed = stream.byte_offset();
                        decoded.push(Envelope::from_value(value));
                    }
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => {
                        consumed = self.buffer.len();
                        decoded.push(Err(WireError::Malformed(e)));
                        break;
                    }
                    None => {
                        consumed = stream.byte_offset();
                        break;
                    }
                }
            }
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.max_buffer {
            self.buffer.clear();
            decoded.push(Err(WireError::FrameTooLarge {
                limit: self.max_buffer,
            }));
        }
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MessageName;

    const WALLET: &str = r#"{"header":{"messageName":"walletAddr"},"body":{"keyNo":2}}"#;
    const WIFI: &str = r#"{"header":{"messageName":"wirelessConf"},"body":{"wifiName":"a","wifiPwd":"b"}}"#;

    #[test]
    fn test_split_back_to_back_objects() {
        let mut splitter = JsonStreamSplitter::new(1024);
        let joined = format!("{}\n{}", WALLET, WIFI);

        let decoded = splitter.push(joined.as_bytes());

        let names: Vec<_> = decoded
            .into_iter()
            .map(|r| r.unwrap().name())
            .collect();
        assert_eq!(
            names,
            vec![Some(MessageName::WalletAddr), Some(MessageName::WirelessConf)]
        );
        assert_eq!(splitter.pending(), 0);
    }

    #[test]
    fn test_partial_object_waits_for_rest() {
        let mut splitter = JsonStreamSplitter::new(1024);
        let (head, tail) = WALLET.split_at(20);

        assert!(splitter.push(head.as_bytes()).is_empty());
        assert_eq!(splitter.pending(), 20);

        let decoded = splitter.push(tail.as_bytes());
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].as_ref().unwrap().name(), Some(MessageName::WalletAddr));
        assert_eq!(splitter.pending(), 0);
    }

    #[test]
    fn test_garbage_is_reported_and_discarded() {
        let mut splitter = JsonStreamSplitter::new(1024);

        let decoded = splitter.push(b"}}not json");
        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0], Err(WireError::Malformed(_))));
        assert_eq!(splitter.pending(), 0);

        let decoded = splitter.push(WALLET.as_bytes());
        assert!(decoded[0].is_ok());
    }

    #[test]
    fn test_object_without_message_name_is_rejected() {
        let mut splitter = JsonStreamSplitter::new(1024);
        let decoded = splitter.push(br#"{"header":{"messageName":""},"body":{}}"#);
        assert!(matches!(decoded[0], Err(WireError::MissingMessageName)));
    }

    #[test]
    fn test_oversized_partial_is_dropped() {
        let mut splitter = JsonStreamSplitter::new(16);
        let decoded = splitter.push(br#"{"header":{"messageName":"walletAddr""#);
        assert!(matches!(decoded[0], Err(WireError::FrameTooLarge { limit: 16 })));
        assert_eq!(splitter.pending(), 0);
    }
}
