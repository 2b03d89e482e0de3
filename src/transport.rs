//! Base64 text form of serialized artifacts, for moving them through
//! JSON bodies, CLI arguments and row stores.

use crate::errors::PreError;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, PreError> {
    STANDARD
        .decode(text.trim())
        .map_err(|_| PreError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let bytes = b"\x02\x00\xff arbitrary artifact bytes";
        let text = encode(bytes);
        assert_eq!(decode(&text).expect("decodes"), bytes.to_vec());
    }

    #[test]
    fn rejects_invalid_text() {
        assert_eq!(decode("not!!base64??"), Err(PreError::InvalidEncoding));
    }
}
