use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// 将字节编码为无填充的 base64url 字符串
pub fn to_base64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// 从无填充的 base64url 字符串解码
#[cfg(test)]
pub(crate) fn from_base64url(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded)
}

/// Strips leading zero bytes from a big-endian integer, keeping at least
/// one byte so that zero still encodes as `[0]`.
pub fn minimal_be_bytes(bytes: &[u8]) -> &[u8] {
    let first_nonzero = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    &bytes[first_nonzero..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_has_no_padding() {
        // 65537 = 0x01_00_01
        assert_eq!(to_base64url(&[0x01, 0x00, 0x01]), "AQAB");
        assert_eq!(to_base64url(&[0xff]), "_w");
        assert_eq!(from_base64url("_w").unwrap(), vec![0xff]);
    }

    #[test]
    fn test_minimal_be_bytes() {
        assert_eq!(minimal_be_bytes(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(minimal_be_bytes(&[0x80]), &[0x80]);
        assert_eq!(minimal_be_bytes(&[0, 0]), &[0]);
        assert_eq!(minimal_be_bytes(&[]), &[] as &[u8]);
    }
}
