use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn verify_signature(secret: &[u8], data: &[u8], signature_b64: &str) -> bool {
    let Ok(sig_bytes) = STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Base64 HMAC-SHA256 of `data`, sent with webhook deliveries so receivers
/// can authenticate the payload.
pub fn sign_data(secret: &[u8], data: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(data);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_payload_verifies() {
        let secret = b"channel-secret";
        let body = br#"{"event":"incident.created"}"#;
        let sig = sign_data(secret, body).unwrap();
        assert!(verify_signature(secret, body, &sig));
    }

    #[test]
    fn tampered_payload_rejected() {
        let sig = sign_data(b"secret", b"original").unwrap();
        assert!(!verify_signature(b"secret", b"tampered", &sig));
        assert!(!verify_signature(b"secret", b"original", "not-base64!"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let sig = sign_data(b"one", b"payload").unwrap();
        assert!(!verify_signature(b"two", b"payload", &sig));
    }
}
