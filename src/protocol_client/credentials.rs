use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Resolution of spec.md §9 open question (b): source credentials are
/// reversibly encrypted under a key derived from the server secret, never
/// one-way hashed, since the server must be able to reconnect.
fn derive_key(server_secret: &str) -> Key<Aes256Gcm> {
    let digest = Sha256::digest(server_secret.as_bytes());
    *Key::<Aes256Gcm>::from_slice(&digest)
}

pub fn encrypt(server_secret: &str, plaintext: &str) -> anyhow::Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(&derive_key(server_secret));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("credential encrypt failed: {e}"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt(server_secret: &str, blob: &[u8]) -> anyhow::Result<String> {
    if blob.len() < NONCE_LEN {
        anyhow::bail!("credential blob too short");
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(&derive_key(server_secret));
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow::anyhow!("credential decrypt failed: {e}"))?;
    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let secret = "super-secret-server-key";
        let blob = encrypt(secret, "hunter2").unwrap();
        assert_ne!(blob, b"hunter2".to_vec());
        let plain = decrypt(secret, &blob).unwrap();
        assert_eq!(plain, "hunter2");
    }

    #[test]
    fn wrong_secret_fails_to_decrypt() {
        let blob = encrypt("secret-a", "hunter2").unwrap();
        assert!(decrypt("secret-b", &blob).is_err());
    }
}
