//! Per-device AES-256-GCM transport encryption

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use zeroize::Zeroizing;

use crate::error::{CityError, CityResult};

pub const ALGORITHM: &str = "aes-256-gcm";
const NONCE_LEN: usize = 12;

/// Wire envelope for an encrypted reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPacket {
    /// Base64 ciphertext with GCM tag
    pub encrypted_data: String,
    /// Hex nonce
    pub iv: String,
    pub algorithm: String,
    /// First 8 hex chars of the key's SHA-256
    pub key_id: String,
    pub timestamp: DateTime<Utc>,
}

/// AES-256-GCM cipher
pub struct AesGcmCipher {
    key: Zeroizing<[u8; 32]>,
}

impl AesGcmCipher {
    /// Create new cipher with random key
    pub fn new() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *key);
        Self { key }
    }

    /// Create cipher with provided key
    pub fn with_key(key: [u8; 32]) -> Self {
        Self { key: Zeroizing::new(key) }
    }

    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(&*self.key);
        hex::encode(&digest[..4])
    }

    /// Returns (nonce, ciphertext || tag)
    pub fn encrypt(&self, plaintext: &[u8]) -> CityResult<([u8; NONCE_LEN], Vec<u8>)> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CityError::Crypto(format!("encryption failed: {}", e)))?;

        Ok((nonce_bytes, ciphertext))
    }

    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> CityResult<Vec<u8>> {
        if nonce.len() != NONCE_LEN {
            return Err(CityError::Crypto(format!("bad nonce length {}", nonce.len())));
        }
        if ciphertext.len() < 16 {
            return Err(CityError::Crypto("ciphertext too short".into()));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*self.key));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CityError::Crypto(format!("decryption failed: {}", e)))
    }
}

impl Default for AesGcmCipher {
    fn default() -> Self {
        Self::new()
    }
}

/// Key cache: one cipher per device, created on first use
#[derive(Default)]
pub struct DeviceCipher {
    keys: HashMap<String, AesGcmCipher>,
}

impl DeviceCipher {
    pub fn new() -> Self {
        Self::default()
    }

    fn cipher_for(&mut self, device_id: &str) -> &AesGcmCipher {
        self.keys.entry(device_id.to_string()).or_default()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn encrypt(&mut self, plaintext: &[u8], device_id: &str, now: DateTime<Utc>) -> CityResult<EncryptedPacket> {
        let cipher = self.cipher_for(device_id);
        let (nonce, ciphertext) = cipher.encrypt(plaintext)?;

        Ok(EncryptedPacket {
            encrypted_data: base64::engine::general_purpose::STANDARD.encode(ciphertext),
            iv: hex::encode(nonce),
            algorithm: ALGORITHM.to_string(),
            key_id: cipher.key_id(),
            timestamp: now,
        })
    }

    /// Only devices that have encrypted before have a key; unknown ids fail
    /// without creating one.
    pub fn decrypt(&self, packet: &EncryptedPacket, device_id: &str) -> CityResult<Vec<u8>> {
        let cipher = self
            .keys
            .get(device_id)
            .ok_or_else(|| CityError::Crypto(format!("no key for device {}", device_id)))?;
        if packet.algorithm != ALGORITHM {
            return Err(CityError::Crypto(format!("unsupported algorithm {}", packet.algorithm)));
        }
        let nonce = hex::decode(&packet.iv).map_err(|e| CityError::Crypto(format!("bad iv: {}", e)))?;
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(&packet.encrypted_data)
            .map_err(|e| CityError::Crypto(format!("bad ciphertext encoding: {}", e)))?;

        cipher.decrypt(&nonce, &ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_encrypt_decrypt() {
        let cipher = AesGcmCipher::new();
        let plaintext = b"{\"deviceId\":\"cctv_cam_1\"}";

        let (nonce, ciphertext) = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&nonce, &ciphertext).unwrap();

        assert_eq!(&decrypted, plaintext);
        assert_eq!(cipher.key_id().len(), 8);
    }

    #[test]
    fn test_keys_are_per_device() {
        let mut devices = DeviceCipher::new();
        let packet = devices.encrypt(b"reading", "waste_bin_1", Utc::now()).unwrap();

        assert_eq!(devices.decrypt(&packet, "waste_bin_1").unwrap(), b"reading");
        assert!(devices.decrypt(&packet, "waste_bin_2").is_err());
        assert_eq!(devices.key_count(), 1);
    }

    #[test]
    fn test_decrypt_for_unknown_device_creates_no_key() {
        let mut devices = DeviceCipher::new();
        let packet = devices.encrypt(b"reading", "parking_sensor_3", Utc::now()).unwrap();

        for n in 0..50 {
            let err = devices.decrypt(&packet, &format!("spoofed_{}", n)).unwrap_err();
            assert!(matches!(err, CityError::Crypto(_)));
        }
        assert_eq!(devices.key_count(), 1);
    }

    #[test]
    fn test_tampered_packet_fails() {
        let mut devices = DeviceCipher::new();
        let mut packet = devices.encrypt(b"reading", "smart_light_1", Utc::now()).unwrap();
        packet.iv = "zz".into();
        assert!(devices.decrypt(&packet, "smart_light_1").is_err());
    }
}
