//! AES-128-CBC payload decryption for RAOP audio frames

use aes::Aes128;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decrypt a RAOP audio payload in place.
///
/// RAOP encrypts only the largest 16-byte-aligned prefix of the payload; any trailing
/// partial block is passed through unencrypted. The IV is always the session IV — RAOP
/// never chains ciphertext state between packets, so every call starts a fresh
/// `Decryptor` from `iv` rather than reusing one across packets.
#[must_use]
pub fn decrypt_audio_payload(key: &[u8; 16], iv: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let block_len = (payload.len() / 16) * 16;
    if block_len == 0 {
        return payload.to_vec();
    }

    let mut cipher = Aes128CbcDec::new(
        GenericArray::from_slice(key),
        GenericArray::from_slice(iv),
    );
    let mut blocks = payload[..block_len].to_vec();
    for chunk in blocks.chunks_exact_mut(16) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(chunk));
    }

    blocks.extend_from_slice(&payload[block_len..]);
    blocks
}
