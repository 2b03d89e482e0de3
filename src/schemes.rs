use crate::curve::{CurveBN, Params};
use crate::errors::PreError;

use std::rc::Rc;

use aead::{Aead, KeyInit, Payload};
use blake2::{Blake2b, Digest};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroupRef, EcPoint};
use sha2::Sha256;
use sha3::Keccak256;

pub const DEM_KEY_SIZE: usize = 32;
const DEM_NONCE_SIZE: usize = 12;
pub const DEM_MIN_SIZE: usize = DEM_NONCE_SIZE + 16 + 1;

const CUSTOMIZATION_LENGTH: usize = 64;

/// Domain-separated hashing. Every implementor absorbs a customization
/// string, zero-padded to a fixed width, before any message data.
pub trait Hash {
    fn new(customization: &[u8]) -> Self;
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

fn pad_customization(customization: &[u8]) -> Vec<u8> {
    assert!(
        customization.len() <= CUSTOMIZATION_LENGTH,
        "customization string is larger than {} bytes",
        CUSTOMIZATION_LENGTH
    );
    let mut padded = customization.to_vec();
    padded.resize(CUSTOMIZATION_LENGTH, 0);
    padded
}

pub struct Blake2bHash {
    digest: Blake2b,
}

impl Hash for Blake2bHash {
    fn new(customization: &[u8]) -> Self {
        let mut digest = Blake2b::new();
        digest.update(pad_customization(customization));
        Self { digest }
    }

    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.digest.finalize().to_vec()
    }
}

pub struct Sha256Hash {
    digest: Sha256,
}

impl Hash for Sha256Hash {
    fn new(customization: &[u8]) -> Self {
        let mut digest = Sha256::new();
        digest.update(pad_customization(customization));
        Self { digest }
    }

    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.digest.finalize().to_vec()
    }
}

/// Two Keccak-256 instances with distinct prefixes, concatenated to a
/// 64-byte output wide enough for unbiased reduction mod the group order.
pub struct ExtendedKeccak {
    upper: Keccak256,
    lower: Keccak256,
}

impl Hash for ExtendedKeccak {
    fn new(customization: &[u8]) -> Self {
        let padded = pad_customization(customization);
        let mut upper = Keccak256::new();
        upper.update(b"\x00");
        upper.update(&padded);
        let mut lower = Keccak256::new();
        lower.update(b"\x01");
        lower.update(&padded);
        Self { upper, lower }
    }

    fn update(&mut self, data: &[u8]) {
        self.upper.update(data);
        self.lower.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        let mut out = self.upper.finalize().to_vec();
        out.append(&mut self.lower.finalize().to_vec());
        out
    }
}

/// Maps arbitrary bytes to a scalar in `[1, order - 1]` by reducing the
/// digest mod `order - 1` and adding one.
pub fn hash_to_scalar<H>(data: &[u8], params: &Rc<Params>, label: Option<&[u8]>) -> CurveBN
where
    H: Hash,
{
    let mut customization = b"hash-to-scalar".to_vec();
    if let Some(label) = label {
        customization.extend_from_slice(label);
    }
    let mut hash = H::new(&customization);
    hash.update(data);

    let digest_bn = BigNum::from_slice(&hash.finalize()).expect("BN allocation");

    let one = BigNum::from_u32(1).expect("BN allocation");
    let mut order_minus_one = BigNum::new().expect("BN allocation");
    order_minus_one
        .checked_sub(params.order(), &one)
        .expect("BN subtraction");

    let mut reduced = BigNum::new().expect("BN allocation");
    reduced
        .checked_rem(&digest_bn, &order_minus_one, &mut params.ctx().borrow_mut())
        .expect("BN reduction");

    let mut scalar = BigNum::new().expect("BN allocation");
    scalar.checked_add(&reduced, &one).expect("BN addition");

    CurveBN::from_bignum(&scalar, params)
}

pub fn hash_to_scalar_blake(data: &[u8], params: &Rc<Params>) -> CurveBN {
    hash_to_scalar::<Blake2bHash>(data, params, None)
}

/// HKDF-BLAKE2b from shared-point bytes to the fixed-size DEM key.
pub fn kdf(base_key: &[u8]) -> Result<Vec<u8>, PreError> {
    let salt = vec![0u8; DEM_KEY_SIZE / 8];
    let mut okm = vec![0u8; DEM_KEY_SIZE];
    Hkdf::<Blake2b>::new(Some(&salt), base_key)
        .expand(&[], &mut okm)
        .map_err(|_| PreError::DerivationFailure)?;
    Ok(okm)
}

/// AEAD encryption, `nonce || ciphertext || tag` layout. The associated
/// data binds the output to its capsule.
pub fn dem_encrypt(key: &[u8], plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>, PreError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; DEM_NONCE_SIZE];
    getrandom::getrandom(&mut nonce_bytes).expect("nonce sampling");
    let nonce = Nonce::from_slice(&nonce_bytes);

    let payload = Payload {
        msg: plaintext,
        aad: aad.unwrap_or(b""),
    };
    let mut sealed = cipher
        .encrypt(nonce, payload)
        .map_err(|_| PreError::EncryptionFailure)?;

    let mut out = nonce.to_vec();
    out.append(&mut sealed);
    Ok(out)
}

pub fn dem_decrypt(key: &[u8], ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>, PreError> {
    if ciphertext.len() < DEM_MIN_SIZE {
        return Err(PreError::InvalidEncoding);
    }
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(&ciphertext[..DEM_NONCE_SIZE]);
    let payload = Payload {
        msg: &ciphertext[DEM_NONCE_SIZE..],
        aad: aad.unwrap_or(b""),
    };
    cipher
        .decrypt(nonce, payload)
        .map_err(|_| PreError::DecryptionFailure)
}

/// Derives a curve point from a label by hashing with an incrementing
/// counter until the digest names a valid compressed point. Only used at
/// parameter-construction time for the secondary generator.
pub fn hash_to_point<H>(
    data: &[u8],
    label: &[u8],
    group: &EcGroupRef,
    ctx: &mut BigNumContext,
) -> EcPoint
where
    H: Hash,
{
    let mut to_hash = (label.len() as u64).to_be_bytes().to_vec();
    to_hash.extend_from_slice(label);
    to_hash.extend_from_slice(&(data.len() as u64).to_be_bytes());
    to_hash.extend_from_slice(data);

    let field_size = ((group.degree() + 7) / 8) as usize;

    for counter in 0..u32::MAX {
        let mut hash = H::new(b"");
        hash.update(&to_hash);
        hash.update(&counter.to_be_bytes());
        let digest = hash.finalize();

        let sign_byte = if digest[0] & 1 == 0 { 0x02 } else { 0x03 };
        let mut candidate = vec![sign_byte];
        candidate.extend_from_slice(&digest[1..=field_size]);

        if let Ok(point) = EcPoint::from_bytes(group, &candidate, ctx) {
            return point;
        }
    }

    unreachable!("no curve point found for label");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_standard_params;

    #[test]
    fn scalar_hashing_is_deterministic_and_labeled() {
        let params = new_standard_params();
        let a = hash_to_scalar_blake(b"some input", &params);
        let b = hash_to_scalar_blake(b"some input", &params);
        assert!(a.eq(&b));

        let c = hash_to_scalar::<Blake2bHash>(b"some input", &params, Some(b"other"));
        assert!(!a.eq(&c));
    }

    #[test]
    fn dem_round_trip_with_aad() {
        let key = kdf(b"shared point bytes").expect("kdf");
        let sealed = dem_encrypt(&key, b"a short message", Some(b"binding")).expect("encrypt");
        let opened = dem_decrypt(&key, &sealed, Some(b"binding")).expect("decrypt");
        assert_eq!(opened, b"a short message");
    }

    #[test]
    fn dem_rejects_wrong_aad_and_tampering() {
        let key = kdf(b"shared point bytes").expect("kdf");
        let sealed = dem_encrypt(&key, b"a short message", Some(b"binding")).expect("encrypt");

        assert_eq!(
            dem_decrypt(&key, &sealed, Some(b"different")),
            Err(PreError::DecryptionFailure)
        );

        let mut tampered = sealed.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert_eq!(
            dem_decrypt(&key, &tampered, Some(b"binding")),
            Err(PreError::DecryptionFailure)
        );

        assert_eq!(
            dem_decrypt(&key, &sealed[..DEM_MIN_SIZE - 1], Some(b"binding")),
            Err(PreError::InvalidEncoding)
        );
    }
}
