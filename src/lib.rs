//! Threshold proxy re-encryption over a prime-order elliptic-curve group.
//!
//! A data owner encrypts once under their own public key. To delegate
//! decryption, the owner splits a re-encryption key into signed fragments
//! (`KeyFrag`) and hands them to semi-trusted proxies. A proxy transforms
//! the ciphertext's capsule with a verified fragment, producing a
//! `CapsuleFrag` with a correctness proof. The delegatee verifies a
//! threshold number of capsule fragments and combines them with their own
//! private key to recover the plaintext. No proxy ever sees a private key
//! or the plaintext.
//!
//! ```no_run
//! use threshold_pre::*;
//!
//! let params = new_standard_params();
//! let alice = KeyPair::random(&params);
//! let bob = KeyPair::random(&params);
//! let signer = Signer::random(&params);
//!
//! let (capsule, ciphertext) = encrypt(alice.public_key(), b"the report").unwrap();
//!
//! let kfrags = generate_kfrags(&alice, bob.public_key(), &signer, 1, 2).unwrap();
//! let verified = kfrags[0]
//!     .clone()
//!     .verify(signer.public_key(), None, None)
//!     .unwrap();
//! let cfrag = reencrypt(&capsule, &verified).unwrap();
//! let verified_cfrag = cfrag
//!     .verify(
//!         &capsule,
//!         alice.public_key(),
//!         bob.public_key(),
//!         signer.public_key(),
//!     )
//!     .unwrap();
//!
//! let plaintext = decrypt_reencrypted(
//!     bob.private_key(),
//!     alice.public_key(),
//!     &capsule,
//!     &[verified_cfrag],
//!     &ciphertext,
//! )
//! .unwrap();
//! assert_eq!(plaintext, b"the report");
//! ```

mod capsule;
mod curve;
mod errors;
pub mod keeper;
mod keys;
mod kfrag;
mod schemes;
pub mod transport;
mod utils;

pub use crate::capsule::{Capsule, CapsuleFrag, CorrectnessProof, VerifiedCapsuleFrag};
pub use crate::curve::{CurveBN, CurvePoint, Params};
pub use crate::errors::PreError;
pub use crate::keys::{KeyPair, Signature, Signer};
pub use crate::kfrag::{KeyFrag, VerifiedKeyFrag};
pub use crate::schemes::DEM_MIN_SIZE;

use crate::kfrag::signed_payload;
use crate::schemes::{dem_decrypt, dem_encrypt, hash_to_scalar_blake, kdf};
use crate::utils::{lambda_coeff, poly_eval, protocol_label};

use std::rc::Rc;

use openssl::nid::Nid;

/// Standard parameters for this crate: the SECP256K1 curve.
pub fn new_standard_params() -> Rc<Params> {
    Rc::new(Params::new(Nid::SECP256K1))
}

// Derives the non-interactive rekeying factor `d` from the precursor DH
// exchange with the delegatee. Both the split and the delegatee's
// combination evaluate this same transcript.
fn rekey_factor(
    precursor_pk: &CurvePoint,
    receiving_pk: &CurvePoint,
    dh_point: &CurvePoint,
) -> CurveBN {
    let mut transcript = precursor_pk.to_bytes();
    transcript.append(&mut receiving_pk.to_bytes());
    transcript.append(&mut dh_point.to_bytes());
    transcript.append(&mut protocol_label("rekey-factor"));
    hash_to_scalar_blake(&transcript, precursor_pk.params())
}

fn _encapsulate(to_public_key: &CurvePoint) -> Result<(Vec<u8>, Capsule), PreError> {
    let params = to_public_key.params();

    let r = KeyPair::random(params);
    let u = KeyPair::random(params);

    let mut to_hash = r.public_key().to_bytes();
    to_hash.append(&mut u.public_key().to_bytes());
    let h = hash_to_scalar_blake(&to_hash, params);

    let s = u.private_key() + &(r.private_key() * &h);

    let shared = to_public_key * &(r.private_key() + u.private_key());
    let key = kdf(&shared.to_bytes())?;

    Ok((
        key,
        Capsule::new(r.public_key().clone(), u.public_key().clone(), s),
    ))
}

/// Encrypts `plaintext` under `to_public_key`, returning the capsule and
/// the ciphertext it is bound to. Probabilistic: repeated calls with the
/// same inputs never repeat a capsule or ciphertext.
pub fn encrypt(
    to_public_key: &CurvePoint,
    plaintext: &[u8],
) -> Result<(Capsule, Vec<u8>), PreError> {
    let (key, capsule) = _encapsulate(to_public_key)?;
    let ciphertext = dem_encrypt(&key, plaintext, Some(&capsule.to_bytes()))?;
    Ok((capsule, ciphertext))
}

/// Recovers the symmetric key directly with the matching private key.
pub fn decapsulate_original(
    private_key: &CurveBN,
    capsule: &Capsule,
) -> Result<Vec<u8>, PreError> {
    if !capsule.verify() {
        return Err(PreError::KeyMismatch);
    }
    let shared = &(capsule.e() + capsule.v()) * private_key;
    kdf(&shared.to_bytes())
}

/// The owner's decryption path: no delegation, no fragments.
pub fn decrypt_original(
    private_key: &CurveBN,
    capsule: &Capsule,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    if ciphertext.len() < DEM_MIN_SIZE {
        return Err(PreError::InvalidEncoding);
    }
    let key = decapsulate_original(private_key, capsule)?;
    dem_decrypt(&key, ciphertext, Some(&capsule.to_bytes()))
}

/// Splits a re-encryption key from the delegating keypair towards
/// `receiving_pk` into `shares` fragments, any `threshold` of which
/// suffice to re-encrypt. Each fragment is committed and signed with
/// `signer`, and is meaningless for any other delegatee: the rekeying
/// scalar is blinded by a factor derived from a DH exchange with the
/// delegatee's key.
pub fn generate_kfrags(
    delegating: &KeyPair,
    receiving_pk: &CurvePoint,
    signer: &Signer,
    threshold: u32,
    shares: u32,
) -> Result<Vec<KeyFrag>, PreError> {
    if threshold == 0 || threshold > shares {
        return Err(PreError::InvalidThreshold);
    }
    let params = delegating.public_key().params();
    if !params.eq(receiving_pk.params()) || !params.eq(signer.params()) {
        return Err(PreError::ParamsMismatch);
    }

    // Ephemeral DH keypair; its public half travels in every fragment so
    // the delegatee can reproduce the rekeying factor.
    let precursor = KeyPair::random(params);
    let dh_point = receiving_pk * precursor.private_key();
    let d = rekey_factor(precursor.public_key(), receiving_pk, &dh_point);

    // Sharing polynomial: constant term is the rekeying scalar, the
    // remaining coefficients are random.
    let mut coefficients = Vec::with_capacity(threshold as usize);
    coefficients.push(delegating.private_key() / &d);
    for _ in 1..threshold {
        coefficients.push(CurveBN::random(params));
    }

    let u = CurvePoint::from_ec_point(params.u_point(), params);
    let mut kfrags = Vec::with_capacity(shares as usize);
    for i in 1..=shares {
        let id = CurveBN::from_u32(i, params);
        let share = poly_eval(&coefficients, &id);
        let commitment = &u * &share;

        let payload = signed_payload(
            &id,
            threshold,
            &commitment,
            precursor.public_key(),
            delegating.public_key(),
            receiving_pk,
        );
        let signature = signer.sign(&payload);

        kfrags.push(KeyFrag::new(
            id,
            threshold,
            share,
            commitment,
            precursor.public_key().clone(),
            delegating.public_key().clone(),
            receiving_pk.clone(),
            signature,
        ));
    }

    Ok(kfrags)
}

/// The proxy transform: applies a verified fragment's share to the
/// capsule and proves the result correct. Pure in its inputs, safe to
/// run repeatedly and concurrently, and never touches a private key.
pub fn reencrypt(capsule: &Capsule, kfrag: &VerifiedKeyFrag) -> Result<CapsuleFrag, PreError> {
    if !capsule.verify() {
        return Err(PreError::KeyMismatch);
    }
    Ok(CapsuleFrag::prove(capsule, kfrag))
}

fn _decapsulate_reencrypted(
    receiving_sk: &CurveBN,
    delegating_pk: &CurvePoint,
    capsule: &Capsule,
    cfrags: &[VerifiedCapsuleFrag],
) -> Result<Vec<u8>, PreError> {
    let params = capsule.e().params();

    let first = match cfrags.first() {
        Some(first) => first,
        None => return Err(PreError::InsufficientFragments),
    };
    let threshold = first.threshold();
    let precursor = first.precursor();
    for cfrag in &cfrags[1..] {
        if cfrag.threshold() != threshold || !cfrag.precursor().eq(precursor) {
            return Err(PreError::VerificationFailure);
        }
    }

    // Fragments with repeated ids carry no extra information.
    let mut distinct: Vec<&VerifiedCapsuleFrag> = Vec::new();
    for cfrag in cfrags {
        if !distinct.iter().any(|seen| seen.id().eq(cfrag.id())) {
            distinct.push(cfrag);
        }
    }
    if (distinct.len() as u32) < threshold {
        return Err(PreError::InsufficientFragments);
    }

    // Lagrange combination over the fragment ids; the result does not
    // depend on the order the fragments were supplied in.
    let ids: Vec<CurveBN> = distinct.iter().map(|cfrag| cfrag.id().clone()).collect();
    let mut e_prime: Option<CurvePoint> = None;
    let mut v_prime: Option<CurvePoint> = None;
    for (cfrag, id) in distinct.iter().zip(&ids) {
        let lambda = lambda_coeff(id, &ids);
        let e_term = cfrag.e1() * &lambda;
        let v_term = cfrag.v1() * &lambda;
        e_prime = Some(match e_prime {
            Some(acc) => &acc + &e_term,
            None => e_term,
        });
        v_prime = Some(match v_prime {
            Some(acc) => &acc + &v_term,
            None => v_term,
        });
    }
    let e_prime = e_prime.expect("at least one fragment");
    let v_prime = v_prime.expect("at least one fragment");

    let receiving_pk = CurvePoint::mul_generator(receiving_sk, params);
    let dh_point = precursor * receiving_sk;
    let d = rekey_factor(precursor, &receiving_pk, &dh_point);

    let mut to_hash = capsule.e().to_bytes();
    to_hash.append(&mut capsule.v().to_bytes());
    let h = hash_to_scalar_blake(&to_hash, params);

    // The aggregate must re-commit to the original capsule under the
    // delegating key; a wrong key or a non-qualifying fragment subset
    // fails here.
    let lhs = delegating_pk * &(capsule.s() / &d);
    let rhs = &(&e_prime * &h) + &v_prime;
    if !lhs.eq(&rhs) {
        return Err(PreError::DecryptionFailure);
    }

    let shared = &(&e_prime + &v_prime) * &d;
    kdf(&shared.to_bytes())
}

/// The delegatee's decryption path: combines at least `threshold`
/// verified capsule fragments (distinct ids, any order) with the
/// delegatee's private key and the delegator's public key.
pub fn decrypt_reencrypted(
    receiving_sk: &CurveBN,
    delegating_pk: &CurvePoint,
    capsule: &Capsule,
    cfrags: &[VerifiedCapsuleFrag],
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    if ciphertext.len() < DEM_MIN_SIZE {
        return Err(PreError::InvalidEncoding);
    }
    if !capsule.verify() {
        return Err(PreError::KeyMismatch);
    }
    let key = _decapsulate_reencrypted(receiving_sk, delegating_pk, capsule, cfrags)?;
    dem_decrypt(&key, ciphertext, Some(&capsule.to_bytes()))
}
