use crate::curve::{CurveBN, CurvePoint, Params};
use crate::errors::PreError;
use crate::schemes::{Hash, Sha256Hash};

use std::rc::Rc;

use openssl::ec::EcKey;
use openssl::ecdsa::EcdsaSig;
use openssl::pkey::Private;

/// An encryption keypair: `public = private * g`. The private scalar never
/// leaves this structure except through `to_bytes`.
pub struct KeyPair {
    pk: CurvePoint,
    sk: CurveBN,
}

impl KeyPair {
    /// Samples a fresh keypair from the curve library's CSPRNG.
    pub fn random(params: &Rc<Params>) -> Self {
        let key = EcKey::generate(params.group()).expect("keypair generation");
        KeyPair {
            pk: CurvePoint::from_ec_point(key.public_key(), params),
            sk: CurveBN::from_bignum(key.private_key(), params),
        }
    }

    /// Rebuilds a keypair from its private scalar.
    pub fn from_private(sk: CurveBN) -> Self {
        let pk = CurvePoint::mul_generator(&sk, sk.params());
        KeyPair { pk, sk }
    }

    pub fn to_bytes(&self) -> (Vec<u8>, Vec<u8>) {
        (self.pk.to_bytes(), self.sk.to_bytes())
    }

    pub fn from_bytes(pk: &[u8], sk: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        let pk = CurvePoint::from_bytes(pk, params)?;
        let sk = CurveBN::from_bytes(sk, params)?;
        Ok(KeyPair { pk, sk })
    }

    pub fn public_key(&self) -> &CurvePoint {
        &self.pk
    }

    pub fn private_key(&self) -> &CurveBN {
        &self.sk
    }
}

/// ECDSA signature over a SHA-256 digest, `r || s` fixed-width encoding.
pub struct Signature {
    r: CurveBN,
    s: CurveBN,
}

impl Signature {
    fn from_ecdsa_sig(sig: &EcdsaSig, params: &Rc<Params>) -> Self {
        Signature {
            r: CurveBN::from_bignum(sig.r(), params),
            s: CurveBN::from_bignum(sig.s(), params),
        }
    }

    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        let half = bytes.len() / 2;
        let r = CurveBN::from_bytes(&bytes[..half], params)?;
        let s = CurveBN::from_bytes(&bytes[half..], params)?;
        Ok(Signature { r, s })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.r.to_bytes();
        out.append(&mut self.s.to_bytes());
        out
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        2 * CurveBN::encoded_size(params)
    }

    pub fn eq(&self, other: &Signature) -> bool {
        self.r.eq(&other.r) && self.s.eq(&other.s)
    }

    /// Verifies over a SHA-256 digest of `data`. Malformed signature
    /// components count as verification failure, not an error.
    pub fn verify(&self, data: &[u8], verifying_pk: &CurvePoint) -> bool {
        let mut hash = Sha256Hash::new(b"");
        hash.update(data);
        let digest = hash.finalize();

        let key = match EcKey::from_public_key(verifying_pk.params().group(), verifying_pk.point())
        {
            Ok(key) => key,
            Err(_) => return false,
        };
        let sig = match EcdsaSig::from_private_components(
            self.r.bn().to_owned().expect("BN clone"),
            self.s.bn().to_owned().expect("BN clone"),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        sig.verify(&digest, &key).unwrap_or(false)
    }
}

impl Clone for Signature {
    fn clone(&self) -> Self {
        Signature {
            r: self.r.clone(),
            s: self.s.clone(),
        }
    }
}

/// A signing keypair, used only to authenticate key fragments. Kept apart
/// from `KeyPair` so an encryption key is never reused for signing.
pub struct Signer {
    key: EcKey<Private>,
    pk: CurvePoint,
    params: Rc<Params>,
}

impl Signer {
    pub fn random(params: &Rc<Params>) -> Self {
        let key = EcKey::generate(params.group()).expect("signer generation");
        let pk = CurvePoint::from_ec_point(key.public_key(), params);
        Signer {
            key,
            pk,
            params: Rc::clone(params),
        }
    }

    pub fn to_bytes(&self) -> (Vec<u8>, Vec<u8>) {
        let sk = CurveBN::from_bignum(self.key.private_key(), &self.params);
        (self.pk.to_bytes(), sk.to_bytes())
    }

    pub fn from_bytes(pk: &[u8], sk: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        let pk = CurvePoint::from_bytes(pk, params)?;
        let sk = CurveBN::from_bytes(sk, params)?;
        let key = EcKey::from_private_components(params.group(), sk.bn(), pk.point())
            .map_err(|_| PreError::InvalidEncoding)?;
        Ok(Signer {
            key,
            pk,
            params: Rc::clone(params),
        })
    }

    pub fn sign(&self, data: &[u8]) -> Signature {
        let mut hash = Sha256Hash::new(b"");
        hash.update(data);
        let digest = hash.finalize();
        Signature::from_ecdsa_sig(
            &EcdsaSig::sign(&digest, &self.key).expect("ECDSA signing"),
            &self.params,
        )
    }

    /// The verifying key distributed alongside the fragments.
    pub fn public_key(&self) -> &CurvePoint {
        &self.pk
    }

    pub fn params(&self) -> &Rc<Params> {
        &self.params
    }
}
