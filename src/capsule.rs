use crate::curve::{CurveBN, CurvePoint, Params};
use crate::errors::PreError;
use crate::keys::Signature;
use crate::kfrag::{signed_payload, VerifiedKeyFrag};
use crate::schemes::{hash_to_scalar, hash_to_scalar_blake, ExtendedKeccak};

use std::rc::Rc;

/// The key-encapsulation artifact produced next to every ciphertext:
/// `E = g*r`, `V = g*u`, `s = u + r * H(E, V)`. Public, immutable, and
/// self-checking: any mutation breaks `verify`.
pub struct Capsule {
    e_point: CurvePoint,
    v_point: CurvePoint,
    s: CurveBN,
}

impl Capsule {
    pub(crate) fn new(e: CurvePoint, v: CurvePoint, s: CurveBN) -> Self {
        Capsule {
            e_point: e,
            v_point: v,
            s,
        }
    }

    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        let point_size = CurvePoint::encoded_size(params);
        let e_point = CurvePoint::from_bytes(&bytes[..point_size], params)?;
        let v_point = CurvePoint::from_bytes(&bytes[point_size..2 * point_size], params)?;
        let s = CurveBN::from_bytes(&bytes[2 * point_size..], params)?;
        Ok(Capsule { e_point, v_point, s })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.e_point.to_bytes();
        bytes.append(&mut self.v_point.to_bytes());
        bytes.append(&mut self.s.to_bytes());
        bytes
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        2 * CurvePoint::encoded_size(params) + CurveBN::encoded_size(params)
    }

    pub fn eq(&self, other: &Capsule) -> bool {
        self.e_point.eq(&other.e_point) && self.v_point.eq(&other.v_point) && self.s.eq(&other.s)
    }

    /// The public consistency relation `g*s == V + E * H(E, V)`.
    pub fn verify(&self) -> bool {
        let params = self.e_point.params();
        let mut to_hash = self.e_point.to_bytes();
        to_hash.append(&mut self.v_point.to_bytes());
        let h = hash_to_scalar_blake(&to_hash, params);

        let lhs = CurvePoint::mul_generator(&self.s, params);
        let rhs = &self.v_point + &(&self.e_point * &h);
        lhs.eq(&rhs)
    }

    pub fn e(&self) -> &CurvePoint {
        &self.e_point
    }

    pub fn v(&self) -> &CurvePoint {
        &self.v_point
    }

    pub fn s(&self) -> &CurveBN {
        &self.s
    }
}

impl Clone for Capsule {
    fn clone(&self) -> Self {
        Capsule {
            e_point: self.e_point.clone(),
            v_point: self.v_point.clone(),
            s: self.s.clone(),
        }
    }
}

/// Non-interactive proof that a capsule fragment was produced from one
/// specific capsule with one specific key fragment's share.
pub struct CorrectnessProof {
    e2: CurvePoint,
    v2: CurvePoint,
    u1: CurvePoint,
    u2: CurvePoint,
    z3: CurveBN,
    kfrag_signature: Signature,
}

impl CorrectnessProof {
    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        let bn_size = CurveBN::encoded_size(params);
        let point_size = CurvePoint::encoded_size(params);

        let mut offset = 0;
        let mut take = |len: usize| {
            let piece = &bytes[offset..offset + len];
            offset += len;
            piece
        };

        let e2 = CurvePoint::from_bytes(take(point_size), params)?;
        let v2 = CurvePoint::from_bytes(take(point_size), params)?;
        let u1 = CurvePoint::from_bytes(take(point_size), params)?;
        let u2 = CurvePoint::from_bytes(take(point_size), params)?;
        let z3 = CurveBN::from_bytes(take(bn_size), params)?;
        let kfrag_signature =
            Signature::from_bytes(take(Signature::encoded_size(params)), params)?;

        Ok(CorrectnessProof {
            e2,
            v2,
            u1,
            u2,
            z3,
            kfrag_signature,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.e2.to_bytes();
        bytes.append(&mut self.v2.to_bytes());
        bytes.append(&mut self.u1.to_bytes());
        bytes.append(&mut self.u2.to_bytes());
        bytes.append(&mut self.z3.to_bytes());
        bytes.append(&mut self.kfrag_signature.to_bytes());
        bytes
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        let bn_size = CurveBN::encoded_size(params);
        let point_size = CurvePoint::encoded_size(params);

        // four points, z3, and a two-scalar signature
        point_size * 4 + bn_size * 3
    }

    pub fn eq(&self, other: &CorrectnessProof) -> bool {
        self.e2.eq(&other.e2)
            && self.v2.eq(&other.v2)
            && self.u1.eq(&other.u1)
            && self.u2.eq(&other.u2)
            && self.z3.eq(&other.z3)
            && self.kfrag_signature.eq(&other.kfrag_signature)
    }
}

impl Clone for CorrectnessProof {
    fn clone(&self) -> Self {
        CorrectnessProof {
            e2: self.e2.clone(),
            v2: self.v2.clone(),
            u1: self.u1.clone(),
            u2: self.u2.clone(),
            z3: self.z3.clone(),
            kfrag_signature: self.kfrag_signature.clone(),
        }
    }
}

// Challenge scalar of the proof: extended Keccak over every point the
// relations range over, in a fixed order.
fn challenge_scalar(
    capsule: &Capsule,
    e1: &CurvePoint,
    v1: &CurvePoint,
    e2: &CurvePoint,
    v2: &CurvePoint,
    u: &CurvePoint,
    u1: &CurvePoint,
    u2: &CurvePoint,
) -> CurveBN {
    let params = capsule.e().params();
    let mut to_hash = capsule.e().to_bytes();
    to_hash.append(&mut e1.to_bytes());
    to_hash.append(&mut e2.to_bytes());
    to_hash.append(&mut capsule.v().to_bytes());
    to_hash.append(&mut v1.to_bytes());
    to_hash.append(&mut v2.to_bytes());
    to_hash.append(&mut u.to_bytes());
    to_hash.append(&mut u1.to_bytes());
    to_hash.append(&mut u2.to_bytes());
    hash_to_scalar::<ExtendedKeccak>(&to_hash, params, None)
}

/// A proxy's transform of a capsule under one key fragment:
/// `e1 = share * E`, `v1 = share * V`, plus the correctness proof.
pub struct CapsuleFrag {
    e1: CurvePoint,
    v1: CurvePoint,
    id: CurveBN,
    threshold: u32,
    precursor: CurvePoint,
    proof: CorrectnessProof,
}

impl CapsuleFrag {
    /// Applies the fragment's share to the capsule points and proves the
    /// transform correct. Pure in its inputs; safe to repeat.
    pub(crate) fn prove(capsule: &Capsule, kfrag: &VerifiedKeyFrag) -> Self {
        let params = capsule.e().params();
        let inner = kfrag.inner();
        let rk = inner.share();

        let e1 = capsule.e() * rk;
        let v1 = capsule.v() * rk;

        let t = CurveBN::random(params);
        let e2 = capsule.e() * &t;
        let v2 = capsule.v() * &t;
        let u = CurvePoint::from_ec_point(params.u_point(), params);
        let u2 = &u * &t;
        let u1 = inner.commitment().clone();

        let h = challenge_scalar(capsule, &e1, &v1, &e2, &v2, &u, &u1, &u2);
        let z3 = &t + &(&h * rk);

        CapsuleFrag {
            e1,
            v1,
            id: inner.id().clone(),
            threshold: inner.threshold(),
            precursor: inner.precursor().clone(),
            proof: CorrectnessProof {
                e2,
                v2,
                u1,
                u2,
                z3,
                kfrag_signature: inner.signature().clone(),
            },
        }
    }

    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        let bn_size = CurveBN::encoded_size(params);
        let point_size = CurvePoint::encoded_size(params);

        let mut offset = 0;
        let mut take = |len: usize| {
            let piece = &bytes[offset..offset + len];
            offset += len;
            piece
        };

        let e1 = CurvePoint::from_bytes(take(point_size), params)?;
        let v1 = CurvePoint::from_bytes(take(point_size), params)?;
        let id = CurveBN::from_bytes(take(bn_size), params)?;
        let mut threshold_bytes = [0u8; 4];
        threshold_bytes.copy_from_slice(take(4));
        let threshold = u32::from_be_bytes(threshold_bytes);
        let precursor = CurvePoint::from_bytes(take(point_size), params)?;
        let proof =
            CorrectnessProof::from_bytes(take(CorrectnessProof::encoded_size(params)), params)?;

        if threshold == 0 {
            return Err(PreError::InvalidEncoding);
        }

        Ok(CapsuleFrag {
            e1,
            v1,
            id,
            threshold,
            precursor,
            proof,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.e1.to_bytes();
        bytes.append(&mut self.v1.to_bytes());
        bytes.append(&mut self.id.to_bytes());
        bytes.extend_from_slice(&self.threshold.to_be_bytes());
        bytes.append(&mut self.precursor.to_bytes());
        bytes.append(&mut self.proof.to_bytes());
        bytes
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        let bn_size = CurveBN::encoded_size(params);
        let point_size = CurvePoint::encoded_size(params);

        point_size * 3 + bn_size + 4 + CorrectnessProof::encoded_size(params)
    }

    pub fn eq(&self, other: &CapsuleFrag) -> bool {
        self.e1.eq(&other.e1)
            && self.v1.eq(&other.v1)
            && self.id.eq(&other.id)
            && self.threshold == other.threshold
            && self.precursor.eq(&other.precursor)
            && self.proof.eq(&other.proof)
    }

    /// Checks the proof against the exact capsule this fragment claims to
    /// transform and the signature chain rooted in the delegator's signing
    /// key. Only the returned verified type may enter combination.
    pub fn verify(
        self,
        capsule: &Capsule,
        delegating_pk: &CurvePoint,
        receiving_pk: &CurvePoint,
        verifying_pk: &CurvePoint,
    ) -> Result<VerifiedCapsuleFrag, PreError> {
        if !capsule.verify() {
            return Err(PreError::KeyMismatch);
        }
        let params = capsule.e().params();

        let u = CurvePoint::from_ec_point(params.u_point(), params);
        let proof = &self.proof;
        let h = challenge_scalar(
            capsule, &self.e1, &self.v1, &proof.e2, &proof.v2, &u, &proof.u1, &proof.u2,
        );

        let payload = signed_payload(
            &self.id,
            self.threshold,
            &proof.u1,
            &self.precursor,
            delegating_pk,
            receiving_pk,
        );
        if !proof.kfrag_signature.verify(&payload, verifying_pk) {
            return Err(PreError::VerificationFailure);
        }

        // z3 * E == e2 + h * e1
        let lhs = capsule.e() * &proof.z3;
        let rhs = &proof.e2 + &(&self.e1 * &h);
        if !lhs.eq(&rhs) {
            return Err(PreError::VerificationFailure);
        }

        // z3 * V == v2 + h * v1
        let lhs = capsule.v() * &proof.z3;
        let rhs = &proof.v2 + &(&self.v1 * &h);
        if !lhs.eq(&rhs) {
            return Err(PreError::VerificationFailure);
        }

        // z3 * U == u2 + h * u1
        let lhs = &u * &proof.z3;
        let rhs = &proof.u2 + &(&proof.u1 * &h);
        if !lhs.eq(&rhs) {
            return Err(PreError::VerificationFailure);
        }

        Ok(VerifiedCapsuleFrag(self))
    }

    pub fn id(&self) -> &CurveBN {
        &self.id
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn precursor(&self) -> &CurvePoint {
        &self.precursor
    }
}

impl Clone for CapsuleFrag {
    fn clone(&self) -> Self {
        CapsuleFrag {
            e1: self.e1.clone(),
            v1: self.v1.clone(),
            id: self.id.clone(),
            threshold: self.threshold,
            precursor: self.precursor.clone(),
            proof: self.proof.clone(),
        }
    }
}

/// A capsule fragment that passed `CapsuleFrag::verify`. Combination
/// accepts only this type.
pub struct VerifiedCapsuleFrag(CapsuleFrag);

impl VerifiedCapsuleFrag {
    /// Restores a fragment that was verified before serialization. The
    /// caller vouches for the bytes; no checks are repeated beyond
    /// decoding.
    pub fn from_verified_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        CapsuleFrag::from_bytes(bytes, params).map(VerifiedCapsuleFrag)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn id(&self) -> &CurveBN {
        self.0.id()
    }

    pub fn threshold(&self) -> u32 {
        self.0.threshold()
    }

    pub fn precursor(&self) -> &CurvePoint {
        self.0.precursor()
    }

    pub(crate) fn e1(&self) -> &CurvePoint {
        &self.0.e1
    }

    pub(crate) fn v1(&self) -> &CurvePoint {
        &self.0.v1
    }
}

impl Clone for VerifiedCapsuleFrag {
    fn clone(&self) -> Self {
        VerifiedCapsuleFrag(self.0.clone())
    }
}
