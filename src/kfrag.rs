use crate::curve::{CurveBN, CurvePoint, Params};
use crate::errors::PreError;
use crate::keys::Signature;

use std::rc::Rc;

/// The byte string covered by a fragment's signature. Binding the share
/// index, the split threshold, the commitment, the precursor and both
/// delegation endpoints means none of them can be swapped undetected.
pub(crate) fn signed_payload(
    id: &CurveBN,
    threshold: u32,
    commitment: &CurvePoint,
    precursor: &CurvePoint,
    delegating_pk: &CurvePoint,
    receiving_pk: &CurvePoint,
) -> Vec<u8> {
    let mut payload = id.to_bytes();
    payload.extend_from_slice(&threshold.to_be_bytes());
    payload.append(&mut commitment.to_bytes());
    payload.append(&mut precursor.to_bytes());
    payload.append(&mut delegating_pk.to_bytes());
    payload.append(&mut receiving_pk.to_bytes());
    payload
}

/// One share of a threshold-split re-encryption key, as produced by
/// `generate_kfrags` and moved between parties. Holds everything a
/// verifier needs besides the signer's verifying key; the share scalar
/// itself never enters any hash or signature.
pub struct KeyFrag {
    id: CurveBN,
    threshold: u32,
    share: CurveBN,
    commitment: CurvePoint,
    precursor: CurvePoint,
    delegating_pk: CurvePoint,
    receiving_pk: CurvePoint,
    signature: Signature,
}

impl KeyFrag {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: CurveBN,
        threshold: u32,
        share: CurveBN,
        commitment: CurvePoint,
        precursor: CurvePoint,
        delegating_pk: CurvePoint,
        receiving_pk: CurvePoint,
        signature: Signature,
    ) -> Self {
        KeyFrag {
            id,
            threshold,
            share,
            commitment,
            precursor,
            delegating_pk,
            receiving_pk,
            signature,
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

        let id = CurveBN::from_bytes(take(bn_size), params)?;
        let mut threshold_bytes = [0u8; 4];
        threshold_bytes.copy_from_slice(take(4));
        let threshold = u32::from_be_bytes(threshold_bytes);
        let share = CurveBN::from_bytes(take(bn_size), params)?;
        let commitment = CurvePoint::from_bytes(take(point_size), params)?;
        let precursor = CurvePoint::from_bytes(take(point_size), params)?;
        let delegating_pk = CurvePoint::from_bytes(take(point_size), params)?;
        let receiving_pk = CurvePoint::from_bytes(take(point_size), params)?;
        let signature = Signature::from_bytes(take(Signature::encoded_size(params)), params)?;

        if threshold == 0 {
            return Err(PreError::InvalidEncoding);
        }

        Ok(KeyFrag {
            id,
            threshold,
            share,
            commitment,
            precursor,
            delegating_pk,
            receiving_pk,
            signature,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.id.to_bytes();
        bytes.extend_from_slice(&self.threshold.to_be_bytes());
        bytes.append(&mut self.share.to_bytes());
        bytes.append(&mut self.commitment.to_bytes());
        bytes.append(&mut self.precursor.to_bytes());
        bytes.append(&mut self.delegating_pk.to_bytes());
        bytes.append(&mut self.receiving_pk.to_bytes());
        bytes.append(&mut self.signature.to_bytes());
        bytes
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        let bn_size = CurveBN::encoded_size(params);
        let point_size = CurvePoint::encoded_size(params);

        // id + share + signature (2 scalars), 4 points, 4-byte threshold
        bn_size * 4 + point_size * 4 + 4
    }

    pub fn eq(&self, other: &KeyFrag) -> bool {
        self.id.eq(&other.id)
            && self.threshold == other.threshold
            && self.share.eq(&other.share)
            && self.commitment.eq(&other.commitment)
            && self.precursor.eq(&other.precursor)
            && self.delegating_pk.eq(&other.delegating_pk)
            && self.receiving_pk.eq(&other.receiving_pk)
            && self.signature.eq(&other.signature)
    }

    /// Checks the commitment against the carried share and the signature
    /// over the fragment's public material. When the caller knows which
    /// delegation the fragment should serve, passing the expected keys
    /// rejects fragments issued for any other pair.
    pub fn verify(
        self,
        verifying_pk: &CurvePoint,
        expected_delegating: Option<&CurvePoint>,
        expected_receiving: Option<&CurvePoint>,
    ) -> Result<VerifiedKeyFrag, PreError> {
        let params = self.commitment.params();
        if !verifying_pk.params().eq(params) {
            return Err(PreError::ParamsMismatch);
        }

        if let Some(expected) = expected_delegating {
            if !expected.eq(&self.delegating_pk) {
                return Err(PreError::VerificationFailure);
            }
        }
        if let Some(expected) = expected_receiving {
            if !expected.eq(&self.receiving_pk) {
                return Err(PreError::VerificationFailure);
            }
        }

        let u = CurvePoint::from_ec_point(params.u_point(), params);
        if !(&u * &self.share).eq(&self.commitment) {
            return Err(PreError::VerificationFailure);
        }

        let payload = signed_payload(
            &self.id,
            self.threshold,
            &self.commitment,
            &self.precursor,
            &self.delegating_pk,
            &self.receiving_pk,
        );
        if !self.signature.verify(&payload, verifying_pk) {
            return Err(PreError::VerificationFailure);
        }

        Ok(VerifiedKeyFrag(self))
    }

    pub fn id(&self) -> &CurveBN {
        &self.id
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn commitment(&self) -> &CurvePoint {
        &self.commitment
    }

    pub fn precursor(&self) -> &CurvePoint {
        &self.precursor
    }

    pub fn delegating_key(&self) -> &CurvePoint {
        &self.delegating_pk
    }

    pub fn receiving_key(&self) -> &CurvePoint {
        &self.receiving_pk
    }

    pub(crate) fn share(&self) -> &CurveBN {
        &self.share
    }

    pub(crate) fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl Clone for KeyFrag {
    fn clone(&self) -> Self {
        KeyFrag {
            id: self.id.clone(),
            threshold: self.threshold,
            share: self.share.clone(),
            commitment: self.commitment.clone(),
            precursor: self.precursor.clone(),
            delegating_pk: self.delegating_pk.clone(),
            receiving_pk: self.receiving_pk.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// A fragment that passed `KeyFrag::verify`. Only this type is accepted
/// by the proxy transform, so an unchecked fragment cannot reach it.
pub struct VerifiedKeyFrag(KeyFrag);

impl VerifiedKeyFrag {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn id(&self) -> &CurveBN {
        self.0.id()
    }

    pub fn threshold(&self) -> u32 {
        self.0.threshold()
    }

    pub(crate) fn inner(&self) -> &KeyFrag {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyPair, Signer};
    use crate::{generate_kfrags, new_standard_params};

    #[test]
    fn fragment_round_trip_and_verify() {
        let params = new_standard_params();
        let alice = KeyPair::random(&params);
        let bob = KeyPair::random(&params);
        let signer = Signer::random(&params);

        let kfrags =
            generate_kfrags(&alice, bob.public_key(), &signer, 2, 3).expect("split succeeds");
        assert_eq!(kfrags.len(), 3);

        let bytes = kfrags[0].to_bytes();
        let decoded = KeyFrag::from_bytes(&bytes, &params).expect("fragment decodes");
        assert!(decoded.eq(&kfrags[0]));

        decoded
            .verify(
                signer.public_key(),
                Some(alice.public_key()),
                Some(bob.public_key()),
            )
            .expect("fragment verifies");
    }

    #[test]
    fn tampered_fragment_is_rejected() {
        let params = new_standard_params();
        let alice = KeyPair::random(&params);
        let bob = KeyPair::random(&params);
        let signer = Signer::random(&params);

        let kfrags =
            generate_kfrags(&alice, bob.public_key(), &signer, 1, 2).expect("split succeeds");

        // Flip a byte inside the share region; the commitment no longer matches.
        let mut bytes = kfrags[0].to_bytes();
        let share_offset = CurveBN::encoded_size(&params) + 4;
        bytes[share_offset + 5] ^= 0x01;
        match KeyFrag::from_bytes(&bytes, &params) {
            Ok(forged) => {
                let res = forged.verify(signer.public_key(), None, None);
                assert!(matches!(res, Err(PreError::VerificationFailure)));
            }
            // Point/scalar decoding may already refuse the mutation.
            Err(err) => assert_eq!(err, PreError::InvalidEncoding),
        }
    }

    #[test]
    fn fragment_bound_to_its_delegatee() {
        let params = new_standard_params();
        let alice = KeyPair::random(&params);
        let bob = KeyPair::random(&params);
        let carol = KeyPair::random(&params);
        let signer = Signer::random(&params);

        let kfrags =
            generate_kfrags(&alice, bob.public_key(), &signer, 1, 2).expect("split succeeds");
        let res = kfrags[0].clone().verify(
            signer.public_key(),
            Some(alice.public_key()),
            Some(carol.public_key()),
        );
        assert!(matches!(res, Err(PreError::VerificationFailure)));
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let params = new_standard_params();
        let alice = KeyPair::random(&params);
        let bob = KeyPair::random(&params);
        let signer = Signer::random(&params);
        let other_signer = Signer::random(&params);

        let kfrags =
            generate_kfrags(&alice, bob.public_key(), &signer, 1, 2).expect("split succeeds");
        let res = kfrags[0].clone().verify(other_signer.public_key(), None, None);
        assert!(matches!(res, Err(PreError::VerificationFailure)));
    }
}
