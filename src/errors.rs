use quick_error::quick_error;

quick_error! {
  #[derive(Debug, PartialEq)]
  pub enum PreError {
      InvalidEncoding {
        display("Malformed bytes for a scalar, point or composite artifact")
      }
      KeyMismatch {
        display("Capsule consistency check failed")
      }
      VerificationFailure {
        display("Fragment signature, commitment or proof check failed")
      }
      InsufficientFragments {
        display("Fewer verified fragments than the split threshold")
      }
      DecryptionFailure {
        display("Authenticated decryption failed")
      }
      EncryptionFailure {
        display("Authenticated encryption failed")
      }
      DerivationFailure {
        display("Symmetric key derivation failed")
      }
      InvalidThreshold {
        display("Threshold must satisfy 1 <= threshold <= shares")
      }
      ParamsMismatch {
        display("Key material belongs to different curve parameters")
      }
  }
}
