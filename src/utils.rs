use crate::curve::CurveBN;

use sha2::{Digest, Sha512};

const LABEL_LENGTH: usize = 8;

/// Short fixed-width domain-separation label derived from a name, so the
/// hashed transcripts of different protocol steps can never collide.
pub fn protocol_label(name: &str) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(name);
    hasher.finalize()[..LABEL_LENGTH].to_vec()
}

/// Lagrange basis coefficient for `id_i` at zero, over the selected ids.
pub fn lambda_coeff(id_i: &CurveBN, selected_ids: &[CurveBN]) -> CurveBN {
    let others: Vec<&CurveBN> = selected_ids.iter().filter(|id| !id.eq(id_i)).collect();
    if others.is_empty() {
        return CurveBN::from_u32(1, id_i.params());
    }

    let mut res = others[0] / &(others[0] - id_i);
    for id in &others[1..] {
        res = &(&res * *id) / &(*id - id_i);
    }
    res
}

/// Horner evaluation of the sharing polynomial at `x`.
pub fn poly_eval(coeffs: &[CurveBN], x: &CurveBN) -> CurveBN {
    let mut res = coeffs.last().expect("nonempty coefficients").clone();
    for coeff in coeffs.iter().rev().skip(1) {
        res = &(&res * x) + coeff;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_standard_params;

    #[test]
    fn polynomial_evaluation() {
        let params = new_standard_params();
        // f(x) = 2 + 3x + 4x^2 + 5x^3 + 6x^4, f(2) = 160
        let coeffs: Vec<CurveBN> = (2..7).map(|i| CurveBN::from_u32(i, &params)).collect();
        let x = CurveBN::from_u32(2, &params);
        let res = poly_eval(&coeffs, &x);
        assert!(res.eq(&CurveBN::from_u32(160, &params)));
    }

    #[test]
    fn lagrange_reconstructs_the_constant_term() {
        let params = new_standard_params();
        // f(x) = 7 + 3x, shares at x = 1, 2
        let coeffs = vec![
            CurveBN::from_u32(7, &params),
            CurveBN::from_u32(3, &params),
        ];
        let ids: Vec<CurveBN> = (1..3).map(|i| CurveBN::from_u32(i, &params)).collect();
        let shares: Vec<CurveBN> = ids.iter().map(|id| poly_eval(&coeffs, id)).collect();

        let mut acc: Option<CurveBN> = None;
        for (id, share) in ids.iter().zip(&shares) {
            let term = &lambda_coeff(id, &ids) * share;
            acc = Some(match acc {
                Some(sum) => &sum + &term,
                None => term,
            });
        }
        assert!(acc.unwrap().eq(&CurveBN::from_u32(7, &params)));
    }

    #[test]
    fn labels_are_distinct() {
        assert_ne!(protocol_label("one"), protocol_label("two"));
        assert_eq!(protocol_label("one").len(), 8);
    }
}
