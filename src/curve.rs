use crate::errors::PreError;
use crate::schemes::{hash_to_point, Blake2bHash};

use std::ops::{Add, Div, Mul, Sub};
use std::{cell::RefCell, fmt, rc::Rc};

use openssl::bn::{BigNum, BigNumContext, BigNumRef};
use openssl::ec::{EcGroup, EcGroupRef, EcPoint, EcPointRef, PointConversionForm};
use openssl::nid::Nid;

/// Curve parameters shared by every scalar, point and key of one protocol
/// instance: the group, its generator `g`, its order, and a secondary
/// generator `u` derived by hashing, used for share commitments.
pub struct Params {
    group: EcGroup,
    g_point: EcPoint,
    order: BigNum,
    u_point: EcPoint,
    field_size: usize,
    order_size: usize,
    ctx: Rc<RefCell<BigNumContext>>,
}

impl Params {
    pub fn new(curve_name: Nid) -> Self {
        let mut ctx = BigNumContext::new().unwrap();
        let group = EcGroup::from_curve_name(curve_name).expect("unknown curve");
        let g_point = group.generator().to_owned(&group).unwrap();
        let mut order = BigNum::new().unwrap();
        group.order(&mut order, &mut ctx).unwrap();
        let field_size = ((group.degree() + 7) / 8) as usize;
        let order_size = order.num_bytes() as usize;
        let g_bytes = g_point
            .to_bytes(&group, PointConversionForm::COMPRESSED, &mut ctx)
            .expect("generator conversion");
        let u_point =
            hash_to_point::<Blake2bHash>(&g_bytes, b"threshold-pre/params/u", &group, &mut ctx);
        Params {
            group,
            g_point,
            order,
            u_point,
            field_size,
            order_size,
            ctx: Rc::new(RefCell::new(ctx)),
        }
    }

    pub fn group(&self) -> &EcGroupRef {
        &self.group
    }

    pub fn g_point(&self) -> &EcPointRef {
        &self.g_point
    }

    pub fn order(&self) -> &BigNumRef {
        &self.order
    }

    pub fn u_point(&self) -> &EcPointRef {
        &self.u_point
    }

    pub fn field_size(&self) -> usize {
        self.field_size
    }

    pub fn order_size(&self) -> usize {
        self.order_size
    }

    pub fn ctx(&self) -> &Rc<RefCell<BigNumContext>> {
        &self.ctx
    }

    pub fn eq(&self, other: &Params) -> bool {
        self.group.curve_name() == other.group.curve_name()
    }
}

/// A scalar in `[1, order - 1]`, tied to its curve parameters.
pub struct CurveBN {
    bn: BigNum,
    params: Rc<Params>,
}

impl CurveBN {
    pub fn from_u32(n: u32, params: &Rc<Params>) -> Self {
        CurveBN {
            bn: BigNum::from_u32(n).expect("BN allocation"),
            params: Rc::clone(params),
        }
    }

    pub fn from_bignum(n: &BigNumRef, params: &Rc<Params>) -> Self {
        CurveBN {
            bn: n.to_owned().expect("BN clone"),
            params: Rc::clone(params),
        }
    }

    /// Fixed-width decoding; rejects out-of-range scalars.
    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        let bn = BigNum::from_slice(bytes).map_err(|_| PreError::InvalidEncoding)?;
        if !Self::in_scalar_range(&bn, params) {
            return Err(PreError::InvalidEncoding);
        }
        Ok(CurveBN {
            bn,
            params: Rc::clone(params),
        })
    }

    pub fn random(params: &Rc<Params>) -> Self {
        let mut rand = BigNum::new().unwrap();
        loop {
            params
                .order()
                .rand_range(&mut rand)
                .expect("scalar sampling");
            if Self::in_scalar_range(&rand, params) {
                break;
            }
        }
        CurveBN {
            bn: rand,
            params: Rc::clone(params),
        }
    }

    /// Left-pads to the group order width so every scalar encodes to the
    /// same number of bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut right = self.bn.to_vec();
        let pad = self
            .params
            .order_size()
            .checked_sub(right.len())
            .expect("scalar wider than group order");
        let mut out = vec![0u8; pad];
        out.append(&mut right);
        out
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        params.order_size()
    }

    fn in_scalar_range(bn: &BigNumRef, params: &Rc<Params>) -> bool {
        let zero = BigNum::new().unwrap();
        bn > &zero && bn < params.order()
    }

    pub fn eq(&self, other: &CurveBN) -> bool {
        self.params.eq(&other.params) && self.bn == other.bn
    }

    pub fn invert(&self) -> Self {
        let mut res = BigNum::new().expect("BN allocation");
        res.mod_inverse(
            &self.bn,
            self.params.order(),
            &mut self.params.ctx().borrow_mut(),
        )
        .expect("modular inverse");
        CurveBN {
            bn: res,
            params: Rc::clone(&self.params),
        }
    }

    pub fn bn(&self) -> &BigNumRef {
        &self.bn
    }

    pub fn params(&self) -> &Rc<Params> {
        &self.params
    }
}

impl Clone for CurveBN {
    fn clone(&self) -> Self {
        CurveBN {
            bn: self.bn.to_owned().expect("BN clone"),
            params: Rc::clone(&self.params),
        }
    }
}

impl fmt::Debug for CurveBN {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CurveBN {{ bn: {:?} }}", self.bn)
    }
}

impl Add for &CurveBN {
    type Output = CurveBN;

    fn add(self, other: &CurveBN) -> CurveBN {
        let mut res = BigNum::new().expect("BN allocation");
        res.mod_add(
            &self.bn,
            &other.bn,
            self.params.order(),
            &mut self.params.ctx().borrow_mut(),
        )
        .expect("modular addition");
        CurveBN {
            bn: res,
            params: Rc::clone(&self.params),
        }
    }
}

impl Sub for &CurveBN {
    type Output = CurveBN;

    fn sub(self, other: &CurveBN) -> CurveBN {
        let mut res = BigNum::new().expect("BN allocation");
        res.mod_sub(
            &self.bn,
            &other.bn,
            self.params.order(),
            &mut self.params.ctx().borrow_mut(),
        )
        .expect("modular subtraction");
        CurveBN {
            bn: res,
            params: Rc::clone(&self.params),
        }
    }
}

impl Mul for &CurveBN {
    type Output = CurveBN;

    fn mul(self, other: &CurveBN) -> CurveBN {
        let mut res = BigNum::new().expect("BN allocation");
        res.mod_mul(
            &self.bn,
            &other.bn,
            self.params.order(),
            &mut self.params.ctx().borrow_mut(),
        )
        .expect("modular multiplication");
        CurveBN {
            bn: res,
            params: Rc::clone(&self.params),
        }
    }
}

impl Div for &CurveBN {
    type Output = CurveBN;

    fn div(self, other: &CurveBN) -> CurveBN {
        let inverse = other.invert();
        self * &inverse
    }
}

/// A point on the curve, tied to its parameters. Serialized in compressed
/// form, so the encoded size is one byte more than a field element.
pub struct CurvePoint {
    point: EcPoint,
    params: Rc<Params>,
}

impl CurvePoint {
    pub fn from_ec_point(p: &EcPointRef, params: &Rc<Params>) -> Self {
        CurvePoint {
            point: p.to_owned(params.group()).expect("point clone"),
            params: Rc::clone(params),
        }
    }

    /// Fixed-width decoding; rejects byte strings that do not name a point
    /// on the curve.
    pub fn from_bytes(bytes: &[u8], params: &Rc<Params>) -> Result<Self, PreError> {
        if bytes.len() != Self::encoded_size(params) {
            return Err(PreError::InvalidEncoding);
        }
        match EcPoint::from_bytes(params.group(), bytes, &mut params.ctx().borrow_mut()) {
            Ok(point) => Ok(CurvePoint {
                point,
                params: Rc::clone(params),
            }),
            Err(_) => Err(PreError::InvalidEncoding),
        }
    }

    pub fn mul_generator(scalar: &CurveBN, params: &Rc<Params>) -> Self {
        let mut res = EcPoint::new(params.group()).expect("point allocation");
        res.mul_generator(params.group(), scalar.bn(), &params.ctx().borrow())
            .expect("generator multiplication");
        CurvePoint {
            point: res,
            params: Rc::clone(params),
        }
    }

    pub fn encoded_size(params: &Rc<Params>) -> usize {
        1 + params.field_size()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.point
            .to_bytes(
                self.params.group(),
                PointConversionForm::COMPRESSED,
                &mut self.params.ctx().borrow_mut(),
            )
            .expect("point serialization")
    }

    pub fn eq(&self, other: &CurvePoint) -> bool {
        self.params.eq(&other.params)
            && self
                .point
                .eq(
                    self.params.group(),
                    &other.point,
                    &mut self.params.ctx().borrow_mut(),
                )
                .expect("point comparison")
    }

    pub fn point(&self) -> &EcPointRef {
        &self.point
    }

    pub fn params(&self) -> &Rc<Params> {
        &self.params
    }
}

impl Clone for CurvePoint {
    fn clone(&self) -> Self {
        CurvePoint {
            point: self
                .point
                .to_owned(self.params.group())
                .expect("point clone"),
            params: Rc::clone(&self.params),
        }
    }
}

impl Add for &CurvePoint {
    type Output = CurvePoint;

    fn add(self, other: &CurvePoint) -> CurvePoint {
        let mut res = EcPoint::new(self.params.group()).expect("point allocation");
        res.add(
            self.params.group(),
            &self.point,
            &other.point,
            &mut self.params.ctx().borrow_mut(),
        )
        .expect("point addition");
        CurvePoint {
            point: res,
            params: Rc::clone(&self.params),
        }
    }
}

impl Mul<&CurveBN> for &CurvePoint {
    type Output = CurvePoint;

    fn mul(self, other: &CurveBN) -> CurvePoint {
        let mut res = EcPoint::new(self.params.group()).expect("point allocation");
        res.mul(
            self.params.group(),
            &self.point,
            other.bn(),
            &self.params.ctx().borrow(),
        )
        .expect("point multiplication");
        CurvePoint {
            point: res,
            params: Rc::clone(&self.params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_standard_params;

    #[test]
    fn scalar_arithmetic() {
        let params = new_standard_params();
        let one = &CurveBN::from_u32(1, &params);
        let two = &CurveBN::from_u32(2, &params);
        let ten = &CurveBN::from_u32(10, &params);

        let three = one + two;
        assert_eq!(three.bn().to_vec(), vec![3u8]);

        let nine = ten - one;
        assert_eq!(nine.bn().to_vec(), vec![9u8]);

        let three_again = &nine / &three;
        assert_eq!(three_again.bn().to_vec(), vec![3u8]);

        let eighteen = &nine * two;
        assert_eq!(eighteen.bn().to_vec(), vec![18u8]);
    }

    #[test]
    fn scalar_and_point_round_trip() {
        let params = new_standard_params();
        let r = CurveBN::random(&params);
        let p = CurvePoint::mul_generator(&r, &params);

        let r_again = CurveBN::from_bytes(&r.to_bytes(), &params).expect("scalar decodes");
        assert!(r.eq(&r_again));

        let p_again = CurvePoint::from_bytes(&p.to_bytes(), &params).expect("point decodes");
        assert!(p.eq(&p_again));
        assert!(CurvePoint::mul_generator(&r_again, &params).eq(&p));
    }

    #[test]
    fn rejects_truncated_and_out_of_range_bytes() {
        let params = new_standard_params();
        let r = CurveBN::random(&params);

        let mut short = r.to_bytes();
        short.pop();
        assert!(CurveBN::from_bytes(&short, &params).is_err());

        let zero = vec![0u8; CurveBN::encoded_size(&params)];
        assert!(CurveBN::from_bytes(&zero, &params).is_err());

        let garbage = vec![0xffu8; CurvePoint::encoded_size(&params)];
        assert!(CurvePoint::from_bytes(&garbage, &params).is_err());
    }
}
