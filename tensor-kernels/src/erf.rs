//! Approximations of the Gauss error function.
//!
//! [`erf`] is the five term Abramowitz and Stegun formula 7.1.26 (absolute error below 1.5e-7).
//! [`erf2`] is the fdlibm rational approximation, accurate to double precision rounding.

/// Float types with error function kernels.
pub trait ErfFloat: Copy {
    fn erf(self) -> Self;
    fn erf2(self) -> Self;
}

/// Abramowitz and Stegun 7.1.26.
pub fn erf<T: ErfFloat>(x: T) -> T {
    x.erf()
}

/// fdlibm `erf`.
pub fn erf2<T: ErfFloat>(x: T) -> T {
    x.erf2()
}

impl ErfFloat for f32 {
    fn erf(self) -> f32 {
        const A1: f32 = 0.254_829_6;
        const A2: f32 = -0.284_496_74;
        const A3: f32 = 1.421_413_8;
        const A4: f32 = -1.453_152;
        const A5: f32 = 1.061_405_4;
        const P: f32 = 0.327_591_1;

        if self.is_nan() {
            return f32::NAN;
        }
        if self.is_infinite() {
            return self.signum();
        }

        let sign = if self < 0.0 { -1.0 } else { 1.0 };
        let x = self.abs();

        let t = 1.0 / (1.0 + P * x);
        let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

        sign * y
    }

    fn erf2(self) -> f32 {
        (self as f64).erf2() as f32
    }
}

impl ErfFloat for f64 {
    fn erf(self) -> f64 {
        const A1: f64 = 0.254829592;
        const A2: f64 = -0.284496736;
        const A3: f64 = 1.421413741;
        const A4: f64 = -1.453152027;
        const A5: f64 = 1.061405429;
        const P: f64 = 0.3275911;

        if self.is_nan() {
            return f64::NAN;
        }
        if self.is_infinite() {
            return self.signum();
        }

        let sign = if self < 0.0 { -1.0 } else { 1.0 };
        let x = self.abs();

        let t = 1.0 / (1.0 + P * x);
        let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

        sign * y
    }

    fn erf2(self) -> f64 {
        fdlibm_erf(self)
    }
}

// Copyright (C) 1993 by Sun Microsystems, Inc. All rights reserved.
//
// Developed at SunPro, a Sun Microsystems, Inc. business.
// Permission to use, copy, modify, and distribute this
// software is freely granted, provided that this notice
// is preserved.

const ERX: f64 = 8.45062911510467529297e-01;

// erf on [0, 0.84375]
const EFX: f64 = 1.28379167095512586316e-01;
const EFX8: f64 = 1.02703333676410069053e+00;
const PP0: f64 = 1.28379167095512558561e-01;
const PP1: f64 = -3.25042107247001499370e-01;
const PP2: f64 = -2.84817495755985104766e-02;
const PP3: f64 = -5.77027029648944159157e-03;
const PP4: f64 = -2.37630166566501626084e-05;
const QQ1: f64 = 3.97917223959155352819e-01;
const QQ2: f64 = 6.50222499887672944485e-02;
const QQ3: f64 = 5.08130628187576562776e-03;
const QQ4: f64 = 1.32494738004321644526e-04;
const QQ5: f64 = -3.96022827877536812320e-06;

// erf on [0.84375, 1.25]
const PA0: f64 = -2.36211856075265944077e-03;
const PA1: f64 = 4.14856118683748331666e-01;
const PA2: f64 = -3.72207876035701323847e-01;
const PA3: f64 = 3.18346619901161753674e-01;
const PA4: f64 = -1.10894694282396677476e-01;
const PA5: f64 = 3.54783043256182359371e-02;
const PA6: f64 = -2.16637559486879084300e-03;
const QA1: f64 = 1.06420880400844228286e-01;
const QA2: f64 = 5.40397917702171048937e-01;
const QA3: f64 = 7.18286544141962662868e-02;
const QA4: f64 = 1.26171219808761642112e-01;
const QA5: f64 = 1.36370839120290507362e-02;
const QA6: f64 = 1.19844998467991074170e-02;

// erfc on [1.25, 1/0.35]
const RA0: f64 = -9.86494403484714822705e-03;
const RA1: f64 = -6.93858572707181764372e-01;
const RA2: f64 = -1.05586262253232909814e+01;
const RA3: f64 = -6.23753324503260060396e+01;
const RA4: f64 = -1.62396669462573470355e+02;
const RA5: f64 = -1.84605092906711035994e+02;
const RA6: f64 = -8.12874355063065934246e+01;
const RA7: f64 = -9.81432934416914548592e+00;
const SA1: f64 = 1.96512716674392571292e+01;
const SA2: f64 = 1.37657754143519042600e+02;
const SA3: f64 = 4.34565877475229228821e+02;
const SA4: f64 = 6.45387271733267880336e+02;
const SA5: f64 = 4.29008140027567833386e+02;
const SA6: f64 = 1.08635005541779435134e+02;
const SA7: f64 = 6.57024977031928170135e+00;
const SA8: f64 = -6.04244152148580987438e-02;

// erfc on [1/0.35, 28]
const RB0: f64 = -9.86494292470009928597e-03;
const RB1: f64 = -7.99283237680523006574e-01;
const RB2: f64 = -1.77579549177547519889e+01;
const RB3: f64 = -1.60636384855821916062e+02;
const RB4: f64 = -6.37566443368389627722e+02;
const RB5: f64 = -1.02509513161107724954e+03;
const RB6: f64 = -4.83519191608651397019e+02;
const SB1: f64 = 3.03380607434824582924e+01;
const SB2: f64 = 3.25792512996573918826e+02;
const SB3: f64 = 1.53672958608443695994e+03;
const SB4: f64 = 3.19985821950859553908e+03;
const SB5: f64 = 2.55305040643316442583e+03;
const SB6: f64 = 4.74528541206955367215e+02;
const SB7: f64 = -2.24409524465858183362e+01;

fn fdlibm_erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.is_infinite() {
        return x.signum();
    }

    let negative = x.is_sign_negative();
    let ax = x.abs();

    if ax < 0.84375 {
        if ax < 2f64.powi(-28) {
            if ax < f64::MIN_POSITIVE * 128.0 {
                // scaled to avoid underflow
                return 0.125 * (8.0 * x + EFX8 * x);
            }
            return x + EFX * x;
        }
        let z = x * x;
        let r = PP0 + z * (PP1 + z * (PP2 + z * (PP3 + z * PP4)));
        let s = 1.0 + z * (QQ1 + z * (QQ2 + z * (QQ3 + z * (QQ4 + z * QQ5))));
        return x + x * (r / s);
    }

    if ax < 1.25 {
        let s = ax - 1.0;
        let p = PA0 + s * (PA1 + s * (PA2 + s * (PA3 + s * (PA4 + s * (PA5 + s * PA6)))));
        let q = 1.0 + s * (QA1 + s * (QA2 + s * (QA3 + s * (QA4 + s * (QA5 + s * QA6)))));
        return if negative { -ERX - p / q } else { ERX + p / q };
    }

    if ax >= 6.0 {
        return if negative { -1.0 } else { 1.0 };
    }

    let s = 1.0 / (ax * ax);
    let (r, big_s) = if ax < 1.0 / 0.35 {
        (
            RA0 + s * (RA1 + s * (RA2 + s * (RA3 + s * (RA4 + s * (RA5 + s * (RA6 + s * RA7)))))),
            1.0 + s
                * (SA1 + s * (SA2 + s * (SA3 + s * (SA4 + s * (SA5 + s * (SA6 + s * (SA7 + s * SA8))))))),
        )
    } else {
        (
            RB0 + s * (RB1 + s * (RB2 + s * (RB3 + s * (RB4 + s * (RB5 + s * RB6))))),
            1.0 + s * (SB1 + s * (SB2 + s * (SB3 + s * (SB4 + s * (SB5 + s * (SB6 + s * SB7)))))),
        )
    };

    // high word of |x| only
    let z = f64::from_bits(ax.to_bits() & 0xffff_ffff_0000_0000);
    let r = (-z * z - 0.5625).exp() * ((z - ax) * (z + ax) + r / big_s).exp();

    if negative { r / ax - 1.0 } else { 1.0 - r / ax }
}

#[cfg(test)]
mod tests {
    use super::*;

    // erf values from standard tables
    const TABLE: [(f64, f64); 8] = [
        (0.0, 0.0),
        (0.1, 0.1124629160182849),
        (0.5, 0.5204998778130465),
        (1.0, 0.8427007929497149),
        (1.5, 0.9661051464753108),
        (2.0, 0.9953222650189527),
        (3.0, 0.9999779095030014),
        (4.0, 0.9999999845827421),
    ];

    #[test]
    fn test_erf_matches_table() {
        for (x, expected) in TABLE {
            assert!((erf(x) - expected).abs() < 2e-7, "erf({x})");
            assert!((erf(-x) + expected).abs() < 2e-7, "erf(-{x})");
            assert!((erf(x as f32) - expected as f32).abs() < 1e-6, "erf({x}f32)");
        }
    }

    #[test]
    fn test_erf2_matches_table() {
        for (x, expected) in TABLE {
            assert!((erf2(x) - expected).abs() < 1e-15, "erf2({x})");
            assert!((erf2(-x) + expected).abs() < 1e-15, "erf2(-{x})");
            assert!((erf2(x as f32) - expected as f32).abs() < 1e-7, "erf2({x}f32)");
        }
    }

    #[test]
    fn test_special_values() {
        assert!(erf(f64::NAN).is_nan());
        assert!(erf2(f32::NAN).is_nan());
        assert_eq!(erf(f32::INFINITY), 1.0);
        assert_eq!(erf(f64::NEG_INFINITY), -1.0);
        assert_eq!(erf2(f64::INFINITY), 1.0);
        assert_eq!(erf2(f32::NEG_INFINITY), -1.0);
        assert_eq!(erf2(10.0f64), 1.0);
        assert_eq!(erf2(-10.0f64), -1.0);
    }

    #[test]
    fn test_tiny_arguments() {
        let x = 1e-30f64;
        assert!((erf2(x) - x * (1.0 + EFX)).abs() < 1e-45);
    }
}
