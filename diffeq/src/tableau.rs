/// Coefficients of an explicit Runge-Kutta method.
///
/// `b` produces the propagated solution. `b2`, when present, produces the
/// embedded lower order estimate used for error control.
#[derive(Clone, Copy, Debug)]
pub struct ButcherTableau<const STAGES: usize> {
    pub a: [[f64; STAGES]; STAGES],
    pub b: [f64; STAGES],
    pub b2: Option<[f64; STAGES]>,
    pub c: [f64; STAGES],
    /// Order of the propagated solution.
    pub order: usize,
}

impl ButcherTableau<4> {
    // usage is ButcherTableau::<4>::RK4
    pub const RK4: Self = Self {
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        b2: None,
        c: [0., 1.0 / 2.0, 1.0 / 2.0, 1.0],
        order: 4,
    };
}

impl ButcherTableau<7> {
    // usage is ButcherTableau::<7>::DORMANDPRINCE45
    pub const DORMANDPRINCE45: Self = Self {
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b2: Some([
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ]),
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1.0, 1.0],
        order: 5,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn check_consistency<const S: usize>(tableau: &ButcherTableau<S>) {
        // weights sum to one and each row of `a` sums to its node
        assert_abs_diff_eq!(tableau.b.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
        if let Some(b2) = tableau.b2 {
            assert_abs_diff_eq!(b2.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
        }
        for s in 0..S {
            assert_abs_diff_eq!(tableau.a[s].iter().sum::<f64>(), tableau.c[s], epsilon = 1e-14);
        }
    }

    #[test]
    fn rk4_is_consistent() {
        check_consistency(&ButcherTableau::<4>::RK4);
    }

    #[test]
    fn dormand_prince_is_consistent() {
        check_consistency(&ButcherTableau::<7>::DORMANDPRINCE45);
    }
}
