/// The logistic function `1 / (1 + e^-z)`.
pub fn sigmoid(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}

/// `ln(1 + e^z)`, evaluated without overflowing for large `z`.
pub fn softplus(z: f32) -> f32 {
    z.max(0.) + (-z.abs()).exp().ln_1p()
}

/// `ln(sigmoid(z))`.
///
/// Computing the sigmoid first saturates to `0` or `1` for `|z|` above ~17 in `f32` and the
/// logarithm then yields `-inf`, so this goes through the softplus identity instead.
pub fn log_sigmoid(z: f32) -> f32 {
    -softplus(-z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(sigmoid(0.), 0.5);
        assert!((sigmoid(2.) + sigmoid(-2.) - 1.).abs() < 1e-6);
    }

    #[test]
    fn softplus_matches_naive_formula_in_range() {
        for z in [-5., -1., 0., 0.5, 3., 8.] {
            let naive = (1f32 + f32::exp(z)).ln();
            assert!((softplus(z) - naive).abs() < 1e-5, "z = {z}");
        }
    }

    #[test]
    fn log_sigmoid_stays_finite_when_saturated() {
        assert!(log_sigmoid(-200.).is_finite());
        assert!((log_sigmoid(-200.) + 200.).abs() < 1e-3);
        assert_eq!(log_sigmoid(200.), 0.);

        // The naive form breaks down here.
        assert_eq!(sigmoid(-200.).ln(), f32::NEG_INFINITY);
    }
}
