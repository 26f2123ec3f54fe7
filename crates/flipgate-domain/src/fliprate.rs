/// Fraction of adjacent outcome pairs that differ.
///
/// Any inequality counts as a flip, in either direction. Fewer than two
/// outcomes cannot flip and yield `0.0`. The caller owns ordering: the slice
/// must already be chronological.
pub fn calc_fliprate<T: PartialEq>(runs: &[T]) -> f64 {
    if runs.len() < 2 {
        return 0.0;
    }
    let possible_flips = runs.len() - 1;
    let flips = runs.windows(2).filter(|pair| pair[0] != pair[1]).count();
    flips as f64 / possible_flips as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_or_empty_history_has_no_flips() {
        assert_eq!(calc_fliprate(&["pass"]), 0.0);
        assert_eq!(calc_fliprate::<&str>(&[]), 0.0);
    }

    #[test]
    fn known_histories() {
        assert_eq!(calc_fliprate(&["fail", "fail"]), 0.0);
        assert_eq!(calc_fliprate(&["pass", "fail", "fail"]), 0.5);
        assert_eq!(calc_fliprate(&[0, 1, 0, 1]), 1.0);
    }

    #[test]
    fn direction_does_not_matter() {
        assert_eq!(
            calc_fliprate(&["pass", "fail"]),
            calc_fliprate(&["fail", "pass"])
        );
        // failure -> error is a change of category, so it flips too.
        assert_eq!(calc_fliprate(&["failure", "error"]), 1.0);
    }

    proptest! {
        #[test]
        fn fliprate_is_a_fraction(runs in prop::collection::vec(0u8..3, 0..64)) {
            let rate = calc_fliprate(&runs);
            prop_assert!((0.0..=1.0).contains(&rate), "rate {rate} out of range");
        }

        #[test]
        fn constant_history_never_flips(value in any::<u8>(), len in 0usize..32) {
            let runs = vec![value; len];
            prop_assert_eq!(calc_fliprate(&runs), 0.0);
        }

        #[test]
        fn fliprate_is_reversal_invariant(runs in prop::collection::vec(0u8..2, 0..64)) {
            let mut reversed = runs.clone();
            reversed.reverse();
            prop_assert_eq!(calc_fliprate(&runs), calc_fliprate(&reversed));
        }
    }
}
