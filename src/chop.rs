use std::cmp::Ordering;

/// Index reported when the target is not in the sequence.
pub const NOT_FOUND: isize = -1;

/// Converts a search result into the sentinel form used by [`crate::Chopper`].
pub const fn to_index(found: Option<usize>) -> isize {
    match found {
        // Slices never hold more than `isize::MAX` bytes, so the index fits.
        Some(idx) => idx as isize,
        None => NOT_FOUND,
    }
}

/// Binary search over the half-open window `[low, high)`.
///
/// `sequence` must be sorted in non-decreasing order. If the target occurs more than once any
/// of its indices may be returned.
pub const fn search(sequence: &[i64], target: i64) -> Option<usize> {
    let mut low = 0;
    let mut high = sequence.len();

    while low < high {
        let mid = low + (high - low) / 2;
        if sequence[mid] == target {
            return Some(mid);
        } else if sequence[mid] < target {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    None
}

/// Same window as [`search`], narrowed by recursion instead of a loop.
pub fn search_recursive(sequence: &[i64], target: i64) -> Option<usize> {
    fn go(sequence: &[i64], target: i64, low: usize, high: usize) -> Option<usize> {
        if low >= high {
            return None;
        }
        let mid = low + (high - low) / 2;
        match sequence[mid].cmp(&target) {
            Ordering::Equal => Some(mid),
            Ordering::Less => go(sequence, target, mid + 1, high),
            Ordering::Greater => go(sequence, target, low, mid),
        }
    }
    go(sequence, target, 0, sequence.len())
}

/// Recurses on sub-slices, adding the offset of the upper half back on the way out.
pub fn search_halving(sequence: &[i64], target: i64) -> Option<usize> {
    if sequence.is_empty() {
        return None;
    }
    let mid = sequence.len() / 2;
    let (lower, upper) = sequence.split_at(mid);
    match upper[0].cmp(&target) {
        Ordering::Equal => Some(mid),
        Ordering::Less => search_halving(&upper[1..], target).map(|idx| mid + 1 + idx),
        Ordering::Greater => search_halving(lower, target),
    }
}

pub fn search_std(sequence: &[i64], target: i64) -> Option<usize> {
    sequence.binary_search(&target).ok()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    const SEARCHES: [(&str, fn(&[i64], i64) -> Option<usize>); 4] = [
        ("iterative", search),
        ("recursive", search_recursive),
        ("halving", search_halving),
        ("std", search_std),
    ];

    fn random_sorted(rng: &mut StdRng) -> Vec<i64> {
        let len = rng.gen_range(0..40);
        let mut sequence: Vec<i64> = (0..len).map(|_| rng.gen_range(-30..30)).collect();
        sequence.sort_unstable();
        sequence
    }

    #[test]
    fn literal_scenarios() {
        for (name, f) in SEARCHES {
            assert_eq!(to_index(f(&[], 3)), -1, "{name}");
            assert_eq!(to_index(f(&[1], 1)), 0, "{name}");
            assert_eq!(to_index(f(&[1, 3, 5], 3)), 1, "{name}");
            assert_eq!(to_index(f(&[1, 3, 5], 0)), -1, "{name}");
            assert_eq!(to_index(f(&[1, 3, 5, 7], 7)), 3, "{name}");
            assert_eq!(to_index(f(&[1, 3, 5, 7], 8)), -1, "{name}");
        }
    }

    #[test]
    fn empty_sequence_is_never_a_match() {
        for (name, f) in SEARCHES {
            for target in [i64::MIN, -1, 0, 1, i64::MAX] {
                assert_eq!(f(&[], target), None, "{name}");
            }
        }
    }

    #[test]
    fn every_element_is_found() {
        let sequence: Vec<i64> = (0..100).map(|x| x * 2 - 51).collect();
        for (name, f) in SEARCHES {
            for (idx, &value) in sequence.iter().enumerate() {
                assert_eq!(f(&sequence, value), Some(idx), "{name}");
            }
            for &value in &sequence {
                assert_eq!(f(&sequence, value + 1), None, "{name}");
            }
        }
    }

    #[test]
    fn extremes_do_not_overflow() {
        let sequence = [i64::MIN, -1, 0, i64::MAX];
        for (name, f) in SEARCHES {
            assert_eq!(f(&sequence, i64::MIN), Some(0), "{name}");
            assert_eq!(f(&sequence, i64::MAX), Some(3), "{name}");
            assert_eq!(f(&sequence, 1), None, "{name}");
        }
    }

    #[test]
    fn agrees_with_linear_scan() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let sequence = random_sorted(&mut rng);
            let target = rng.gen_range(-35..35);
            let present = sequence.contains(&target);
            for (name, f) in SEARCHES {
                match f(&sequence, target) {
                    Some(idx) => assert_eq!(sequence[idx], target, "{name}: {sequence:?}"),
                    None => assert!(!present, "{name}: missed {target} in {sequence:?}"),
                }
                assert_eq!(f(&sequence, target), f(&sequence, target), "{name}");
            }
        }
    }

    #[test]
    fn duplicates_return_some_matching_index() {
        let sequence = [1, 2, 2, 2, 2, 3];
        for (name, f) in SEARCHES {
            let idx = f(&sequence, 2).unwrap();
            assert_eq!(sequence[idx], 2, "{name}");
        }
    }

    #[test]
    fn iterative_search_is_const() {
        const FOUND: Option<usize> = search(&[1, 3, 5, 7], 5);
        assert_eq!(FOUND, Some(2));
        assert_eq!(to_index(FOUND), 2);
    }
}
