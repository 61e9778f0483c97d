//! Presentation-order shuffling.
//!
//! Shuffles are computed as index permutations and then applied to a copy,
//! so identifiers and correctness flags are carried along untouched.

use rand::Rng;

/// A uniformly random permutation of `0..len` (Fisher–Yates, walking from
/// the last index down to 1 and swapping with a uniform index in `[0, i]`).
pub fn permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    for i in (1..len).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }
    order
}

/// The identity permutation of `0..len`.
pub fn identity(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// Clone `items` into the order given by `order`.
///
/// `order` must be a permutation of `0..items.len()`.
pub fn apply<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    debug_assert_eq!(items.len(), order.len());
    order.iter().map(|&i| items[i].clone()).collect()
}
