//! Parallel or sequential slice mapping, chosen in one place.
//!
//! Hyperparameter search scores every parameter combination independently,
//! so the combinations can be fanned out across cores. The `cfg` switch
//! between rayon and plain iterators lives here so the search stays clean.
//!
//! With the `parallel` feature enabled (the default) work is spread with
//! rayon. `force_sequential` is a runtime override that keeps execution on
//! the caller's thread.
//!
//! Output order always matches input order, so callers that pick a winner
//! with a strict `>` scan get the same answer either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Apply `f` to every element, returning results in input order.
#[inline]
pub fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            return slice.iter().map(f).collect();
        }
        slice.par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        slice.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_slice_preserves_order() {
        let items: Vec<u64> = (0..500).collect();
        let par = map_slice(&items, |x| x * 2, false);
        let seq = map_slice(&items, |x| x * 2, true);
        assert_eq!(par, seq);
        assert_eq!(par[499], 998);
    }

    #[test]
    fn test_empty_input() {
        let empty: Vec<i32> = Vec::new();
        assert!(map_slice(&empty, |x| *x, false).is_empty());
    }
}
