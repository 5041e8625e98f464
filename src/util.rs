//! Small shared helpers.

/// Split a slice into consecutive chunks of at most `size` items; the last
/// chunk carries the remainder. An empty input yields no chunks.
pub fn chunked<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "chunk size must be positive");
    items.chunks(size).map(<[T]>::to_vec).collect()
}
