//! Interval union over raw spans.

use super::Span;

/// Collapses overlapping or touching spans into a minimal covering set.
///
/// The output is sorted by start and pairwise disjoint. Ties on start keep
/// their input order.
pub fn merge_spans(spans: &[Span]) -> Vec<Span> {
    let mut sorted: Vec<Span> = spans.iter().copied().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|s| s.start);

    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    for span in iter {
        if current.overlaps_or_touches(&span) {
            current.end = current.end.max(span.end);
        } else {
            merged.push(current);
            current = span;
        }
    }
    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(usize, usize)]) -> Vec<Span> {
        pairs.iter().map(|&(s, e)| Span::new(s, e)).collect()
    }

    #[test]
    fn empty_input() {
        assert!(merge_spans(&[]).is_empty());
    }

    #[test]
    fn overlapping_spans_merge() {
        assert_eq!(merge_spans(&spans(&[(0, 5), (3, 8)])), spans(&[(0, 8)]));
    }

    #[test]
    fn touching_spans_merge() {
        assert_eq!(merge_spans(&spans(&[(0, 3), (3, 6)])), spans(&[(0, 6)]));
    }

    #[test]
    fn disjoint_spans_stay_apart() {
        assert_eq!(
            merge_spans(&spans(&[(10, 12), (0, 3), (5, 7)])),
            spans(&[(0, 3), (5, 7), (10, 12)])
        );
    }

    #[test]
    fn contained_span_is_absorbed() {
        assert_eq!(merge_spans(&spans(&[(0, 10), (2, 4), (9, 11)])), spans(&[(0, 11)]));
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(merge_spans(&spans(&[(4, 8), (4, 8), (4, 8)])), spans(&[(4, 8)]));
    }

    #[test]
    fn output_is_sorted_disjoint_and_non_empty() {
        let input = spans(&[(7, 9), (1, 2), (30, 31), (2, 4), (8, 15), (20, 25), (0, 1), (21, 22)]);
        let merged = merge_spans(&input);
        assert_eq!(merged, spans(&[(0, 4), (7, 15), (20, 25), (30, 31)]));
        for pair in merged.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        assert!(merged.iter().all(|s| s.end > s.start));
    }
}
