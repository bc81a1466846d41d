//! Range selection over a fully sorted result set.

/// Computes the half-open slice `[start, end)` of a virtual array of
/// `total_len` items that holds page `page` of size `page_size`.
///
/// * Pages `0` and `1` both mean the first page.
/// * A page past the end of the data falls back to the first page.
/// * Negative pages count from the end: `-1` is the last `page_size` items.
///   A negative page reaching past the beginning also falls back to the
///   first page.
/// * When the data holds fewer items than one page, everything is returned.
/// * A non-positive `page_size` selects nothing.
///
/// The result always satisfies `0 <= start <= end <= total_len` (for
/// non-negative `total_len`) and `end - start <= page_size.max(0)`.
pub fn select_range(page: i64, page_size: i64, total_len: i64) -> (i64, i64) {
    if page_size <= 0 {
        return (0, 0);
    }

    if total_len < page_size {
        return (0, total_len.max(0));
    }

    if total_len <= 0 {
        return (0, 0);
    }

    let start = if page > 1 {
        let offset = (page - 1).saturating_mul(page_size);
        if offset >= total_len { 0 } else { offset }
    } else if page < 0 {
        let from_end = page.saturating_neg().saturating_mul(page_size);
        if from_end < total_len {
            total_len - from_end
        } else {
            0
        }
    } else {
        0
    };

    if start.saturating_add(page_size) > total_len {
        (start, total_len)
    } else {
        (start, start + page_size)
    }
}
