//! Pure page-slice computation for paginated result listings.

/// A borrowed page of a result list.
#[derive(Debug)]
pub struct Page<'a, T> {
    /// Items on this page, in original order.
    pub items: &'a [T],
    /// The page index actually shown, after clamping.
    pub index: usize,
    /// Total page count. At least 1, even for an empty list.
    pub total_pages: usize,
}

/// Computes the slice and page count for `page_index` of `items`.
///
/// `total_pages` is `ceil(len / page_size)` with a floor of 1: an empty
/// result list is a single empty page, never a zero-page state. The
/// requested index is clamped into `[0, total_pages - 1]`. A `page_size`
/// of zero is treated as 1.
///
/// No side effects; safe to call any number of times with the same inputs.
pub fn paginate<T>(items: &[T], page_index: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let index = page_index.min(total_pages - 1);

    let start = index * page_size;
    let end = items.len().min(start + page_size);
    let items = if start >= items.len() {
        &[]
    } else {
        &items[start..end]
    };

    Page {
        items,
        index,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_items_page_size_five() {
        let items: Vec<u32> = (0..12).collect();

        let p0 = paginate(&items, 0, 5);
        assert_eq!(p0.items, &[0, 1, 2, 3, 4]);
        assert_eq!(p0.total_pages, 3);

        let p2 = paginate(&items, 2, 5);
        assert_eq!(p2.items, &[10, 11]);
        assert_eq!(p2.index, 2);
    }

    #[test]
    fn test_out_of_range_index_clamps() {
        let items: Vec<u32> = (0..12).collect();
        let page = paginate(&items, 5, 5);
        assert_eq!(page.index, 2);
        assert_eq!(page.items, &[10, 11]);
    }

    #[test]
    fn test_empty_list_is_one_empty_page() {
        let items: Vec<u32> = vec![];
        let page = paginate(&items, 0, 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.index, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        let items: Vec<u32> = (0..10).collect();
        let page = paginate(&items, 0, 5);
        assert_eq!(page.total_pages, 2);
        assert_eq!(paginate(&items, 1, 5).items, &[5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_zero_page_size_treated_as_one() {
        let items: Vec<u32> = (0..3).collect();
        let page = paginate(&items, 1, 0);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items, &[1]);
    }

    #[test]
    fn test_pages_concatenate_to_original() {
        let items: Vec<u32> = (0..17).collect();
        let size = 4;
        let total = paginate(&items, 0, size).total_pages;
        assert_eq!(total, 5);

        let mut collected = Vec::new();
        for idx in 0..total {
            collected.extend_from_slice(paginate(&items, idx, size).items);
        }
        assert_eq!(collected, items);
    }
}
