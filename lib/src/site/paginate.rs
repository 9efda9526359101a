use crate::util::replace_vars;

/// The page-number pattern used when none is configured.
pub const DEFAULT_PAGINATE_PATH: &str = "{name}{number}{extension}";

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginator<T> {
    /// The 1-based page number.
    pub number: usize,
    /// The total number of pages.
    pub total: usize,
    pub url: String,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub items: Vec<T>,
}

impl<T> Paginator<T> {
    pub fn has_prev(&self) -> bool {
        self.prev_url.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }
}

/// The URL of page `number` of a list rooted at `base`.
///
/// Page 1 is `base` itself. Later pages substitute `{name}` (`base` without
/// its extension), `{number}`, and `{extension}` (with its dot) into
/// `pattern`.
///
/// ```
/// use snowdrift::site::page_url;
///
/// assert_eq!(page_url("/blog/index.html", "", 1), "/blog/index.html");
/// assert_eq!(page_url("/blog/index.html", "", 3), "/blog/index3.html");
/// assert_eq!(page_url("/blog/index.html", "{name}/page/{number}{extension}", 2),
///     "/blog/index/page/2.html");
/// assert_eq!(page_url("/blog/", "", 2), "/blog/2");
/// ```
pub fn page_url(base: &str, pattern: &str, number: usize) -> String {
    if number <= 1 {
        return base.to_string();
    }

    let pattern = match pattern.is_empty() {
        true => DEFAULT_PAGINATE_PATH,
        false => pattern,
    };

    let file_start = base.rfind('/').map_or(0, |i| i + 1);
    let (name, extension) = match base[file_start..].rfind('.') {
        Some(dot) => base.split_at(file_start + dot),
        None => (base, ""),
    };

    let number = number.to_string();
    let vars = [("{name}", name), ("{number}", number.as_str()), ("{extension}", extension)];
    replace_vars(pattern, &vars)
}

/// Splits `items` into pages of `per_page` items. A non-positive `per_page`
/// puts everything on one page; an empty list still yields one empty page.
pub fn paginate<T: Clone>(items: &[T], per_page: i64, base: &str, pattern: &str) -> Vec<Paginator<T>> {
    let per_page = match per_page {
        n if n > 0 => n as usize,
        _ => items.len().max(1),
    };

    let total = items.len().div_ceil(per_page).max(1);
    (1..=total)
        .map(|number| {
            let start = ((number - 1) * per_page).min(items.len());
            let end = (start + per_page).min(items.len());
            Paginator {
                number,
                total,
                url: page_url(base, pattern, number),
                prev_url: (number > 1).then(|| page_url(base, pattern, number - 1)),
                next_url: (number < total).then(|| page_url(base, pattern, number + 1)),
                items: items[start..end].to_vec(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_five_by_ten() {
        let items: Vec<usize> = (0..25).collect();
        let pages = paginate(&items, 10, "/posts/index.html", "");

        assert_eq!(pages.len(), 3);
        let sizes: Vec<_> = pages.iter().map(|p| p.items.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        assert_eq!(pages[0].url, "/posts/index.html");
        assert_eq!(pages[1].url, "/posts/index2.html");
        assert_eq!(pages[2].url, "/posts/index3.html");
        assert_eq!(pages[2].items[0], 20);

        assert!(!pages[0].has_prev());
        assert_eq!(pages[0].next_url.as_deref(), Some("/posts/index2.html"));
        assert_eq!(pages[2].prev_url.as_deref(), Some("/posts/index2.html"));
        assert!(!pages[2].has_next());
        assert!(pages.iter().all(|p| p.total == 3));
    }

    #[test]
    fn unpaginated_and_empty_lists() {
        let items = vec!["a", "b", "c"];
        let pages = paginate(&items, 0, "/index.html", "");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].items, items);

        let pages = paginate::<&str>(&[], 10, "/index.html", "");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].items.is_empty());
        assert_eq!(pages[0].url, "/index.html");
    }

    #[test]
    fn dots_in_directories_are_not_extensions() {
        assert_eq!(page_url("/v1.2/list", "", 2), "/v1.2/list2");
    }
}
