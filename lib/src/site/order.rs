use std::cmp::Ordering;

use crate::site::{Page, PageId, Section, SectionId, Site};
use crate::util::split_trim;

/// A parsed `orderby` string: `key [desc|asc], ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    keys: Vec<(String, bool)>,
}

impl OrderBy {
    /// Parses `orderby`. An empty string orders by `-`.
    pub fn parse(orderby: &str) -> Self {
        let mut keys: Vec<(String, bool)> = split_trim(orderby, ",")
            .into_iter()
            .filter_map(|clause| {
                let mut words = clause.split_whitespace();
                let key = words.next()?.to_string();
                let desc = words.next().map_or(false, |dir| dir.eq_ignore_ascii_case("desc"));
                Some((key, desc))
            })
            .collect();

        if keys.is_empty() {
            keys.push(("-".into(), false));
        }

        OrderBy { keys }
    }

    fn compare<T>(&self, a: &T, b: &T, cmp: impl Fn(&str, &T, &T) -> Ordering) -> Ordering {
        self.keys.iter()
            .map(|(key, desc)| match desc {
                true => cmp(key, a, b).reverse(),
                false => cmp(key, a, b),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

fn compare_pages(key: &str, a: &Page, b: &Page) -> Ordering {
    match key {
        "-" => b.title.cmp(&a.title),
        "title" => a.title.cmp(&b.title),
        "date" => a.date.cmp(&b.date),
        "modified" => a.modified.cmp(&b.modified),
        "type" => a.kind.cmp(&b.kind),
        key => match (a.meta.get(key), b.meta.get(key)) {
            (Some(a), Some(b)) => a.compare(b),
            _ => Ordering::Equal,
        }
    }
}

fn compare_sections(key: &str, a: &Section, b: &Section) -> Ordering {
    match key {
        "-" => b.title.cmp(&a.title),
        "title" => a.title.cmp(&b.title),
        "weight" => a.meta.get_int("weight").cmp(&b.meta.get_int("weight")),
        "count" => a.pages.len().cmp(&b.pages.len()),
        key => match (a.meta.get(key), b.meta.get(key)) {
            (Some(a), Some(b)) => a.compare(b),
            _ => Ordering::Equal,
        }
    }
}

impl Site {
    /// A copy of `pages` stably sorted by `orderby`. Ties are broken by
    /// reverse title and then by source file.
    pub fn order_pages(&self, pages: &[PageId], orderby: &str) -> Vec<PageId> {
        let order = OrderBy::parse(orderby);
        let mut pages = pages.to_vec();
        pages.sort_by(|&a, &b| {
            let (a, b) = (&self[a], &self[b]);
            order.compare(a, b, compare_pages)
                .then_with(|| compare_pages("-", a, b))
                .then_with(|| a.file.cmp(&b.file))
        });

        pages
    }

    /// A copy of `sections` stably sorted by `orderby`. Ties are broken by
    /// title and then by directory.
    pub fn order_sections(&self, sections: &[SectionId], orderby: &str) -> Vec<SectionId> {
        let order = OrderBy::parse(orderby);
        let mut sections = sections.to_vec();
        sections.sort_by(|&a, &b| {
            let (a, b) = (&self[a], &self[b]);
            order.compare(a, b, compare_sections)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.dir.cmp(&b.dir))
        });

        sections
    }

    /// Links each page in `pages` to its neighbours: `prev`/`next` for the
    /// global chain, `prev_in_section`/`next_in_section` when `in_section`.
    pub fn link_pages(&mut self, pages: &[PageId], in_section: bool) {
        let mut prev: Option<PageId> = None;
        for &id in pages {
            match in_section {
                true => self[id].prev_in_section = prev,
                false => self[id].prev = prev,
            }

            if let Some(prev) = prev {
                match in_section {
                    true => self[prev].next_in_section = Some(id),
                    false => self[prev].next = Some(id),
                }
            }

            prev = Some(id);
        }

        if let Some(last) = prev {
            match in_section {
                true => self[last].next_in_section = None,
                false => self[last].next = None,
            }
        }
    }
}
