use rustc_hash::{FxHashMap, FxHashSet};

use crate::meta::Meta;
use crate::site::{Page, PageId, Pages, Site, TaxonomyId, TermId};
use crate::util::{format_time, split_prefix, slugify_path};
use crate::value::Value;

/// A grouping dimension, such as `tags`, in one language.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub id: TaxonomyId,
    pub name: String,
    pub lang: String,
    pub meta: Meta,
    pub path: String,
    pub permalink: String,
    /// The top-level terms, in first-seen order.
    pub terms: Vec<TermId>,
}

/// One node of a taxonomy's term forest, for example `lang` and `lang/go`
/// for a page tagged `lang/go`.
#[derive(Debug, Clone)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: TaxonomyId,
    /// The last `/`-separated segment of `full_name`.
    pub name: String,
    pub full_name: String,
    pub slug: String,
    pub path: String,
    pub permalink: String,
    /// Pages grouped under this term or any term below it.
    pub pages: Pages,
    pub parent: Option<TermId>,
    pub children: Vec<TermId>,
}

impl Taxonomy {
    pub fn new(name: &str, lang: &str, meta: Meta) -> Self {
        Taxonomy {
            id: TaxonomyId(0),
            name: name.to_string(),
            lang: lang.to_string(),
            meta,
            path: String::new(),
            permalink: String::new(),
            terms: vec![],
        }
    }

    /// The metadata key or `date:<format>` pseudo-key pages are grouped by.
    pub fn group_by(&self) -> String {
        match self.meta.get_string("group_by") {
            key if key.is_empty() => self.name.clone(),
            key => key,
        }
    }
}

/// The group names `page` falls under for `key`.
fn group_names(page: &Page, key: &str) -> Vec<String> {
    if let Some(format) = key.strip_prefix("date:") {
        return format_time(&page.date, format).into_iter().collect();
    }

    match page.meta.get(key) {
        Some(Value::String(name)) => vec![name.to_string()],
        Some(Value::Array(names)) => names.iter()
            .filter_map(|name| name.as_str())
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

impl Site {
    pub fn insert_taxonomy(&mut self, mut taxonomy: Taxonomy) -> TaxonomyId {
        let id = TaxonomyId(self.taxonomies.len());
        taxonomy.id = id;
        self.taxonomies.push(taxonomy);
        id
    }

    /// Groups `pages` into the term forest of `taxonomy`.
    ///
    /// Every name is split on `/`; the page joins the term for each prefix,
    /// so ancestors accumulate the pages of all of their descendants. Terms
    /// are keyed by full path, so a repeated name reuses its term. A page is
    /// listed at most once per term, however many of its names share it.
    pub fn group(&mut self, taxonomy: TaxonomyId, pages: &[PageId]) {
        let key = self[taxonomy].group_by();
        let mut table: FxHashMap<String, TermId> = self.terms.iter()
            .filter(|term| term.taxonomy == taxonomy)
            .map(|term| (term.full_name.clone(), term.id))
            .collect();

        for &page in pages {
            let mut joined = FxHashSet::default();
            for name in group_names(&self[page], &key) {
                let mut parent: Option<TermId> = None;
                for full_name in split_prefix(&name) {
                    let id = match table.get(&full_name) {
                        Some(&id) => id,
                        None => {
                            let id = self.new_term(taxonomy, &full_name, parent);
                            table.insert(full_name, id);
                            id
                        }
                    };

                    if joined.insert(id) {
                        self[id].pages.push(page);
                    }

                    if let Some(parent) = parent {
                        if !self[parent].children.contains(&id) {
                            self[parent].children.push(id);
                        }
                    }

                    parent = Some(id);
                }
            }
        }
    }

    fn new_term(&mut self, taxonomy: TaxonomyId, full_name: &str, parent: Option<TermId>) -> TermId {
        let id = TermId(self.terms.len());
        let name = full_name.rsplit('/').next().unwrap_or(full_name);
        self.terms.push(Term {
            id,
            taxonomy,
            name: name.to_string(),
            full_name: full_name.to_string(),
            slug: slugify_path(full_name),
            path: String::new(),
            permalink: String::new(),
            pages: vec![],
            parent,
            children: vec![],
        });

        if parent.is_none() {
            self[taxonomy].terms.push(id);
        }

        id
    }

    /// Every term of `taxonomy`, parents before their children.
    pub fn terms_depth_first(&self, taxonomy: TaxonomyId) -> Vec<TermId> {
        fn walk(site: &Site, terms: &[TermId], out: &mut Vec<TermId>) {
            for &term in terms {
                out.push(term);
                walk(site, &site[term].children, out);
            }
        }

        let mut out = vec![];
        walk(self, &self[taxonomy].terms, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::tests::{page, site_with_sections};

    fn tagged(site: &mut Site, file: &str, tags: &[&str]) -> PageId {
        let blog = site.sections[1].id;
        let mut p = page(file, blog, file);
        p.meta.insert("tags", tags.iter().copied().map(Value::from).collect::<Value>());
        site.insert_page(p)
    }

    #[test]
    fn ancestors_accumulate_descendant_pages() {
        let (mut site, ..) = site_with_sections();
        let go = tagged(&mut site, "go.md", &["lang/go"]);
        let rust = tagged(&mut site, "rust.md", &["lang/rust", "misc"]);

        let tags = site.insert_taxonomy(Taxonomy::new("tags", "en", Meta::new()));
        site.group(tags, &[go, rust]);

        let lang = site.find_term(tags, "lang").unwrap();
        let lang_go = site.find_term(tags, "lang/go").unwrap();
        let lang_rust = site.find_term(tags, "lang/rust").unwrap();
        let misc = site.find_term(tags, "misc").unwrap();

        assert_eq!(site[lang].pages, vec![go, rust]);
        assert_eq!(site[lang_go].pages, vec![go]);
        assert_eq!(site[lang_rust].pages, vec![rust]);
        assert_eq!(site[misc].pages, vec![rust]);

        assert_eq!(site[tags].terms, vec![lang, misc]);
        assert_eq!(site[lang].children, vec![lang_go, lang_rust]);
        assert_eq!(site[lang_go].parent, Some(lang));
        assert_eq!(site[lang_go].name, "go");
        assert_eq!(site.terms_depth_first(tags), vec![lang, lang_go, lang_rust, misc]);
    }

    #[test]
    fn repeated_names_reuse_terms() {
        let (mut site, ..) = site_with_sections();
        let a = tagged(&mut site, "a.md", &["x/y", "x/y"]);
        let b = tagged(&mut site, "b.md", &["x/y"]);

        let tags = site.insert_taxonomy(Taxonomy::new("tags", "en", Meta::new()));
        site.group(tags, &[a, b]);

        let x = site.find_term(tags, "x").unwrap();
        let y = site.find_term(tags, "x/y").unwrap();
        assert_eq!(site.terms.len(), 2);
        assert_eq!(site[x].children, vec![y]);
        assert_eq!(site[x].pages, vec![a, b]);
        assert_eq!(site[y].pages, vec![a, b]);
    }

    #[test]
    fn pages_join_each_term_once() {
        let (mut site, ..) = site_with_sections();
        let a = tagged(&mut site, "a.md", &["x/y", "z", "x/w", "x"]);
        let b = tagged(&mut site, "b.md", &["x"]);

        let tags = site.insert_taxonomy(Taxonomy::new("tags", "en", Meta::new()));
        site.group(tags, &[a, b]);

        let x = site.find_term(tags, "x").unwrap();
        let z = site.find_term(tags, "z").unwrap();
        assert_eq!(site[x].pages, vec![a, b]);
        assert_eq!(site[z].pages, vec![a]);
    }

    #[test]
    fn bad_date_formats_group_nothing() {
        let (mut site, ..) = site_with_sections();
        let a = tagged(&mut site, "a.md", &[]);

        let mut meta = Meta::new();
        meta.insert("group_by", "date:%Q");
        let archive = site.insert_taxonomy(Taxonomy::new("archives", "en", meta));
        site.group(archive, &[a]);
        assert!(site[archive].terms.is_empty());
    }

    #[test]
    fn dates_group_by_format() {
        let (mut site, ..) = site_with_sections();
        let a = tagged(&mut site, "a.md", &[]);

        let mut meta = Meta::new();
        meta.insert("group_by", "date:%Y/%m");
        let archive = site.insert_taxonomy(Taxonomy::new("archives", "en", meta));
        site.group(archive, &[a]);

        let year = site.find_term(archive, "2024").unwrap();
        let month = site.find_term(archive, "2024/01").unwrap();
        assert_eq!(site[year].children, vec![month]);
        assert_eq!(site[month].slug, "2024/01");
    }
}
