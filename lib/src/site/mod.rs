//! The content graph: sections, pages, taxonomies, and terms.
//!
//! Every node lives in a flat arena owned by [`Site`] and refers to other
//! nodes by id. Parent/child and sibling relations are plain ids, so the
//! graph has no ownership cycles and can be shared immutably across the
//! write workers once it's built.

mod section;
mod page;
mod context;
mod taxonomy;
mod order;
mod paginate;

pub use section::*;
pub use page::*;
pub use context::*;
pub use taxonomy::*;
pub use order::*;
pub use paginate::*;

use std::ops::{Index, IndexMut};
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

macro_rules! define_id {
    ($($(#[$attr:meta])* $name:ident => $field:ident: $T:ty),* $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub(crate) usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }

            impl Index<$name> for Site {
                type Output = $T;

                fn index(&self, id: $name) -> &Self::Output {
                    &self.$field[id.0]
                }
            }

            impl IndexMut<$name> for Site {
                fn index_mut(&mut self, id: $name) -> &mut Self::Output {
                    &mut self.$field[id.0]
                }
            }
        )*
    };
}

define_id! {
    /// Identifies a [`Section`] in a [`Site`].
    SectionId => sections: Section,
    /// Identifies a [`Page`] in a [`Site`].
    PageId => pages: Page,
    /// Identifies a [`Taxonomy`] in a [`Site`].
    TaxonomyId => taxonomies: Taxonomy,
    /// Identifies a [`Term`] in a [`Site`].
    TermId => terms: Term,
}

pub type Pages = Vec<PageId>;
pub type Sections = Vec<SectionId>;

/// The per-language page buckets.
#[derive(Debug, Default, Clone)]
pub struct PageLists {
    pub pages: Pages,
    pub hidden_pages: Pages,
    pub section_pages: Pages,
}

/// The content graph of one build.
#[derive(Debug, Default)]
pub struct Site {
    pub sections: Vec<Section>,
    pub pages: Vec<Page>,
    pub taxonomies: Vec<Taxonomy>,
    pub terms: Vec<Term>,
    languages: Vec<String>,
    section_index: FxHashMap<(Arc<Path>, String), SectionId>,
    page_index: FxHashMap<(Arc<Path>, String), PageId>,
    lists: FxHashMap<String, PageLists>,
}

impl Site {
    /// An empty graph for `languages`, the default language first.
    pub fn new(languages: Vec<String>) -> Self {
        Site { languages, ..Site::default() }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn default_language(&self) -> &str {
        self.languages.first().map(|l| l.as_str()).unwrap_or("")
    }

    /// The section for `dir` in `lang`, if one was built.
    pub fn section_id(&self, dir: &Path, lang: &str) -> Option<SectionId> {
        self.section_index.get(&(Arc::from(dir), lang.to_string())).copied()
    }

    /// The page read from `file` in `lang`, if one was inserted.
    pub fn page_id(&self, file: &Path, lang: &str) -> Option<PageId> {
        self.page_index.get(&(Arc::from(file), lang.to_string())).copied()
    }

    /// The page buckets for `lang`.
    pub fn lists(&self, lang: &str) -> PageLists {
        self.lists.get(lang).cloned().unwrap_or_default()
    }

    pub(crate) fn lists_mut(&mut self, lang: &str) -> &mut PageLists {
        self.lists.entry(lang.to_string()).or_default()
    }

    /// The root section for `lang`.
    pub fn root(&self, lang: &str) -> Option<SectionId> {
        self.sections.iter()
            .find(|s| s.parent.is_none() && s.lang == lang)
            .map(|s| s.id)
    }

    /// Every section in `lang`, in insertion order.
    pub fn sections_in(&self, lang: &str) -> Sections {
        self.sections.iter()
            .filter(|s| s.lang == lang)
            .map(|s| s.id)
            .collect()
    }

    /// Every taxonomy in `lang`, in insertion order.
    pub fn taxonomies_in(&self, lang: &str) -> Vec<TaxonomyId> {
        self.taxonomies.iter()
            .filter(|t| t.lang == lang)
            .map(|t| t.id)
            .collect()
    }

    pub fn ancestors(&self, id: SectionId) -> impl Iterator<Item = SectionId> + '_ {
        let mut current = id;
        std::iter::from_fn(move || {
            let parent = self[current].parent?;
            current = parent;
            Some(parent)
        })
    }

    /// The `/`-joined titles from the root's child down to `id`. The root's
    /// name is empty.
    pub fn section_name(&self, id: SectionId) -> String {
        let mut titles: Vec<&str> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|&s| self[s].parent.is_some())
            .map(|s| self[s].title.as_str())
            .collect();

        titles.reverse();
        titles.join("/")
    }

    /// The title of the top-level section `id` lives under, that is, the
    /// first segment of [`Site::section_name()`]. Empty for the root.
    pub fn section_first_name(&self, id: SectionId) -> String {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|&s| self[s].parent.is_some())
            .last()
            .map(|s| self[s].title.clone())
            .unwrap_or_default()
    }

    /// The section in `lang` whose [`Site::section_name()`] is `name`.
    pub fn find_section(&self, name: &str, lang: &str) -> Option<SectionId> {
        let name = name.trim_matches('/');
        self.sections.iter()
            .filter(|s| s.lang == lang)
            .find(|s| self.section_name(s.id) == name)
            .map(|s| s.id)
    }

    pub fn find_taxonomy(&self, name: &str, lang: &str) -> Option<TaxonomyId> {
        self.taxonomies.iter()
            .find(|t| t.name == name && t.lang == lang)
            .map(|t| t.id)
    }

    /// The term with the full `/`-joined `name` in `taxonomy`.
    pub fn find_term(&self, taxonomy: TaxonomyId, name: &str) -> Option<TermId> {
        self.terms.iter()
            .find(|t| t.taxonomy == taxonomy && t.full_name == name)
            .map(|t| t.id)
    }

    /// The normal pages of `id` and of every section below it.
    pub fn all_pages(&self, id: SectionId) -> Pages {
        let mut pages = self[id].pages.clone();
        for &child in &self[id].children {
            pages.extend(self.all_pages(child));
        }

        pages
    }

    /// Registers `section` unless one already exists for its directory and
    /// language, returning the id of the registered section either way.
    pub fn insert_section(&mut self, mut section: Section) -> SectionId {
        let key = (section.dir.clone(), section.lang.clone());
        if let Some(&existing) = self.section_index.get(&key) {
            return existing;
        }

        let id = SectionId(self.sections.len());
        section.id = id;
        if let Some(parent) = section.parent {
            self[parent].children.push(id);
        }

        self.section_index.insert(key, id);
        self.sections.push(section);
        id
    }

    /// Registers `page` and files it into the bucket its metadata selects,
    /// both in its section and in its language's lists.
    pub fn insert_page(&mut self, page: Page) -> PageId {
        let id = PageId(self.pages.len());
        let (section, lang) = (page.section, page.lang.clone());
        self.page_index.insert((page.file.clone(), lang.clone()), id);

        let kind = page.kind();
        self.pages.push(page);

        let lists = self.lists_mut(&lang);
        match kind {
            PageKind::Hidden => lists.hidden_pages.push(id),
            PageKind::Section => lists.section_pages.push(id),
            PageKind::Normal => lists.pages.push(id),
        }

        let section = &mut self[section];
        match kind {
            PageKind::Hidden => section.hidden_pages.push(id),
            PageKind::Section => section.section_pages.push(id),
            PageKind::Normal => section.pages.push(id),
        }

        id
    }
}
