//! Lazy template views over the shared [`Site`] graph.
//!
//! Nothing is copied out of the graph up front: each object holds the shared
//! site and an id, and resolves fields as templates access them.

use std::sync::Arc;

use minijinja::value::{Enumerator, Object, ObjectRepr, Rest, Value};

use crate::meta::Meta;
use crate::site::{PageId, Paginator, Section, SectionId, Site, TaxonomyId, TermId};
use crate::value;

impl From<value::Value> for Value {
    fn from(value: value::Value) -> Self {
        Value::from_serialize(&value)
    }
}

fn meta(meta: &Meta) -> Value {
    Value::from_serialize(meta)
}

fn date(date: &chrono::NaiveDateTime) -> Value {
    Value::from(date.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// A graph node that can be exposed to templates by id.
pub trait Node: Copy + std::fmt::Debug + Send + Sync + 'static {
    fn value(self, site: &Arc<Site>) -> Value;
}

impl Node for PageId {
    fn value(self, site: &Arc<Site>) -> Value {
        Value::from_object(PageObject { site: site.clone(), id: self })
    }
}

impl Node for SectionId {
    fn value(self, site: &Arc<Site>) -> Value {
        Value::from_object(SectionObject { site: site.clone(), section: SectionRef::Id(self) })
    }
}

impl Node for TaxonomyId {
    fn value(self, site: &Arc<Site>) -> Value {
        Value::from_object(TaxonomyObject { site: site.clone(), id: self })
    }
}

impl Node for TermId {
    fn value(self, site: &Arc<Site>) -> Value {
        Value::from_object(TermObject { site: site.clone(), id: self })
    }
}

/// A sequence of graph nodes, resolved one at a time.
#[derive(derive_more::Debug)]
pub struct List<I> {
    #[debug(skip)]
    site: Arc<Site>,
    items: Vec<I>,
}

impl<I: Node> Object for List<I> {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Seq
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let item = *self.items.get(key.as_usize()?)?;
        Some(item.value(&self.site))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Seq(self.items.len())
    }
}

/// A template sequence over `items`.
pub fn list<I: Node>(site: &Arc<Site>, items: Vec<I>) -> Value {
    Value::from_object(List { site: site.clone(), items })
}

/// One page of a paginated page list.
#[derive(derive_more::Debug)]
pub struct PaginatorObject {
    #[debug(skip)]
    site: Arc<Site>,
    paginator: Paginator<PageId>,
}

impl PaginatorObject {
    pub fn new(site: &Arc<Site>, paginator: Paginator<PageId>) -> Value {
        Value::from_object(PaginatorObject { site: site.clone(), paginator })
    }
}

impl Object for PaginatorObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let paginator = &self.paginator;
        let url = |url: &Option<String>| url.as_deref().map_or(Value::from(()), Value::from);
        let value = match key.as_str()? {
            "number" => Value::from(paginator.number),
            "total" => Value::from(paginator.total),
            "url" => Value::from(paginator.url.as_str()),
            "prev_url" => url(&paginator.prev_url),
            "next_url" => url(&paginator.next_url),
            "has_prev" => Value::from(paginator.has_prev()),
            "has_next" => Value::from(paginator.has_next()),
            "pages" => list(&self.site, paginator.items.clone()),
            _ => return None,
        };

        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&[
            "number", "total", "url", "prev_url", "next_url", "has_prev", "has_next", "pages",
        ])
    }
}

#[derive(derive_more::Debug)]
pub struct PageObject {
    #[debug(skip)]
    site: Arc<Site>,
    id: PageId,
}

impl Object for PageObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let page = &self.site[self.id];
        let link = |id: Option<PageId>| id.map(|id| id.value(&self.site));
        let value = match key.as_str()? {
            "file" => Value::from(page.file.display().to_string()),
            "type" => Value::from(page.kind.as_str()),
            "lang" => Value::from(page.lang.as_str()),
            "title" => Value::from(page.title.as_str()),
            "date" => date(&page.date),
            "modified" => date(&page.modified),
            "path" => Value::from(page.path.as_str()),
            "permalink" => Value::from(page.permalink.as_str()),
            "aliases" => Value::from_serialize(&page.aliases),
            "summary" => Value::from_safe_string(page.summary.clone()),
            "content" => Value::from_safe_string(page.content.clone()),
            "meta" => meta(&page.meta),
            "section" => page.section.value(&self.site),
            "prev" => link(page.prev)?,
            "next" => link(page.next)?,
            "prev_in_section" => link(page.prev_in_section)?,
            "next_in_section" => link(page.next_in_section)?,
            key => page.meta.get(key).cloned()?.into(),
        };

        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&[
            "file", "type", "lang", "title", "date", "modified", "path", "permalink",
            "aliases", "summary", "content", "meta", "section",
        ])
    }
}

/// A section in the graph, or a detached one built for a section page.
#[derive(Debug)]
pub enum SectionRef {
    Id(SectionId),
    Detached(Arc<Section>),
}

#[derive(derive_more::Debug)]
pub struct SectionObject {
    #[debug(skip)]
    site: Arc<Site>,
    section: SectionRef,
}

impl SectionObject {
    pub fn detached(site: &Arc<Site>, section: Section) -> Value {
        let section = SectionRef::Detached(Arc::new(section));
        Value::from_object(SectionObject { site: site.clone(), section })
    }

    fn section(&self) -> &Section {
        match &self.section {
            SectionRef::Id(id) => &self.site[*id],
            SectionRef::Detached(section) => section.as_ref(),
        }
    }
}

impl Object for SectionObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let site = &self.site;
        let section = self.section();
        let value = match key.as_str()? {
            "name" => match &self.section {
                SectionRef::Id(id) => Value::from(site.section_name(*id)),
                SectionRef::Detached(section) => Value::from(section.title.as_str()),
            },
            "title" => Value::from(section.title.as_str()),
            "slug" => Value::from(section.slug.as_str()),
            "lang" => Value::from(section.lang.as_str()),
            "path" => Value::from(section.path.as_str()),
            "permalink" => Value::from(section.permalink.as_str()),
            "content" => Value::from_safe_string(section.content.clone()),
            "meta" => meta(&section.meta),
            "pages" => list(site, section.pages.clone()),
            "hidden_pages" => list(site, section.hidden_pages.clone()),
            "section_pages" => list(site, section.section_pages.clone()),
            "children" => list(site, section.children.clone()),
            "parent" => section.parent?.value(site),
            key => section.meta.get(key).cloned()?.into(),
        };

        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&[
            "name", "title", "slug", "lang", "path", "permalink", "content", "meta",
            "pages", "hidden_pages", "section_pages", "children",
        ])
    }
}

#[derive(derive_more::Debug)]
pub struct TaxonomyObject {
    #[debug(skip)]
    site: Arc<Site>,
    id: TaxonomyId,
}

impl Object for TaxonomyObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let taxonomy = &self.site[self.id];
        let value = match key.as_str()? {
            "name" => Value::from(taxonomy.name.as_str()),
            "lang" => Value::from(taxonomy.lang.as_str()),
            "path" => Value::from(taxonomy.path.as_str()),
            "permalink" => Value::from(taxonomy.permalink.as_str()),
            "meta" => meta(&taxonomy.meta),
            "terms" => list(&self.site, taxonomy.terms.clone()),
            key => taxonomy.meta.get(key).cloned()?.into(),
        };

        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name", "lang", "path", "permalink", "meta", "terms"])
    }
}

#[derive(derive_more::Debug)]
pub struct TermObject {
    #[debug(skip)]
    site: Arc<Site>,
    id: TermId,
}

impl Object for TermObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let term = &self.site[self.id];
        let value = match key.as_str()? {
            "name" => Value::from(term.name.as_str()),
            "full_name" => Value::from(term.full_name.as_str()),
            "slug" => Value::from(term.slug.as_str()),
            "path" => Value::from(term.path.as_str()),
            "permalink" => Value::from(term.permalink.as_str()),
            "pages" => list(&self.site, term.pages.clone()),
            "children" => list(&self.site, term.children.clone()),
            "parent" => term.parent?.value(&self.site),
            "taxonomy" => term.taxonomy.value(&self.site),
            _ => return None,
        };

        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&[
            "name", "full_name", "slug", "path", "permalink", "pages", "children", "taxonomy",
        ])
    }
}

/// The `get_section`, `get_section_url`, `get_taxonomy`, and
/// `get_taxonomy_url` template functions for `lang`.
pub fn helpers(site: &Arc<Site>, lang: &str) -> [(&'static str, Value); 4] {
    let (s, l) = (site.clone(), lang.to_string());
    let get_section = move |name: String| -> Value {
        s.find_section(&name, &l).map_or(Value::UNDEFINED, |id| id.value(&s))
    };

    let (s, l) = (site.clone(), lang.to_string());
    let get_section_url = move |name: String| -> String {
        s.find_section(&name, &l).map(|id| s[id].permalink.clone()).unwrap_or_default()
    };

    let (s, l) = (site.clone(), lang.to_string());
    let get_taxonomy = move |name: String| -> Value {
        s.find_taxonomy(&name, &l).map_or(Value::UNDEFINED, |id| id.value(&s))
    };

    let (s, l) = (site.clone(), lang.to_string());
    let get_taxonomy_url = move |kind: String, terms: Rest<String>| -> String {
        let Some(taxonomy) = s.find_taxonomy(&kind, &l) else {
            return String::new();
        };

        match terms.first() {
            Some(term) => s.find_term(taxonomy, term)
                .map(|id| s[id].permalink.clone())
                .unwrap_or_default(),
            None => s[taxonomy].permalink.clone(),
        }
    };

    [
        ("get_section", Value::from_function(get_section)),
        ("get_section_url", Value::from_function(get_section_url)),
        ("get_taxonomy", Value::from_function(get_taxonomy)),
        ("get_taxonomy_url", Value::from_function(get_taxonomy_url)),
    ]
}
