use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::meta::Meta;
use crate::site::{Pages, Scanner, SectionId, Sections};
use crate::util::{replace_vars, slugify_path};

/// Keys describing one section that a child section must not inherit.
const NOT_INHERITED: [&str; 4] = ["title", "slug", "content", "ignore_files"];

/// A directory of content in one language.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: SectionId,
    pub dir: Arc<Path>,
    pub lang: String,
    /// Inherited and own metadata, fully resolved.
    pub meta: Meta,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub path: String,
    pub permalink: String,
    pub pages: Pages,
    pub hidden_pages: Pages,
    pub section_pages: Pages,
    pub parent: Option<SectionId>,
    pub children: Sections,
    pub ignore: Vec<Regex>,
}

impl Section {
    /// An unregistered section with empty metadata.
    pub fn new<P: AsRef<Path>>(dir: P, lang: &str, parent: Option<SectionId>) -> Self {
        Section {
            id: SectionId(0),
            dir: Arc::from(dir.as_ref()),
            lang: lang.to_string(),
            meta: Meta::new(),
            title: String::new(),
            slug: String::new(),
            content: String::new(),
            path: String::new(),
            permalink: String::new(),
            pages: vec![],
            hidden_pages: vec![],
            section_pages: vec![],
            parent,
            children: vec![],
            ignore: vec![],
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// `true` if the section has no pages of any kind and no children.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
            && self.hidden_pages.is_empty()
            && self.section_pages.is_empty()
            && self.children.is_empty()
    }

    /// `true` if `file_name` matches one of the `ignore_files` patterns.
    pub fn ignores(&self, file_name: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(file_name))
    }
}

impl Scanner<'_> {
    /// Returns the section for `dir` in `lang`, building it and every
    /// missing ancestor first.
    ///
    /// Building happens outside the context lock; only the final
    /// registration takes it, and a section registered concurrently by
    /// another worker wins over the one built here.
    pub fn section(&self, dir: &Path, lang: &str) -> SectionId {
        if let Some(id) = self.context.section_id(dir, lang) {
            return id;
        }

        let parent = match dir == self.config.content.as_path() {
            true => None,
            false => dir.parent()
                .filter(|parent| parent.starts_with(&self.config.content))
                .map(|parent| self.section(parent, lang)),
        };

        let mut section = Section::new(dir, lang, parent);
        let own = self.read_index(dir, lang);
        let name = match parent {
            Some(parent) => {
                let title = dir.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let (parent_name, mut meta) = self.context.with_lock(|site| {
                    (site.section_name(parent), site[parent].meta.clone())
                });

                for key in NOT_INHERITED {
                    meta.remove(key);
                }

                section.meta = meta;
                section.title = title.clone();
                match parent_name.is_empty() {
                    true => title,
                    false => format!("{parent_name}/{title}"),
                }
            }
            None => {
                section.meta = self.config.get_string_map("sections._default");
                String::new()
            }
        };

        section.meta.load(&own);
        if parent.is_some() {
            section.meta.load(&self.config.map_at(&["sections", name.as_str()]));
            if lang != self.config.default_language() {
                let path = ["languages", lang, "sections", name.as_str()];
                section.meta.load(&self.config.map_at(&path));
            }
        }

        let meta = &section.meta;
        if let Some(title) = meta.get("title").map(|v| v.cast_string()).filter(|t| !t.is_empty()) {
            section.title = title;
        }

        section.content = meta.get_string("content");
        section.slug = match meta.get_string("slug") {
            slug if slug.is_empty() => slugify_path(&name),
            slug => slug,
        };

        let vars = [("{section}", name.as_str()), ("{section:slug}", section.slug.as_str())];
        let path = replace_vars(&meta.get_string("path"), &vars);
        section.path = self.config.rel_url(&path, lang);
        section.permalink = self.config.url(&section.path);
        section.ignore = meta.get_string_slice("ignore_files")
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(dir = %dir.display(), pattern, "ignoring invalid pattern: {e}");
                    None
                }
            })
            .collect();

        debug!(dir = %dir.display(), lang, name, "section");
        self.context.with_lock(|site| site.insert_section(section))
    }

    /// Reads the metadata of `dir`'s index file in `lang`, if there is one.
    fn read_index(&self, dir: &Path, lang: &str) -> Meta {
        let stem = match lang == self.config.default_language() {
            true => "_index".to_string(),
            false => format!("_index.{lang}"),
        };

        for ext in self.readers.extensions() {
            let file = dir.join(format!("{stem}.{ext}"));
            if !file.is_file() {
                continue;
            }

            match self.read(&file) {
                Ok(meta) => return meta,
                Err(e) => warn!(file = %file.display(), "skipping unreadable index:\n{e}"),
            }
        }

        Meta::new()
    }
}
