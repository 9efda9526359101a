use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{Chainable, Result};
use crate::meta::Meta;
use crate::site::{PageId, Scanner, SectionId};
use crate::util::{file_base_name, file_extension, parse_time, replace_vars};
use crate::value::Value;

/// One content file, in one language.
#[derive(Debug, Clone)]
pub struct Page {
    pub file: Arc<Path>,
    pub meta: Meta,
    /// The page's `type`: its top-level section's name unless overridden.
    pub kind: String,
    pub lang: String,
    pub date: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub path: String,
    pub permalink: String,
    pub aliases: Vec<String>,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub section: SectionId,
    pub prev: Option<PageId>,
    pub next: Option<PageId>,
    pub prev_in_section: Option<PageId>,
    pub next_in_section: Option<PageId>,
}

/// The bucket a page is filed into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageKind {
    Normal,
    /// `hidden = true`: rendered, but kept out of listings and taxonomies.
    Hidden,
    /// `section = true`: rendered as an alternate view of its section.
    Section,
}

impl Page {
    /// An unregistered page with empty metadata dated `date`.
    pub fn new<P: AsRef<Path>>(file: P, section: SectionId, lang: &str, date: NaiveDateTime) -> Self {
        Page {
            file: Arc::from(file.as_ref()),
            meta: Meta::new(),
            kind: String::new(),
            lang: lang.to_string(),
            date,
            modified: date,
            path: String::new(),
            permalink: String::new(),
            aliases: vec![],
            title: String::new(),
            summary: String::new(),
            content: String::new(),
            section,
            prev: None,
            next: None,
            prev_in_section: None,
            next_in_section: None,
        }
    }

    pub fn kind(&self) -> PageKind {
        if self.is_hidden() {
            PageKind::Hidden
        } else if self.is_section() {
            PageKind::Section
        } else {
            PageKind::Normal
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.meta.get_bool("hidden")
    }

    pub fn is_section(&self) -> bool {
        self.meta.get_bool("section")
    }

    pub fn is_normal(&self) -> bool {
        self.kind() == PageKind::Normal
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

/// Section keys that are copied down to a page under their page-level name.
const PAGE_SCOPED: [(&str, &str); 3] = [
    ("path", "page_path"),
    ("template", "page_template"),
    ("formats", "page_formats"),
];

impl Scanner<'_> {
    /// Reads `file` with the reader registered for its extension.
    pub fn read(&self, file: &Path) -> Result<Meta> {
        let ext = file_extension(file).unwrap_or_default();
        let Some(reader) = self.readers.get(ext) else {
            return err!("no reader for file extension", "file" => file.display());
        };

        let input = fs::read_to_string(file)
            .chain_with(|| error!("failed to read content file", "file" => file.display()))?;

        reader.read(&input)
            .chain_with(|| error!("failed to parse content file", "file" => file.display()))
    }

    /// Determines the language of `file`: an explicit `lang` key, then a
    /// `name.<lang>.<ext>` suffix, then the default language.
    pub fn find_lang(&self, file: &Path, meta: &Meta) -> String {
        if let Some(lang) = meta.get("lang").and_then(|v| v.as_str()) {
            if self.config.is_language(lang) {
                return lang.to_string();
            }
        }

        let stem = file_base_name(file);
        match stem.rsplit_once('.') {
            Some((_, lang)) if self.config.is_language(lang) => lang.to_string(),
            _ => self.config.default_language(),
        }
    }

    /// Reads `file`, derives its page, and files it into the graph.
    ///
    /// Returns `None` if the file can't be read, is ignored by its section,
    /// or is dropped by a hook or the global filter.
    pub fn insert_page(&self, file: &Path) -> Option<PageId> {
        let filemeta = match self.read(file) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(file = %file.display(), "skipping unreadable content file:\n{e}");
                return None;
            }
        };

        let lang = self.find_lang(file, &filemeta);
        let section_id = self.section(file.parent()?, &lang);
        let file_name = file.file_name()?.to_string_lossy();
        let (mut meta, kind, name, section_slug, is_root, ignored) = self.context.with_lock(|site| {
            let section = &site[section_id];
            (
                section.meta.clone(),
                site.section_first_name(section_id),
                site.section_name(section_id),
                section.slug.clone(),
                section.is_root(),
                section.ignores(&file_name),
            )
        });

        if ignored {
            debug!(file = %file.display(), "ignored by section");
            return None;
        }

        // Section pages render as sections: only the path is page-scoped.
        let section_page = filemeta.get_bool("section");
        for (key, section_key) in PAGE_SCOPED {
            if section_page && key != "path" {
                continue;
            }

            match meta.get(section_key).cloned() {
                Some(value) => meta.insert(key, value),
                None => { meta.remove(key); }
            }
        }

        meta.remove("slug");
        meta.remove("title");
        meta.load(&filemeta);

        let mut page = Page::new(file, section_id, &lang, self.now);
        page.kind = kind;
        let mut modified = None;
        for (key, value) in meta.iter() {
            if matches!(value, Value::String(s) if s.is_empty()) {
                continue;
            }

            match key {
                "type" => page.kind = value.cast_string(),
                "title" => page.title = value.cast_string(),
                "date" => if let Some(date) = parse_time(&value.cast_string()) {
                    page.date = date;
                },
                "modified" => modified = parse_time(&value.cast_string()),
                "url" | "save_as" => page.path = value.cast_string(),
                "aliases" => page.aliases = value.cast_string_slice(),
                "summary" => page.summary = value.cast_string(),
                "content" => page.content = value.cast_string(),
                _ => {}
            }
        }

        page.modified = modified.unwrap_or(page.date);
        let mut filename = file_base_name(file);
        if let Some((stem, suffix)) = filename.rsplit_once('.') {
            if suffix == lang {
                filename = stem.to_string();
            }
        }

        if filename == "index" && !is_root {
            filename = file.parent()
                .and_then(|dir| dir.file_name())
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or(filename);
        }

        if page.title.is_empty() {
            page.title = filename.clone();
        }

        if page.path.is_empty() {
            let slug = match meta.get_string("slug") {
                slug if slug.is_empty() => self.config.slug(&page.title),
                slug => slug,
            };

            let vars = [
                ("{date:%Y}", page.date.format("%Y").to_string()),
                ("{date:%m}", page.date.format("%m").to_string()),
                ("{date:%d}", page.date.format("%d").to_string()),
                ("{date:%H}", page.date.format("%H").to_string()),
                ("{filename}", filename),
                ("{section}", name),
                ("{section:slug}", section_slug),
                ("{slug}", slug),
            ];

            page.path = replace_vars(&meta.get_string("path"), &vars);
        }

        page.path = self.config.rel_url(&page.path, &lang);
        page.permalink = self.config.url(&page.path);
        page.meta = meta;

        let Some(page) = self.hooks.after_page_parse(page) else {
            debug!(file = %file.display(), "dropped by hook");
            return None;
        };

        if let Some(filter) = self.context.filter() {
            if !filter.matches(&page) {
                debug!(file = %file.display(), "excluded by filter");
                return None;
            }
        }

        Some(self.context.with_lock(|site| site.insert_page(page)))
    }
}
