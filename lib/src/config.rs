use std::path::{Path, PathBuf};

use crate::error::{Chainable, Result};
use crate::meta::Meta;
use crate::util::slugify;
use crate::value::{Format, Toml, Value};

/// Settings every site starts from. User settings are merged on top.
const DEFAULTS: &[(&str, &str)] = &[
    ("site.url", "http://127.0.0.1:8000"),
    ("site.language", "en"),
    ("site.workers", "100"),
    ("sections._default.path", "{section:slug}/index.html"),
    ("sections._default.template", "section.html"),
    ("sections._default.orderby", "date desc"),
    ("sections._default.paginate", "10"),
    ("sections._default.paginate_path", "{name}{number}{extension}"),
    ("sections._default.page_path", "{section:slug}/{slug}.html"),
    ("sections._default.page_template", "page.html"),
    ("sections._default.sections_orderby", "weight"),
    ("taxonomies._default.path", "{taxonomy}/index.html"),
    ("taxonomies._default.term_path", "{taxonomy}/{term:slug}/index.html"),
    ("taxonomies._default.orderby", "date desc"),
    ("taxonomies._default.paginate", "10"),
    ("taxonomies._default.paginate_path", "{name}{number}{extension}"),
    ("taxonomies.tags.weight", "1"),
    ("taxonomies.categories.weight", "2"),
    ("formats.rss.template", "_default/rss.xml"),
    ("formats.atom.template", "_default/atom.xml"),
];

/// A fully resolved site configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory content files are read from.
    pub content: PathBuf,
    /// The directory rendered output is written to.
    pub output: PathBuf,
    settings: Meta,
}

impl Config {
    /// A configuration with only the built-in defaults.
    pub fn new<C: AsRef<Path>, O: AsRef<Path>>(content: C, output: O) -> Self {
        let mut settings = Meta::new();
        for (key, value) in DEFAULTS {
            settings.set(key, value);
        }

        Config {
            content: content.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            settings,
        }
    }

    /// A configuration with `user` merged over the built-in defaults.
    pub fn with_settings(mut self, user: &Meta) -> Self {
        self.settings.merge(user);
        self
    }

    /// Parses `toml` as user settings and merges them over the defaults.
    pub fn from_toml<C, O>(content: C, output: O, toml: &str) -> Result<Self>
        where C: AsRef<Path>, O: AsRef<Path>
    {
        let user: Meta = Toml::parse(toml).chain(error!("invalid site configuration"))?;
        Ok(Config::new(content, output).with_settings(&user))
    }

    pub fn settings(&self) -> &Meta {
        &self.settings
    }

    /// Sets a dotted `key` from a raw string, as [`Meta::set()`] does.
    pub fn set(&mut self, key: &str, raw: &str) {
        self.settings.set(key, raw);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.lookup(key)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| v.cast_string()).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).map(|v| v.cast_int()).unwrap_or(0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| v.cast_bool()).unwrap_or(false)
    }

    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.get(key).map(|v| v.cast_string_slice()).unwrap_or_default()
    }

    pub fn get_string_map(&self, key: &str) -> Meta {
        self.map_at(crate::util::split_trim(key, ".").as_slice())
    }

    /// The dict at the exact `path` of segments. Unlike dotted keys, a
    /// segment may itself contain `.` or `/`, as section names do.
    pub fn map_at<S: AsRef<str>>(&self, path: &[S]) -> Meta {
        match self.settings.lookup_path(path) {
            Some(Value::Dict(dict)) => Meta::from((**dict).clone()),
            _ => Meta::new(),
        }
    }

    pub fn default_language(&self) -> String {
        match self.get_string("site.language") {
            lang if lang.is_empty() => "en".into(),
            lang => lang,
        }
    }

    /// Every configured language, the default language first.
    pub fn languages(&self) -> Vec<String> {
        let default = self.default_language();
        let others = self.get_string_map("languages");
        let mut languages = vec![default.clone()];
        languages.extend(others.keys().filter(|l| *l != default).map(String::from));
        languages
    }

    pub fn is_language(&self, lang: &str) -> bool {
        lang == self.default_language()
            || self.settings.lookup_path(&["languages", lang]).is_some()
    }

    pub fn slug(&self, name: &str) -> String {
        slugify(name)
    }

    /// The site-relative URL for `path` in `lang`: always rooted at `/`,
    /// and prefixed with `/<lang>` for languages other than the default.
    /// An empty `path` stays empty.
    pub fn rel_url(&self, path: &str, lang: &str) -> String {
        if path.is_empty() {
            return String::new();
        }

        let path = path.trim_start_matches('/');
        match lang == self.default_language() || lang.is_empty() {
            true => format!("/{path}"),
            false => format!("/{lang}/{path}"),
        }
    }

    /// The absolute URL for the site-relative `rel` path.
    pub fn url(&self, rel: &str) -> String {
        if rel.is_empty() {
            return String::new();
        }

        let base = self.get_string("site.url");
        format!("{}/{}", base.trim_end_matches('/'), rel.trim_start_matches('/'))
    }

    /// The number of concurrent write workers, at least one.
    pub fn workers(&self) -> usize {
        match self.get_int("site.workers") {
            n if n > 0 => n as usize,
            _ => 1,
        }
    }

    /// The configured hook names, in order.
    pub fn hooks(&self) -> Vec<String> {
        self.get_string_slice("hooks")
    }

    /// The configured taxonomy names ordered by `weight` then name, without
    /// `_default` and disabled taxonomies.
    pub fn taxonomy_names(&self) -> Vec<String> {
        let taxonomies = self.get_string_map("taxonomies");
        let mut names: Vec<_> = taxonomies.iter()
            .filter(|(name, _)| *name != "_default")
            .filter_map(|(name, value)| {
                let dict = value.as_dict();
                let lookup = |key: &str| dict.and_then(|d| d.get(key));
                match lookup("disable").map(|v| v.cast_bool()).unwrap_or(false) {
                    true => None,
                    false => {
                        let weight = lookup("weight").map(|v| v.cast_int()).unwrap_or(0);
                        Some((weight, name.to_string()))
                    }
                }
            })
            .collect();

        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }
}
