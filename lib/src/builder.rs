//! Builders: the top-level units of a site build.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use jwalk::WalkDir;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Chainable, Result};
use crate::filter::Filter;
use crate::hook::{HookRegistry, Hooks};
use crate::reader::Readers;
use crate::site::{Context, Scanner, Site, Taxonomy};
use crate::templating::Engine;
use crate::util::{file_base_name, file_extension, format_time, replace_vars, time};
use crate::writer::{Stats, WriteSet, Writer};

/// One independent part of a site build.
pub trait Builder: Send + Sync {
    /// The source directories this builder reads.
    fn dirs(&self) -> Vec<PathBuf>;

    fn build(&self) -> Result<()>;
}

/// Something that can be told which directories to watch for changes.
pub trait Watch {
    fn watch(&mut self, dir: &Path) -> Result<()>;
}

/// Builders that run in parallel.
#[derive(Default)]
pub struct Builders(Vec<Box<dyn Builder>>);

impl Builders {
    pub fn new() -> Self {
        Builders::default()
    }

    pub fn push<B: Builder + 'static>(&mut self, builder: B) {
        self.0.push(Box::new(builder));
    }

    /// Registers every builder's directories with `watch`, then builds.
    pub fn build_watched(&self, watch: Option<&mut dyn Watch>) -> Result<()> {
        if let Some(watch) = watch {
            for dir in self.dirs() {
                watch.watch(&dir)?;
            }
        }

        self.build()
    }
}

impl Builder for Builders {
    fn dirs(&self) -> Vec<PathBuf> {
        self.0.iter().flat_map(|builder| builder.dirs()).collect()
    }

    /// Runs every builder at once. A failing builder is logged; the others
    /// still finish, and the composite succeeds.
    fn build(&self) -> Result<()> {
        rayon::scope(|scope| {
            for builder in &self.0 {
                scope.spawn(move |_| if let Err(e) = builder.build() {
                    tracing::error!("build failed:\n{e}");
                });
            }
        });

        Ok(())
    }
}

/// Builds the content graph from a content directory and writes it.
pub struct PageBuilder {
    config: Arc<Config>,
    engine: Arc<dyn Engine>,
    readers: Arc<Readers>,
    registry: Arc<HookRegistry>,
    filter: Option<Filter>,
}

impl PageBuilder {
    /// A builder using `site.filter`, if set, as the global page filter.
    ///
    /// Fails if `site.filter` isn't a valid expression.
    pub fn new(
        config: Arc<Config>,
        engine: Arc<dyn Engine>,
        readers: Arc<Readers>,
        registry: Arc<HookRegistry>,
    ) -> Result<Self> {
        let filter = Filter::parse(&config.get_string("site.filter"))
            .chain_with(|| error!("invalid `site.filter`"))?;

        Ok(PageBuilder { config, engine, readers, registry, filter })
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scans the content directory into a linked, grouped graph.
    pub fn scan(&self, hooks: &Hooks) -> Result<Site> {
        let config = &*self.config;
        if !config.content.is_dir() {
            return err!("content directory not found", "path" => config.content.display());
        }

        let predicate = self.filter.as_ref().map(|filter| filter.compile()).transpose()?;
        let languages = config.languages();
        let context = Context::new(languages.clone(), predicate);
        let scanner = Scanner {
            config,
            readers: &self.readers,
            hooks,
            context: &context,
            now: Local::now().naive_local(),
        };

        let files = discover(&config.content, &self.readers);
        info!(files = files.len(), languages = ?languages, "scanning");
        for lang in &languages {
            scanner.section(&config.content, lang);
        }

        files.par_iter().for_each(|file| {
            scanner.insert_page(file);
        });

        let mut site = context.into_site();
        time!("link", link(&mut site));
        time!("group", group(&mut site, config));
        Ok(site)
    }

    /// Runs the before-write hooks over `site` and writes everything they
    /// keep. Empty non-root sections are not written.
    pub fn write(&self, mut site: Site, hooks: &Hooks) -> Result<Stats> {
        let mut set = WriteSet::default();
        for lang in site.languages().to_vec() {
            let lists = site.lists(&lang);
            for bucket in [lists.pages, lists.hidden_pages, lists.section_pages] {
                set.pages.extend(hooks.before_pages_write(&mut site, bucket));
            }
        }

        let sections = site.sections.iter()
            .filter(|section| section.is_root() || !section.is_empty())
            .map(|section| section.id)
            .collect();

        set.sections = hooks.before_sections_write(&mut site, sections);

        let taxonomies = site.taxonomies.iter().map(|taxonomy| taxonomy.id).collect();
        set.taxonomies = hooks.before_taxonomies_write(&mut site, taxonomies);

        let terms = set.taxonomies.iter()
            .flat_map(|&taxonomy| site.terms_depth_first(taxonomy))
            .collect();

        set.terms = hooks.before_terms_write(&mut site, terms);

        let writer = Writer::new(&self.config, &*self.engine, Arc::new(site));
        let jobs = writer.jobs(&set);
        info!(jobs = jobs.len(), workers = self.config.workers(), "writing");
        writer.run(jobs, self.config.workers())
    }

    /// One full build: a fresh hook chain, scan, then write.
    pub fn run(&self) -> Result<Stats> {
        let hooks = self.registry.chain(&self.config);
        let site = time!("scan", self.scan(&hooks))?;
        let stats = time!("write", self.write(site, &hooks))?;
        info!(written = stats.written, failed = stats.failed, "build finished");
        Ok(stats)
    }
}

impl Builder for PageBuilder {
    fn dirs(&self) -> Vec<PathBuf> {
        vec![self.config.content.clone()]
    }

    fn build(&self) -> Result<()> {
        self.run().map(|_| ())
    }
}

/// Every content file under `root` with a registered extension, except
/// section index files, in sorted order.
fn discover(root: &Path, readers: &Readers) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort(true)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path())
        .filter(|path| file_extension(path).map_or(false, |ext| readers.get(ext).is_some()))
        .filter(|path| !file_base_name(path).starts_with("_index"))
        .collect()
}

/// Orders every page list and links the global and per-section chains.
fn link(site: &mut Site) {
    for lang in site.languages().to_vec() {
        let Some(root) = site.root(&lang) else {
            continue;
        };

        let orderby = site[root].meta.get_string("orderby");
        let lists = site.lists(&lang);
        let pages = site.order_pages(&lists.pages, &orderby);
        let hidden_pages = site.order_pages(&lists.hidden_pages, &orderby);
        let section_pages = site.order_pages(&lists.section_pages, &orderby);
        site.link_pages(&pages, false);

        let lists = site.lists_mut(&lang);
        lists.pages = pages;
        lists.hidden_pages = hidden_pages;
        lists.section_pages = section_pages;
    }

    for i in 0..site.sections.len() {
        let section = &site.sections[i];
        let orderby = section.meta.get_string("orderby");
        let pages = site.order_pages(&section.pages, &orderby);
        let hidden_pages = site.order_pages(&section.hidden_pages, &orderby);
        let section_pages = site.order_pages(&section.section_pages, &orderby);
        let children = site.order_sections(&section.children, &section.meta.get_string("sections_orderby"));
        site.link_pages(&pages, true);

        let section = &mut site.sections[i];
        section.pages = pages;
        section.hidden_pages = hidden_pages;
        section.section_pages = section_pages;
        section.children = children;
    }
}

/// Builds every configured taxonomy in every language from the normal
/// pages, and computes taxonomy and term paths.
fn group(site: &mut Site, config: &Config) {
    let default_language = config.default_language();
    for lang in site.languages().to_vec() {
        let pages = site.lists(&lang).pages;
        for name in config.taxonomy_names() {
            let mut meta = config.map_at(&["taxonomies", "_default"]);
            meta.load(&config.map_at(&["taxonomies", name.as_str()]));
            if lang != default_language {
                meta.load(&config.map_at(&["languages", lang.as_str(), "taxonomies", name.as_str()]));
            }

            if meta.get_bool("disable") {
                continue;
            }

            if let Some(format) = meta.get_string("group_by").strip_prefix("date:") {
                if format_time(&NaiveDateTime::default(), format).is_none() {
                    warn!(taxonomy = %name, lang = %lang, format, "invalid date format, skipping taxonomy");
                    continue;
                }
            }

            let mut taxonomy = Taxonomy::new(&name, &lang, meta);
            let path = replace_vars(&taxonomy.meta.get_string("path"), &[("{taxonomy}", name.as_str())]);
            taxonomy.path = config.rel_url(&path, &lang);
            taxonomy.permalink = config.url(&taxonomy.path);

            let id = site.insert_taxonomy(taxonomy);
            site.group(id, &pages);

            let orderby = site[id].meta.get_string("orderby");
            let term_path = site[id].meta.get_string("term_path");
            for term in site.terms_depth_first(id) {
                let vars = [
                    ("{taxonomy}", name.as_str()),
                    ("{term}", site[term].full_name.as_str()),
                    ("{term:slug}", site[term].slug.as_str()),
                ];

                let path = config.rel_url(&replace_vars(&term_path, &vars), &lang);
                let pages = site.order_pages(&site[term].pages, &orderby);
                let term = &mut site[term];
                term.permalink = config.url(&path);
                term.path = path;
                term.pages = pages;
            }
        }
    }
}
