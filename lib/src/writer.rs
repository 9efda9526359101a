//! The concurrent write stage.
//!
//! Every finalized graph node becomes one [`Job`]. Jobs run on a bounded
//! rayon pool; [`Writer::run()`] returns once every job has finished. A job
//! that fails is logged and counted but never stops its siblings.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::ThreadPoolBuilder;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::filter::Filter;
use crate::meta::Meta;
use crate::site::{paginate, PageId, Pages, Section, SectionId, Sections, Site, TaxonomyId, TermId};
use crate::templating::objects::{self, Node, PaginatorObject, SectionObject};
use crate::templating::{output_file, Engine, Template, Vars};
use crate::util::replace_vars;

/// One unit of rendering work.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Job {
    Page(PageId),
    Section(SectionId),
    Taxonomy(TaxonomyId),
    Term(TermId),
}

/// The collections handed to the writer after the before-write hooks.
#[derive(Debug, Default, Clone)]
pub struct WriteSet {
    pub pages: Pages,
    pub sections: Sections,
    pub taxonomies: Vec<TaxonomyId>,
    pub terms: Vec<TermId>,
}

/// How many files a write produced and how many jobs failed.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Stats {
    pub written: usize,
    pub failed: usize,
}

pub struct Writer<'a> {
    config: &'a Config,
    engine: &'a dyn Engine,
    site: Arc<Site>,
    globals: FxHashMap<String, Vars>,
    written: AtomicUsize,
    failed: AtomicUsize,
}

impl<'a> Writer<'a> {
    pub fn new(config: &'a Config, engine: &'a dyn Engine, site: Arc<Site>) -> Self {
        let settings = config.settings();
        let globals = site.languages().iter()
            .map(|lang| {
                let mut vars = Vars::new();
                vars.insert("pages", objects::list(&site, site.lists(lang).pages));
                vars.insert("sections", objects::list(&site, site.sections_in(lang)));
                vars.insert("taxonomies", objects::list(&site, site.taxonomies_in(lang)));
                vars.insert("site", settings.get("site").cloned().unwrap_or_default().into());
                vars.extend(objects::helpers(&site, lang));
                (lang.clone(), vars)
            })
            .collect();

        Writer {
            config,
            engine,
            site,
            globals,
            written: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// The jobs for `set` in submission order: pages, then sections, then
    /// each taxonomy followed by its terms. Every collection keeps the order
    /// the hooks left it in.
    pub fn jobs(&self, set: &WriteSet) -> Vec<Job> {
        let mut terms: FxHashMap<TaxonomyId, Vec<TermId>> = FxHashMap::default();
        for &term in &set.terms {
            terms.entry(self.site[term].taxonomy).or_default().push(term);
        }

        let mut jobs: Vec<Job> = set.pages.iter().map(|&id| Job::Page(id)).collect();
        jobs.extend(set.sections.iter().map(|&id| Job::Section(id)));
        for &taxonomy in &set.taxonomies {
            jobs.push(Job::Taxonomy(taxonomy));
            jobs.extend(terms.remove(&taxonomy).into_iter().flatten().map(Job::Term));
        }

        jobs
    }

    /// Runs `jobs` on a pool of `workers` threads and waits for all of them.
    pub fn run(&self, jobs: Vec<Job>, workers: usize) -> Result<Stats> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("writer-{i}"))
            .build()?;

        pool.scope(|scope| {
            for job in jobs {
                scope.spawn(move |_| self.isolated(job));
            }
        });

        Ok(self.stats())
    }

    pub fn stats(&self) -> Stats {
        Stats {
            written: self.written.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    /// Runs `job`, counting a panic as one failed job.
    fn isolated(&self, job: Job) {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| self.job(job))) {
            let reason = panic.downcast_ref::<&str>().copied()
                .or_else(|| panic.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown cause");

            tracing::error!(?job, "job panicked: {reason}");
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn job(&self, job: Job) {
        match job {
            Job::Page(id) => self.write_page(id),
            Job::Section(id) => self.write_section(id),
            Job::Taxonomy(id) => self.write_taxonomy(id),
            Job::Term(id) => self.write_term(id),
        }
    }

    /// Renders `template` to the file for the site-relative `path`. Job
    /// bindings in `vars` win over the build-wide ones.
    fn write(&self, template: &Template<'_>, path: &str, lang: &str, mut vars: Vars) {
        if path.is_empty() {
            return;
        }

        if let Some(globals) = self.globals.get(lang) {
            for (key, value) in globals {
                vars.entry(*key).or_insert_with(|| value.clone());
            }
        }

        vars.entry("current_url").or_insert_with(|| self.config.url(path).into());
        vars.entry("current_path").or_insert_with(|| path.into());
        vars.entry("current_lang").or_insert_with(|| lang.into());
        vars.entry("current_template").or_insert_with(|| template.name().into());

        let file = output_file(&self.config.output, path);
        match template.write(&file, &vars) {
            Ok(()) => {
                debug!(path, template = template.name(), "wrote");
                self.written.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                tracing::error!(path, template = template.name(), "write failed:\n{e}");
                self.failed.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    fn lookup(&self, names: &[&str]) -> Option<Template<'a>> {
        let template = self.engine.lookup(names);
        if template.is_none() {
            warn!(?names, "no template found");
        }

        template
    }

    fn write_page(&self, id: PageId) {
        let page = &self.site[id];
        if page.is_section() {
            return self.write_section_page(id);
        }

        let mut vars = Vars::new();
        vars.insert("page", id.value(&self.site));

        let template = page.meta.get_string("template");
        let by_type = format!("{}/page.html", page.kind);
        let names = [template.as_str(), by_type.as_str(), "page.html", "_default/page.html"];
        if let Some(template) = self.lookup(&names) {
            self.write(&template, &page.path, &page.lang, vars.clone());
        }

        if !page.aliases.is_empty() {
            if let Some(template) = self.lookup(&["alias.html", "_default/alias.html"]) {
                for alias in &page.aliases {
                    let path = self.config.rel_url(alias, &page.lang);
                    self.write(&template, &path, &page.lang, vars.clone());
                }
            }
        }

        let section = &self.site[page.section];
        let slug = match page.meta.get_string("slug") {
            slug if slug.is_empty() => self.config.slug(&page.title),
            slug => slug,
        };

        let path_vars = [
            ("{section}", self.site.section_name(page.section)),
            ("{section:slug}", section.slug.clone()),
            ("{slug}", slug),
            ("{type}", page.kind.clone()),
        ];

        self.write_formats(&page.meta, &path_vars, &page.lang, vars);
    }

    /// Writes a `section = true` page as a detached section listing every
    /// normal page below its own section.
    fn write_section_page(&self, id: PageId) {
        let page = &self.site[id];
        if page.path.is_empty() {
            return;
        }

        let meta = &page.meta;
        let pages = Filter::apply(&meta.get_string("filter"), self.site.all_pages(page.section)
            .into_iter()
            .map(|id| (id, &self.site[id])));

        let mut section = Section::new(&*page.file, &page.lang, None);
        section.meta = meta.clone();
        section.title = page.title.clone();
        section.content = page.content.clone();
        section.slug = self.config.slug(&page.title);
        section.path = page.path.clone();
        section.permalink = page.permalink.clone();
        section.pages = self.site.order_pages(&pages, &meta.get_string("orderby"));

        let name = section.title.clone();
        self.write_list(&section, &name, SectionObject::detached(&self.site, section.clone()));
    }

    fn write_section(&self, id: SectionId) {
        let section = &self.site[id];
        let name = self.site.section_name(id);
        self.write_list(section, &name, id.value(&self.site));
    }

    /// Writes the paginated list pages and formats of `section`.
    fn write_list(&self, section: &Section, name: &str, object: minijinja::Value) {
        let meta = &section.meta;
        let path_vars = [
            ("{section}", name.to_string()),
            ("{section:slug}", section.slug.clone()),
        ];

        let pages = objects::list(&self.site, section.pages.clone());
        if !section.path.is_empty() {
            let template = replace_vars(&meta.get_string("template"), &path_vars);
            let names = [template.as_str(), "section.html", "_default/section.html"];
            if let Some(template) = self.lookup(&names) {
                for paginator in self.paginate(&section.pages, meta, &section.path) {
                    let mut vars = Vars::new();
                    let url = paginator.url.clone();
                    vars.insert("section", object.clone());
                    vars.insert("pages", pages.clone());
                    vars.insert("current_index", paginator.number.into());
                    vars.insert("paginator", PaginatorObject::new(&self.site, paginator));
                    self.write(&template, &url, &section.lang, vars);
                }
            }
        }

        let mut vars = Vars::new();
        vars.insert("section", object);
        vars.insert("pages", pages);
        self.write_formats(meta, &path_vars, &section.lang, vars);
    }

    fn write_taxonomy(&self, id: TaxonomyId) {
        let taxonomy = &self.site[id];
        if taxonomy.path.is_empty() {
            return;
        }

        let path_vars = [("{taxonomy}", taxonomy.name.clone())];
        let template = replace_vars(&taxonomy.meta.get_string("template"), &path_vars);
        let by_name = format!("{}/taxonomy.html", taxonomy.name);
        let names = [template.as_str(), by_name.as_str(), "taxonomy.html", "_default/taxonomy.html"];
        if let Some(template) = self.lookup(&names) {
            let mut vars = Vars::new();
            vars.insert("taxonomy", id.value(&self.site));
            vars.insert("terms", objects::list(&self.site, taxonomy.terms.clone()));
            self.write(&template, &taxonomy.path, &taxonomy.lang, vars);
        }
    }

    fn write_term(&self, id: TermId) {
        let term = &self.site[id];
        let taxonomy = &self.site[term.taxonomy];
        let meta = &taxonomy.meta;
        let path_vars = [
            ("{taxonomy}", taxonomy.name.clone()),
            ("{term}", term.full_name.clone()),
            ("{term:slug}", term.slug.clone()),
        ];

        let pages = objects::list(&self.site, term.pages.clone());
        if !term.path.is_empty() {
            let template = replace_vars(&meta.get_string("term_template"), &path_vars);
            let by_name = format!("{}/taxonomy.terms.html", taxonomy.name);
            let names = [
                template.as_str(),
                by_name.as_str(),
                "taxonomy.terms.html",
                "_default/taxonomy.terms.html",
            ];

            if let Some(template) = self.lookup(&names) {
                for paginator in self.paginate(&term.pages, meta, &term.path) {
                    let mut vars = Vars::new();
                    let url = paginator.url.clone();
                    vars.insert("term", id.value(&self.site));
                    vars.insert("pages", pages.clone());
                    vars.insert("taxonomy", term.taxonomy.value(&self.site));
                    vars.insert("current_index", paginator.number.into());
                    vars.insert("paginator", PaginatorObject::new(&self.site, paginator));
                    self.write(&template, &url, &taxonomy.lang, vars);
                }
            }
        }

        let mut vars = Vars::new();
        vars.insert("term", id.value(&self.site));
        vars.insert("pages", pages);
        vars.insert("taxonomy", term.taxonomy.value(&self.site));
        self.write_formats(meta, &path_vars, &taxonomy.lang, vars);
    }

    /// Splits `pages` by the `paginate`, `paginate_path`, and
    /// `paginate_filter` settings in `meta`.
    fn paginate(&self, pages: &[PageId], meta: &Meta, base: &str) -> Vec<crate::site::Paginator<PageId>> {
        let filter = meta.get_string("paginate_filter");
        let pages = Filter::apply(&filter, pages.iter().map(|&id| (id, &self.site[id])));
        paginate(&pages, meta.get_int("paginate"), base, &meta.get_string("paginate_path"))
    }

    /// Writes each extra format named in `meta`'s `formats`, layered over
    /// the site-wide `formats` block.
    fn write_formats(&self, meta: &Meta, path_vars: &[(&str, String)], lang: &str, vars: Vars) {
        let formats = meta.get_string_map("formats");
        if formats.is_empty() {
            return;
        }

        let defaults = self.config.get_string_map("formats");
        for name in formats.keys() {
            let mut format = defaults.get_string_map(name);
            format.merge(&formats.get_string_map(name));

            let path = replace_vars(&format.get_string("path"), path_vars);
            let template = replace_vars(&format.get_string("template"), path_vars);
            if path.is_empty() || template.is_empty() {
                continue;
            }

            if let Some(template) = self.lookup(&[template.as_str()]) {
                let path = self.config.rel_url(&path, lang);
                self.write(&template, &path, lang, vars.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::tests::{page, site_with_sections};
    use crate::site::Taxonomy;

    #[derive(Debug)]
    struct Nothing;

    impl Engine for Nothing {
        fn contains(&self, _: &str) -> bool {
            false
        }

        fn render(&self, _: &str, _: &Vars) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn jobs_follow_submission_order() {
        let (mut site, root, blog, rust) = site_with_sections();
        let a = site.insert_page(page("a.md", blog, "A"));
        let mut p = page("b.md", blog, "B");
        p.meta.insert("tags", crate::value::Value::from(vec!["x/y", "z"]));
        let b = site.insert_page(p);

        let tags = site.insert_taxonomy(Taxonomy::new("tags", "en", Meta::new()));
        site.group(tags, &[b]);
        let x = site.find_term(tags, "x").unwrap();
        let y = site.find_term(tags, "x/y").unwrap();
        let z = site.find_term(tags, "z").unwrap();

        let config = Config::new("content", "public");
        let writer = Writer::new(&config, &Nothing, Arc::new(site));
        let set = WriteSet {
            pages: vec![b, a],
            sections: vec![root, blog, rust],
            taxonomies: vec![tags],
            terms: vec![z, y, x],
        };

        assert_eq!(writer.jobs(&set), vec![
            Job::Page(b), Job::Page(a),
            Job::Section(root), Job::Section(blog), Job::Section(rust),
            Job::Taxonomy(tags), Job::Term(z), Job::Term(y), Job::Term(x),
        ]);

        let dropped = WriteSet { terms: vec![z], ..set };
        assert_eq!(writer.jobs(&dropped)[5..], [Job::Taxonomy(tags), Job::Term(z)]);
    }

    #[derive(Debug)]
    struct Panicking;

    impl Engine for Panicking {
        fn contains(&self, _: &str) -> bool {
            true
        }

        fn render(&self, name: &str, _: &Vars) -> Result<String> {
            panic!("cannot render {name}");
        }
    }

    #[test]
    fn panicking_jobs_count_as_failures() {
        let (mut site, _, blog, _) = site_with_sections();
        let mut p = page("a.md", blog, "A");
        p.path = "/a.html".into();
        let a = site.insert_page(p);
        let mut p = page("b.md", blog, "B");
        p.path = "/b.html".into();
        let b = site.insert_page(p);

        let dir = tempfile::tempdir().unwrap();
        let config = Config::new("content", dir.path());
        let writer = Writer::new(&config, &Panicking, Arc::new(site));
        let jobs = writer.jobs(&WriteSet { pages: vec![a, b], ..WriteSet::default() });
        let stats = writer.run(jobs, 2).unwrap();
        assert_eq!(stats, Stats { written: 0, failed: 2 });
    }

    #[test]
    fn missing_templates_write_nothing() {
        let (mut site, _, blog, _) = site_with_sections();
        let mut p = page("a.md", blog, "A");
        p.path = "/a.html".into();
        let a = site.insert_page(p);

        let config = Config::new("content", "public");
        let writer = Writer::new(&config, &Nothing, Arc::new(site));
        let jobs = writer.jobs(&WriteSet { pages: vec![a], ..WriteSet::default() });
        let stats = writer.run(jobs, 4).unwrap();
        assert_eq!(stats, Stats::default());
    }
}
