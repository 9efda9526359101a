//! The hook pipeline: named extensions run at fixed points of a build.
//!
//! A [`HookRegistry`] maps names to constructors. Each build asks the
//! registry for its [`Hooks`] chain, which always starts with the built-in
//! `internal` hook (if registered) followed by the configured `hooks` names
//! in order. Hooks run synchronously in chain order, each one's output
//! feeding the next.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::site::{Page, Pages, Sections, Site, TaxonomyId, TermId};

/// An extension invoked at the lifecycle points of a build.
///
/// Every method defaults to passing its input through unchanged. Hooks
/// can't fail: they transform, reorder, or drop.
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    /// Called once per page after its derived fields are computed. Returning
    /// `None` drops the page.
    fn after_page_parse(&self, page: Page) -> Option<Page> {
        Some(page)
    }

    fn before_pages_write(&self, _site: &mut Site, pages: Pages) -> Pages {
        pages
    }

    fn before_sections_write(&self, _site: &mut Site, sections: Sections) -> Sections {
        sections
    }

    fn before_taxonomies_write(&self, _site: &mut Site, taxonomies: Vec<TaxonomyId>) -> Vec<TaxonomyId> {
        taxonomies
    }

    fn before_terms_write(&self, _site: &mut Site, terms: Vec<TermId>) -> Vec<TermId> {
        terms
    }
}

/// An ordered chain of hooks.
#[derive(Default)]
pub struct Hooks(Vec<Box<dyn Hook>>);

impl Hooks {
    pub fn new(hooks: Vec<Box<dyn Hook>>) -> Self {
        Hooks(hooks)
    }

    pub fn push<H: Hook + 'static>(&mut self, hook: H) {
        self.0.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|hook| hook.name()).collect()
    }

    pub fn after_page_parse(&self, page: Page) -> Option<Page> {
        self.0.iter().try_fold(page, |page, hook| hook.after_page_parse(page))
    }

    pub fn before_pages_write(&self, site: &mut Site, pages: Pages) -> Pages {
        self.0.iter().fold(pages, |pages, hook| hook.before_pages_write(site, pages))
    }

    pub fn before_sections_write(&self, site: &mut Site, sections: Sections) -> Sections {
        self.0.iter().fold(sections, |sections, hook| hook.before_sections_write(site, sections))
    }

    pub fn before_taxonomies_write(&self, site: &mut Site, taxonomies: Vec<TaxonomyId>) -> Vec<TaxonomyId> {
        self.0.iter().fold(taxonomies, |list, hook| hook.before_taxonomies_write(site, list))
    }

    pub fn before_terms_write(&self, site: &mut Site, terms: Vec<TermId>) -> Vec<TermId> {
        self.0.iter().fold(terms, |terms, hook| hook.before_terms_write(site, terms))
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

type Creator = Box<dyn Fn(&Config) -> Box<dyn Hook> + Send + Sync>;

/// The name of the hook that always runs first.
pub const INTERNAL: &str = "internal";

/// Constructors for every known hook, by name.
#[derive(Default)]
pub struct HookRegistry {
    creators: BTreeMap<String, Creator>,
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    /// A registry holding the built-in `internal` hook.
    pub fn with_builtins() -> Self {
        let mut registry = HookRegistry::new();
        registry.creators.insert(INTERNAL.into(), Box::new(Internal::create));
        registry
    }

    /// Registers `creator` under `name`. Registering a name twice is an
    /// error.
    pub fn register<F>(&mut self, name: &str, creator: F) -> Result<()>
        where F: Fn(&Config) -> Box<dyn Hook> + Send + Sync + 'static
    {
        if self.creators.contains_key(name) {
            return err!("hook registered twice", "name" => name);
        }

        self.creators.insert(name.to_string(), Box::new(creator));
        Ok(())
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.creators.keys().map(|name| name.as_str()).collect()
    }

    /// Instantiates the chain for one build: `internal` first, then each
    /// configured name in order. Unknown names are skipped with a warning.
    pub fn chain(&self, config: &Config) -> Hooks {
        let mut hooks = Hooks::default();
        if let Some(creator) = self.creators.get(INTERNAL) {
            hooks.0.push(creator(config));
        }

        for name in config.hooks() {
            if name == INTERNAL {
                continue;
            }

            match self.creators.get(&name) {
                Some(creator) => hooks.0.push(creator(config)),
                None => warn!(hook = %name, "skipping unknown hook"),
            }
        }

        hooks
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Drops draft pages.
#[derive(Debug, Clone, Copy)]
pub struct Internal;

impl Internal {
    fn create(_: &Config) -> Box<dyn Hook> {
        Box::new(Internal)
    }
}

impl Hook for Internal {
    fn name(&self) -> &str {
        INTERNAL
    }

    fn after_page_parse(&self, page: Page) -> Option<Page> {
        match page.meta.get_bool("draft") {
            true => None,
            false => Some(page),
        }
    }
}
