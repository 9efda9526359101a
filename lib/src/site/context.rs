use std::path::Path;

use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::config::Config;
use crate::filter::Predicate;
use crate::hook::Hooks;
use crate::reader::Readers;
use crate::site::{SectionId, Site};

/// The shared, lock-guarded state of one build's scan.
///
/// A context is created empty for every build and consumed by
/// [`Context::into_site()`] once scanning finishes.
#[derive(Debug)]
pub struct Context<'f> {
    site: Mutex<Site>,
    filter: Option<Predicate<'f>>,
}

impl<'f> Context<'f> {
    pub fn new(languages: Vec<String>, filter: Option<Predicate<'f>>) -> Self {
        Context { site: Mutex::new(Site::new(languages)), filter }
    }

    /// Runs `f` with exclusive access to the graph.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut Site) -> R) -> R {
        f(&mut self.site.lock())
    }

    pub fn section_id(&self, dir: &Path, lang: &str) -> Option<SectionId> {
        self.with_lock(|site| site.section_id(dir, lang))
    }

    /// The global page exclusion filter, if one is configured.
    pub fn filter(&self) -> Option<&Predicate<'f>> {
        self.filter.as_ref()
    }

    pub fn into_site(self) -> Site {
        self.site.into_inner()
    }
}

/// Everything needed to turn content files into graph nodes.
///
/// A scanner is shared by reference across the scanning workers; all of its
/// mutation goes through [`Context::with_lock()`].
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    pub config: &'a Config,
    pub readers: &'a Readers,
    pub hooks: &'a Hooks,
    pub context: &'a Context<'a>,
    /// The instant undated pages are dated with.
    pub now: NaiveDateTime,
}
