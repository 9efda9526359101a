//! Content readers: turn the raw text of a content file into [`Meta`].

mod markdown;

pub use markdown::Markdown;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::meta::Meta;

/// Parses one kind of content file.
///
/// The returned metadata always carries `content` and `summary`.
pub trait Reader: Send + Sync {
    fn read(&self, input: &str) -> Result<Meta>;
}

/// The registered readers, keyed by file extension (without the dot).
#[derive(Default, Clone)]
pub struct Readers {
    readers: FxHashMap<String, Arc<dyn Reader>>,
}

impl Readers {
    pub fn new() -> Self {
        Readers::default()
    }

    /// Readers with [`Markdown`] registered for `md` and `markdown`.
    pub fn markdown() -> Self {
        let mut readers = Readers::new();
        let markdown: Arc<dyn Reader> = Arc::new(Markdown::new());
        readers.register_shared("md", markdown.clone());
        readers.register_shared("markdown", markdown);
        readers
    }

    pub fn register<R: Reader + 'static>(&mut self, ext: &str, reader: R) {
        self.register_shared(ext, Arc::new(reader));
    }

    pub fn register_shared(&mut self, ext: &str, reader: Arc<dyn Reader>) {
        self.readers.insert(ext.trim_start_matches('.').to_lowercase(), reader);
    }

    pub fn get(&self, ext: &str) -> Option<&dyn Reader> {
        self.readers.get(&ext.to_lowercase()).map(|r| r.as_ref())
    }

    /// Every registered extension, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<_> = self.readers.keys().map(|e| e.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}

impl fmt::Debug for Readers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readers")
            .field("extensions", &self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Reader for Plain {
        fn read(&self, input: &str) -> Result<Meta> {
            let mut meta = Meta::new();
            meta.insert("content", input);
            meta.insert("summary", input);
            Ok(meta)
        }
    }

    #[test]
    fn readers_are_keyed_by_extension() {
        let mut readers = Readers::markdown();
        readers.register(".TXT", Plain);

        assert_eq!(readers.extensions(), vec!["markdown", "md", "txt"]);
        assert!(readers.get("MD").is_some());
        assert!(readers.get("rst").is_none());

        let meta = readers.get("txt").unwrap().read("hi").unwrap();
        assert_eq!(meta.get_string("content"), "hi");
    }
}
