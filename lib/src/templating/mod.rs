//! The template capability: named lookup plus render-to-file.

pub mod minijinja;
pub mod objects;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Chainable, Result};

/// Variable bindings for one render.
pub type Vars = BTreeMap<&'static str, ::minijinja::Value>;

/// A set of named templates.
pub trait Engine: Send + Sync + Debug {
    /// Whether a template called `name` exists.
    fn contains(&self, name: &str) -> bool;

    fn render(&self, name: &str, vars: &Vars) -> Result<String>;
}

impl<'a> dyn Engine + 'a {
    /// The first of `names` this engine contains. Empty names are skipped,
    /// so an unset explicit template falls through to the defaults.
    pub fn lookup<'e>(&'e self, names: &[&str]) -> Option<Template<'e>> {
        names.iter()
            .filter(|name| !name.is_empty())
            .find(|name| self.contains(name))
            .map(|name| Template { engine: self, name: name.to_string() })
    }
}

/// A template found by [`Engine::lookup()`](dyn Engine::lookup()).
#[derive(Debug, Clone)]
pub struct Template<'e> {
    engine: &'e dyn Engine,
    name: String,
}

impl Template<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders this template with `vars` into the file at `path`, creating
    /// parent directories as needed.
    pub fn write(&self, path: &Path, vars: &Vars) -> Result<()> {
        let output = self.engine.render(&self.name, vars)
            .chain_with(|| error!("failed to render template", "template" => &self.name))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .chain_with(|| error!("failed to create directory", "path" => parent.display()))?;
        }

        fs::write(path, output)
            .chain_with(|| error!("failed to write output file", "path" => path.display()))
    }
}

/// The file under `root` that the site-relative URL `path` is written to.
///
/// A path that is empty or ends in `/` gets an `index.html` file name.
/// Parent and root components are dropped so output never escapes `root`.
///
/// ```
/// use std::path::Path;
/// use snowdrift::templating::output_file;
///
/// let root = Path::new("public");
/// assert_eq!(output_file(root, "/blog/a.html"), root.join("blog/a.html"));
/// assert_eq!(output_file(root, "/blog/"), root.join("blog/index.html"));
/// assert_eq!(output_file(root, "/"), root.join("index.html"));
/// assert_eq!(output_file(root, "/../x.html"), root.join("x.html"));
/// ```
pub fn output_file(root: &Path, path: &str) -> PathBuf {
    let mut file = root.to_path_buf();
    for component in Path::new(path).components() {
        if let Component::Normal(segment) = component {
            file.push(segment);
        }
    }

    if path.is_empty() || path.ends_with('/') {
        file.push("index.html");
    }

    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Names(Vec<&'static str>, Mutex<Vec<String>>);

    impl Engine for Names {
        fn contains(&self, name: &str) -> bool {
            self.0.contains(&name)
        }

        fn render(&self, name: &str, vars: &Vars) -> Result<String> {
            self.1.lock().unwrap().push(name.to_string());
            Ok(format!("{name}: {}", vars.len()))
        }
    }

    #[test]
    fn lookup_takes_the_first_existing_name() {
        let names = Names(vec!["_default/post.html", "page.html"], Mutex::default());
        let engine: &dyn Engine = &names;

        let found = engine.lookup(&["post.html", "_default/post.html"]).unwrap();
        assert_eq!(found.name(), "_default/post.html");

        let found = engine.lookup(&["", "page.html", "_default/post.html"]).unwrap();
        assert_eq!(found.name(), "page.html");

        assert!(engine.lookup(&["missing.html"]).is_none());
        assert!(engine.lookup(&[]).is_none());
    }

    #[test]
    fn write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let names = Names(vec!["page.html"], Mutex::default());
        let engine: &dyn Engine = &names;

        let path = output_file(dir.path(), "/a/b/");
        engine.lookup(&["page.html"]).unwrap().write(&path, &Vars::new()).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a/b/index.html")).unwrap(), "page.html: 0");
        assert_eq!(*names.1.lock().unwrap(), vec!["page.html"]);
    }
}
