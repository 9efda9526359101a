//! Page filter expressions.
//!
//! A filter is a template expression evaluated once per page; the page is
//! kept when the result is truthy. The page's metadata is in scope along with
//! its derived `type`, `title`, and `lang`, so filters can use the full
//! expression language: comparisons, `and`/`or`/`not`, `in`, tests, and
//! parentheses. A lone `=` is read as `==`.
//!
//! ```
//! use snowdrift::filter::Filter;
//!
//! let filter = Filter::parse("type = 'post' and not draft").unwrap().unwrap();
//! assert_eq!(filter.to_string(), "type == 'post' and not draft");
//! assert!(Filter::parse("  ").unwrap().is_none());
//! assert!(Filter::parse("type ==").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use minijinja::{Environment, Expression};
use tracing::{debug, warn};

use crate::error::{Chainable, Result};
use crate::site::{Page, PageId};
use crate::value::{Dict, Value};

/// A validated filter expression. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Filter {
    env: Arc<Environment<'static>>,
    source: Arc<str>,
}

/// A [`Filter`] compiled for evaluation against many pages.
#[derive(Debug)]
pub struct Predicate<'f> {
    source: &'f str,
    expr: Expression<'f, 'static>,
}

/// Rewrites every lone `=` outside of quotes to `==`.
fn normalize(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut output = String::with_capacity(expr.len() + 4);
    let mut quote = None;
    for (i, &c) in chars.iter().enumerate() {
        output.push(c);
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '=') => {
                let prev = i.checked_sub(1).map(|i| chars[i]);
                let next = chars.get(i + 1).copied();
                let paired = matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
                if !paired {
                    output.push('=');
                }
            }
            _ => {}
        }
    }

    output
}

/// The variables a filter sees for `page`.
fn scope(page: &Page) -> Dict {
    let mut scope = Dict::from(page.meta.clone());
    scope.insert("type".into(), Value::from(page.kind.as_str()));
    scope.insert("title".into(), Value::from(page.title.as_str()));
    scope.insert("lang".into(), Value::from(page.lang.as_str()));
    scope
}

impl Filter {
    /// Parses and validates `expr`. Returns `Ok(None)` when `expr` is blank.
    pub fn parse(expr: &str) -> Result<Option<Filter>> {
        let source = normalize(expr.trim());
        if source.is_empty() {
            return Ok(None);
        }

        let env = Environment::new();
        env.compile_expression_owned(source.clone())
            .chain_with(|| error!("invalid filter expression", "filter" => expr))?;

        Ok(Some(Filter { env: Arc::new(env), source: source.into() }))
    }

    /// Compiles the expression for repeated evaluation.
    pub fn compile(&self) -> Result<Predicate<'_>> {
        let expr = self.env.compile_expression_owned(self.source.to_string())?;
        Ok(Predicate { source: &self.source, expr })
    }

    pub fn matches(&self, page: &Page) -> bool {
        self.compile().map_or(false, |predicate| predicate.matches(page))
    }

    /// The members of `pages` matched by `filter`, or all of them if `filter`
    /// is blank. An invalid `filter` is logged and matches every page.
    pub fn apply<'a, I>(filter: &str, pages: I) -> Vec<PageId>
        where I: IntoIterator<Item = (PageId, &'a Page)>
    {
        let filter = match Filter::parse(filter) {
            Ok(filter) => filter,
            Err(e) => {
                warn!("ignoring filter:\n{e}");
                None
            }
        };

        let predicate = filter.as_ref().and_then(|f| f.compile().ok());
        pages.into_iter()
            .filter(|(_, page)| predicate.as_ref().map_or(true, |p| p.matches(page)))
            .map(|(id, _)| id)
            .collect()
    }
}

impl Predicate<'_> {
    /// Whether `page` passes. An evaluation error counts as a mismatch.
    pub fn matches(&self, page: &Page) -> bool {
        match self.expr.eval(scope(page)) {
            Ok(value) => value.is_true(),
            Err(e) => {
                debug!(filter = self.source, file = %page.file.display(), "filter failed: {e}");
                false
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SectionId;
    use chrono::NaiveDateTime;

    fn page(kind: &str) -> Page {
        let mut page = Page::new("a.md", SectionId(0), "en", NaiveDateTime::default());
        page.kind = kind.into();
        page.title = "Hello".into();
        page
    }

    fn matches(expr: &str, page: &Page) -> bool {
        Filter::parse(expr).unwrap().unwrap().matches(page)
    }

    #[test]
    fn equality_and_membership() {
        let mut post = page("post");
        post.meta.insert("tags", Value::from(vec!["rust", "rock and roll"]));

        assert!(matches("type == 'post'", &post));
        assert!(matches("type = \"post\"", &post));
        assert!(!matches("type != 'post'", &post));
        assert!(matches("'rust' in tags", &post));
        assert!(matches("'rock and roll' in tags", &post));
        assert!(!matches("'c' in tags", &post));
        assert!(matches("title == 'Hello' and lang == 'en'", &post));
        assert!(matches("(type == 'note' or type == 'post') and tags|length == 2", &post));
    }

    #[test]
    fn truthiness_and_comparisons() {
        let mut draft = page("post");
        draft.meta.insert("draft", true);
        draft.meta.insert("weight", 3);

        assert!(matches("draft", &draft));
        assert!(!matches("not draft", &draft));
        assert!(matches("weight > 2", &draft));
        assert!(!matches("weight <= 2", &draft));
        assert!(matches("not missing", &draft));
        assert!(!matches("draft and missing", &draft));
    }

    #[test]
    fn lone_equals_becomes_comparison() {
        assert_eq!(normalize("a = 1"), "a == 1");
        assert_eq!(normalize("a == 1 and b != 2 and c >= 3"), "a == 1 and b != 2 and c >= 3");
        assert_eq!(normalize("a = 'x = y'"), "a == 'x = y'");
    }

    #[test]
    fn invalid_expressions() {
        assert!(Filter::parse("type ==").is_err());
        assert!(Filter::parse("").unwrap().is_none());

        let pages = [page("a"), page("b")];
        let all = Filter::apply("((", pages.iter().enumerate().map(|(i, p)| (PageId(i), p)));
        assert_eq!(all, vec![PageId(0), PageId(1)]);

        let none = Filter::apply("type == 'c'", pages.iter().enumerate().map(|(i, p)| (PageId(i), p)));
        assert!(none.is_empty());
    }
}
