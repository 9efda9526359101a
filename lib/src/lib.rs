//! A toolkit for building static sites from a content graph.
//!
//! # Overview
//!
//! Snowdrift turns a directory of content files into a linked output tree.
//! It reads every file into an in-memory graph, orders and groups that graph,
//! and writes each node through a template engine it doesn't own.
//!
//! The graph is organized as follows:
//!
//! ```text
//!                      +------+
//!                      | Site |
//!                      +--+---+
//!                         |
//!       +-----------------+-----------------+
//!       |                                   |
//!  +----+----+  one per language      +-----+----+
//!  | Section |  (the root)            | Taxonomy |
//!  +----+----+                        +-----+----+
//!       |                                   |
//!   +---+--------+----------+            +--+---+
//!   |            |          |            | Term |...
//! +-+-----+  +---+--+   +---+--+         +--+---+
//! |Section|..| Page |...| Page |            |
//! +-------+  +------+   +------+         +--+---+
//!                                        | Term |...
//!                                        +------+
//! ```
//!
//! In words, a **site** consists of:
//!
//!   * **Sections**, one per directory and language. A section inherits the
//!     metadata of its parent and owns three ordered buckets of pages:
//!     normal, hidden, and section pages (pages that define an alternate
//!     view of their section).
//!
//!   * **Pages**, one per content file. A page's metadata is its section's,
//!     overlaid with the file's own front matter.
//!
//!   * **Taxonomies**, such as `tags`, each holding a tree of **terms**. A
//!     term `a/b` lists its pages, and `a` lists the pages of every term
//!     below it as well.
//!
//! ## Building
//!
//! A [`PageBuilder`](builder::PageBuilder) runs one build:
//!
//! 1. Content files are discovered, read through a [`Reader`](reader::Reader),
//!    and inserted into the graph in parallel, building sections on demand.
//! 2. Page lists are ordered and linked, and taxonomies are grouped.
//! 3. The [`Hooks`] chain filters what gets written.
//! 4. A bounded pool of workers renders every page, section, taxonomy and
//!    term through an [`Engine`](templating::Engine).

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod meta;
pub mod config;
pub mod filter;
pub mod site;
pub mod hook;
pub mod reader;
pub mod templating;
pub mod writer;
pub mod builder;

pub use config::Config;
pub use meta::Meta;
pub use filter::Filter;
pub use hook::{Hook, HookRegistry, Hooks};
pub use builder::{Builder, Builders, PageBuilder, Watch};
pub use site::*;

pub use rayon;
