use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use snowdrift::error::Result;
use snowdrift::reader::Readers;
use snowdrift::templating::minijinja::MiniJinjaEngine;
use snowdrift::{Builder, Filter, PageBuilder};

use crate::config::SiteConfig;

mod config;
mod hooks;

pub const CONTENT_DIR: &str = "content";
pub const TEMPLATE_DIR: &str = "templates";
pub const OUTPUT_DIR: &str = "output";
pub const CONFIG_FILE: &str = "config.toml";

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Build the site rooted at `input`.
        cmd blizzard {
            /// The site root, holding `config.toml`, content, and templates.
            required input: PathBuf
            /// Write here instead of the configured output directory.
            optional output: PathBuf
            /// The number of concurrent write workers.
            optional -j, --jobs jobs: usize
            /// Only build pages matching this filter expression.
            optional --filter filter: String
        }
    }
}

fn build(flags: flags::Blizzard) -> Result<()> {
    let SiteConfig { mut config, templates } = SiteConfig::discover(&flags.input, flags.output)?;
    if let Some(jobs) = flags.jobs {
        config.set("site.workers", &jobs.to_string());
    }

    let engine = MiniJinjaEngine::new(&templates)?;
    let mut builder = PageBuilder::new(
        Arc::new(config),
        Arc::new(engine),
        Arc::new(Readers::markdown()),
        Arc::new(hooks::registry()?),
    )?;

    if let Some(filter) = flags.filter {
        builder = builder.with_filter(Filter::parse(&filter)?);
    }

    builder.build()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let flags = flags::Blizzard::from_env_or_exit();
    let input: PathBuf = flags.input.clone();
    match build(flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(site = %input.display(), "build failed:\n{e}");
            ExitCode::FAILURE
        }
    }
}
