use std::path::{Path, PathBuf};

use serde::Deserialize;

use snowdrift::Config;
use snowdrift::error::{Chainable, Result};

/// Where a site keeps its content, templates, and output, relative to the
/// site root. Read from the `[build]` table of the config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub content_dir: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            content_dir: crate::CONTENT_DIR.into(),
            template_dir: crate::TEMPLATE_DIR.into(),
            output_dir: crate::OUTPUT_DIR.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default)]
    build: Layout,
}

/// A site's resolved configuration along with its template directory.
#[derive(Debug)]
pub struct SiteConfig {
    pub config: Config,
    pub templates: PathBuf,
}

impl SiteConfig {
    /// Reads `config.toml` from `root`, if it exists. `output` overrides the
    /// configured output directory.
    pub fn discover(root: &Path, output: Option<PathBuf>) -> Result<Self> {
        let file = root.join(crate::CONFIG_FILE);
        let text = match file.exists() {
            true => std::fs::read_to_string(&file)
                .chain_with(|| snowdrift::error!("failed to read config", "path" => file.display()))?,
            false => String::new(),
        };

        let settings: Settings = toml::from_str(&text)
            .chain_with(|| snowdrift::error!("invalid config", "path" => file.display()))?;

        let layout = settings.build;
        let output = output.unwrap_or_else(|| root.join(&layout.output_dir));
        let config = Config::from_toml(root.join(&layout.content_dir), output, &text)?;
        Ok(SiteConfig { config, templates: root.join(&layout.template_dir) })
    }
}
