use std::path::Path;

use minijinja::{path_loader, Environment, ErrorKind};

use crate::error::Result;
use crate::templating::{Engine, Vars};

/// An [`Engine`] backed by a minijinja environment.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// An engine loading templates from files under `dir` on demand.
    ///
    /// Fails if `dir` isn't a directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return err!("template directory not found", "path" => dir.display());
        }

        let mut env = environment();
        env.set_loader(path_loader(dir));
        Ok(MiniJinjaEngine { env })
    }

    /// An engine holding exactly the `(name, source)` pairs in `templates`.
    pub fn from_templates<I, N, S>(templates: I) -> Result<Self>
        where I: IntoIterator<Item = (N, S)>, N: Into<String>, S: Into<String>
    {
        let mut env = environment();
        for (name, source) in templates {
            env.add_template_owned(name.into(), source.into())?;
        }

        Ok(MiniJinjaEngine { env })
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("slugify", ext::slugify);
    env.add_filter("deslug", ext::deslug);
    env.add_filter("date", ext::date);
    env
}

impl Engine for MiniJinjaEngine {
    fn contains(&self, name: &str) -> bool {
        match self.env.get_template(name) {
            Ok(_) => true,
            Err(e) => e.kind() != ErrorKind::TemplateNotFound,
        }
    }

    fn render(&self, name: &str, vars: &Vars) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(vars)?)
    }
}

mod ext {
    use chrono::{DateTime, NaiveDateTime};
    use minijinja::{value::Value, Error, ErrorKind};

    use crate::util::{format_time, parse_time};

    pub fn slugify(value: &str) -> String {
        crate::util::slugify(value)
    }

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    /// Formats a date string or a Unix timestamp with `fmt`, `%Y-%m-%d` by
    /// default.
    pub fn date(value: Value, fmt: Option<&str>) -> Result<Value, Error> {
        let fmt = fmt.unwrap_or("%Y-%m-%d");
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return render_date(&datetime.naive_utc(), fmt);
        }

        let kind = value.kind();
        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let datetime = parse_time(string)
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string} as a date")
            ))?;

        render_date(&datetime, fmt)
    }

    fn render_date(datetime: &NaiveDateTime, fmt: &str) -> Result<Value, Error> {
        format_time(datetime, fmt)
            .map(Value::from)
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("invalid date format {fmt:?} provided to `date`")
            ))
    }
}
