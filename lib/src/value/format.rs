use serde::de::DeserializeOwned;

use crate::error::{Chainable, ErrorDetail, Result};

/// A serialized data format that metadata can be read from.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// The human-readable name of the format, used in error messages.
    const NAME: &'static str;

    /// Parses `string` as the data format `Self` as a `T` or returns the
    /// format's own error if the `string` is an invalid `T`.
    fn from_str<T: DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Like [`Format::from_str()`] but with a contextualized [`Error`].
    ///
    /// [`Error`]: crate::error::Error
    fn parse<T: DeserializeOwned>(string: &str) -> Result<T> {
        Self::from_str(string).chain_with(|| error!(format!("invalid {} data", Self::NAME)))
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty, $display:literal) => (
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            const NAME: &'static str = $display;

            fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error, "TOML");
impl_format!(Yaml: serde_yaml::from_str, serde_yaml::Error, "YAML");
impl_format!(Json: serde_json::from_str, serde_json::Error, "JSON");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn invalid_data_names_the_format() {
        let error = Toml::parse::<Value>("a = ").unwrap_err();
        assert_eq!(error.message(), "invalid TOML data");

        let error = Yaml::parse::<Value>("a: [").unwrap_err();
        assert_eq!(error.message(), "invalid YAML data");
    }

    #[test]
    fn formats_agree_on_values() {
        let toml: Value = Toml::parse("tags = [\"a\", \"b\"]\ncount = 2").unwrap();
        let yaml: Value = Yaml::parse("tags: [a, b]\ncount: 2").unwrap();
        let json: Value = Json::parse(r#"{"tags": ["a", "b"], "count": 2}"#).unwrap();
        assert_eq!(toml, yaml);
        assert_eq!(yaml, json);
    }
}
