//! A trivial, sectionless `key = value` reader for `srcsafe.ini`: the one
//! external-collaborator file format spec.md §1 calls out as explicitly
//! out of the core's scope ("a trivial line reader").

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// The parsed contents of `srcsafe.ini`: whitespace-trimmed `key = value`
/// pairs, one per line, with `#` and `;` introducing end-of-line comments.
/// Case-sensitive keys; the core only ever consumes `Data_Path`.
#[derive(Debug, Clone, Default)]
pub struct Ini {
    values: HashMap<String, String>,
}

impl Ini {
    pub fn parse(text: &str) -> Ini {
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ini { values }
    }

    pub fn load(path: &Path) -> Result<Ini> {
        let text = std::fs::read_to_string(path)?;
        Ok(Ini::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }
}

/// Strips a `#` or `;` end-of-line comment, whichever comes first.
fn strip_comment(line: &str) -> &str {
    let cut = line
        .find(['#', ';'])
        .unwrap_or(line.len());
    &line[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_key_value_pairs() {
        let ini = Ini::parse("Data_Path = data\nOther = 1\n");
        assert_eq!(ini.get("Data_Path"), Some("data"));
        assert_eq!(ini.get("Other"), Some("1"));
    }

    #[test]
    fn strips_hash_and_semicolon_comments() {
        let ini = Ini::parse("Data_Path = mydata # the data dir\n; a whole comment line\nFoo=bar ; trailing\n");
        assert_eq!(ini.get("Data_Path"), Some("mydata"));
        assert_eq!(ini.get("Foo"), Some("bar"));
        assert_eq!(ini.get("a whole comment line"), None);
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let ini = Ini::parse("");
        assert_eq!(ini.get_or("Data_Path", "data"), "data");
    }
}
