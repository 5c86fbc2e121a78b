//! Argument converters.
//!
//! Converters form a closed registry: templates name them, the loader
//! resolves the names, and the assembler applies them to resolved values.
//! The only converter today is `resolveClassPath`, which maps a fully
//! qualified PHP class name to its file using the PSR-4 autoload tables of
//! the project's `composer.json`.
//!
//! See <https://www.php-fig.org/psr/psr-4/> and
//! <https://getcomposer.org/doc/04-schema.md#psr-4>.

use conjure_core::{AppError, AppResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A named, stateless transformation of an argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    /// Fully qualified class name → relative source file path
    ResolveClassPath,
}

impl Converter {
    /// Every registered converter.
    pub const ALL: &'static [Converter] = &[Converter::ResolveClassPath];

    /// Name used in template files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResolveClassPath => "resolveClassPath",
        }
    }

    /// Apply the converter to `value`.
    pub fn apply(&self, value: &str, ctx: &mut ConversionContext) -> AppResult<String> {
        match self {
            Self::ResolveClassPath => {
                let map = ctx.psr4()?;
                let path = map.class_path(value).ok_or_else(|| {
                    AppError::Conversion(format!(
                        "No PSR-4 namespace in {} matches class {}",
                        ctx.composer_json.display(),
                        value
                    ))
                })?;
                tracing::info!("Resolving class path for {}: {}", value, path);
                Ok(path)
            }
        }
    }
}

impl FromStr for Converter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| AppError::UnknownConverter(s.to_string()))
    }
}

impl fmt::Display for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs converters may need, loaded on first use.
#[derive(Debug)]
pub struct ConversionContext {
    composer_json: PathBuf,
    psr4: Option<Psr4Map>,
}

impl ConversionContext {
    /// Context reading PSR-4 tables from `composer_json` when first needed.
    pub fn new(composer_json: impl Into<PathBuf>) -> Self {
        Self {
            composer_json: composer_json.into(),
            psr4: None,
        }
    }

    /// Context with an already built namespace map.
    pub fn with_psr4(map: Psr4Map) -> Self {
        Self {
            composer_json: PathBuf::from("composer.json"),
            psr4: Some(map),
        }
    }

    fn psr4(&mut self) -> AppResult<&Psr4Map> {
        if self.psr4.is_none() {
            self.psr4 = Some(Psr4Map::from_composer_file(&self.composer_json)?);
        }
        self.psr4
            .as_ref()
            .ok_or_else(|| AppError::Other("PSR-4 map unavailable".to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    autoload: Autoload,
    #[serde(default, rename = "autoload-dev")]
    autoload_dev: Autoload,
}

#[derive(Debug, Default, Deserialize)]
struct Autoload {
    #[serde(default, rename = "psr-4")]
    psr4: BTreeMap<String, Psr4Dirs>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Psr4Dirs {
    One(String),
    Many(Vec<String>),
}

impl Psr4Dirs {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(dir) => Some(dir),
            Self::Many(dirs) => dirs.first().map(String::as_str),
        }
    }
}

/// Namespace prefix → base directory mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Psr4Map {
    entries: BTreeMap<String, String>,
}

impl Psr4Map {
    /// Build a map from `(namespace prefix, base directory)` pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Read `autoload-dev.psr-4` and `autoload.psr-4`; `autoload` wins on duplicate prefixes.
    pub fn from_composer_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::Conversion(format!(
                    "{} not found. Can't resolve class paths.",
                    path.display()
                ))
            } else {
                AppError::Io(e)
            }
        })?;
        Self::from_composer_json(&contents).map_err(|e| {
            AppError::Conversion(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Parse the contents of a composer.json file.
    pub fn from_composer_json(contents: &str) -> AppResult<Self> {
        let manifest: ComposerManifest = serde_json::from_str(contents)?;

        if manifest.autoload_dev.psr4.is_empty() {
            tracing::info!("Didn't find autoload-dev PSR-4 section in composer.json");
        }
        if manifest.autoload.psr4.is_empty() {
            tracing::info!("Didn't find autoload PSR-4 section in composer.json");
        }

        let entries = manifest
            .autoload_dev
            .psr4
            .iter()
            .chain(manifest.autoload.psr4.iter())
            .filter_map(|(prefix, dirs)| dirs.first().map(|d| (prefix.clone(), d.to_string())))
            .collect::<Vec<_>>();

        Ok(Self::new(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File path for a fully qualified class name, using the longest matching prefix.
    ///
    /// A leading `\` on the class name is ignored.
    pub fn class_path(&self, fqcn: &str) -> Option<String> {
        let class = fqcn.trim().trim_start_matches('\\');

        let (prefix, base) = self
            .entries
            .iter()
            .filter(|(prefix, _)| class.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())?;

        let relative = class[prefix.len()..].trim_start_matches('\\');
        if relative.is_empty() {
            return None;
        }

        let relative = format!("{}.php", relative.replace('\\', "/"));
        let base = normalize_dir(base);
        if base.is_empty() {
            Some(relative)
        } else {
            Some(format!("{}/{}", base, relative))
        }
    }

    /// Inverse of [`Psr4Map::class_path`]: the class a source file defines.
    pub fn class_for_path(&self, path: &str) -> Option<String> {
        let path = path.replace('\\', "/");
        let path = path.trim_start_matches("./");
        let stem = path.strip_suffix(".php")?;

        let (prefix, relative) = self
            .entries
            .iter()
            .filter_map(|(prefix, base)| {
                let base = normalize_dir(base);
                if base.is_empty() {
                    Some((prefix, base.len(), stem))
                } else {
                    stem.strip_prefix(base)
                        .and_then(|rest| rest.strip_prefix('/'))
                        .map(|rest| (prefix, base.len(), rest))
                }
            })
            .max_by_key(|(_, base_len, _)| *base_len)
            .map(|(prefix, _, rest)| (prefix, rest))?;

        if relative.is_empty() {
            return None;
        }

        let mut class = prefix.clone();
        if !class.is_empty() && !class.ends_with('\\') {
            class.push('\\');
        }
        class.push_str(&relative.replace('/', "\\"));
        Some(class)
    }
}

fn normalize_dir(dir: &str) -> &str {
    dir.trim_start_matches("./").trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COMPOSER: &str = r#"{
        "name": "acme/app",
        "autoload": {
            "psr-4": {
                "App\\": "src/",
                "App\\Legacy\\": ["legacy/", "old/"]
            },
            "classmap": ["database/"]
        },
        "autoload-dev": {
            "psr-4": {
                "App\\": "dev-src/",
                "App\\Tests\\": "tests/"
            }
        }
    }"#;

    #[test]
    fn test_converter_lookup() {
        assert_eq!(
            "resolveClassPath".parse::<Converter>().unwrap(),
            Converter::ResolveClassPath
        );
        assert_eq!(Converter::ResolveClassPath.to_string(), "resolveClassPath");

        let err = "shout".parse::<Converter>().unwrap_err();
        assert!(matches!(err, AppError::UnknownConverter(name) if name == "shout"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let map = Psr4Map::from_composer_json(COMPOSER).unwrap();

        assert_eq!(map.class_path("App\\Foo").as_deref(), Some("src/Foo.php"));
        assert_eq!(
            map.class_path("\\App\\Service\\Mailer").as_deref(),
            Some("src/Service/Mailer.php")
        );
        assert_eq!(
            map.class_path("App\\Tests\\FooTest").as_deref(),
            Some("tests/FooTest.php")
        );
        // First directory of a list is used
        assert_eq!(
            map.class_path("App\\Legacy\\Thing").as_deref(),
            Some("legacy/Thing.php")
        );
        assert_eq!(map.class_path("Vendor\\Other"), None);
    }

    #[test]
    fn test_empty_prefix_maps_whole_namespace() {
        let map = Psr4Map::new([("", "src/")]);
        assert_eq!(map.class_path("App\\Foo").as_deref(), Some("src/App/Foo.php"));

        let map = Psr4Map::new([("", "")]);
        assert_eq!(map.class_path("App\\Foo").as_deref(), Some("App/Foo.php"));
    }

    #[test]
    fn test_base_dir_without_trailing_slash() {
        let map = Psr4Map::new([("Acme\\", "lib")]);
        assert_eq!(map.class_path("Acme\\Util\\Str").as_deref(), Some("lib/Util/Str.php"));
    }

    #[test]
    fn test_namespace_only_has_no_path() {
        let map = Psr4Map::new([("App\\", "src/")]);
        assert_eq!(map.class_path("App\\"), None);
    }

    #[test]
    fn test_round_trip_recovers_namespace() {
        let map = Psr4Map::new([
            ("App\\", "src/"),
            ("App\\Tests\\", "tests/"),
            ("Lib\\", "./lib"),
        ]);

        for class in [
            "App\\Foo",
            "App\\Http\\Controller\\HomeController",
            "App\\Tests\\Unit\\FooTest",
            "Lib\\Str",
        ] {
            let path = map.class_path(class).unwrap();
            let back = map.class_for_path(&path).unwrap();
            let original: Vec<&str> = class.split('\\').collect();
            let recovered: Vec<&str> = back.split('\\').collect();
            assert_eq!(original, recovered, "round trip through {}", path);
        }
    }

    #[test]
    fn test_class_for_path_rejects_non_php() {
        let map = Psr4Map::new([("App\\", "src/")]);
        assert_eq!(map.class_for_path("src/Foo.txt"), None);
        assert_eq!(map.class_for_path("vendor/Foo.php"), None);
    }

    #[test]
    fn test_apply_reads_composer_lazily() {
        let dir = TempDir::new().unwrap();
        let composer = dir.path().join("composer.json");
        std::fs::write(&composer, COMPOSER).unwrap();

        let mut ctx = ConversionContext::new(&composer);
        let path = Converter::ResolveClassPath
            .apply("App\\Foo", &mut ctx)
            .unwrap();
        assert_eq!(path, "src/Foo.php");

        let err = Converter::ResolveClassPath
            .apply("Nope\\Foo", &mut ctx)
            .unwrap_err();
        assert!(matches!(err, AppError::Conversion(_)));
    }

    #[test]
    fn test_apply_without_composer() {
        let dir = TempDir::new().unwrap();
        let mut ctx = ConversionContext::new(dir.path().join("composer.json"));
        let err = Converter::ResolveClassPath
            .apply("App\\Foo", &mut ctx)
            .unwrap_err();
        assert!(matches!(err, AppError::Conversion(msg) if msg.contains("not found")));
    }

    #[test]
    fn test_invalid_composer_json() {
        let dir = TempDir::new().unwrap();
        let composer = dir.path().join("composer.json");
        std::fs::write(&composer, "{ not json").unwrap();
        let result = Psr4Map::from_composer_file(&composer);
        assert!(matches!(result, Err(AppError::Conversion(_))));
    }
}
