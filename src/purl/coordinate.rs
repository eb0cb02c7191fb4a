//! Package coordinates and their package-URL text form
//!
//! A coordinate is parsed from and rendered to
//! `pkg:type/namespace/name@version?qualifiers#subpath`.
//! Equality folds namespace and name with the ecosystem's case rule,
//! so `pkg:npm/Lodash` and `pkg:npm/lodash` are the same package.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PurlError;
use crate::purl::types::Ecosystem;

/// Immutable identity of a package (or package version) within one ecosystem
#[derive(Debug, Clone)]
pub struct Coordinate {
    ecosystem: Ecosystem,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: BTreeMap<String, String>,
    subpath: Option<String>,
}

impl Coordinate {
    /// Create a coordinate for `name` in `ecosystem`
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>) -> Result<Self, PurlError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PurlError::EmptyName(format!("pkg:{}/", ecosystem)));
        }
        Ok(Self {
            ecosystem,
            namespace: None,
            name,
            version: None,
            qualifiers: BTreeMap::new(),
            subpath: None,
        })
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.qualifiers.insert(key.into().to_lowercase(), value);
        }
        self
    }

    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        let subpath = normalize_subpath(&subpath.into());
        self.subpath = (!subpath.is_empty()).then_some(subpath);
        self
    }

    /// Derive the same package at `version`. The receiver is left untouched.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            version: (!version.is_empty()).then_some(version),
            ..self.clone()
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn qualifiers(&self) -> &BTreeMap<String, String> {
        &self.qualifiers
    }

    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers.get(key).map(String::as_str)
    }

    pub fn subpath(&self) -> Option<&str> {
        self.subpath.as_deref()
    }

    /// `namespace/name`, or just `name` when there is no namespace
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}/{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    fn folded_namespace(&self) -> Option<String> {
        self.namespace.as_deref().map(|ns| self.ecosystem.fold(ns))
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.ecosystem == other.ecosystem
            && self.folded_namespace() == other.folded_namespace()
            && self.ecosystem.fold(&self.name) == other.ecosystem.fold(&other.name)
            && self.version == other.version
            && self.qualifiers == other.qualifiers
            && self.subpath == other.subpath
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ecosystem.hash(state);
        self.folded_namespace().hash(state);
        self.ecosystem.fold(&self.name).hash(state);
        self.version.hash(state);
        self.qualifiers.hash(state);
        self.subpath.hash(state);
    }
}

fn decode(segment: &str) -> Result<String, PurlError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| PurlError::Encoding(segment.to_string()))
}

fn normalize_subpath(subpath: &str) -> String {
    subpath
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

impl FromStr for Coordinate {
    type Err = PurlError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let purl = input.trim();

        let (rest, subpath) = match purl.rsplit_once('#') {
            Some((rest, subpath)) => (rest, Some(subpath)),
            None => (purl, None),
        };
        let (rest, qualifiers) = match rest.rsplit_once('?') {
            Some((rest, qualifiers)) => (rest, Some(qualifiers)),
            None => (rest, None),
        };

        let Some((scheme, rest)) = rest.split_once(':') else {
            return Err(PurlError::MissingScheme(input.to_string()));
        };
        if !scheme.eq_ignore_ascii_case("pkg") {
            return Err(PurlError::MissingScheme(input.to_string()));
        }

        let rest = rest.trim_start_matches('/');
        let Some((kind, rest)) = rest.split_once('/') else {
            return Err(PurlError::MissingType(input.to_string()));
        };
        let ecosystem = kind
            .parse::<Ecosystem>()
            .map_err(|_| PurlError::UnknownType(kind.to_string()))?;

        let rest = rest.trim_matches('/');

        // '@' only separates the version when it sits inside the last segment
        let last_segment_start = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (path, version) = match rest.rfind('@') {
            Some(at) if at > last_segment_start => (&rest[..at], Some(decode(&rest[at + 1..])?)),
            _ => (rest, None),
        };

        let mut segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;
        let name = segments.pop().unwrap_or_default();

        let mut coordinate =
            Coordinate::new(ecosystem, name).map_err(|_| PurlError::EmptyName(input.to_string()))?;
        coordinate = coordinate.with_namespace(segments.join("/"));
        if let Some(version) = version {
            coordinate = coordinate.with_version(version);
        }

        for pair in qualifiers.into_iter().flat_map(|q| q.split('&')) {
            if let Some((key, value)) = pair.split_once('=') {
                coordinate = coordinate.with_qualifier(key, decode(value)?);
            }
        }

        if let Some(subpath) = subpath {
            let decoded = normalize_subpath(subpath)
                .split('/')
                .map(decode)
                .collect::<Result<Vec<_>, _>>()?
                .join("/");
            coordinate = coordinate.with_subpath(decoded);
        }

        Ok(coordinate)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.ecosystem)?;
        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/').filter(|s| !s.is_empty()) {
                write!(f, "{}/", urlencoding::encode(segment))?;
            }
        }
        write!(f, "{}", urlencoding::encode(&self.name))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", urlencoding::encode(version))?;
        }
        if !self.qualifiers.is_empty() {
            let qualifiers = self
                .qualifiers
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            write!(f, "?{}", qualifiers)?;
        }
        if let Some(subpath) = &self.subpath {
            let encoded = subpath
                .split('/')
                .map(|s| urlencoding::encode(s).into_owned())
                .collect::<Vec<_>>()
                .join("/");
            write!(f, "#{}", encoded)?;
        }
        Ok(())
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let purl = String::deserialize(deserializer)?;
        purl.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[test]
    fn parses_all_components() {
        let coordinate: Coordinate =
            "pkg:npm/%40babel/core@7.0.0?repository_url=https%3A%2F%2Fexample.com&arch=x86#lib/index.js"
                .parse()
                .unwrap();

        assert_eq!(coordinate.ecosystem(), Ecosystem::Npm);
        assert_eq!(coordinate.namespace(), Some("@babel"));
        assert_eq!(coordinate.name(), "core");
        assert_eq!(coordinate.version(), Some("7.0.0"));
        assert_eq!(
            coordinate.qualifier("repository_url"),
            Some("https://example.com")
        );
        assert_eq!(coordinate.qualifier("arch"), Some("x86"));
        assert_eq!(coordinate.subpath(), Some("lib/index.js"));
    }

    #[rstest]
    #[case("pkg:npm/lodash@4.17.21", None, "lodash", Some("4.17.21"))]
    #[case("pkg:npm/@types/node", Some("@types"), "node", None)]
    #[case("pkg:npm/@types/node@20.1.0", Some("@types"), "node", Some("20.1.0"))]
    #[case("pkg:nuget/Newtonsoft.Json", None, "Newtonsoft.Json", None)]
    #[case("pkg:pypi/django@5.0a1", None, "django", Some("5.0a1"))]
    #[case("pkg://hackage/aeson@2.2.1.0", None, "aeson", Some("2.2.1.0"))]
    #[case("pkg:github/nodejs/node", Some("nodejs"), "node", None)]
    fn parses_namespace_name_and_version(
        #[case] input: &str,
        #[case] namespace: Option<&str>,
        #[case] name: &str,
        #[case] version: Option<&str>,
    ) {
        let coordinate: Coordinate = input.parse().unwrap();

        assert_eq!(coordinate.namespace(), namespace);
        assert_eq!(coordinate.name(), name);
        assert_eq!(coordinate.version(), version);
    }

    #[rstest]
    #[case("npm/lodash")]
    #[case("http:npm/lodash")]
    #[case("pkg:npm")]
    #[case("pkg:cpan/Moose")]
    #[case("pkg:npm/")]
    fn rejects_malformed_purls(#[case] input: &str) {
        assert!(input.parse::<Coordinate>().is_err());
    }

    #[rstest]
    #[case("pkg:npm/%40babel/core@7.0.0")]
    #[case("pkg:pypi/requests@2.32.0?extension=tar.gz")]
    #[case("pkg:nuget/Newtonsoft.Json@13.0.3")]
    #[case("pkg:npm/semver@1.0.0%2Bbuild.1")]
    #[case("pkg:github/nodejs/node#lib/fs.js")]
    #[case("pkg:gitlab/ghc/ghc?repository_url=https%3A%2F%2Fgitlab.haskell.org#libraries/base")]
    fn display_round_trips_canonical_form(#[case] input: &str) {
        let coordinate: Coordinate = input.parse().unwrap();

        assert_eq!(coordinate.to_string(), input);
        assert_eq!(coordinate.to_string().parse::<Coordinate>().unwrap(), coordinate);
    }

    #[test]
    fn subpath_drops_dot_segments() {
        let coordinate: Coordinate = "pkg:npm/lodash#/./src/../lib//".parse().unwrap();

        assert_eq!(coordinate.subpath(), Some("src/lib"));
    }

    #[test]
    fn empty_qualifier_values_are_dropped() {
        let coordinate: Coordinate = "pkg:pypi/requests?Arch=&os=linux".parse().unwrap();

        assert_eq!(coordinate.qualifiers().len(), 1);
        assert_eq!(coordinate.qualifier("os"), Some("linux"));
    }

    #[rstest]
    #[case("pkg:npm/Lodash", "pkg:npm/lodash", true)]
    #[case("pkg:nuget/Newtonsoft.Json", "pkg:nuget/newtonsoft.json", true)]
    #[case("pkg:pypi/Django", "pkg:pypi/django", false)]
    #[case("pkg:hackage/QuickCheck", "pkg:hackage/quickcheck", false)]
    #[case("pkg:npm/lodash@1.0.0", "pkg:npm/lodash@1.0.1", false)]
    fn equality_follows_case_folding(#[case] a: &str, #[case] b: &str, #[case] equal: bool) {
        let a: Coordinate = a.parse().unwrap();
        let b: Coordinate = b.parse().unwrap();

        assert_eq!(a == b, equal);
        if equal {
            let set: HashSet<Coordinate> = [a, b].into_iter().collect();
            assert_eq!(set.len(), 1);
        }
    }

    #[test]
    fn with_version_leaves_original_untouched() {
        let original = Coordinate::new(Ecosystem::Npm, "lodash").unwrap();

        let versioned = original.with_version("4.17.21");

        assert_eq!(original.version(), None);
        assert_eq!(versioned.version(), Some("4.17.21"));
        assert_eq!(versioned.name(), original.name());
    }

    #[test]
    fn new_rejects_empty_name() {
        assert!(matches!(
            Coordinate::new(Ecosystem::Pypi, "  "),
            Err(PurlError::EmptyName(_))
        ));
    }

    #[test]
    fn serializes_as_purl_string() {
        let coordinate: Coordinate = "pkg:npm/%40types/node@20.0.0".parse().unwrap();

        let json = serde_json::to_string(&coordinate).unwrap();

        assert_eq!(json, r#""pkg:npm/%40types/node@20.0.0""#);
        assert_eq!(serde_json::from_str::<Coordinate>(&json).unwrap(), coordinate);
    }
}
