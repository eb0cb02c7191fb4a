//! Ecosystem tags used in package URLs

/// Type of package ecosystem (the `type` component of a package URL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ecosystem {
    /// npm registry (registry.npmjs.org)
    Npm,
    /// NuGet gallery (api.nuget.org)
    Nuget,
    /// Hackage (hackage.haskell.org)
    Hackage,
    /// Python Package Index (pypi.org)
    Pypi,
    /// crates.io
    Cargo,
    /// RubyGems
    Gem,
    /// Maven Central
    Maven,
    /// Go modules
    Golang,
    /// GitHub repository
    Github,
    /// GitLab repository
    Gitlab,
    /// Bitbucket repository
    Bitbucket,
    /// Anything else addressed by URL
    Generic,
}

impl Ecosystem {
    /// Returns the package URL type string of the ecosystem
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Nuget => "nuget",
            Ecosystem::Hackage => "hackage",
            Ecosystem::Pypi => "pypi",
            Ecosystem::Cargo => "cargo",
            Ecosystem::Gem => "gem",
            Ecosystem::Maven => "maven",
            Ecosystem::Golang => "golang",
            Ecosystem::Github => "github",
            Ecosystem::Gitlab => "gitlab",
            Ecosystem::Bitbucket => "bitbucket",
            Ecosystem::Generic => "generic",
        }
    }

    /// Whether names in this ecosystem compare case-insensitively
    pub fn is_case_insensitive(&self) -> bool {
        matches!(
            self,
            Ecosystem::Npm
                | Ecosystem::Nuget
                | Ecosystem::Github
                | Ecosystem::Gitlab
                | Ecosystem::Bitbucket
        )
    }

    /// Fold a name or namespace the way the ecosystem compares them
    pub fn fold(&self, value: &str) -> String {
        if self.is_case_insensitive() {
            value.to_lowercase()
        } else {
            value.to_string()
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Ecosystem::Npm),
            "nuget" => Ok(Ecosystem::Nuget),
            "hackage" => Ok(Ecosystem::Hackage),
            "pypi" => Ok(Ecosystem::Pypi),
            "cargo" => Ok(Ecosystem::Cargo),
            "gem" => Ok(Ecosystem::Gem),
            "maven" => Ok(Ecosystem::Maven),
            "golang" => Ok(Ecosystem::Golang),
            "github" => Ok(Ecosystem::Github),
            "gitlab" => Ok(Ecosystem::Gitlab),
            "bitbucket" => Ok(Ecosystem::Bitbucket),
            "generic" => Ok(Ecosystem::Generic),
            _ => Err(()),
        }
    }
}
