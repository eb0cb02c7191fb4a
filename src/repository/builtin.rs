//! Platform built-in modules
//!
//! Some names on a registry belong to the platform itself. Their source lives
//! in the platform's own tree rather than a repository of their own.

use crate::purl::{Coordinate, Ecosystem};

/// Node.js core modules
const NODE_CORE_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Libraries developed inside the GHC source tree
const GHC_BOOT_LIBRARIES: &[&str] = &[
    "base",
    "ghc",
    "ghc-bignum",
    "ghc-boot",
    "ghc-boot-th",
    "ghc-compact",
    "ghc-heap",
    "ghc-prim",
    "ghci",
    "integer-gmp",
    "template-haskell",
];

const GHC_GITLAB: &str = "https://gitlab.haskell.org";

/// Repository of a platform built-in module, if `coordinate` names one
pub fn builtin_repository(coordinate: &Coordinate) -> Option<Coordinate> {
    if coordinate.namespace().is_some() {
        return None;
    }
    let name = coordinate.name();
    match coordinate.ecosystem() {
        Ecosystem::Npm if NODE_CORE_MODULES.contains(&name) => {
            Coordinate::new(Ecosystem::Github, "node").ok().map(|c| {
                c.with_namespace("nodejs")
                    .with_subpath(format!("lib/{}.js", name))
            })
        }
        Ecosystem::Hackage if GHC_BOOT_LIBRARIES.contains(&name) => {
            Coordinate::new(Ecosystem::Gitlab, "ghc").ok().map(|c| {
                c.with_namespace("ghc")
                    .with_qualifier("repository_url", GHC_GITLAB)
                    .with_subpath(format!("libraries/{}", name))
            })
        }
        _ => None,
    }
}
