//! Registry fixtures served by a mockito server

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, Server};

use purl_meta::Resolver;
use purl_meta::config::{RegistryConfig, ResolverConfig};
use purl_meta::create_default_resolver;

/// Resolver whose registries all point at `server`; PyPI files live under `/files`
pub fn create_test_resolver(server: &Server) -> Resolver {
    let url = server.url();
    let mut config = ResolverConfig::default();
    config.registries.npm = RegistryConfig::with_base_url(&url);
    config.registries.nuget = RegistryConfig::with_base_url(&url);
    config.registries.hackage = RegistryConfig::with_base_url(&url);
    config.registries.pypi = RegistryConfig {
        files_url: Some(format!("{}/files", url)),
        ..RegistryConfig::with_base_url(&url)
    };
    create_default_resolver(&config).unwrap()
}

pub const LODASH: &str = r#"{
    "name": "lodash",
    "dist-tags": {"latest": "4.17.21"},
    "versions": {
        "4.17.15": {
            "name": "lodash",
            "version": "4.17.15",
            "description": "Lodash modular utilities.",
            "license": "MIT",
            "repository": {"type": "git", "url": "git+https://github.com/lodash/lodash.git"}
        },
        "4.17.21": {
            "name": "lodash",
            "version": "4.17.21",
            "description": "Lodash modular utilities.",
            "license": "MIT",
            "repository": {"type": "git", "url": "git+https://github.com/lodash/lodash.git"}
        }
    },
    "time": {
        "4.17.15": "2019-07-19T02:28:46.584Z",
        "4.17.21": "2021-02-20T15:42:16.891Z"
    }
}"#;

/// npm document whose repository field has no scheme
pub const MALFORMED_REPOSITORY: &str = r#"{
    "name": "left-pad",
    "dist-tags": {"latest": "1.3.0"},
    "versions": {
        "1.3.0": {
            "name": "left-pad",
            "version": "1.3.0",
            "repository": {"type": "git", "url": "not a url/left-pad"}
        }
    }
}"#;

/// npm document whose `latest` tag trails a newer prerelease
pub const REACT: &str = r#"{
    "name": "react",
    "dist-tags": {"latest": "18.3.1", "next": "19.0.0-rc.1"},
    "versions": {
        "18.3.1": {"name": "react", "version": "18.3.1"},
        "19.0.0-rc.1": {"name": "react", "version": "19.0.0-rc.1"}
    }
}"#;

pub async fn mock_json(server: &mut Server, path: &str, body: &str, expect: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(expect)
        .create_async()
        .await
}

pub async fn mock_lodash(server: &mut Server, expect: usize) -> Mock {
    mock_json(server, "/lodash", LODASH, expect).await
}

/// Mocks for `Newtonsoft.Json` with 13.0.3 as the newest version
pub async fn mock_newtonsoft(server: &mut Server) -> Vec<Mock> {
    let url = server.url();
    let versions = mock_json(
        server,
        "/v3-flatcontainer/newtonsoft.json/index.json",
        r#"{"versions": ["12.0.3", "13.0.1", "13.0.3"]}"#,
        1,
    )
    .await;
    let registration = format!(
        r#"{{
        "items": [{{
            "lower": "12.0.3",
            "upper": "13.0.3",
            "items": [
                {{
                    "@id": "{url}/v3/registration5-semver1/newtonsoft.json/12.0.3.json",
                    "catalogEntry": {{"id": "Newtonsoft.Json", "version": "12.0.3"}}
                }},
                {{
                    "@id": "{url}/v3/registration5-semver1/newtonsoft.json/13.0.3.json",
                    "catalogEntry": {{
                        "id": "Newtonsoft.Json",
                        "version": "13.0.3",
                        "description": "Json.NET is a popular high-performance JSON framework for .NET",
                        "licenseExpression": "MIT",
                        "repository": {{
                            "type": "git",
                            "url": "https://github.com/JamesNK/Newtonsoft.Json.git"
                        }}
                    }}
                }}
            ]
        }}]
    }}"#
    );
    let index = mock_json(
        server,
        "/v3/registration5-semver1/newtonsoft.json/index.json",
        &registration,
        1,
    )
    .await;
    vec![versions, index]
}

/// Gzipped tarball holding `files` as `(path, contents)`
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    let archive = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&archive).unwrap();
    encoder.finish().unwrap()
}
