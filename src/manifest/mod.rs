//! Upstream manifest model
//!
//! Wire types for the per-game version catalog and the per-version flat file
//! manifests, plus the client that fetches them.

pub mod client;
pub mod decode;
pub mod packages;

pub use client::{HttpManifestClient, ManifestClient};
pub use decode::{decode_manifest, DECODE_CHUNK_LINES};
pub use packages::{
    file_download_url, format_bytes, game_packages, update_packages, PackageEntry, PackageKind,
};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One line of a `pkg_version` manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "remoteName")]
    pub remote_path: String,
    #[serde(rename = "md5")]
    pub checksum: String,
    #[serde(rename = "fileSize")]
    pub size: u64,
    #[serde(rename = "hash", default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileRecord {
    pub fn new(remote_path: impl Into<String>, checksum: impl Into<String>, size: u64) -> Self {
        Self {
            remote_path: remote_path.into(),
            checksum: checksum.into(),
            size,
            content_hash: None,
        }
    }
}

/// Downloadable package as listed in a version descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "md5")]
    pub checksum: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
}

/// Full game package plus its split segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePackages {
    #[serde(default)]
    pub full: Option<PackageDescriptor>,
    #[serde(default)]
    pub segments: Vec<PackageDescriptor>,
}

/// Update packages from one earlier version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    #[serde(default)]
    pub game: Option<PackageDescriptor>,
    #[serde(default)]
    pub voice: BTreeMap<String, PackageDescriptor>,
}

/// Everything the catalog knows about one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    #[serde(default)]
    pub game: GamePackages,
    #[serde(default)]
    pub voice: BTreeMap<String, PackageDescriptor>,
    #[serde(default)]
    pub update: BTreeMap<String, UpdateDescriptor>,
    #[serde(default)]
    pub decompressed_path: Option<String>,
}

/// Version label -> descriptor, in upstream document order (oldest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCatalog {
    versions: Vec<(String, VersionDescriptor)>,
}

impl VersionCatalog {
    pub fn from_entries(versions: Vec<(String, VersionDescriptor)>) -> Self {
        Self { versions }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn get(&self, version: &str) -> Option<&VersionDescriptor> {
        self.versions
            .iter()
            .find(|(label, _)| label == version)
            .map(|(_, descriptor)| descriptor)
    }

    /// Labels in upstream order.
    pub fn labels(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.versions.iter().map(|(label, _)| label.as_str())
    }

    /// Labels newest first, the order a version picker shows them.
    pub fn newest_first(&self) -> Vec<&str> {
        self.labels().rev().collect()
    }

    pub fn latest(&self) -> Option<&str> {
        self.versions.last().map(|(label, _)| label.as_str())
    }

    pub fn entries(&self) -> &[(String, VersionDescriptor)] {
        &self.versions
    }
}

impl<'de> Deserialize<'de> for VersionCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = VersionCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of version labels to version descriptors")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut versions = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, descriptor)) =
                    map.next_entry::<String, VersionDescriptor>()?
                {
                    versions.push((label, descriptor));
                }
                Ok(VersionCatalog { versions })
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

/// Accept sizes published either as JSON numbers or as numeric strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(0),
        NumberOrString::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}
