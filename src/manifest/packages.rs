//! Package listings derived from a version descriptor.

use super::{PackageDescriptor, VersionDescriptor};
use std::fmt;

/// Role of a package within a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageKind {
    Full,
    Segment,
    VoicePack { language: String },
    /// Update from `from_version`; `voice` is set for voice-pack updates
    Update {
        from_version: String,
        voice: Option<String>,
    },
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::Full => f.write_str("game"),
            PackageKind::Segment => f.write_str("game (segment)"),
            PackageKind::VoicePack { language } => write!(f, "voice pack ({})", language),
            PackageKind::Update {
                voice: None,
                from_version,
            } => write!(f, "update from {}", from_version),
            PackageKind::Update {
                voice: Some(language),
                from_version,
            } => write!(f, "voice update ({}) from {}", language, from_version),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry<'a> {
    pub kind: PackageKind,
    pub package: &'a PackageDescriptor,
}

/// Full package, then segments, then voice packs.
pub fn game_packages(descriptor: &VersionDescriptor) -> Vec<PackageEntry<'_>> {
    let mut entries = Vec::new();
    if let Some(full) = &descriptor.game.full {
        entries.push(PackageEntry {
            kind: PackageKind::Full,
            package: full,
        });
    }
    for segment in &descriptor.game.segments {
        entries.push(PackageEntry {
            kind: PackageKind::Segment,
            package: segment,
        });
    }
    for (language, package) in &descriptor.voice {
        entries.push(PackageEntry {
            kind: PackageKind::VoicePack {
                language: language.clone(),
            },
            package,
        });
    }
    entries
}

/// For every source version: the game update, then its voice updates.
pub fn update_packages(descriptor: &VersionDescriptor) -> Vec<PackageEntry<'_>> {
    let mut entries = Vec::new();
    for (from_version, update) in &descriptor.update {
        if let Some(game) = &update.game {
            entries.push(PackageEntry {
                kind: PackageKind::Update {
                    from_version: from_version.clone(),
                    voice: None,
                },
                package: game,
            });
        }
        for (language, package) in &update.voice {
            entries.push(PackageEntry {
                kind: PackageKind::Update {
                    from_version: from_version.clone(),
                    voice: Some(language.clone()),
                },
                package,
            });
        }
    }
    entries
}

/// Direct download URL of one manifest file, when the version publishes unpacked files.
pub fn file_download_url(decompressed_path: Option<&str>, remote_path: &str) -> Option<String> {
    let base = decompressed_path?.trim();
    if base.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        remote_path.replace('\\', "/").trim_start_matches('/')
    ))
}

/// Human-readable size with two decimals (`1.50 KB`).
pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
