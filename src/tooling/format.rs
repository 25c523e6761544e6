//! Text rendering for CLI output.

use crate::config::ExplorerConfig;
use crate::error::ApiError;
use crate::loader::TreeResult;
use crate::manifest::{
    file_download_url, format_bytes, game_packages, update_packages, PackageEntry, VersionCatalog,
    VersionDescriptor,
};
use crate::tree::{DirectoryNode, SearchResults, TreeNode};
use crate::types::CacheKey;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_games(config: &ExplorerConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Games")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Name", "Short", "Voice packs"]);
    for (id, game) in &config.games {
        let marker = if *id == config.default_game { " *" } else { "" };
        let voices = if game.voices.is_empty() {
            "-".to_string()
        } else {
            game.voices.join(", ")
        };
        table.add_row(vec![
            format!("{}{}", id, marker),
            game.name.clone(),
            game.short_name.clone().unwrap_or_else(|| "-".to_string()),
            voices,
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_versions(game: &str, catalog: &VersionCatalog) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Versions of {}", game))
    ));
    if catalog.is_empty() {
        out.push_str("No versions published.\n");
        return out;
    }
    let latest = catalog.latest();
    for label in catalog.newest_first() {
        if Some(label) == latest {
            out.push_str(&format!("  {} {}\n", label.bold(), "(latest)".green()));
        } else {
            out.push_str(&format!("  {}\n", label));
        }
    }
    out
}

fn package_table(entries: &[PackageEntry<'_>]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Kind", "Name", "Size", "MD5", "URL"]);
    for entry in entries {
        table.add_row(vec![
            entry.kind.to_string(),
            entry.package.name.clone(),
            format_bytes(entry.package.size),
            entry.package.checksum.clone(),
            entry.package.url.clone(),
        ]);
    }
    table
}

pub fn format_packages(game: &str, version: &str, descriptor: &VersionDescriptor) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("{} {} packages", game, version))
    ));

    let game_entries = game_packages(descriptor);
    if game_entries.is_empty() {
        out.push_str("No game packages listed.\n\n");
    } else {
        out.push_str(&format!("{}\n\n", package_table(&game_entries)));
    }

    let updates = update_packages(descriptor);
    if !updates.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Updates")));
        out.push_str(&format!("{}\n", package_table(&updates)));
    }
    if let Some(path) = &descriptor.decompressed_path {
        out.push_str(&format!("Decompressed files: {}\n", path));
    }
    out
}

/// Summary lines for a loaded tree, including voice-pack problems.
pub fn format_tree_summary(key: &CacheKey, result: &TreeResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Files of {}", key))
    ));
    out.push_str(&format!("  Files: {}\n", result.tree.file_count));
    out.push_str(&format!(
        "  Total size: {}\n",
        format_bytes(result.tree.total_size)
    ));
    if result.tree.dropped > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("Skipped {} malformed paths", result.tree.dropped).yellow()
        ));
    }
    for failure in &result.voice_pack_failures {
        out.push_str(&format!("  {}\n", failure.to_string().yellow()));
    }
    out.push('\n');
    out
}

/// Render `dir` as an indented tree. `depth` limits how many levels are expanded.
pub fn format_tree(
    dir: &DirectoryNode,
    prefix: &str,
    depth: Option<usize>,
    download_base: Option<&str>,
) -> String {
    let mut out = String::new();
    let title = if prefix.is_empty() { "/" } else { prefix };
    out.push_str(&format!(
        "{} {}\n",
        title.bold(),
        format_bytes(dir.aggregate_size).dimmed()
    ));
    render_children(dir, prefix, "", depth, download_base, &mut out);
    out
}

fn render_children(
    dir: &DirectoryNode,
    path: &str,
    indent: &str,
    depth: Option<usize>,
    download_base: Option<&str>,
    out: &mut String,
) {
    if depth == Some(0) {
        if !dir.children.is_empty() {
            out.push_str(&format!("{}└── ...\n", indent));
        }
        return;
    }
    let count = dir.children.len();
    for (i, child) in dir.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let child_path = if path.is_empty() {
            child.name().to_string()
        } else {
            format!("{}/{}", path, child.name())
        };
        match child {
            TreeNode::Directory(sub) => {
                out.push_str(&format!(
                    "{}{}{}/ {}\n",
                    indent,
                    branch,
                    sub.name.blue().bold(),
                    format_bytes(sub.aggregate_size).dimmed()
                ));
                let next_indent = format!("{}{}", indent, if last { "    " } else { "│   " });
                render_children(
                    sub,
                    &child_path,
                    &next_indent,
                    depth.map(|d| d - 1),
                    download_base,
                    out,
                );
            }
            TreeNode::File(file) => {
                let mut line = format!(
                    "{}{}{} {} md5:{}",
                    indent,
                    branch,
                    file.name,
                    format_bytes(file.size()).dimmed(),
                    file.record.checksum
                );
                if let Some(hash) = &file.record.content_hash {
                    line.push_str(&format!(" hash:{}", hash));
                }
                if let Some(url) = file_download_url(download_base, &child_path) {
                    line.push_str(&format!(" {}", url.dimmed()));
                }
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
}

pub fn format_search(keyword: &str, results: &SearchResults<'_>, download_base: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Search: {}", keyword))
    ));
    if results.is_empty() {
        out.push_str("No matching files.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    let with_urls = download_base.is_some();
    let mut header = vec!["Path", "Size", "MD5"];
    if with_urls {
        header.push("URL");
    }
    table.set_header(header);
    for found in &results.matches {
        let mut row = vec![
            found.path.clone(),
            format_bytes(found.file.size()),
            found.file.record.checksum.clone(),
        ];
        if with_urls {
            row.push(file_download_url(download_base, &found.path).unwrap_or_default());
        }
        table.add_row(row);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!("{} matches", results.total));
    if results.truncated() > 0 {
        out.push_str(&format!(", {} more not shown", results.truncated()));
    }
    out.push('\n');
    out
}

/// One row per preloaded game, then an overall line.
pub fn format_preload(rows: &[(String, Option<ApiError>)], all_succeeded: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Preload")));
    if rows.is_empty() {
        out.push_str("All version catalogs already cached.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Game", "Result"]);
    for (game, error) in rows {
        let result = match error {
            None => "ok".to_string(),
            Some(e) => e.to_string(),
        };
        table.add_row(vec![game.clone(), result]);
    }
    out.push_str(&format!("{}\n", table));
    if all_succeeded {
        out.push_str(&format!("{}\n", "All games loaded.".green()));
    } else {
        out.push_str(&format!("{}\n", "Some games failed to load.".red()));
    }
    out
}
