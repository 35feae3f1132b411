//! `--info`: describe the assets instead of rendering them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::RenderOptions;
use crate::runtime::{
    AnimationRuntime, RuntimeVersion, SkeletonFormat, SkeletonSummary, ensure_exists,
    read_skeleton_json,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub exists: bool,
    /// Bytes, when the file exists
    pub size: Option<u64>,
}

impl FileEntry {
    fn new(path: &Path) -> Self {
        let size = fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len());
        Self {
            path: path.to_path_buf(),
            exists: size.is_some(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkeletonEncoding {
    Json,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonReport {
    pub file: FileEntry,
    pub encoding: SkeletonEncoding,
    /// Older dialect the JSON was upgraded from
    pub upgraded_from: Option<RuntimeVersion>,
    pub summary: SkeletonSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoReport {
    pub atlas: FileEntry,
    pub pages: Vec<FileEntry>,
    pub skeleton: Option<SkeletonReport>,
}

/// Gather the report for the atlas and, if given, the skeleton.
pub fn build_report<R: AnimationRuntime>(
    runtime: &R,
    options: &RenderOptions,
) -> Result<InfoReport> {
    ensure_exists("Atlas", &options.atlas)?;
    let pages = runtime
        .atlas_pages(&options.atlas)
        .with_context(|| format!("failed to read atlas {}", options.atlas.display()))?
        .iter()
        .map(|page| FileEntry::new(page))
        .collect();

    let skeleton = match options.skeleton.as_deref() {
        Some(path) => Some(skeleton_report(runtime, path, options)?),
        None => None,
    };

    Ok(InfoReport {
        atlas: FileEntry::new(&options.atlas),
        pages,
        skeleton,
    })
}

fn skeleton_report<R: AnimationRuntime>(
    runtime: &R,
    path: &Path,
    options: &RenderOptions,
) -> Result<SkeletonReport> {
    ensure_exists("Skeleton", path)?;
    let report = match SkeletonFormat::from_path(path)? {
        SkeletonFormat::Json => {
            let doc = read_skeleton_json(path, options.runtime)?;
            SkeletonReport {
                file: FileEntry::new(path),
                encoding: SkeletonEncoding::Json,
                upgraded_from: doc.upgraded_from,
                summary: doc.summary,
            }
        }
        SkeletonFormat::Binary => SkeletonReport {
            file: FileEntry::new(path),
            encoding: SkeletonEncoding::Binary,
            upgraded_from: None,
            summary: runtime
                .binary_summary(path)
                .with_context(|| format!("failed to read skeleton {}", path.display()))?,
        },
    };
    Ok(report)
}

fn size_label(entry: &FileEntry) -> String {
    match entry.size {
        Some(bytes) if bytes >= 1024 * 1024 => format!("{:.1} MiB", mib(bytes)),
        Some(bytes) if bytes >= 1024 => format!("{:.1} KiB", kib(bytes)),
        Some(bytes) => format!("{bytes} B"),
        None => "missing".to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn kib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

#[allow(clippy::cast_precision_loss)]
fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn mark(entry: &FileEntry) -> &'static str {
    if entry.exists { "ok" } else { "MISSING" }
}

/// Human-readable report, ending with example command lines.
pub fn render_text(report: &InfoReport) -> String {
    let mut lines = vec![
        format!(
            "Atlas: {} ({})",
            report.atlas.path.display(),
            size_label(&report.atlas)
        ),
        format!("Pages: {}", report.pages.len()),
    ];
    lines.extend(report.pages.iter().map(|page| {
        format!(
            "  [{}] {} ({})",
            mark(page),
            page.path.display(),
            size_label(page)
        )
    }));

    let Some(skeleton) = &report.skeleton else {
        lines.push("Skeleton: not given (pass --skel to list skins and animations)".to_string());
        return lines.join("\n") + "\n";
    };

    lines.push(format!(
        "Skeleton: {} ({})",
        skeleton.file.path.display(),
        size_label(&skeleton.file)
    ));
    let summary = &skeleton.summary;

    lines.push(format!(
        "Spine version: {}",
        summary.spine_version.as_deref().unwrap_or("unknown")
    ));
    if let Some(version) = skeleton.upgraded_from {
        lines.push(format!("  Upgraded from the {version} format"));
    }
    lines.push(format!("Bones: {}", summary.bones));
    lines.push(format!("Slots: {}", summary.slots));
    lines.push(format!("Skins ({}):", summary.skins.len()));
    lines.extend(summary.skins.iter().map(|skin| {
        format!(
            "  {} ({} attachments, {} regions)",
            skin.name, skin.attachments, skin.regions
        )
    }));
    lines.push(format!("Animations ({}):", summary.animations.len()));
    lines.extend(
        summary
            .animations
            .iter()
            .map(|a| format!("  {} ({:.3}s)", a.name, a.duration)),
    );

    let command = format!(
        "  spineshot --atlas {} --skel {}",
        report.atlas.path.display(),
        skeleton.file.path.display()
    );
    lines.push("Usage:".to_string());
    if let Some(animation) = summary.animations.first() {
        lines.push(format!("{command} --animation {} --frame 0", animation.name));
    }
    if let Some(skin) = summary.skins.first() {
        lines.push(format!("{command} --skin {}", skin.name));
    }
    lines.push(format!("{command} --skin all --animation all"));

    lines.join("\n") + "\n"
}

/// Print the report to stdout, as text or pretty JSON.
#[allow(clippy::print_stdout)]
pub fn print_report(report: &InfoReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}
