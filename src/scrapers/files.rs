use crate::errors::ScrapeError;
use crate::models::{BillingCycle, FileDownloadInfo};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Normalizes a file name into slug form: lowercase stem, runs of
/// non-alphanumerics collapsed to single underscores.
pub fn normalize_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let mut out = String::with_capacity(stem.len());
    let mut last_was_sep = true;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Resolves a downloaded file name to a report slug. Exact normalized-name
/// lookup first; otherwise the strategy's ordered pattern list, first match
/// wins. Same file name always resolves to the same slug.
pub fn resolve_slug(
    file_name: &str,
    billing_cycle: &BillingCycle,
    patterns: &[(&str, &str)],
) -> Option<String> {
    let normalized = normalize_name(file_name);

    if billing_cycle.slug_map.contains_key(&normalized) {
        return Some(normalized);
    }

    for (needle, slug) in patterns {
        if normalized.contains(needle) {
            return Some((*slug).to_string());
        }
    }

    None
}

/// Associates one downloaded file with a billing artifact. A miss is a
/// valid, reportable outcome: the record is kept with a null mapping so the
/// caller can decide what to do with it.
pub fn map_download(
    path: &Path,
    billing_cycle: &BillingCycle,
    patterns: &[(&str, &str)],
) -> FileDownloadInfo {
    let source_file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mapped_billing_artifact_id = resolve_slug(&source_file_name, billing_cycle, patterns)
        .and_then(|slug| billing_cycle.slug_map.get(&slug).copied());

    if mapped_billing_artifact_id.is_none() {
        tracing::warn!(
            "⚠️ No matching report slug for downloaded file: {}",
            source_file_name
        );
    }

    FileDownloadInfo {
        source_file_name,
        local_path: path.to_path_buf(),
        mapped_billing_artifact_id,
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Expands a downloaded zip next to itself and returns the extracted entry
/// paths.
pub fn expand_archive(path: &Path) -> Result<Vec<PathBuf>, ScrapeError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive");
    let dest = path.with_file_name(format!("{}_extracted", stem));
    std::fs::create_dir_all(&dest)?;

    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(enclosed) = entry.enclosed_name() else {
            tracing::warn!("⚠️ Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let Some(file_name) = enclosed.file_name() else {
            continue;
        };

        let out_path = dest.join(file_name);
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
        extracted.push(out_path);
    }

    tracing::info!(
        "📦 Expanded archive {} ({} entries)",
        path.display(),
        extracted.len()
    );
    Ok(extracted)
}

/// Maps every downloaded path against the billing cycle, expanding zip
/// archives so each extracted entry goes through the same per-file mapping.
pub fn map_downloads(
    paths: &[PathBuf],
    billing_cycle: &BillingCycle,
    patterns: &[(&str, &str)],
) -> Result<Vec<FileDownloadInfo>, ScrapeError> {
    let mut out = Vec::new();

    for path in paths {
        if is_archive(path) {
            for entry in expand_archive(path)? {
                out.push(map_download(&entry, billing_cycle, patterns));
            }
        } else {
            out.push(map_download(path, billing_cycle, patterns));
        }
    }

    Ok(out)
}
