//! Locating, checking and copying media files for a release package

use crate::cover::{image_dimensions, MIN_COVER_PX};
use crate::error::{AssetError, Result};
use crate::matcher::{SubstringMatcher, TitleMatcher};
use courier_core::{AssetKind, BatchContext, MetadataRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, FileTimes};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One kind of media file searched for each track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSlot {
    /// Expected extension, without the dot
    pub extension: String,

    /// Directory scanned for candidates (not recursive)
    pub source_dir: PathBuf,

    pub kind: AssetKind,

    /// Whether a miss is reported as a missing file
    pub required: bool,
}

impl AssetSlot {
    pub fn new(
        extension: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        kind: AssetKind,
        required: bool,
    ) -> Self {
        Self {
            extension: extension.into(),
            source_dir: source_dir.into(),
            kind,
            required,
        }
    }

    fn accepts_extension(&self, filename: &str) -> bool {
        filename
            .to_lowercase()
            .ends_with(&format!(".{}", self.extension.to_lowercase()))
    }
}

/// Default slots: mp3, wav, flac and jpg under the given source folders
pub fn standard_slots(audio_dir: &Path, wav_dir: &Path, image_dir: &Path) -> Vec<AssetSlot> {
    vec![
        AssetSlot::new("mp3", audio_dir, AssetKind::Audio, true),
        AssetSlot::new("wav", wav_dir, AssetKind::Audio, false),
        AssetSlot::new("flac", audio_dir, AssetKind::Audio, false),
        AssetSlot::new("jpg", image_dir, AssetKind::Image, true),
    ]
}

/// A media file copied into a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAsset {
    pub kind: AssetKind,
    pub extension: String,
    pub source: PathBuf,
    pub path: PathBuf,
}

impl ResolvedAsset {
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// A required slot with no usable candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingAsset {
    pub title: String,
    pub extension: String,
}

impl fmt::Display for MissingAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing file: {}.{}", self.title, self.extension)
    }
}

/// A cover candidate that failed the size check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedAsset {
    pub path: PathBuf,
    pub reason: String,
}

/// A matched file that could not be copied into the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAsset {
    pub source: PathBuf,
    pub reason: String,
}

impl fmt::Display for FailedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Copy failed: {} ({})", self.source.display(), self.reason)
    }
}

/// Everything resolved for one record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetBundle {
    pub files: Vec<ResolvedAsset>,
    pub missing: Vec<MissingAsset>,
    pub rejected: Vec<RejectedAsset>,
    pub failed: Vec<FailedAsset>,
}

impl AssetBundle {
    /// File name of the copied cover, if any
    pub fn image_filename(&self) -> Option<String> {
        self.files
            .iter()
            .find(|a| a.kind == AssetKind::Image)
            .and_then(ResolvedAsset::file_name)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|a| a.path.as_path())
    }
}

/// Finds each slot's file for a track and copies it into the package folder
pub struct AssetResolver {
    slots: Vec<AssetSlot>,
    matcher: Box<dyn TitleMatcher>,
    min_cover_px: u32,
}

impl AssetResolver {
    pub fn new(slots: Vec<AssetSlot>) -> Self {
        Self {
            slots,
            matcher: Box::new(SubstringMatcher),
            min_cover_px: MIN_COVER_PX,
        }
    }

    /// Standard slots under `<root>/AUDIO`, `<root>/WAV` and `<root>/IMAGES`
    pub fn with_search_root(root: &Path) -> Self {
        Self::new(standard_slots(
            &root.join("AUDIO"),
            &root.join("WAV"),
            &root.join("IMAGES"),
        ))
    }

    pub fn with_matcher(mut self, matcher: Box<dyn TitleMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_min_cover_px(mut self, min_cover_px: u32) -> Self {
        self.min_cover_px = min_cover_px;
        self
    }

    pub fn slots(&self) -> &[AssetSlot] {
        &self.slots
    }

    /// Resolve every slot for a record
    ///
    /// A slot without a usable candidate never fails the record; it shows up
    /// in `missing` (required slots) or is skipped (optional slots). A copy
    /// that fails lands in `failed` and the remaining slots are still tried.
    /// Only an unusable package folder is an error.
    pub fn resolve(&self, record: &MetadataRecord, batch: &BatchContext) -> Result<AssetBundle> {
        let package_dir = batch.ensure_package_dir(&record.upc)?;
        let mut bundle = AssetBundle::default();

        for slot in &self.slots {
            let Some(candidate) = self.first_candidate(slot, &record.title) else {
                if slot.required {
                    let missing = MissingAsset {
                        title: record.title.clone(),
                        extension: slot.extension.clone(),
                    };
                    warn!(upc = %record.upc, "{}", missing);
                    bundle.missing.push(missing);
                } else {
                    debug!(title = %record.title, ext = %slot.extension, "No optional asset");
                }
                continue;
            };

            if slot.kind == AssetKind::Image {
                if let Err(reason) = self.check_cover(&candidate) {
                    warn!(path = %candidate.display(), %reason, "Cover rejected");
                    bundle.rejected.push(RejectedAsset {
                        path: candidate,
                        reason,
                    });
                    if slot.required {
                        bundle.missing.push(MissingAsset {
                            title: record.title.clone(),
                            extension: slot.extension.clone(),
                        });
                    }
                    continue;
                }
            }

            let copied = match copy_preserving_times(&candidate, &package_dir) {
                Ok(copied) => copied,
                Err(e) => {
                    warn!(source = %candidate.display(), error = %e, "Asset copy failed");
                    bundle.failed.push(FailedAsset {
                        source: candidate,
                        reason: e.to_string(),
                    });
                    if slot.required {
                        bundle.missing.push(MissingAsset {
                            title: record.title.clone(),
                            extension: slot.extension.clone(),
                        });
                    }
                    continue;
                }
            };
            info!(
                source = %candidate.display(),
                dest = %copied.display(),
                matcher = self.matcher.name(),
                "Asset copied"
            );
            bundle.files.push(ResolvedAsset {
                kind: slot.kind,
                extension: slot.extension.clone(),
                source: candidate,
                path: copied,
            });
        }

        Ok(bundle)
    }

    /// First accepted file in the slot's directory, by file name order
    fn first_candidate(&self, slot: &AssetSlot, title: &str) -> Option<PathBuf> {
        if !slot.source_dir.is_dir() {
            warn!(dir = %slot.source_dir.display(), "Source folder not found");
            return None;
        }

        WalkDir::new(&slot.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .find(|e| {
                let name = e.file_name().to_string_lossy();
                slot.accepts_extension(&name) && self.matcher.matches(title, &name)
            })
            .map(|e| e.into_path())
    }

    fn check_cover(&self, path: &Path) -> std::result::Result<(), String> {
        match image_dimensions(path) {
            Ok((width, height)) if width >= self.min_cover_px && height >= self.min_cover_px => {
                Ok(())
            }
            Ok((width, height)) => Err(format!(
                "too small ({width}x{height}, minimum {0}x{0})",
                self.min_cover_px
            )),
            Err(e) => Err(format!("unreadable image: {e}")),
        }
    }
}

/// Copy a file into `dest_dir`, keeping its name and timestamps
///
/// The source is never modified. Timestamps are best effort: platforms that
/// cannot set them still get the copy.
pub fn copy_preserving_times(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| AssetError::InvalidPath(source.display().to_string()))?;
    let dest = dest_dir.join(file_name);

    fs::copy(source, &dest).map_err(|e| AssetError::Copy {
        from: source.display().to_string(),
        to: dest.display().to_string(),
        source: e,
    })?;

    if let Err(e) = copy_times(source, &dest) {
        debug!(path = %dest.display(), error = %e, "Timestamps not preserved");
    }

    Ok(dest)
}

fn copy_times(source: &Path, dest: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    fs::File::options().write(true).open(dest)?.set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_slot_extension_is_case_insensitive() {
        let slot = AssetSlot::new("jpg", "/tmp", AssetKind::Image, true);
        assert!(slot.accepts_extension("cover.JPG"));
        assert!(slot.accepts_extension("cover.jpg"));
        assert!(!slot.accepts_extension("cover.jpeg"));
        assert!(!slot.accepts_extension("jpg"));
    }

    #[test]
    fn test_copy_preserves_modified_time() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("track.mp3");
        fs::write(&source, b"audio").unwrap();

        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let dest_dir = temp.path().join("pkg");
        fs::create_dir(&dest_dir).unwrap();
        let copied = copy_preserving_times(&source, &dest_dir).unwrap();

        assert_eq!(copied, dest_dir.join("track.mp3"));
        assert_eq!(fs::read(&copied).unwrap(), b"audio");
        assert_eq!(fs::metadata(&copied).unwrap().modified().unwrap(), past);
        assert!(source.exists(), "source is never moved");
    }

    #[test]
    fn test_missing_asset_display() {
        let missing = MissingAsset {
            title: "Test Song".to_string(),
            extension: "mp3".to_string(),
        };
        assert_eq!(missing.to_string(), "Missing file: Test Song.mp3");
    }

    #[test]
    fn test_failed_copy_keeps_other_slots() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        for folder in ["AUDIO", "WAV", "IMAGES"] {
            fs::create_dir_all(source.join(folder)).unwrap();
        }
        fs::write(source.join("AUDIO/test_song.mp3"), b"audio").unwrap();
        image::RgbImage::new(800, 800)
            .save(source.join("IMAGES/test_song.jpg"))
            .unwrap();

        let batch = BatchContext::new(
            temp.path().join("out"),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        // a directory in the way makes only the cover copy fail
        let package_dir = batch.ensure_package_dir("00012345").unwrap();
        fs::create_dir(package_dir.join("test_song.jpg")).unwrap();

        let record = MetadataRecord::new("Test Song", "US123", "00012345");
        let bundle = AssetResolver::with_search_root(&source)
            .resolve(&record, &batch)
            .unwrap();

        assert_eq!(bundle.files.len(), 1);
        assert_eq!(bundle.files[0].path, package_dir.join("test_song.mp3"));
        assert_eq!(bundle.failed.len(), 1);
        assert_eq!(bundle.failed[0].source, source.join("IMAGES/test_song.jpg"));
        assert!(bundle.failed[0].to_string().starts_with("Copy failed: "));
        assert_eq!(bundle.missing.len(), 1);
        assert_eq!(bundle.missing[0].extension, "jpg");
        assert_eq!(bundle.image_filename(), None);
    }
}
