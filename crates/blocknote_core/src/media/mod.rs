//! Media file store contract.
//!
//! # Responsibility
//! - Define how captured image/audio bytes become a stable file path plus
//!   metadata before a block referencing them reaches the editor.
//! - Provide a directory-backed store that delegates metadata probing.
//!
//! # Invariants
//! - A block is only built from a successfully stored asset; on any
//!   `MediaError` no block exists and no placeholder is inserted.
//! - A file whose probe fails is removed again.

use crate::model::block::{BlockKind, ContentBlock, ValidationError};
use crate::model::note::NoteId;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub type MediaResult<T> = Result<T, MediaError>;

/// Kind of a captured asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Audio => "audios",
        }
    }

    fn file_name(self) -> String {
        match self {
            Self::Image => format!("img_{}.jpg", Uuid::new_v4()),
            Self::Audio => format!("record_{}.m4a", Uuid::new_v4()),
        }
    }
}

/// Metadata probed from a stored file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub width_px: Option<u32>,
    pub height_px: Option<u32>,
    pub duration_ms: Option<u64>,
}

/// An asset persisted by a media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub kind: MediaKind,
    pub file_path: String,
    pub metadata: MediaMetadata,
}

/// Captured bytes waiting to be stored.
#[derive(Debug, Clone, Copy)]
pub struct MediaCapture<'a> {
    pub kind: MediaKind,
    pub bytes: &'a [u8],
    pub alt_text: Option<&'a str>,
}

/// Persists captured media and reports its metadata.
pub trait MediaStore {
    fn store(&self, kind: MediaKind, bytes: &[u8]) -> MediaResult<StoredMedia>;
}

/// Reads pixel dimensions or duration from a stored file.
pub trait MediaProbe {
    fn probe(&self, kind: MediaKind, path: &Path) -> MediaResult<MediaMetadata>;
}

#[derive(Debug)]
pub enum MediaError {
    /// The capture carried no bytes.
    EmptyCapture,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The probe could not read the stored asset.
    Probe(String),
    /// Stored metadata does not form a valid block.
    InvalidMetadata(ValidationError),
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapture => write!(f, "captured media is empty"),
            Self::Io { path, source } => {
                write!(f, "media file error at `{}`: {source}", path.display())
            }
            Self::Probe(message) => write!(f, "media probe failed: {message}"),
            Self::InvalidMetadata(err) => write!(f, "invalid media metadata: {err}"),
        }
    }
}

impl Error for MediaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidMetadata(err) => Some(err),
            Self::EmptyCapture | Self::Probe(_) => None,
        }
    }
}

impl From<ValidationError> for MediaError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidMetadata(value)
    }
}

/// Stores a capture and builds the media block referencing it.
///
/// The block's `order` is provisional; the save scan assigns the real one.
pub fn capture_block(
    store: &dyn MediaStore,
    note_id: NoteId,
    capture: MediaCapture<'_>,
) -> MediaResult<ContentBlock> {
    if capture.bytes.is_empty() {
        return Err(MediaError::EmptyCapture);
    }
    let stored = store.store(capture.kind, capture.bytes)?;
    let alt_text = capture.alt_text.map(str::to_string);
    let kind = match stored.kind {
        MediaKind::Image => BlockKind::Image {
            file_path: stored.file_path,
            alt_text,
            width_px: stored.metadata.width_px,
            height_px: stored.metadata.height_px,
        },
        MediaKind::Audio => BlockKind::Audio {
            file_path: stored.file_path,
            alt_text,
            duration_ms: stored.metadata.duration_ms,
        },
    };
    Ok(ContentBlock::new(note_id, kind, 0)?)
}

/// Media store writing files under `<root>/images` and `<root>/audios`.
pub struct DirMediaStore<P: MediaProbe> {
    root: PathBuf,
    probe: P,
}

impl<P: MediaProbe> DirMediaStore<P> {
    pub fn new(root: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            root: root.into(),
            probe,
        }
    }
}

impl<P: MediaProbe> MediaStore for DirMediaStore<P> {
    fn store(&self, kind: MediaKind, bytes: &[u8]) -> MediaResult<StoredMedia> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyCapture);
        }
        let dir = self.root.join(kind.dir_name());
        std::fs::create_dir_all(&dir).map_err(|err| MediaError::Io {
            path: dir.clone(),
            source: err,
        })?;

        let path = dir.join(kind.file_name());
        std::fs::write(&path, bytes).map_err(|err| MediaError::Io {
            path: path.clone(),
            source: err,
        })?;

        let metadata = match self.probe.probe(kind, &path) {
            Ok(metadata) => metadata,
            Err(err) => {
                error!(
                    "event=media_store module=media status=error stage=probe bytes={} error={}",
                    bytes.len(),
                    err
                );
                if let Err(remove_err) = std::fs::remove_file(&path) {
                    warn!(
                        "event=media_store module=media status=cleanup_failed error={}",
                        remove_err
                    );
                }
                return Err(err);
            }
        };

        info!(
            "event=media_store module=media status=ok dir={} bytes={}",
            kind.dir_name(),
            bytes.len()
        );
        Ok(StoredMedia {
            kind,
            file_path: path.to_string_lossy().into_owned(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        capture_block, DirMediaStore, MediaCapture, MediaError, MediaKind, MediaMetadata,
        MediaProbe, MediaResult, MediaStore,
    };
    use crate::model::block::BlockKind;
    use std::path::Path;
    use uuid::Uuid;

    struct FixedProbe(MediaMetadata);

    impl MediaProbe for FixedProbe {
        fn probe(&self, _kind: MediaKind, _path: &Path) -> MediaResult<MediaMetadata> {
            Ok(self.0)
        }
    }

    struct FailingProbe;

    impl MediaProbe for FailingProbe {
        fn probe(&self, _kind: MediaKind, _path: &Path) -> MediaResult<MediaMetadata> {
            Err(MediaError::Probe("unreadable".to_string()))
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn stored_image_becomes_image_block() {
        let root = tempfile::tempdir().unwrap();
        let store = DirMediaStore::new(
            root.path(),
            FixedProbe(MediaMetadata {
                width_px: Some(640),
                height_px: Some(480),
                duration_ms: None,
            }),
        );

        let note_id = Uuid::new_v4();
        let block = capture_block(
            &store,
            note_id,
            MediaCapture {
                kind: MediaKind::Image,
                bytes: b"jpeg-bytes",
                alt_text: Some("receipt"),
            },
        )
        .unwrap();

        assert_eq!(block.note_id(), note_id);
        match block.kind() {
            BlockKind::Image {
                file_path,
                alt_text,
                width_px,
                height_px,
            } => {
                assert!(Path::new(file_path).exists());
                assert!(file_path.ends_with(".jpg"));
                assert_eq!(alt_text.as_deref(), Some("receipt"));
                assert_eq!((*width_px, *height_px), (Some(640), Some(480)));
            }
            other => panic!("expected image block, got {other:?}"),
        }
        assert_eq!(file_count(&root.path().join("images")), 1);
    }

    #[test]
    fn failed_probe_removes_stored_file() {
        let root = tempfile::tempdir().unwrap();
        let store = DirMediaStore::new(root.path(), FailingProbe);

        let err = store.store(MediaKind::Audio, b"m4a-bytes").unwrap_err();
        assert!(matches!(err, MediaError::Probe(_)));
        assert_eq!(file_count(&root.path().join("audios")), 0);
    }

    #[test]
    fn empty_capture_is_rejected_before_storing() {
        let root = tempfile::tempdir().unwrap();
        let store = DirMediaStore::new(root.path(), FixedProbe(MediaMetadata::default()));

        let err = capture_block(
            &store,
            Uuid::new_v4(),
            MediaCapture {
                kind: MediaKind::Image,
                bytes: &[],
                alt_text: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::EmptyCapture));
        assert!(!root.path().join("images").exists());
    }

    #[test]
    fn zero_width_metadata_is_invalid() {
        let root = tempfile::tempdir().unwrap();
        let store = DirMediaStore::new(
            root.path(),
            FixedProbe(MediaMetadata {
                width_px: Some(0),
                height_px: Some(10),
                duration_ms: None,
            }),
        );

        let err = capture_block(
            &store,
            Uuid::new_v4(),
            MediaCapture {
                kind: MediaKind::Image,
                bytes: b"x",
                alt_text: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMetadata(_)));
    }
}
