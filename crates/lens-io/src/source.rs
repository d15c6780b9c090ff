//! Frame sources backed by image files on disk.

use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted as frames (compared case-insensitively).
const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("frame directory not found: {0}")]
    NotFound(String),
    #[error("no frames in {0}")]
    Empty(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// File name, used as the key into detection files and for output naming.
    pub name: String,
    pub sequence: u32,
    pub image: RgbImage,
}

/// Sorted list of image files in a directory, decoded lazily.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir.display().to_string()));
        }
        let entries = std::fs::read_dir(dir).map_err(|source| SourceError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_frame_file(p))
            .collect();
        if paths.is_empty() {
            return Err(SourceError::Empty(dir.display().to_string()));
        }
        paths.sort();

        tracing::info!(dir = %dir.display(), frames = paths.len(), "opened image sequence");
        Ok(Self {
            paths,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Iterator for ImageSequence {
    type Item = Result<Frame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.get(self.next)?;
        let sequence = self.next as u32;
        self.next += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(load_frame(path).map(|image| Frame {
            name,
            sequence,
            image,
        }))
    }
}

/// Decode one image file to 8-bit RGB.
pub fn load_frame(path: &Path) -> Result<RgbImage, SourceError> {
    let img = image::open(path).map_err(|source| SourceError::Decode {
        path: path.display().to_string(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Encode `image` to `path`; the format follows the file extension.
pub fn save_frame(path: &Path, image: &RgbImage) -> Result<(), SourceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| SourceError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    image.save(path).map_err(|source| SourceError::Encode {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, value: u8) {
        let img = RgbImage::from_pixel(4, 3, image::Rgb([value, value, value]));
        save_frame(&dir.join(name), &img).unwrap();
    }

    #[test]
    fn test_sequence_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "b.png", 20);
        write_png(dir.path(), "a.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let seq = ImageSequence::open(dir.path()).unwrap();
        assert_eq!(seq.len(), 2);
        let frames: Vec<Frame> = seq.map(|f| f.unwrap()).collect();
        assert_eq!(frames[0].name, "a.png");
        assert_eq!(frames[0].sequence, 0);
        assert_eq!(frames[0].image.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(frames[1].name, "b.png");
        assert_eq!(frames[1].image.dimensions(), (4, 3));
    }

    #[test]
    fn test_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequence::open(dir.path()),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(matches!(
            ImageSequence::open(Path::new("/nonexistent/frames")),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_frame_reported_per_item() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut seq = ImageSequence::open(dir.path()).unwrap();
        assert!(matches!(seq.next(), Some(Err(SourceError::Decode { .. }))));
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/frame.png");
        save_frame(&path, &RgbImage::new(2, 2)).unwrap();
        assert_eq!(load_frame(&path).unwrap().dimensions(), (2, 2));
    }
}
