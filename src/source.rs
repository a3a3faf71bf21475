use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

use crate::error::{DecodeError, PipelineError};
use crate::models::ImageRecord;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// A decoded image and its file record
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub record: ImageRecord,
    pub image: DynamicImage,
}

/// Recognized image files of one directory, in lexical file-name order.
///
/// Enumeration happens once; decoding is deferred until iteration, so `iter`
/// can be called again to restart the sequence.
#[derive(Debug, Clone)]
pub struct ImageSource {
    dir: PathBuf,
    files: Vec<String>,
}

impl ImageSource {
    pub fn open(dir: &Path) -> Result<Self, PipelineError> {
        let entries = std::fs::read_dir(dir).map_err(|source| PipelineError::InputDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PipelineError::InputDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_image_file(&path) {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_names(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lazily decode every file in order.
    pub fn iter(&self) -> impl Iterator<Item = (String, Result<DecodedImage, DecodeError>)> + '_ {
        self.files
            .iter()
            .map(|name| (name.clone(), decode_image(&self.dir.join(name))))
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Decode one image file and capture its record.
pub fn decode_image(path: &Path) -> Result<DecodedImage, DecodeError> {
    let decode_err = |reason: String| DecodeError {
        path: path.to_path_buf(),
        reason,
    };

    let image = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(decode_err("image has no pixels".to_string()));
    }

    let record = ImageRecord::from_image(path, &image)?;
    Ok(DecodedImage { record, image })
}
