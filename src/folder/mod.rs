//! Document folder discovery and image embedding.
//!
//! A document folder holds one annotation YAML file and the image it
//! annotates. Folders named `*.grapto` under a common parent form a batch
//! that can be opened one at a time.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::CollectraError;

/// Directory extension marking a document folder inside a batch.
pub const DOCUMENT_FOLDER_EXTENSION: &str = "grapto";

const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Image formats a document folder may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Jpg,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Tif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 8] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Jpg,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Webp,
        ImageFormat::Tiff,
        ImageFormat::Tif,
    ];

    /// Looks up a format by file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| ext.eq_ignore_ascii_case(format.extension()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Tif => "tif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Jpg => "image/jpg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Tiff | ImageFormat::Tif => "image/tiff",
        }
    }
}

/// A folder holding one annotation document and its image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentFolder {
    /// Folder name, e.g. `page_01.grapto`.
    pub name: String,
    pub path: PathBuf,
    pub yaml_path: PathBuf,
    pub image_path: PathBuf,
}

/// An image file read into memory and encoded for embedding.
#[derive(Clone, Debug, Serialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
}

/// Finds the first YAML file and the first image directly inside `dir`.
///
/// Entries are visited in file-name order so the choice is stable.
pub fn scan_document_folder(dir: &Path) -> Result<DocumentFolder, CollectraError> {
    if !dir.is_dir() {
        return Err(folder_invalid(dir, "not a directory"));
    }

    let mut yaml_path = None;
    let mut image_path = None;

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            folder_invalid(dir, format!("failed while traversing directory: {source}"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if yaml_path.is_none() && has_extension(path, YAML_EXTENSIONS) {
            yaml_path = Some(path.to_path_buf());
        }
        if image_path.is_none() && ImageFormat::from_path(path).is_some() {
            image_path = Some(path.to_path_buf());
        }
        if yaml_path.is_some() && image_path.is_some() {
            break;
        }
    }

    let yaml_path = yaml_path.ok_or_else(|| folder_invalid(dir, "no YAML file found in folder"))?;
    let image_path = image_path.ok_or_else(|| folder_invalid(dir, "no image file found in folder"))?;
    debug!(dir = %dir.display(), yaml = %yaml_path.display(), image = %image_path.display(), "scanned document folder");

    Ok(DocumentFolder {
        name: file_name(dir),
        path: dir.to_path_buf(),
        yaml_path,
        image_path,
    })
}

/// Lists the `*.grapto` subdirectories of `parent` that hold both a YAML
/// file and an image, sorted by name.
///
/// Subdirectories missing either file are skipped.
pub fn scan_parent_folder(parent: &Path) -> Result<Vec<DocumentFolder>, CollectraError> {
    if !parent.is_dir() {
        return Err(folder_invalid(parent, "not a directory"));
    }

    let mut folders = Vec::new();
    for entry in WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            folder_invalid(parent, format!("failed while traversing directory: {source}"))
        })?;
        if !entry.file_type().is_dir() || !has_extension(entry.path(), &[DOCUMENT_FOLDER_EXTENSION]) {
            continue;
        }

        match scan_document_folder(entry.path()) {
            Ok(folder) => folders.push(folder),
            Err(err) => debug!(error = %err, "skipping incomplete document folder"),
        }
    }

    Ok(folders)
}

/// Reads an image and encodes it as a `data:` URI.
pub fn image_data_uri(path: &Path) -> Result<ImageAsset, CollectraError> {
    let format = ImageFormat::from_path(path).ok_or_else(|| {
        CollectraError::UnsupportedImageFormat(
            path.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default()
                .to_string(),
        )
    })?;

    let (width, height) = read_image_dimensions(path)?;
    let bytes = fs::read(path)?;
    let data_uri = format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(&bytes));

    Ok(ImageAsset {
        path: path.to_path_buf(),
        format,
        width,
        height,
        data_uri,
    })
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), CollectraError> {
    let size = imagesize::size(path).map_err(|source| CollectraError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| folder_invalid(path, format!("image width {} does not fit in u32", size.width)))?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| folder_invalid(path, format!("image height {} does not fit in u32", size.height)))?;

    Ok((width, height))
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    allowed.iter().any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn folder_invalid(path: &Path, message: impl Into<String>) -> CollectraError {
    CollectraError::FolderInvalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
