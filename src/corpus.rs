// THEORY:
// The `corpus` module is the bridge between the filesystem and the feature store.
// A corpus is a single directory of images named by their sequential identifier
// and a fixed extension: `1.jpg`, `2.jpg`, ..., `N.jpg`.
//
// Missing files are a hard failure. Substituting a placeholder would let every
// query match against noise, so a gap in the sequence aborts the load just like an
// undecodable image does.

use std::path::{Path, PathBuf};

use crate::core_modules::ImageId;
use crate::core_modules::feature_store::FeatureStore;
use crate::core_modules::histogram::HistogramSet;
use crate::error::{CorpusLoadError, InvalidImageError};

/// A directory of sequentially numbered corpus images.
#[derive(Debug, Clone)]
pub struct CorpusDirectory {
    folder: PathBuf,
    extension: String,
}

impl CorpusDirectory {
    pub fn new(folder: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            folder: folder.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// `<id>.<extension>`
    pub fn file_name(&self, id: ImageId) -> String {
        format!("{}.{}", id, self.extension)
    }

    pub fn image_path(&self, id: ImageId) -> PathBuf {
        self.folder.join(self.file_name(id))
    }

    /// Length of the contiguous run `1, 2, ...` of existing image files.
    pub fn discover(&self) -> usize {
        (1..).take_while(|&id| self.image_path(id).is_file()).count()
    }

    /// Decodes and extracts every image `1..=corpus_size`, or the discovered run when
    /// no size is given. Fails on the first missing or invalid image.
    pub fn load(&self, corpus_size: Option<usize>) -> Result<FeatureStore, CorpusLoadError> {
        let corpus_size = corpus_size.unwrap_or_else(|| self.discover());
        log::info!(
            "Loading {} images from {}",
            corpus_size,
            self.folder.display()
        );

        let histograms = (1..=corpus_size)
            .map(|id| self.extract(id))
            .collect::<Result<Vec<_>, _>>()?;
        FeatureStore::from_histograms(histograms)
    }

    fn extract(&self, id: ImageId) -> Result<HistogramSet, CorpusLoadError> {
        let path = self.image_path(id);
        if !path.exists() {
            return Err(CorpusLoadError::MissingImage { id, path });
        }

        let bytes = std::fs::read(&path).map_err(|source| CorpusLoadError::Unreadable {
            id,
            path: path.clone(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|err| CorpusLoadError::Image {
            id,
            source: InvalidImageError::Undecodable(err),
        })?;

        let histograms = HistogramSet::extract(&image)
            .map_err(|source| CorpusLoadError::Image { id, source })?;
        log::debug!(
            "Extracted {} ({} pixels)",
            path.display(),
            histograms.pixel_count()
        );
        Ok(histograms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_solid(dir: &Path, name: &str, rgb: [u8; 3]) {
        RgbImage::from_pixel(5, 4, Rgb(rgb))
            .save(dir.join(name))
            .expect("Error Saving File.");
    }

    #[test]
    fn names_images_by_id_and_extension() {
        let corpus = CorpusDirectory::new("images", ".jpg");
        assert_eq!(corpus.file_name(12), "12.jpg");
        assert_eq!(corpus.image_path(3), Path::new("images").join("3.jpg"));
    }

    #[test]
    fn discovers_the_contiguous_run() {
        let dir = TempDir::new().unwrap();
        for (name, shade) in [("1.png", 0), ("2.png", 85), ("3.png", 160), ("5.png", 240)] {
            write_solid(dir.path(), name, [shade; 3]);
        }
        let corpus = CorpusDirectory::new(dir.path(), "png");
        assert_eq!(corpus.discover(), 3);

        let store = corpus.load(None).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.histograms(2).unwrap().intensity.bins()[8], 20);
    }

    #[test]
    fn missing_image_fails_the_whole_load() {
        let dir = TempDir::new().unwrap();
        write_solid(dir.path(), "1.png", [10, 20, 30]);
        write_solid(dir.path(), "3.png", [10, 20, 30]);
        let corpus = CorpusDirectory::new(dir.path(), "png");

        let err = corpus.load(Some(3)).unwrap_err();
        assert!(matches!(err, CorpusLoadError::MissingImage { id: 2, .. }));
    }

    #[test]
    fn undecodable_image_fails_the_whole_load() {
        let dir = TempDir::new().unwrap();
        write_solid(dir.path(), "1.png", [10, 20, 30]);
        std::fs::write(dir.path().join("2.png"), b"definitely not a png").unwrap();
        let corpus = CorpusDirectory::new(dir.path(), "png");

        let err = corpus.load(Some(2)).unwrap_err();
        assert!(matches!(
            err,
            CorpusLoadError::Image {
                id: 2,
                source: InvalidImageError::Undecodable(_)
            }
        ));
    }

    #[test]
    fn unreadable_entry_fails_the_whole_load() {
        let dir = TempDir::new().unwrap();
        write_solid(dir.path(), "1.png", [10, 20, 30]);
        std::fs::create_dir(dir.path().join("2.png")).unwrap();
        write_solid(dir.path(), "3.png", [10, 20, 30]);
        let corpus = CorpusDirectory::new(dir.path(), "png");

        match corpus.load(Some(3)) {
            Err(CorpusLoadError::Unreadable { id, path, .. }) => {
                assert_eq!(id, 2);
                assert_eq!(path, dir.path().join("2.png"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("a directory in place of an image must not load"),
        }
    }

    #[test]
    fn empty_directory_is_an_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let corpus = CorpusDirectory::new(dir.path(), "png");
        assert!(matches!(corpus.load(None), Err(CorpusLoadError::Empty)));
    }
}
