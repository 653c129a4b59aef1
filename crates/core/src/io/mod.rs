//! Seam to the I/O collaborator that persists output images.
//!
//! Decoding and encoding of on-disk formats live outside this library; the
//! engine only hands finished images to an [`ImageSink`]. Sink failures are
//! surfaced unchanged as [`Error::Io`](crate::Error::Io).

use crate::error::Result;
use crate::image::Image;
use std::collections::BTreeMap;

/// Destination for finished output images
pub trait ImageSink {
    /// Persist `image` under `image.name()`
    fn write(&mut self, image: &Image) -> std::io::Result<()>;
}

impl Image {
    /// Hand this image to the persistence collaborator
    pub fn persist<S: ImageSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write(self)?;
        Ok(())
    }
}

/// Keeps written images in memory, keyed by output name
#[derive(Debug, Default)]
pub struct MemorySink {
    images: BTreeMap<String, Image>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Image> {
        self.images.get(name)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSink for MemorySink {
    fn write(&mut self, image: &Image) -> std::io::Result<()> {
        self.images.insert(image.name().to_string(), image.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::raster::Raster;

    struct ReadOnlyDisk;

    impl ImageSink for ReadOnlyDisk {
        fn write(&mut self, _image: &Image) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            ))
        }
    }

    fn image() -> Image {
        Image::from_planes("out.tif", vec![("red", Raster::filled(2, 2, 0.1))]).unwrap()
    }

    #[test]
    fn test_memory_sink_keeps_image() {
        let mut sink = MemorySink::new();
        image().persist(&mut sink).unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink.get("out.tif").is_some());
    }

    #[test]
    fn test_sink_failure_passes_through() {
        let err = image().persist(&mut ReadOnlyDisk).unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
