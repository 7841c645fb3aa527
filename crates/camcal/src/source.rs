//! Still images on disk as a [`FrameSource`].

use crate::core::{Frame, FrameSource};
use crate::detect::frame_from_rgb;
use crate::CamcalError;
use log::{debug, warn};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Image files decoded one by one, in file-name order.
///
/// Files that fail to decode are skipped with a warning; the sequence ends
/// after the last file.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    pending: VecDeque<PathBuf>,
    current: Option<PathBuf>,
}

impl ImageSequenceSource {
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
            current: None,
        }
    }

    /// Every `png`/`jpg`/`jpeg`/`bmp` file directly inside `dir`, sorted by name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CamcalError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(CamcalError::NoImages(dir.to_path_buf()));
        }
        paths.sort();
        debug!("{} images in {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    /// Files not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// The file behind the most recent frame.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<Frame> {
        while let Some(path) = self.pending.pop_front() {
            let frame = ::image::open(&path)
                .map_err(|e| e.to_string())
                .and_then(|img| {
                    frame_from_rgb(img.to_rgb8()).ok_or_else(|| "empty image".to_string())
                });
            match frame {
                Ok(frame) => {
                    self.current = Some(path);
                    return Some(frame);
                }
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
        self.current = None;
        None
    }
}
