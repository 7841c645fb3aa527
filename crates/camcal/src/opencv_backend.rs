//! OpenCV camera, HighGUI window and ArUco marker images.

use crate::core::{BoardGeometry, DetectedPattern, Display, DisplayError, Frame, FrameSource};
use crate::CamcalError;
use log::{info, warn};
use opencv::core::{Mat, Point2f, Size, Vector};
use opencv::prelude::*;
use opencv::{calib3d, highgui, imgcodecs, imgproc, objdetect, videoio};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// BGR camera frame → RGB [`Frame`].
pub fn mat_to_frame(bgr: &Mat) -> Result<Option<Frame>, opencv::Error> {
    if bgr.empty() {
        return Ok(None);
    }
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let data = rgb.data_bytes()?.to_vec();
    Ok(Frame::from_rgb(rgb.cols() as usize, rgb.rows() as usize, data))
}

/// RGB [`Frame`] → BGR matrix for HighGUI.
pub fn frame_to_mat(frame: &Frame) -> Result<Mat, opencv::Error> {
    let rgb = Mat::from_slice(&frame.data)?
        .reshape(3, frame.height as i32)?
        .try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Live frames from a `VideoCapture` device.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    buffer: Mat,
    fps: Option<f64>,
}

impl CameraSource {
    /// Open camera `index`; a device that does not open is an error.
    pub fn open(index: i32) -> Result<Self, CamcalError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CamcalError::CameraUnavailable(index));
        }
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = (fps.is_finite() && fps > 0.0).then_some(fps);
        info!("camera {index} opened (fps {fps:?})");
        Ok(Self {
            capture,
            buffer: Mat::default(),
            fps,
        })
    }

    /// Frame rate reported by the driver, when it reports one.
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Option<Frame> {
        match self.capture.read(&mut self.buffer) {
            Ok(true) => {}
            Ok(false) => {
                warn!("camera returned no frame");
                return None;
            }
            Err(e) => {
                warn!("camera read failed: {e}");
                return None;
            }
        }
        match mat_to_frame(&self.buffer) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("frame conversion failed: {e}");
                None
            }
        }
    }
}

/// One HighGUI window showing the feed with the detected corners drawn in.
pub struct HighGuiDisplay {
    title: String,
    board: BoardGeometry,
}

impl HighGuiDisplay {
    pub fn new(title: impl Into<String>, board: BoardGeometry) -> Result<Self, CamcalError> {
        let title = title.into();
        highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { title, board })
    }

    fn render(&self, frame: &Frame, pattern: &DetectedPattern) -> Result<(), opencv::Error> {
        let mut bgr = frame_to_mat(frame)?;
        if !pattern.points.is_empty() {
            let corners: Vector<Point2f> = pattern
                .points
                .iter()
                .map(|p| Point2f::new(p.x, p.y))
                .collect();
            let size = Size::new(self.board.width as i32, self.board.height as i32);
            calib3d::draw_chessboard_corners(&mut bgr, size, &corners, pattern.found)?;
        }
        highgui::imshow(&self.title, &bgr)
    }
}

impl Display for HighGuiDisplay {
    fn show(&mut self, frame: &Frame, pattern: &DetectedPattern) -> Result<(), DisplayError> {
        self.render(frame, pattern)
            .map_err(|e| DisplayError(e.to_string()))
    }

    fn wait_key(&mut self, timeout: Duration) -> Result<Option<i32>, DisplayError> {
        let ms = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(ms).map_err(|e| DisplayError(e.to_string()))?;
        Ok((key >= 0).then_some(key & 0xFF))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.title);
    }
}

/// File name of marker `id`.
pub fn marker_file_name(id: i32) -> String {
    format!("4x4Marker_{id}.jpg")
}

/// Write `count` markers of the predefined 4×4_50 ArUco dictionary as
/// `side_px`-pixel JPEGs with a one-bit border.
pub fn generate_aruco_markers(
    dir: impl AsRef<Path>,
    count: i32,
    side_px: i32,
) -> Result<Vec<PathBuf>, CamcalError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let dictionary =
        objdetect::get_predefined_dictionary(objdetect::PredefinedDictionaryType::DICT_4X4_50)?;

    let mut written = Vec::with_capacity(count.max(0) as usize);
    for id in 0..count {
        let mut marker = Mat::default();
        objdetect::generate_image_marker(&dictionary, id, side_px, &mut marker, 1)?;
        let path = dir.join(marker_file_name(id));
        let ok = imgcodecs::imwrite(&path.to_string_lossy(), &marker, &Vector::<i32>::new())?;
        if !ok {
            return Err(CamcalError::Io(std::io::Error::other(format!(
                "could not write {}",
                path.display()
            ))));
        }
        written.push(path);
    }
    info!("{} markers written to {}", written.len(), dir.display());
    Ok(written)
}
