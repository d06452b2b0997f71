use opencv::core::{Mat, Size};
use opencv::highgui::{destroy_window, imshow, named_window, resize_window, wait_key, WINDOW_NORMAL};
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};

use crate::errors::{Error, ErrorKind};

const KEY_ESCAPE: i32 = 27;

/// Open camera device, released again when the handle drops.
pub struct Camera {
    capture: VideoCapture,
}

impl Camera {
    pub fn open(camera_id: i32, resolution: Size) -> Result<Self, Error> {
        let mut capture = VideoCapture::new(camera_id, CAP_ANY)?;
        if !VideoCapture::is_opened(&capture)? {
            capture.release()?;
            return Err(Error::Calibration(ErrorKind::CameraUnavailable));
        }
        capture.set(CAP_PROP_FRAME_WIDTH, resolution.width as f64)?;
        capture.set(CAP_PROP_FRAME_HEIGHT, resolution.height as f64)?;
        Ok(Self { capture })
    }

    /// Blocks for the next frame. `None` means the stream ended.
    pub fn read(&mut self) -> opencv::Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.size()?.width < 1 {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}

/// Display window, destroyed again when the handle drops.
pub struct Window {
    name: String,
}

impl Window {
    pub fn open(name: &str, width: i32, height: i32) -> opencv::Result<Self> {
        named_window(name, WINDOW_NORMAL)?;
        resize_window(name, width, height)?;
        Ok(Self { name: name.to_owned() })
    }

    pub fn show(&self, frame: &Mat) -> opencv::Result<()> {
        imshow(&self.name, frame)
    }

    /// Short-timeout poll for the Esc key, once per loop iteration.
    pub fn cancelled(&self) -> opencv::Result<bool> {
        Ok(wait_key(1)? == KEY_ESCAPE)
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let _ = destroy_window(&self.name);
    }
}
