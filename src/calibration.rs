use log::info;
use opencv::aruco::calibrate_camera_charuco;
use opencv::core::{Mat, Point2f, Size, TermCriteria, Vector};
use opencv::objdetect::{
    self, ArucoDetector, CharucoBoard, CharucoDetector, CharucoParameters, DetectorParameters,
    RefineParameters,
};
use opencv::prelude::*;
use opencv::types::PtrOfCharucoBoard;

use crate::board::BoardSpec;
use crate::errors::{Error, ErrorKind};
use crate::sampling::Accumulator;

/// Detection result for a single frame: the raw marker detections plus the
/// interpolated Charuco corners. Either side may be partial.
#[derive(Debug)]
pub struct Observation {
    pub marker_corners: Vector<Vector<Point2f>>,
    pub marker_ids: Vector<i32>,
    pub charuco_corners: Vector<Point2f>,
    pub charuco_ids: Vector<i32>,
}

impl Observation {
    pub fn marker_count(&self) -> usize {
        self.marker_corners.len()
    }

    pub fn corner_count(&self) -> usize {
        self.charuco_corners.len()
    }
}

/// Wraps the OpenCV marker and Charuco detectors for one board
/// specification.
pub struct BoardDetector {
    board: CharucoBoard,
    marker_detector: ArucoDetector,
    charuco_detector: CharucoDetector,
}

impl BoardDetector {
    pub fn new(spec: &BoardSpec) -> opencv::Result<Self> {
        let board = spec.create_board()?;
        let refine = RefineParameters {
            min_rep_distance: 0.5,
            error_correction_rate: 1.0,
            check_all_orders: true,
        };
        let marker_detector = ArucoDetector::new(
            &objdetect::get_predefined_dictionary(objdetect::PredefinedDictionaryType::DICT_4X4_50)?,
            &DetectorParameters::default()?,
            refine,
        )?;
        let charuco_detector = CharucoDetector::new(
            &board,
            &CharucoParameters::default()?,
            &DetectorParameters::default()?,
            refine,
        )?;
        Ok(Self {
            board,
            marker_detector,
            charuco_detector,
        })
    }

    pub fn board(&self) -> &CharucoBoard {
        &self.board
    }

    /// Runs marker detection and Charuco corner interpolation on a grayscale
    /// frame. Returns `None` when no marker is visible at all. The input must
    /// be the pristine capture, not the annotated display buffer.
    pub fn detect(&self, gray: &Mat) -> opencv::Result<Option<Observation>> {
        let mut marker_corners = Vector::<Vector<Point2f>>::new();
        let mut marker_ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        self.marker_detector
            .detect_markers(gray, &mut marker_corners, &mut marker_ids, &mut rejected)?;

        if marker_ids.is_empty() {
            return Ok(None);
        }

        let mut charuco_corners = Vector::<Point2f>::new();
        let mut charuco_ids = Vector::<i32>::new();
        self.charuco_detector.detect_board(
            gray,
            &mut charuco_corners,
            &mut charuco_ids,
            &mut marker_corners,
            &mut marker_ids,
        )?;

        Ok(Some(Observation {
            marker_corners,
            marker_ids,
            charuco_corners,
            charuco_ids,
        }))
    }
}

/// Solved intrinsics plus the per-observation poses, persistence-ready:
/// rotation and translation vectors are stacked into N×3 matrices.
#[derive(Debug)]
pub struct CalibrationResult {
    pub camera_matrix: Mat,
    pub distortion_coefficients: Mat,
    pub rotation_vectors: Mat,
    pub translation_vectors: Mat,
}

/// Hands the full accumulator to the OpenCV Charuco calibration solve. An
/// empty accumulator is rejected up front; degenerate observation sets fail
/// inside the solver and propagate as-is.
pub fn calibrate(
    accumulator: &Accumulator,
    board: &CharucoBoard,
    image_size: Size,
) -> Result<CalibrationResult, Error> {
    if accumulator.is_empty() {
        return Err(Error::Calibration(ErrorKind::NoObservations));
    }

    let board = PtrOfCharucoBoard::new(board.clone());
    let mut camera_matrix = Mat::default();
    let mut distortion_coefficients = Mat::default();
    let mut rotation_vectors = Vector::<Mat>::new();
    let mut translation_vectors = Vector::<Mat>::new();
    let rms = calibrate_camera_charuco(
        accumulator.corners(),
        accumulator.ids(),
        &board,
        image_size,
        &mut camera_matrix,
        &mut distortion_coefficients,
        &mut rotation_vectors,
        &mut translation_vectors,
        0,
        TermCriteria::default()?,
    )?;
    info!(
        "solved intrinsics from {} observations, rms reprojection error {:.4}",
        accumulator.len(),
        rms
    );

    Ok(CalibrationResult {
        camera_matrix,
        distortion_coefficients,
        rotation_vectors: stack_pose_vectors(&rotation_vectors)?,
        translation_vectors: stack_pose_vectors(&translation_vectors)?,
    })
}

// one 3x1 pose vector per observation -> N×3
fn stack_pose_vectors(vectors: &Vector<Mat>) -> opencv::Result<Mat> {
    let mut rows = Vector::<Mat>::new();
    for index in 0..vectors.len() {
        let vector = vectors.get(index)?;
        rows.push(vector.reshape(1, 1)?.try_clone()?);
    }
    let mut stacked = Mat::default();
    opencv::core::vconcat(&rows, &mut stacked)?;
    Ok(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_is_rejected_before_the_solve() {
        let spec = BoardSpec { rows: 8, columns: 10 };
        let board = spec.create_board().unwrap();
        let result = calibrate(&Accumulator::new(), &board, Size::new(1280, 720));
        assert!(matches!(
            result,
            Err(Error::Calibration(ErrorKind::NoObservations))
        ));
    }

    #[test]
    fn pose_vectors_stack_row_per_observation() {
        let mut vectors = Vector::<Mat>::new();
        vectors.push(Mat::from_slice_2d(&[[0.1f64], [0.2], [0.3]]).unwrap());
        vectors.push(Mat::from_slice_2d(&[[1.0f64], [2.0], [3.0]]).unwrap());
        let stacked = stack_pose_vectors(&vectors).unwrap();
        assert_eq!(stacked.rows(), 2);
        assert_eq!(stacked.cols(), 3);
        assert_eq!(*stacked.at_2d::<f64>(1, 2).unwrap(), 3.0);
    }
}
