use log::info;
use opencv::core::{FileStorage, FileStorage_READ, FileStorage_WRITE, Mat};
use opencv::prelude::*;

use crate::calibration::CalibrationResult;
use crate::errors::{Error, ErrorKind};

const CAMERA_MATRIX: &str = "camera_matrix";
const DISTORTION_COEFFICIENTS: &str = "distortion_coefficients";
const ROTATION_VECTORS: &str = "rotation_vectors";
const TRANSLATION_VECTORS: &str = "translation_vectors";

/// Writes the four calibration fields into one named archive, replacing any
/// existing archive at `path`.
pub fn save(result: &CalibrationResult, path: &str) -> Result<(), Error> {
    let mut storage = FileStorage::new(path, FileStorage_WRITE, "")?;
    storage.write_mat(CAMERA_MATRIX, &result.camera_matrix)?;
    storage.write_mat(DISTORTION_COEFFICIENTS, &result.distortion_coefficients)?;
    storage.write_mat(ROTATION_VECTORS, &result.rotation_vectors)?;
    storage.write_mat(TRANSLATION_VECTORS, &result.translation_vectors)?;
    storage.release()?;
    info!("calibration data written to {}", path);
    Ok(())
}

/// Reads all four fields back. Fails if the archive cannot be opened or any
/// field is absent.
pub fn load(path: &str) -> Result<CalibrationResult, Error> {
    let storage = FileStorage::new(path, FileStorage_READ, "")?;
    if !storage.is_opened()? {
        return Err(Error::Calibration(ErrorKind::MissingArchive(path.into())));
    }
    let result = CalibrationResult {
        camera_matrix: read_field(&storage, CAMERA_MATRIX)?,
        distortion_coefficients: read_field(&storage, DISTORTION_COEFFICIENTS)?,
        rotation_vectors: read_field(&storage, ROTATION_VECTORS)?,
        translation_vectors: read_field(&storage, TRANSLATION_VECTORS)?,
    };
    Ok(result)
}

fn read_field(storage: &FileStorage, name: &'static str) -> Result<Mat, Error> {
    let node = storage.get(name)?;
    if node.empty()? {
        return Err(Error::Calibration(ErrorKind::MissingField(name)));
    }
    Ok(node.mat()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> CalibrationResult {
        CalibrationResult {
            camera_matrix: Mat::from_slice_2d(&[
                [912.5f64, 0.0, 640.25],
                [0.0, 910.75, 360.5],
                [0.0, 0.0, 1.0],
            ])
            .unwrap(),
            distortion_coefficients: Mat::from_slice_2d(&[[
                0.125f64, -0.25, 0.0625, -0.03125, 0.5,
            ]])
            .unwrap(),
            rotation_vectors: Mat::from_slice_2d(&[
                [0.5f64, -0.25, 0.125],
                [1.5, 0.75, -0.375],
            ])
            .unwrap(),
            translation_vectors: Mat::from_slice_2d(&[
                [10.5f64, -2.25, 30.0],
                [-1.5, 4.0, 28.5],
            ])
            .unwrap(),
        }
    }

    fn assert_mat_eq(left: &Mat, right: &Mat) {
        assert_eq!(left.rows(), right.rows());
        assert_eq!(left.cols(), right.cols());
        let left: Vec<f64> = left.data_typed::<f64>().unwrap().to_vec();
        let right: Vec<f64> = right.data_typed::<f64>().unwrap().to_vec();
        assert_eq!(left, right);
    }

    fn assert_results_eq(left: &CalibrationResult, right: &CalibrationResult) {
        assert_mat_eq(&left.camera_matrix, &right.camera_matrix);
        assert_mat_eq(
            &left.distortion_coefficients,
            &right.distortion_coefficients,
        );
        assert_mat_eq(&left.rotation_vectors, &right.rotation_vectors);
        assert_mat_eq(&left.translation_vectors, &right.translation_vectors);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration_data.json");
        let path = path.to_str().unwrap();

        let original = sample_result();
        save(&original, path).unwrap();
        let loaded = load(path).unwrap();
        assert_results_eq(&original, &loaded);
    }

    #[test]
    fn resaving_under_a_new_name_preserves_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        let original = sample_result();
        save(&original, first.to_str().unwrap()).unwrap();
        let reloaded = load(first.to_str().unwrap()).unwrap();
        save(&reloaded, second.to_str().unwrap()).unwrap();
        let final_copy = load(second.to_str().unwrap()).unwrap();
        assert_results_eq(&original, &final_copy);
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.json");
        assert!(load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        let path = path.to_str().unwrap();

        let mut storage = FileStorage::new(path, FileStorage_WRITE, "").unwrap();
        storage
            .write_mat(CAMERA_MATRIX, &sample_result().camera_matrix)
            .unwrap();
        storage.release().unwrap();

        let result = load(path);
        assert!(matches!(
            result,
            Err(Error::Calibration(ErrorKind::MissingField(
                DISTORTION_COEFFICIENTS
            )))
        ));
    }
}
