use opencv::core::{no_array, Size, Vector};
use opencv::imgcodecs::imwrite;
use opencv::objdetect::{get_predefined_dictionary, CharucoBoard, PredefinedDictionaryType};
use opencv::prelude::*;

use crate::errors::Error;

pub const SQUARE_LENGTH: f32 = 0.035; // in meters
pub const MARKER_LENGTH: f32 = 0.0175; // in meters
pub const BOARD_IMAGE_FILE: &str = "charuco.png";

// 300 dpi DIN A4
const BOARD_IMAGE_WIDTH: i32 = 2480;
const BOARD_IMAGE_HEIGHT: i32 = 3508;

/// Geometry of the printed Charuco board. `rows` runs along the short side of
/// the paper, `columns` along the long side.
#[derive(Debug, Clone, Copy)]
pub struct BoardSpec {
    pub rows: i32,
    pub columns: i32,
}

impl BoardSpec {
    pub fn create_board(&self) -> opencv::Result<CharucoBoard> {
        let dictionary = get_predefined_dictionary(PredefinedDictionaryType::DICT_4X4_50)?;
        CharucoBoard::new(
            Size::new(self.rows, self.columns),
            SQUARE_LENGTH,
            MARKER_LENGTH,
            &dictionary,
            &no_array(),
        )
    }

    /// Renders the board at print resolution and writes it to `path`.
    pub fn export_image(&self, path: &str) -> Result<(), Error> {
        let board = self.create_board()?;
        let mut image = Mat::default();
        board.generate_image(
            Size::new(BOARD_IMAGE_WIDTH, BOARD_IMAGE_HEIGHT),
            &mut image,
            0,
            1,
        )?;
        imwrite(path, &image, &Vector::<i32>::default())?;
        Ok(())
    }
}
