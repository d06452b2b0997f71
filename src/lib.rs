pub mod board;
pub mod calibration;
pub mod errors;
pub mod graphics;
pub mod persistence;
pub mod sampling;
pub mod video;
