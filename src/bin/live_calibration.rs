use std::process;
use std::str::FromStr;
use std::time::{Duration, Instant};

use getopts::{Matches, Options};
use log::{error, info};
use opencv::core::{Mat, Point, Size};
use opencv::imgproc::{cvt_color, COLOR_BGR2GRAY};
use opencv::prelude::*;

use charuco_live::board::{BoardSpec, BOARD_IMAGE_FILE};
use charuco_live::calibration::{calibrate, BoardDetector};
use charuco_live::errors::Error;
use charuco_live::graphics::{draw_observation, write_text};
use charuco_live::persistence;
use charuco_live::sampling::{Accumulator, SamplingGate};
use charuco_live::video::{Camera, Window};

const WINDOW_NAME: &str = "Livestream";

const DEFAULT_ROWS: i32 = 8;
const DEFAULT_COLUMNS: i32 = 10;
const DEFAULT_VIDEO_WIDTH: i32 = 1280;
const DEFAULT_VIDEO_HEIGHT: i32 = 720;
const DEFAULT_TIME_STEP: f64 = 3.0;
const DEFAULT_CAMERA_ID: i32 = 0;
const DEFAULT_OUTPUT_FILE: &str = "calibration_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Calibrate,
    Generate,
}

#[derive(Debug)]
struct Args {
    mode: Mode,
    rows: i32,
    columns: i32,
    video_width: i32,
    video_height: i32,
    time_step: f64,
    camera_id: i32,
    output_file: String,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv[0].clone();

    let mut opts = Options::new();
    opts.optopt("m", "mode", "'calibrate' or 'generate'", "MODE");
    opts.optopt("", "rows", "amount of rows (short side of paper), default 8", "N");
    opts.optopt("", "columns", "amount of columns (long side of paper), default 10", "N");
    opts.optopt("", "video-height", "height of livestream video, default 720", "PX");
    opts.optopt("", "video-width", "width of livestream video, default 1280", "PX");
    opts.optopt(
        "",
        "time-step",
        "min. seconds which need to pass between two captures, default 3",
        "SECONDS",
    );
    opts.optopt("", "camera-id", "camera device id, default 0", "ID");
    opts.optopt(
        "",
        "output-file",
        "output file base name, default 'calibration_data'",
        "NAME",
    );
    opts.optflag("h", "help", "prints usage");

    let matches = match opts.parse(&argv[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("{}", f);
            process::exit(2);
        }
    };
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return;
    }
    let args = match parse_args(&matches) {
        Some(args) => args,
        None => {
            print_usage(&program, opts);
            process::exit(2);
        }
    };

    if args.mode == Mode::Generate {
        let spec = BoardSpec {
            rows: args.rows,
            columns: args.columns,
        };
        if let Err(err) = spec.export_image(BOARD_IMAGE_FILE) {
            error!("could not generate board image: {}", err);
            process::exit(1);
        }
        info!("board image written to {}", BOARD_IMAGE_FILE);
        return;
    }

    // device-open failure is fatal before any window exists
    let resolution = Size::new(args.video_width, args.video_height);
    let camera = match Camera::open(args.camera_id, resolution) {
        Ok(camera) => camera,
        Err(_) => {
            eprintln!("Could not open camera device.");
            process::exit(1);
        }
    };

    if let Err(err) = run_calibrate(&args, camera) {
        error!("error occurred, exiting: {}", err);
        process::exit(1);
    }
}

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} --mode MODE [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_args(matches: &Matches) -> Option<Args> {
    let mode = match matches.opt_str("mode").as_deref() {
        Some("calibrate") => Mode::Calibrate,
        Some("generate") => Mode::Generate,
        _ => return None,
    };

    Some(Args {
        mode,
        rows: opt_or(matches, "rows", DEFAULT_ROWS),
        columns: opt_or(matches, "columns", DEFAULT_COLUMNS),
        video_width: opt_or(matches, "video-width", DEFAULT_VIDEO_WIDTH),
        video_height: opt_or(matches, "video-height", DEFAULT_VIDEO_HEIGHT),
        time_step: opt_or(matches, "time-step", DEFAULT_TIME_STEP),
        camera_id: opt_or(matches, "camera-id", DEFAULT_CAMERA_ID),
        output_file: opt_or(matches, "output-file", DEFAULT_OUTPUT_FILE.to_owned()),
    })
}

// falls back to the default when the option is absent or unparsable
fn opt_or<T: FromStr>(matches: &Matches, name: &str, default: T) -> T {
    matches
        .opt_str(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn run_calibrate(args: &Args, mut camera: Camera) -> Result<(), Error> {
    let spec = BoardSpec {
        rows: args.rows,
        columns: args.columns,
    };
    let detector = BoardDetector::new(&spec)?;
    let window = Window::open(WINDOW_NAME, args.video_width, args.video_height)?;

    let mut gate = SamplingGate::new(Duration::from_secs_f64(args.time_step.max(0.0)));
    let mut accumulator = Accumulator::new();

    let status_origin = Point::new(10, args.video_height - 10);
    let captured_origin = Point::new(10, args.video_height - 40);

    loop {
        if window.cancelled()? {
            break;
        }
        let mut frame = match camera.read()? {
            Some(frame) => frame,
            None => break,
        };

        // detection runs on a pristine grayscale copy, overlays only touch
        // the display buffer
        let mut gray = Mat::default();
        cvt_color(&frame, &mut gray, COLOR_BGR2GRAY, 0)?;

        match detector.detect(&gray)? {
            Some(observation) => {
                write_text(
                    &mut frame,
                    &format!("#{} markers found.", observation.marker_count()),
                    status_origin,
                )?;
                if gate.evaluate(observation.corner_count(), Instant::now()) {
                    accumulator.admit(
                        observation.charuco_corners.clone(),
                        observation.charuco_ids.clone(),
                    );
                    info!(
                        "admitted observation #{} with {} corners",
                        accumulator.len(),
                        observation.corner_count()
                    );
                }
                draw_observation(&mut frame, &observation)?;
            }
            None => write_text(&mut frame, "No charucos found.", status_origin)?,
        }

        write_text(&mut frame, "Press Esc. to stop recording.", Point::new(10, 30))?;
        write_text(
            &mut frame,
            &format!("Images captured: {}", accumulator.len()),
            captured_origin,
        )?;
        window.show(&frame)?;
    }

    let image_size = Size::new(args.video_width, args.video_height);
    let result = calibrate(&accumulator, detector.board(), image_size)?;
    persistence::save(&result, &format!("{}.json", args.output_file))?;

    Ok(())
}
