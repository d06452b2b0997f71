use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};
use log::{error, info};
use opencv::calib3d::undistort;
use opencv::core::{hconcat2, no_array, Mat, Size};
use opencv::imgproc::{resize, INTER_AREA};

use charuco_live::calibration::CalibrationResult;
use charuco_live::errors::Error;
use charuco_live::persistence;
use charuco_live::video::{Camera, Window};

const WINDOW_NAME: &str = "Livestream";

const DEFAULT_VIDEO_WIDTH: i32 = 1280;
const DEFAULT_VIDEO_HEIGHT: i32 = 720;
const DEFAULT_CAMERA_ID: i32 = 0;
const DEFAULT_CALIBRATION_FILE: &str = "calibration_data";

#[derive(Debug)]
struct Args {
    video_width: i32,
    video_height: i32,
    camera_id: i32,
    calibration_file: String,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv[0].clone();

    let mut opts = Options::new();
    opts.optopt("", "video-height", "height of livestream video, default 720", "PX");
    opts.optopt("", "video-width", "width of livestream video, default 1280", "PX");
    opts.optopt("", "camera-id", "camera device id, default 0", "ID");
    opts.optopt(
        "",
        "calibration-file",
        "calibration file base name, default 'calibration_data'",
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
    let args = parse_args(&matches);

    let calibration = match persistence::load(&format!("{}.json", args.calibration_file)) {
        Ok(calibration) => calibration,
        Err(err) => {
            error!("could not load calibration data: {}", err);
            process::exit(1);
        }
    };

    // device-open failure is fatal before any window exists
    let resolution = Size::new(args.video_width, args.video_height);
    let camera = match Camera::open(args.camera_id, resolution) {
        Ok(camera) => camera,
        Err(_) => {
            eprintln!("Could not open camera device.");
            process::exit(1);
        }
    };

    if let Err(err) = run(&args, camera, &calibration) {
        error!("error occurred, exiting: {}", err);
        process::exit(1);
    }
}

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_args(matches: &Matches) -> Args {
    Args {
        video_width: opt_or(matches, "video-width", DEFAULT_VIDEO_WIDTH),
        video_height: opt_or(matches, "video-height", DEFAULT_VIDEO_HEIGHT),
        camera_id: opt_or(matches, "camera-id", DEFAULT_CAMERA_ID),
        calibration_file: opt_or(matches, "calibration-file", DEFAULT_CALIBRATION_FILE.to_owned()),
    }
}

// falls back to the default when the option is absent or unparsable
fn opt_or<T: FromStr>(matches: &Matches, name: &str, default: T) -> T {
    matches
        .opt_str(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn run(args: &Args, mut camera: Camera, calibration: &CalibrationResult) -> Result<(), Error> {
    let half = Size::new(args.video_width / 2, args.video_height / 2);
    let window = Window::open(WINDOW_NAME, half.width * 2, half.height)?;

    loop {
        if window.cancelled()? {
            break;
        }
        let frame = match camera.read()? {
            Some(frame) => frame,
            None => {
                info!("can't read image from camera, exiting");
                break;
            }
        };

        let mut undistorted = Mat::default();
        undistort(
            &frame,
            &mut undistorted,
            &calibration.camera_matrix,
            &calibration.distortion_coefficients,
            &no_array(),
        )?;

        let mut small_original = Mat::default();
        resize(&frame, &mut small_original, half, 0.0, 0.0, INTER_AREA)?;
        let mut small_undistorted = Mat::default();
        resize(&undistorted, &mut small_undistorted, half, 0.0, 0.0, INTER_AREA)?;

        let mut side_by_side = Mat::default();
        hconcat2(&small_original, &small_undistorted, &mut side_by_side)?;
        window.show(&side_by_side)?;
    }

    Ok(())
}
