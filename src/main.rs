fn main() {
    if let Err(err) = rps_gesture_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
