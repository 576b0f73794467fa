fn setup_environment() {
    // A stray Python environment breaks the python-based yt-dlp builds.
    std::env::remove_var("PYTHONHOME");
    std::env::remove_var("PYTHONPATH");
}

fn main() -> std::process::ExitCode {
    setup_environment();
    ytripper_lib::run()
}
