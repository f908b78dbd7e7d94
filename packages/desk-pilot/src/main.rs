use desk_pilot::cli::run_desk_pilot;

fn main() {
    if let Err(err) = run_desk_pilot() {
        tracing::error!(error = %err, "desk-pilot failed");
        std::process::exit(1);
    }
}
