mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::to_json;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::{print_summary, render_summary};

/// Prints the `refbuild` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔎 refbuild"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Reference Build Resolver")
    );
}
