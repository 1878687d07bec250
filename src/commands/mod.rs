pub mod cache;
pub mod history;

pub use cache::{handle_cache_clear, handle_cache_dir};
pub use history::{LogArgs, handle_log};

/// Stream colour choice for an explicit `colored` setting.
pub fn color_choice(colored: bool) -> anstream::ColorChoice {
    if colored {
        anstream::ColorChoice::Always
    } else {
        anstream::ColorChoice::Never
    }
}
