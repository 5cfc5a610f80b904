//! Progress bar styling

use indicatif::{MultiProgress, ProgressBar, ProgressFinish, ProgressStyle};

/// Maximum update frequency we will use for the progress display
pub(crate) const MAX_UPDATE_FPS: u8 = 20;

/// Single-line style for a transfer of known size
///
/// ```text
/// general/photo.jpg [==========================            ] 2s @ 1.4MB/s [70%/1.24MB]
/// ```
const PROGRESS_STYLE: &str =
    "{msg:.dim} {wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec} [{percent}%/{decimal_total_bytes:.dim}]";

/// Style for a transfer whose size we learn only at the end (downloads)
const SPINNER_STYLE: &str = "{spinner} {msg:.dim} {decimal_bytes} @ {decimal_bytes_per_sec}";

/// Adds a bar for one transfer to `display`, or returns a hidden one if `quiet`
pub(crate) fn progress_bar_for(
    display: &MultiProgress,
    name: &str,
    length: Option<u64>,
    quiet: bool,
) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = match length {
        Some(len) => ProgressBar::new(len).with_style(ProgressStyle::with_template(PROGRESS_STYLE)?),
        None => ProgressBar::no_length().with_style(ProgressStyle::with_template(SPINNER_STYLE)?),
    };
    Ok(display.add(
        bar.with_message(name.to_string())
            .with_finish(ProgressFinish::AndClear),
    ))
}

#[cfg(test)]
mod test {
    use super::progress_bar_for;
    use indicatif::{MultiProgress, ProgressDrawTarget};

    #[test]
    fn hidden_when_quiet() {
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        assert!(progress_bar_for(&mp, "x", Some(10), true).unwrap().is_hidden());
    }

    #[test]
    fn styles_parse() {
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = progress_bar_for(&mp, "general/a.txt", Some(10), false).unwrap();
        assert_eq!(bar.length(), Some(10));
        let spin = progress_bar_for(&mp, "general/a.txt", None, false).unwrap();
        assert_eq!(spin.length(), None);
        assert_eq!(spin.message(), "general/a.txt");
    }
}
