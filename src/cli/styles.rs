//! CLI output styling
//!
//! Use anstream's `println!` / `eprintln!` with these; they strip the escapes when the
//! output isn't a terminal.

#[allow(clippy::enum_glob_use)]
use anstyle::AnsiColor::*;
use anstyle::Color::Ansi;
use clap::builder::styling::Styles;
use std::borrow::Cow;

/// Error message styling. This can be Displayed directly.
pub const ERROR: anstyle::Style = anstyle::Style::new().bold().fg_color(Some(Ansi(Red)));
/// Warning message styling. This can be Displayed directly.
pub const WARNING: anstyle::Style = anstyle::Style::new().bold().fg_color(Some(Ansi(Yellow)));
/// Informational message styling. This can be Displayed directly.
pub const INFO: anstyle::Style = anstyle::Style::new().fg_color(Some(Ansi(Cyan)));
/// Success message style. This can be Displayed directly.
pub const SUCCESS: anstyle::Style = anstyle::Style::new().fg_color(Some(Ansi(Green)));

pub(crate) const HEADER: anstyle::Style = anstyle::Style::new()
    .underline()
    .fg_color(Some(Ansi(Yellow)));

pub(crate) const CLAP_STYLES: Styles = Styles::styled()
    .usage(HEADER)
    .header(HEADER)
    .literal(anstyle::Style::new().bold())
    .invalid(WARNING)
    .error(ERROR)
    .valid(INFO.bold().underline())
    .placeholder(INFO);

/// Resets styling to default.
pub use anstyle::Reset as RESET;

/// Are terminal colours in play, as far as anstream is concerned?
#[must_use]
pub fn use_colours() -> bool {
    !matches!(anstream::ColorChoice::global(), anstream::ColorChoice::Never)
}

pub(crate) fn maybe_strip_color(s: &str) -> Cow<'_, str> {
    if use_colours() {
        s.into()
    } else {
        anstream::adapter::strip_str(s).to_string().into()
    }
}

#[cfg(test)]
mod test {
    use super::{maybe_strip_color, ERROR, RESET};

    #[test]
    fn strip_when_colours_off() {
        anstream::ColorChoice::Never.write_global();
        let styled = format!("{ERROR}bad{RESET}");
        assert_eq!(maybe_strip_color(&styled), "bad");
    }
}
