//! Terminal output for publish progress and results.

use console::{Style, Term};

/// Coloring of one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tone {
    /// Progress and neutral detail.
    Plain,
    /// Pages written and successful totals.
    Done,
    /// Pages left untouched because of another failure or an interrupt.
    Attention,
    /// Failed pages and errors.
    Failure,
    /// Section banners.
    Heading,
    /// Pages that were already up to date.
    Quiet,
}

impl Tone {
    fn style(self) -> Option<Style> {
        match self {
            Self::Plain => None,
            Self::Done => Some(Style::new().green()),
            Self::Attention => Some(Style::new().yellow()),
            Self::Failure => Some(Style::new().red()),
            Self::Heading => Some(Style::new().cyan().bold()),
            Self::Quiet => Some(Style::new().dim()),
        }
    }
}

/// Line writer on stderr, keeping stdout free for piping.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Write `msg` in the given tone.
    pub(crate) fn line(&self, tone: Tone, msg: &str) {
        let _ = match tone.style() {
            Some(style) => self.term.write_line(&style.apply_to(msg).to_string()),
            None => self.term.write_line(msg),
        };
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(Tone::Plain, msg);
    }
}
