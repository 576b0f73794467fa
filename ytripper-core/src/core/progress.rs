/// Pulls a percentage out of raw downloader output. Chunks need not line up
/// with lines; only strictly increasing values are reported.
///
/// The percentage is the last whitespace-separated token before the first `%`
/// in the chunk. A chunk with several percent-like substrings (a title holding
/// `%`, or several progress lines at once) only yields the first.
#[derive(Debug, Default)]
pub struct ProgressParser {
    last_percent: Option<f64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_percent(&self) -> Option<f64> {
        self.last_percent
    }

    pub fn consume(&mut self, chunk: &str) -> Option<f64> {
        let (before, _) = chunk.split_once('%')?;
        let token = before.split_whitespace().last()?;
        let percent = token.parse::<f64>().ok().filter(|p| p.is_finite())?;

        if self.last_percent.is_some_and(|last| percent <= last) {
            return None;
        }

        self.last_percent = Some(percent);
        Some(percent)
    }
}
