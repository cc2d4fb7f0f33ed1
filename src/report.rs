use std::io::Write;

use crate::analyzer::{Analyzer, Scenario};
use crate::client::{CompletionBackend, CompletionError};
use crate::spinner::Spinner;

type Section = Result<String, CompletionError>;

pub const INITIAL_STATUS: &str = "Analyzing temporal paradox...";

/// Outcome of the four questions, each kept as returned by the analyzer.
#[derive(Debug)]
pub struct Report {
    pub analysis: Section,
    pub paradox_type: Section,
    pub timeline: Section,
    pub resolutions: Section,
}

impl Report {
    fn sections(&self) -> [(&'static str, &'static str, &Section); 4] {
        [
            ("Paradox Analysis", "analyzing paradox", &self.analysis),
            ("Paradox Type", "identifying paradox type", &self.paradox_type),
            ("Timeline Consistency", "checking timeline consistency", &self.timeline),
            ("Potential Resolutions", "generating paradox resolutions", &self.resolutions),
        ]
    }

    pub fn failures(&self) -> usize {
        self.sections()
            .iter()
            .filter(|(_, _, section)| section.is_err())
            .count()
    }

    /// One Markdown document with a heading per section. Failed sections
    /// show their error in place of the reply.
    pub fn render_markdown(&self) -> String {
        let mut doc = String::new();
        for (heading, action, section) in self.sections() {
            let body = match section {
                Ok(text) => text.clone(),
                Err(err) => format!("Error {action}: {err}"),
            };
            doc.push_str(&format!("\n## {heading}\n\n{body}\n"));
        }
        doc
    }
}

/// Runs the four questions one after another while `spinner` reports which
/// step is in flight. The spinner is stopped before this returns, and on
/// unwind by its `Drop`.
pub fn analyze_time_paradox<B, W>(
    analyzer: &Analyzer<B>,
    scenario: &Scenario,
    mut spinner: Spinner<W>,
) -> Report
where
    B: CompletionBackend,
    W: Write + Send + 'static,
{
    let text = scenario.text.as_str();
    spinner.start();

    let analysis = analyzer.analyze_paradox(text);

    spinner.update_message("Identifying paradox type...");
    let paradox_type = analyzer.identify_paradox_type(text, scenario.suspected_type);

    spinner.update_message("Checking timeline consistency...");
    let timeline = analyzer.check_timeline_consistency(text, scenario.timeline_details.as_deref());

    spinner.update_message("Calculating potential resolutions...");
    let resolutions = analyzer.get_paradox_resolution(text, scenario.causality);

    spinner.stop();

    let report = Report {
        analysis,
        paradox_type,
        timeline,
        resolutions,
    };
    for (heading, _, section) in report.sections() {
        if let Err(err) = section {
            tracing::warn!(section = heading, error = %err, "request failed");
        }
    }
    report
}
