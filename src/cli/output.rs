use crate::cli::args::OutputFormat;
use crate::daemon::protocol::CompletionResponse;
use std::fmt::Write;

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_completion(&self, response: &CompletionResponse) -> String {
        match self.format {
            OutputFormat::Vim => Self::format_vim(response),
            OutputFormat::Json => Self::format_json(response),
        }
    }

    /// `[partial, [{'word':'..','abbr':'..'}, ...]]`, ready for Vim's `eval()`.
    fn format_vim(response: &CompletionResponse) -> String {
        let mut output = format!("[{}, [", response.partial);

        for (i, proposal) in response.proposals.iter().enumerate() {
            if i > 0 {
                output.push(',');
            }
            let _ = write!(
                output,
                "{{'word':'{}','abbr':'{}'}}",
                vim_quote(&proposal.word),
                vim_quote(&proposal.abbr)
            );
        }

        output.push_str("]]");
        output
    }

    fn format_json(response: &CompletionResponse) -> String {
        serde_json::to_string(response)
            .unwrap_or_else(|_| format!("{{\"partial\":{},\"proposals\":[]}}", response.partial))
    }
}

/// Inside a Vim single-quoted string, `'` is written `''`.
fn vim_quote(text: &str) -> String {
    text.replace('\'', "''")
}
