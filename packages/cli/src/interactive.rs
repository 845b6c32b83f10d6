//! Menu-driven mode for running the toolchain without memorizing flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use loan_docs_cli_utils::MultiProgress;
use loan_docs_extract::MiscellaneousPolicy;

use crate::commands::{self, ExtractRequest};
use crate::output::OutputFormat;

enum Action {
    Extract,
    Classify,
    Fields,
    Rules,
}

impl Action {
    const ALL: &[Self] = &[Self::Extract, Self::Classify, Self::Fields, Self::Rules];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extract fields from PDFs",
            Self::Classify => "Classify PDFs",
            Self::Fields => "Show output schema",
            Self::Rules => "Show extraction rules",
        }
    }
}

/// Prompts for an action and its settings, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loan Document Toolchain");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Extract => extract(multi).await?,
        Action::Classify => {
            let path = prompt_path()?;
            commands::classify(commands::default_config()?, &[path]).await?;
        }
        Action::Fields => commands::fields(&mut std::io::stdout().lock())?,
        Action::Rules => commands::rules(&mut std::io::stdout().lock(), None, None)?,
    }

    Ok(())
}

async fn extract(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let path = prompt_path()?;

    let mut config = commands::default_config()?;
    let policies = [MiscellaneousPolicy::Skip, MiscellaneousPolicy::Generic];
    let policy_labels = [
        "Skip (classify only)",
        "Generic rules (loan amount, rate, borrower)",
    ];
    let policy = Select::new()
        .with_prompt("Unclassified documents")
        .items(&policy_labels)
        .default(usize::from(config.miscellaneous == MiscellaneousPolicy::Generic))
        .interact()?;
    config.miscellaneous = policies[policy];

    let formats = [OutputFormat::Json, OutputFormat::Csv];
    let format = Select::new()
        .with_prompt("Output format")
        .items(&["JSON", "CSV"])
        .default(0)
        .interact()?;

    let output: String = Input::new()
        .with_prompt("Output file (empty for stdout)")
        .allow_empty(true)
        .interact_text()?;
    let output = Some(output.trim())
        .filter(|o| !o.is_empty())
        .map(PathBuf::from);

    let summary = Confirm::new()
        .with_prompt("Print an extraction summary?")
        .default(true)
        .interact()?;

    let request = ExtractRequest {
        paths: vec![path],
        format: formats[format],
        output,
        summary,
    };
    commands::extract(multi, config, request).await
}

fn prompt_path() -> Result<PathBuf, dialoguer::Error> {
    let path: String = Input::new()
        .with_prompt("PDF file or folder")
        .default(".".to_owned())
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}
