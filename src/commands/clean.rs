// ABOUTME: Clean command implementation.
// ABOUTME: Builds the candidate batch, runs reconciliation, and prints the summary.

use std::collections::HashMap;

use super::close;
use dregs::config::Config;
use dregs::connection::Connection;
use dregs::engine::{Engine, ImageFilter};
use dregs::error::{Error, Result};
use dregs::inventory::{self, Inventory};
use dregs::output::{Output, OutputMode};
use dregs::prompt::Prompt;
use dregs::reconcile::{ReconcileContext, Reconciler, Report, clean_images};
use dregs::types::ImageId;

/// Which images a clean run starts from.
#[derive(Debug, Clone)]
pub enum CleanTarget {
    Dangling,
    All,
    /// IDs, ID prefixes, or tags given by the operator.
    References(Vec<String>),
}

impl CleanTarget {
    /// Rejects references no engine could resolve before anything connects.
    pub fn from_args(all: bool, ids: Vec<String>) -> Result<Self> {
        match (all, ids.is_empty()) {
            (true, _) => Ok(CleanTarget::All),
            (false, true) => Ok(CleanTarget::Dangling),
            (false, false) => {
                let references = ids
                    .into_iter()
                    .map(|reference| match ImageId::parse(&reference) {
                        Ok(_) => Ok(reference.trim().to_string()),
                        Err(source) => Err(Error::InvalidReference { reference, source }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CleanTarget::References(references))
            }
        }
    }
}

pub async fn clean(
    config: &Config,
    target: CleanTarget,
    prompt: &mut dyn Prompt,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let connection = Connection::open(config, &output).await?;
    let result = run_clean(connection.engine(), target, prompt, &output).await;
    close(connection, &output).await;

    print_report(&result?, &output);
    Ok(())
}

pub(super) async fn run_clean(
    engine: &dyn Engine,
    target: CleanTarget,
    prompt: &mut dyn Prompt,
    output: &Output,
) -> Result<Report> {
    let ctx = ReconcileContext::new(engine, prompt, output);
    let report = match target {
        CleanTarget::Dangling => clean_images(ctx, ImageFilter::Dangling).await?,
        CleanTarget::All => clean_images(ctx, ImageFilter::All).await?,
        CleanTarget::References(references) => {
            let images = Inventory::new(engine).list_images(ImageFilter::All).await?;
            let mut ids = Vec::new();
            let mut labels = HashMap::new();
            for reference in &references {
                let found = inventory::select(&images, reference);
                match found.as_slice() {
                    [] => return Err(Error::UnknownImage(reference.clone())),
                    [image] => {
                        labels.insert(image.id.clone(), image.display_name().to_string());
                        ids.push(image.id.clone());
                    }
                    many => {
                        return Err(Error::AmbiguousImage {
                            reference: reference.clone(),
                            count: many.len(),
                        });
                    }
                }
            }
            Reconciler::new(ctx, ids).with_labels(labels).run().await?
        }
    };
    Ok(report)
}

pub(super) fn print_report(report: &Report, output: &Output) {
    if output.mode() == OutputMode::Json {
        output.json("report", report);
    } else {
        let lines = report.summary_lines();
        if let Some((headline, details)) = lines.split_first() {
            output.success(headline);
            output.disclose(details);
        }
    }

    for warning in &report.warnings {
        output.warning(warning);
    }
}

