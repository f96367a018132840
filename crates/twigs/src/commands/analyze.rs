//! Implementation of the `twigs analyze` command

use anyhow::Context as _;
use twigs_core::{Analysis, AnalyzeOptions, CancelToken, analyze};

use super::{GlobalArgs, open_repository, report_error};
use crate::interaction::Spinner;
use crate::output::{AnalyzeData, JsonResponse, analysis_issues};
use crate::render;

/// Run the read-only pipeline with a spinner, for `analyze` and `clean`
pub(crate) fn run_pipeline(
    args: &GlobalArgs,
    options: AnalyzeOptions,
    cancel: &CancelToken,
) -> Result<(twigs_core::GitCli, Analysis), twigs_core::TwigsError> {
    let (git, config) = open_repository(args)?;
    let spinner = Spinner::start("Reading repository", !args.quiet && !args.json);
    let result = analyze(&git, &config, options, cancel);
    spinner.finish(result.is_ok());
    Ok((git, result?))
}

/// Run the analyze command
pub fn run_analyze(args: &GlobalArgs, cancel: &CancelToken) -> Result<i32, String> {
    let analysis = match run_pipeline(args, AnalyzeOptions::default(), cancel) {
        Ok((_, analysis)) => analysis,
        Err(e) => return report_error("analyze", &e, serde_json::Value::Null, args.json),
    };

    if args.json {
        let response = JsonResponse::ok_with_issues(
            "analyze",
            AnalyzeData::from(&analysis),
            analysis_issues(&analysis),
        );
        response
            .print()
            .context("failed to write JSON output")
            .map_err(|e| format!("{:#}", e))?;
    } else if !args.quiet {
        render::print_analysis(&analysis, args.verbose);
        render::print_plan(&analysis.plan);
    }

    Ok(0)
}
