//! `validate`: load data sets and report what was rejected

use anyhow::{Result, bail};
use console::style;

use crate::cli::ValidateArgs;
use crate::commands::load_catalog;
use crate::utils::{add_table_row, create_table};

pub fn execute(args: ValidateArgs) -> Result<()> {
    let (_, reports) = load_catalog(&args.files)?;

    let mut rejected = 0;
    for (file, report) in args.files.iter().zip(&reports) {
        let status = if report.is_clean() {
            style("OK").green().bold()
        } else {
            style("ISSUES").yellow().bold()
        };
        println!("{status} {} ({report})", file.display());

        if !report.rejections.is_empty() {
            let mut table = create_table(&["Entry", "Reason"]);
            for rejection in &report.rejections {
                add_table_row(
                    &mut table,
                    vec![rejection.scope.to_string(), rejection.reason.clone()],
                );
            }
            table.printstd();
        }
        for warning in &report.warnings {
            println!("  {} {warning}", style("warning:").yellow());
        }
        rejected += report.rejections.len();
    }

    if args.strict && rejected > 0 {
        bail!("{rejected} entries rejected");
    }
    Ok(())
}
