//! `certstat compare`: diff two README tables.

use std::path::Path;

use anyhow::Result;
use console::style;

use certstat_core::compare::{compare_documents, Difference};

use crate::output::print_success;

pub async fn run(left: &Path, right: &Path, json: bool) -> Result<()> {
    let left_doc = super::read_readme(left).await?;
    let right_doc = super::read_readme(right).await?;
    let differences = compare_documents(&left_doc, &right_doc);

    if json {
        println!("{}", serde_json::to_string_pretty(&differences)?);
        return Ok(());
    }

    if differences.is_empty() {
        print_success("Tables agree");
        return Ok(());
    }

    for difference in &differences {
        match difference {
            Difference::OnlyLeft { company } => {
                println!("{} {} (only in {})", style("-").red(), company, left.display());
            }
            Difference::OnlyRight { company } => {
                println!("{} {} (only in {})", style("+").green(), company, right.display());
            }
            Difference::Changed { company, fields } => {
                println!("{} {}", style("~").yellow(), style(company).bold());
                for field in fields {
                    println!("    {}: {:?} -> {:?}", field.field, field.left, field.right);
                }
            }
        }
    }
    println!();
    println!("{} difference(s)", differences.len());

    Ok(())
}
