//! `certstat list`: print the README certificate table.

use std::path::Path;

use anyhow::Result;

use certstat_core::models::CertificateListing;

use crate::output::{print_info, print_table_header, print_table_row};

pub async fn run(readme: &Path, json: bool) -> Result<()> {
    let doc = super::read_readme(readme).await?;
    let listings: Vec<&CertificateListing> = doc.listings().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        print_info(&format!("No certificate table in {}", readme.display()));
        return Ok(());
    }

    print_table_header(&[
        ("COMPANY", 40),
        ("STATUS", 10),
        ("VALID FROM", 26),
        ("VALID TO", 26),
        ("FOLDER", 30),
    ]);
    for listing in &listings {
        let folder = listing.download_folder().unwrap_or_else(|| "-".to_string());
        print_table_row(&[
            (listing.company.as_str(), 40),
            (listing.status().as_str(), 10),
            (listing.valid_from.as_str(), 26),
            (listing.valid_to.as_str(), 26),
            (folder.as_str(), 30),
        ]);
    }
    println!();
    println!("{} certificate(s)", listings.len());

    Ok(())
}
