//! `certstat folders`: list certificate folders.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use certstat_core::folders::{discover, folder_name, CertificateBundle, PASSWORD_FILE};

use crate::config::ResolvedConfig;
use crate::output::{print_info, print_table_header, print_table_row};

pub async fn run(config: &ResolvedConfig, root: &Path) -> Result<()> {
    let folders = discover(root, &config.ignore)
        .await
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    if folders.is_empty() {
        print_info(&format!("No folders in {}", root.display()));
        return Ok(());
    }

    print_table_header(&[("FOLDER", 44), ("CHECKABLE", 10), ("PASSWORD", 10)]);
    let mut checkable = 0;
    for folder in &folders {
        let name = folder_name(folder);
        let bundle = CertificateBundle::load(folder, &config.default_password).await?;
        let has_password_file = folder.join(PASSWORD_FILE).is_file();

        let (state, password) = match bundle {
            Some(_) => {
                checkable += 1;
                (
                    style("yes").green().to_string(),
                    if has_password_file { "file" } else { "default" },
                )
            }
            None => (style("no").red().to_string(), "-"),
        };
        print_table_row(&[(name.as_str(), 44), (state.as_str(), 10), (password, 10)]);
    }
    println!();
    println!("{} of {} folder(s) can be checked", checkable, folders.len());

    Ok(())
}
