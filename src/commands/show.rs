//! Show command - displays the resolved configuration.

use anyhow::Result;

use crate::bundles::BundleConfig;
use crate::config::Config;

/// Print the configuration and, if readable, the bundle definitions.
pub fn cmd_show_config(config: &Config, osgver: Option<&str>) -> Result<()> {
    config.print();
    if !config.bundles_file.exists() {
        return Ok(());
    }

    let bundles = BundleConfig::load(&config.bundles_file)?;
    println!();
    println!("Bundles ({}):", bundles.path().display());
    for name in bundles.bundle_names() {
        match bundles.bundle(name) {
            Ok(bundle) => {
                let sets = match bundle.paramsets() {
                    Ok(sets) => sets
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" "),
                    Err(e) if bundle.paramsets.is_some() => format!("INVALID: {}", e),
                    Err(_) => "-".to_string(),
                };
                println!("  {:<24} {}", name, sets);
            }
            Err(e) => println!("  {:<24} INVALID: {}", name, e),
        }
    }

    if let Some(release) = osgver {
        match bundles.default_bundles(release) {
            Some(names) => println!("Defaults for {}: {}", release, names.join(" ")),
            None => println!("Defaults for {}: none", release),
        }
    }
    Ok(())
}
