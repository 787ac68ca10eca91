//! The `show` command: print the effective configuration.

use anyhow::Result;

use crate::config::BuildConfiguration;
use crate::platform::Platform;

pub fn run() -> Result<()> {
    let base = std::env::current_dir()?;
    let config = BuildConfiguration::load(&base);
    config.print();

    match Platform::for_target(&config.platform) {
        Ok(platform) => {
            println!("Platform capabilities:");
            println!("  symlinks: {:?}", platform.symlink_style);
            println!("  archive:  {:?}", platform.archive_strategy);
            println!("  scripts:  {:?}", platform.install_script_style);
        }
        Err(err) => println!("Platform: {err}"),
    }
    println!(
        "Installer base name: {}",
        config.installer_base_name()
    );
    Ok(())
}
