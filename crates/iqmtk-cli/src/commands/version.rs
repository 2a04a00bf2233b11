//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - compile and run circuits on IQM quantum computers",
        style("iqmtk").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  iqmtk-ir           Circuit intermediate representation");
    println!("  iqmtk-compile      Compilation passes for IQM devices");
    println!("  iqmtk-hal          Backend abstraction");
    println!("  iqmtk-adapter-iqm  IQM Server client");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/iqmtk").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
