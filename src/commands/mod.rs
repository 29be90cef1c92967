// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports restore and scan commands

pub mod restore;
pub mod scan;

pub use restore::restore;
pub use scan::scan;
