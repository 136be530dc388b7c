//! Print a PDF at its actual size through the platform spooler.
//!
//! Usage:
//!   print_pdf <input>

use std::path::Path;
use std::process;
use std::sync::Arc;

use pdf_reglyph::printing::{self, SystemPrintQueue};
use pdf_reglyph::{Document, SystemFonts};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input) = input_path(&args) else {
        eprintln!("usage: print_pdf <input>");
        process::exit(1);
    };

    if let Err(err) = run(Path::new(input)) {
        eprintln!("print_pdf: {}", err);
        process::exit(1);
    }
}

/// The single positional argument, or `None` on any other count.
fn input_path(args: &[String]) -> Option<&str> {
    match args {
        [_, input] => Some(input.as_str()),
        _ => None,
    }
}

fn run(path: &Path) -> pdf_reglyph::Result<()> {
    let document = Document::open(path)?;
    let system = Arc::new(SystemFonts::new());
    let mut queue = SystemPrintQueue::default();

    // The document is released whether or not printing succeeded.
    let outcome = printing::print(&document, &mut queue, system);
    document.close();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_argument_accepted() {
        let argv = args(&["print_pdf", "input.pdf"]);
        assert_eq!(input_path(&argv), Some("input.pdf"));
    }

    #[test]
    fn test_zero_arguments_rejected() {
        let argv = args(&["print_pdf"]);
        assert_eq!(input_path(&argv), None);
    }

    #[test]
    fn test_extra_arguments_rejected() {
        let argv = args(&["print_pdf", "a.pdf", "b.pdf"]);
        assert_eq!(input_path(&argv), None);
    }
}
