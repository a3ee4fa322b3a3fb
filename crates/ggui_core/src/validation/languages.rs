//! Source language shares and common file extensions.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Extension (lowercase, without the dot) to language name.
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "Python"),
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("c", "C"),
    ("h", "C/C++"),
    ("cs", "C#"),
    ("php", "PHP"),
    ("rb", "Ruby"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("kt", "Kotlin"),
    ("swift", "Swift"),
    ("scala", "Scala"),
    ("r", "R"),
    ("m", "Objective-C"),
    ("pl", "Perl"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("zsh", "Shell"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("sass", "Sass"),
    ("less", "Less"),
    ("vue", "Vue"),
    ("jsx", "JSX"),
    ("tsx", "TSX"),
];

/// Number of extensions reported in `SourceScan::top_extensions`.
pub const TOP_EXTENSION_COUNT: usize = 10;

/// Directories that hold VCS metadata rather than sources.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr", "CVS"];

/// Lowercase extension of a file name, without the dot.
fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Language for a file name, if its extension is recognized.
pub fn language_for(file_name: &str) -> Option<&'static str> {
    let ext = extension_of(file_name)?;
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let name: &str = &name;
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name))
}

/// What a walk of the working tree found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceScan {
    /// Language name -> share of recognized source files.
    pub languages: BTreeMap<String, f64>,
    /// Most common extensions (any file type), most frequent first.
    pub top_extensions: Vec<String>,
}

/// Walk `root` once, counting extensions and languages.
///
/// Language shares are in (0, 1] and sum to 1 when any language is found.
/// Unreadable entries are skipped.
pub fn scan_sources(root: &Path) -> SourceScan {
    let mut extensions: BTreeMap<String, usize> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if let Some(ext) = extension_of(&entry.file_name().to_string_lossy()) {
            *extensions.entry(ext).or_default() += 1;
        }
    }

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (ext, count) in &extensions {
        if let Some((_, lang)) = LANGUAGE_EXTENSIONS.iter().find(|(e, _)| *e == ext.as_str()) {
            *counts.entry(*lang).or_default() += count;
        }
    }

    let total: usize = counts.values().sum();
    let languages = if total == 0 {
        BTreeMap::new()
    } else {
        counts
            .into_iter()
            .map(|(lang, count)| (lang.to_string(), count as f64 / total as f64))
            .collect()
    };

    let mut ranked: Vec<(String, usize)> = extensions.into_iter().collect();
    // BTreeMap order breaks ties alphabetically; the sort is stable
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_extensions = ranked
        .into_iter()
        .take(TOP_EXTENSION_COUNT)
        .map(|(ext, _)| ext)
        .collect();

    SourceScan {
        languages,
        top_extensions,
    }
}

/// Share of recognized source files per language under `root`.
pub fn language_shares(root: &Path) -> BTreeMap<String, f64> {
    scan_sources(root).languages
}
