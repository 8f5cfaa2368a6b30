use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::{Result, TranslationError};

// @module: File and directory utilities

// @const: Extensions the directory driver picks up
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["md", "markdown", "html", "htm", "txt"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| TranslationError::FileWrite {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    // @generates: Sibling output path `{dir}/{stem}.{lang}{ext}`
    pub fn output_path_for<P: AsRef<Path>>(input_file: P, target_language: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();

        let mut output_filename = format!("{}.{}", stem, target_language);
        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        }

        match input_file.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        }
    }

    // @generates: Output directory from a `{lang}` template
    pub fn resolve_output_dir(template: &str, target_language: &str) -> PathBuf {
        PathBuf::from(template.replace("{lang}", target_language))
    }

    // @generates: Path of `file` re-rooted from `input_root` under `output_root`
    pub fn mirrored_output_path(input_root: &Path, file: &Path, output_root: &Path) -> PathBuf {
        match file.strip_prefix(input_root) {
            Ok(relative) => output_root.join(relative),
            Err(_) => output_root.join(file.file_name().unwrap_or_default()),
        }
    }

    // @checks: Extension is one of SUPPORTED_EXTENSIONS
    pub fn is_supported_document<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s))
            })
            .unwrap_or(false)
    }

    /// Find translatable documents under `dir`, skipping ignored paths.
    ///
    /// Ignore patterns are matched against the path relative to `dir`,
    /// with `/` separators. Results are sorted for stable ordering.
    pub fn find_documents<P: AsRef<Path>>(dir: P, ignore: &[String]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Err(TranslationError::FileNotFound(dir.display().to_string()));
        }

        let matchers: Vec<Regex> = ignore.iter().filter_map(|p| glob_to_regex(p)).collect();
        let mut result = Vec::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| TranslationError::FileRead {
                path: dir.display().to_string(),
                message: format!("Failed to read directory entry: {}", e),
            })?;
            let path = entry.path();

            if !path.is_file() || !Self::is_supported_document(path) {
                continue;
            }

            let relative = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if matchers.iter().any(|re| re.is_match(&relative)) {
                continue;
            }

            result.push(path.to_path_buf());
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TranslationError::FileNotFound(path.display().to_string()));
        }
        fs::read_to_string(path).map_err(|e| TranslationError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write a string to a file, creating parent directories
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Self::ensure_dir(parent)?;
        }

        fs::write(path, content).map_err(|e| TranslationError::FileWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Convert a shell glob (`**`, `*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.trim_start_matches("./").chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    Regex::new(&out).ok()
}
