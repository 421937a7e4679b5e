//! Handler-package enumeration.
//!
//! Routes name their handlers through package-qualified calls; hover needs
//! the declaration site of those functions. An import path inside the
//! workspace module resolves to exactly one directory (no recursion into
//! sub-packages); its `.go` files are scanned for top-level `func`
//! declarations. Generated template shims (`*_templ.go`) are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use hxlink_types::Position;

#[derive(Debug, Error)]
pub enum PkgError {
    #[error("import path `{import_path}` is outside module `{module}`")]
    ForeignImport { import_path: String, module: String },
    #[error("reading package directory {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A top-level function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub file: PathBuf,
    /// Zero-based position of the `func` keyword.
    pub pos: Position,
}

/// The source files and functions of one package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub files: Vec<PathBuf>,
    pub functions: Vec<Function>,
}

impl Package {
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Load the package at `import_path`, resolved against the workspace module.
pub fn load_package(root: &Path, module: &str, import_path: &str) -> Result<Package, PkgError> {
    let dir = resolve_dir(root, module, import_path)?;

    let entries = fs::read_dir(&dir).map_err(|source| PkgError::Io {
        dir: dir.clone(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_package_source(path))
        .collect();
    files.sort();

    let mut functions = Vec::new();
    for file in &files {
        match fs::read_to_string(file) {
            Ok(src) => collect_functions(file, &src, &mut functions),
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "skipping unreadable source file");
            }
        }
    }

    Ok(Package { files, functions })
}

fn resolve_dir(root: &Path, module: &str, import_path: &str) -> Result<PathBuf, PkgError> {
    if import_path == module {
        return Ok(root.to_path_buf());
    }
    let prefix = format!("{module}/");
    match import_path.strip_prefix(&prefix) {
        Some(rest) => Ok(root.join(rest)),
        None => Err(PkgError::ForeignImport {
            import_path: import_path.to_string(),
            module: module.to_string(),
        }),
    }
}

fn is_package_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_templ.go")
}

/// Collect `func` declarations that start a line, methods included.
fn collect_functions(file: &Path, src: &str, out: &mut Vec<Function>) {
    for (line_no, line) in src.lines().enumerate() {
        let Some(rest) = line.strip_prefix("func ") else {
            continue;
        };
        let Some(name) = declaration_name(rest) else {
            continue;
        };
        out.push(Function {
            name,
            file: file.to_path_buf(),
            pos: Position::new(line_no as u32, 0),
        });
    }
}

/// The declared name after `func `, skipping a method receiver if present.
fn declaration_name(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let rest = if let Some(after) = rest.strip_prefix('(') {
        let close = after.find(')')?;
        after[close + 1..].trim_start()
    } else {
        rest
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_package_collects_functions() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg_dir = tmp.path().join("internal/server/handlers/page");
        fs::create_dir_all(&pkg_dir).unwrap();
        write(
            &pkg_dir,
            "index.go",
            "package page\n\nfunc Index(db *sql.DB) http.Handler {\n\treturn nil\n}\n\nfunc helper() {}\n",
        );
        write(
            &pkg_dir,
            "item.go",
            "package page\n\nfunc (p *Pages) Item(db *sql.DB) http.Handler {\n\treturn nil\n}\n",
        );
        write(&pkg_dir, "index_templ.go", "package page\n\nfunc Ghost() {}\n");
        write(&pkg_dir, "notes.txt", "not go\n");

        let pkg = load_package(
            tmp.path(),
            "example.com/app",
            "example.com/app/internal/server/handlers/page",
        )
        .unwrap();

        assert_eq!(pkg.files.len(), 2);
        let names: Vec<&str> = pkg.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Index", "helper", "Item"]);
    }

    #[test]
    fn test_function_positions_are_zero_based() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg_dir = tmp.path().join("pkg");
        fs::create_dir_all(&pkg_dir).unwrap();
        write(&pkg_dir, "a.go", "package pkg\n\nfunc First() {}\n");

        let pkg = load_package(tmp.path(), "m", "m/pkg").unwrap();
        let f = pkg.function("First").unwrap();
        assert_eq!(f.pos, Position::new(2, 0));
        assert!(f.file.ends_with("a.go"));
    }

    #[test]
    fn test_foreign_import_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_package(tmp.path(), "example.com/app", "github.com/other/dep").unwrap_err();
        assert!(matches!(err, PkgError::ForeignImport { .. }));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_package(tmp.path(), "m", "m/nope").unwrap_err();
        assert!(matches!(err, PkgError::Io { .. }));
    }

    #[test]
    fn test_module_root_package() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "package main\n\nfunc main() {}\n");
        let pkg = load_package(tmp.path(), "m", "m").unwrap();
        assert_eq!(pkg.functions.len(), 1);
        assert_eq!(pkg.functions[0].name, "main");
    }

    #[test]
    fn test_method_receiver_is_skipped() {
        assert_eq!(declaration_name("(s *Server) Routes() {"), Some("Routes".into()));
        assert_eq!(declaration_name("Index(db *sql.DB) {"), Some("Index".into()));
        assert_eq!(declaration_name(""), None);
    }
}
