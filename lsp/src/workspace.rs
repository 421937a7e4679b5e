//! The project index.
//!
//! One `Workspace` models the managed project for the lifetime of the
//! server: the routes index, the set of open templates with their resolved
//! route links, and the function tables of referenced handler packages.
//!
//! Every operation locks the single inner mutex for its whole duration, so
//! each presents as atomic to concurrent handlers — a diagnostic can never
//! observe a template whose URIs and route links disagree. Accessors hand
//! out clones, never references into the index.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use hxlink_analysis::manifest;
use hxlink_analysis::pkg::{self, Function, Package};
use hxlink_analysis::routes::{Route, RoutesIndex};
use hxlink_analysis::templ;
use hxlink_analysis::uri::Uri;
use hxlink_types::Diagnostic;

/// Marker directory that makes a workspace a managed project.
pub const CONFIG_DIR: &str = ".hxlink";
/// Conventional location of the routes file below the workspace root.
pub const ROUTES_FILE: &str = "internal/server/routes.go";
/// Basename that identifies the routes file in document events.
pub const ROUTES_BASENAME: &str = "routes.go";
/// Extension of template files.
pub const TEMPLATE_EXT: &str = "templ";

const NO_ROUTE_MESSAGE: &str = "no route found for uri";

/// An open template: its text, extracted URIs, and per-URI route links.
///
/// `uris` and `route_index` are always the same length; `route_index[i]` is
/// the best-matching route for `uris[i]`, or `None` for an orphan.
#[derive(Debug, Clone, Default)]
pub struct TemplateDoc {
    pub path: String,
    pub text: String,
    pub uris: Vec<Uri>,
    pub route_index: Vec<Option<usize>>,
}

#[derive(Debug, Default)]
struct Inner {
    root_path: PathBuf,
    has_config: bool,
    module: String,
    routes: RoutesIndex,
    open_templates: HashMap<String, TemplateDoc>,
    packages: HashMap<String, Package>,
}

/// The shared project index. Cheap to clone a handle via `Arc` at the
/// call sites; all state lives behind the inner mutex.
#[derive(Debug, Default)]
pub struct Workspace {
    inner: Mutex<Inner>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the index from disk. Called by the `initialize` handler.
    ///
    /// A workspace without the marker directory is not an error — the
    /// server stays inert. A missing routes file is tolerated (empty but
    /// initialized). Anything else that fails here is fatal to
    /// initialization.
    pub fn open(&self, root_path: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().expect("workspace lock poisoned");
        inner.root_path = PathBuf::from(root_path);

        if !inner.root_path.join(CONFIG_DIR).is_dir() {
            inner.has_config = false;
            tracing::info!(root = root_path, "workspace is not a managed project");
            return Ok(());
        }
        inner.has_config = true;

        let mod_path = inner.root_path.join("go.mod");
        let mod_file = fs::read_to_string(&mod_path)
            .with_context(|| format!("reading {}", mod_path.display()))?;
        inner.module = manifest::module_path(&mod_file)
            .with_context(|| format!("no module path in {}", mod_path.display()))?;

        let routes_path = inner.root_path.join(ROUTES_FILE);
        match fs::read(&routes_path) {
            Ok(bytes) => inner.routes.update(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %routes_path.display(), "no routes file, starting empty");
                inner.routes.set_empty();
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", routes_path.display()));
            }
        }

        reload_packages(&mut inner);
        tracing::info!(
            root = root_path,
            module = %inner.module,
            routes = inner.routes.routes().len(),
            "workspace opened"
        );
        Ok(())
    }

    /// Whether this is a managed project the server should act on.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.has_config && !inner.module.is_empty() && inner.routes.is_initialized()
    }

    pub fn open_template(&self, path: &str, text: &str) {
        let mut inner = self.inner.lock().expect("workspace lock poisoned");
        let doc = build_template(&inner.routes, path, text);
        inner.open_templates.insert(path.to_string(), doc);
    }

    pub fn change_template(&self, path: &str, text: &str) {
        let mut inner = self.inner.lock().expect("workspace lock poisoned");
        if !inner.open_templates.contains_key(path) {
            return;
        }
        let doc = build_template(&inner.routes, path, text);
        inner.open_templates.insert(path.to_string(), doc);
    }

    pub fn close_template(&self, path: &str) {
        let mut inner = self.inner.lock().expect("workspace lock poisoned");
        inner.open_templates.remove(path);
    }

    /// Swap in a re-parsed routes file and reconcile every open template.
    pub fn update_routes(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().expect("workspace lock poisoned");
        inner.routes.update(bytes);

        let paths: Vec<String> = inner.open_templates.keys().cloned().collect();
        for path in paths {
            let text = inner.open_templates[&path].text.clone();
            let doc = build_template(&inner.routes, &path, &text);
            inner.open_templates.insert(path, doc);
        }

        reload_packages(&mut inner);
    }

    #[must_use]
    pub fn template(&self, path: &str) -> Option<TemplateDoc> {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.open_templates.get(path).cloned()
    }

    #[must_use]
    pub fn route(&self, index: usize) -> Option<Route> {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.routes.get(index).cloned()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.routes.routes().to_vec()
    }

    #[must_use]
    pub fn package_function(&self, pkg: &str, name: &str) -> Option<Function> {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.packages.get(pkg)?.function(name).cloned()
    }

    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        let inner = self.inner.lock().expect("workspace lock poisoned");
        inner.root_path.clone()
    }
}

/// Parse a template and resolve its URIs against the routes index.
///
/// Parse failure stores the document with no URIs; orphan URIs get the
/// "no route found" error appended.
fn build_template(routes: &RoutesIndex, path: &str, text: &str) -> TemplateDoc {
    let mut uris = match templ::template_uris(text) {
        Ok(uris) => uris,
        Err(err) => {
            tracing::debug!(path = %path, error = %err, "template parse failed");
            return TemplateDoc {
                path: path.to_string(),
                text: text.to_string(),
                uris: Vec::new(),
                route_index: Vec::new(),
            };
        }
    };

    let mut route_index = Vec::with_capacity(uris.len());
    for uri in &mut uris {
        let found = routes.query(uri);
        if found.is_none() {
            uri.diagnostics.push(Diagnostic::error(NO_ROUTE_MESSAGE));
        }
        route_index.push(found);
    }

    TemplateDoc {
        path: path.to_string(),
        text: text.to_string(),
        uris,
        route_index,
    }
}

/// Rebuild the package tables for every package named by a route.
///
/// Unresolvable packages (foreign imports, missing directories) are skipped;
/// hover simply won't link their handlers.
fn reload_packages(inner: &mut Inner) {
    let mut packages = HashMap::new();
    for route in inner.routes.routes() {
        if route.pkg.is_empty() || packages.contains_key(&route.pkg) {
            continue;
        }
        match pkg::load_package(&inner.root_path, &inner.module, &route.pkg) {
            Ok(package) => {
                packages.insert(route.pkg.clone(), package);
            }
            Err(err) => {
                tracing::debug!(pkg = %route.pkg, error = %err, "skipping package");
            }
        }
    }
    inner.packages = packages;
}

/// Whether a document path names a template file.
#[must_use]
pub fn is_template_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == TEMPLATE_EXT)
}

/// Whether a document path names the routes file.
#[must_use]
pub fn is_routes_path(path: &str) -> bool {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == ROUTES_BASENAME)
}
