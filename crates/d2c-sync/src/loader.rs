//! Document tree loading from the filesystem.
//!
//! Loading runs in two phases. The scan phase walks the directory and records
//! which markdown files and subdirectories exist, without reading content.
//! The build phase reads each file, strips front matter, derives titles and
//! assembles the [`DocumentTree`].
//!
//! Layout conventions:
//! - `index.md` supplies its directory's content; the root directory's
//!   `index.md` becomes the root page.
//! - A directory without an index is a container page. If a sibling file
//!   shares its name (`guide.md` next to `guide/`), that file supplies the
//!   directory's content instead of becoming a separate page.
//! - A directory takes its content from exactly one document; `index.md`
//!   next to `index.markdown`, or `guide.md` next to `guide.markdown`, is an
//!   error.
//! - Hidden entries and non-markdown files are ignored; directories without
//!   any markdown below them are pruned.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::LoadError;
use crate::tree::{DocumentTree, NodeId};

/// Recognized markdown extensions (compared case-insensitively).
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// File stem that supplies a directory's own content.
const INDEX_STEM: &str = "index";

/// Title used when the root directory has no usable name.
const FALLBACK_ROOT_TITLE: &str = "Home";

/// Load the document tree rooted at `root`.
///
/// # Errors
///
/// Returns [`LoadError`] if the root is missing or not a directory, a file
/// cannot be read, front matter is malformed, two documents share a title,
/// or two documents supply the content of the same directory.
pub fn load(root: &Path) -> Result<DocumentTree, LoadError> {
    if !root.exists() {
        return Err(LoadError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(LoadError::NotADirectory(root.to_path_buf()));
    }

    let scanned = scan_dir(root, Path::new(""))?.unwrap_or_default();

    let (root_title, root_content) = match &scanned.index {
        Some(index) => {
            let doc = read_document(root, index)?;
            (doc.title.unwrap_or_else(|| root_dir_title(root)), Some(doc.body))
        }
        None => (root_dir_title(root), None),
    };

    let mut tree = DocumentTree::new(root_title, root_content);
    let root_id = tree.root();
    build_children(&mut tree, root_id, root, &scanned)?;
    check_unique_titles(&tree)?;

    debug!("Loaded {} documents from {}", tree.len(), root.display());
    Ok(tree)
}

/// Directory contents discovered by the scan phase (paths relative to the root).
#[derive(Debug, Default)]
struct ScannedDir {
    /// Directory path.
    path: PathBuf,
    /// Index document, if present.
    index: Option<PathBuf>,
    /// Standalone markdown files.
    files: Vec<PathBuf>,
    /// Subdirectories containing markdown somewhere below.
    dirs: Vec<ScannedDir>,
}

impl ScannedDir {
    fn is_empty(&self) -> bool {
        self.index.is_none() && self.files.is_empty() && self.dirs.is_empty()
    }

    fn name(&self) -> OsString {
        self.path.file_name().map(OsString::from).unwrap_or_default()
    }
}

/// Scan a directory recursively.
///
/// Returns `None` for directories with no markdown anywhere below.
fn scan_dir(root: &Path, rel: &Path) -> Result<Option<ScannedDir>, LoadError> {
    let abs = root.join(rel);
    let entries = fs::read_dir(&abs).map_err(|source| LoadError::Io {
        path: abs.clone(),
        source,
    })?;

    let mut scanned = ScannedDir {
        path: rel.to_path_buf(),
        ..ScannedDir::default()
    };

    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: abs.clone(),
            source,
        })?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let child_rel = rel.join(&name);
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

        if is_dir {
            if let Some(dir) = scan_dir(root, &child_rel)? {
                scanned.dirs.push(dir);
            }
        } else if is_markdown(&child_rel) {
            if file_stem(&child_rel).eq_ignore_ascii_case(INDEX_STEM) {
                if let Some(existing) = scanned.index.take() {
                    return Err(duplicate_content(rel, existing, child_rel));
                }
                scanned.index = Some(child_rel);
            } else {
                scanned.files.push(child_rel);
            }
        }
    }

    scanned.files.sort();
    scanned.dirs.sort_by_key(ScannedDir::name);

    Ok((!scanned.is_empty()).then_some(scanned))
}

fn duplicate_content(dir: &Path, a: PathBuf, b: PathBuf) -> LoadError {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    LoadError::DuplicateContent {
        dir: dir.to_path_buf(),
        first,
        second,
    }
}

/// One child entry of a directory during the build phase.
enum Entry<'a> {
    File(&'a Path),
    Dir(&'a ScannedDir),
}

impl Entry<'_> {
    fn sort_key(&self) -> OsString {
        match self {
            Entry::File(path) => path.file_name().map(OsString::from).unwrap_or_default(),
            Entry::Dir(dir) => dir.name(),
        }
    }
}

/// Add children of a scanned directory under `parent`.
fn build_children(
    tree: &mut DocumentTree,
    parent: NodeId,
    root: &Path,
    scanned: &ScannedDir,
) -> Result<(), LoadError> {
    // Files named after an index-less sibling directory become that directory's content
    let mut dir_content: HashMap<OsString, &Path> = HashMap::new();
    let mut entries: Vec<Entry<'_>> = Vec::new();

    for file in &scanned.files {
        let stem = file_stem(file);
        let claimed = scanned
            .dirs
            .iter()
            .any(|dir| dir.index.is_none() && dir.name() == *stem);
        if claimed {
            if let Some(existing) = dir_content.insert(OsString::from(stem.as_ref()), file) {
                return Err(duplicate_content(
                    &scanned.path.join(stem.as_ref()),
                    existing.to_path_buf(),
                    file.clone(),
                ));
            }
        } else {
            entries.push(Entry::File(file));
        }
    }
    entries.extend(scanned.dirs.iter().map(Entry::Dir));
    entries.sort_by_key(Entry::sort_key);

    for entry in entries {
        match entry {
            Entry::File(file) => {
                let doc = read_document(root, file)?;
                let title = doc
                    .title
                    .unwrap_or_else(|| titlecase_from_slug(&file_stem(file)));
                debug!("Found document {} ({title})", file.display());
                tree.add_child(parent, file, title, Some(doc.body));
            }
            Entry::Dir(dir) => {
                let source = dir.index.as_deref().or(dir_content.get(&dir.name()).copied());
                let (title, content) = match source {
                    Some(file) => {
                        let doc = read_document(root, file)?;
                        let title = doc
                            .title
                            .unwrap_or_else(|| titlecase_from_slug(&dir.name().to_string_lossy()));
                        (title, Some(doc.body))
                    }
                    None => (titlecase_from_slug(&dir.name().to_string_lossy()), None),
                };
                debug!("Found section {} ({title})", dir.path.display());
                let id = tree.add_child(parent, &dir.path, title, content);
                build_children(tree, id, root, dir)?;
            }
        }
    }

    Ok(())
}

/// Markdown file content split into front matter title and body.
struct LoadedDocument {
    title: Option<String>,
    body: String,
}

/// Front matter fields used by the loader. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
}

fn read_document(root: &Path, rel: &Path) -> Result<LoadedDocument, LoadError> {
    let abs = root.join(rel);
    let text = fs::read_to_string(&abs).map_err(|source| LoadError::Io { path: abs, source })?;

    let Some((yaml, body)) = split_front_matter(&text) else {
        return Ok(LoadedDocument {
            title: None,
            body: text,
        });
    };

    let front = parse_front_matter(yaml).map_err(|message| LoadError::FrontMatter {
        path: rel.to_path_buf(),
        message,
    })?;
    let title = front
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty());

    Ok(LoadedDocument {
        title,
        body: body.to_owned(),
    })
}

/// Split a leading `---` YAML block from the body.
///
/// Returns `None` if the text does not open with a delimiter line or the
/// block is never closed.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_front_matter(yaml: &str) -> Result<FrontMatter, String> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| e.to_string())
}

fn check_unique_titles(tree: &DocumentTree) -> Result<(), LoadError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for id in tree.pre_order() {
        let node = tree.node(id);
        if let Some(first) = seen.insert(&node.title, &node.path) {
            return Err(LoadError::DuplicateTitle {
                title: node.title.clone(),
                first: first.to_path_buf(),
                second: node.path.clone(),
            });
        }
    }
    Ok(())
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy();
        MARKDOWN_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

fn file_stem(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_stem().unwrap_or_default().to_string_lossy()
}

/// Title for the root page when its index has no front matter title.
fn root_dir_title(root: &Path) -> String {
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    match titlecase_from_slug(&name) {
        title if title.is_empty() => FALLBACK_ROOT_TITLE.to_owned(),
        title => title,
    }
}

/// Convert a slug (kebab-case or `snake_case`) to title case.
///
/// Replaces `-` and `_` with spaces, then capitalizes the first letter of each word.
pub(crate) fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}
