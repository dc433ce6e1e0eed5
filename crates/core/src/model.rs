#![forbid(unsafe_code)]

use crate::investigated::InvestigatedSet;

/// Symbol recorded for findings that sit outside any function.
pub const PACKAGE_LEVEL: &str = "(package-level)";
/// Folder name the scanner uses for files at the project root.
pub const ROOT_FOLDER: &str = ".";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Info];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    /// Rule id from the scanner; not unique within a file.
    pub id: String,
    pub tier_id: String,
    pub dim_id: String,
    pub severity: Severity,
    pub line: u32,
    pub symbol: String,
    pub label: String,
    /// Overlaid from the investigated mirror, never taken from the scanner.
    pub investigated: bool,
}

impl Finding {
    pub fn is_package_level(&self) -> bool {
        self.symbol.is_empty() || self.symbol == PACKAGE_LEVEL
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileNode {
    pub findings: Vec<Finding>,
    pub symbols: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub node: FileNode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub files: Vec<FileEntry>,
}

impl Folder {
    pub fn file(&self, name: &str) -> Option<&FileNode> {
        self.files
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.node)
    }
}

/// folder → file → findings, in producer order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    folders: Vec<Folder>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a file, keeping first-seen order of folders and files.
    pub fn insert(&mut self, folder: &str, file: &str, node: FileNode) {
        let folder_idx = match self.folders.iter().position(|f| f.name == folder) {
            Some(idx) => idx,
            None => {
                self.folders.push(Folder {
                    name: folder.to_string(),
                    files: Vec::new(),
                });
                self.folders.len() - 1
            }
        };
        let files = &mut self.folders[folder_idx].files;
        match files.iter_mut().find(|entry| entry.name == file) {
            Some(entry) => entry.node = node,
            None => files.push(FileEntry {
                name: file.to_string(),
                node,
            }),
        }
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.name == name)
    }

    pub fn file(&self, folder: &str, file: &str) -> Option<&FileNode> {
        self.folder(folder).and_then(|f| f.file(file))
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &str, &FileNode)> {
        self.folders.iter().flat_map(|folder| {
            folder
                .files
                .iter()
                .map(move |entry| (folder.name.as_str(), entry.name.as_str(), &entry.node))
        })
    }

    pub fn finding_count(&self) -> usize {
        self.files().map(|(_, _, node)| node.findings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Re-derives every finding's `investigated` flag from the mirror.
    pub fn apply_investigated(&mut self, mirror: &InvestigatedSet) {
        for folder in &mut self.folders {
            for entry in &mut folder.files {
                let marked = mirror.contains(&file_path(&folder.name, &entry.name));
                for finding in &mut entry.node.findings {
                    finding.investigated = marked;
                }
            }
        }
    }
}

pub fn file_path(folder: &str, file: &str) -> String {
    if folder.is_empty() || folder == ROOT_FOLDER {
        file.to_string()
    } else {
        format!("{folder}/{file}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Root,
    Folder,
    File,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    Root,
    Folder(String),
    File {
        folder: String,
        file: String,
    },
}

impl Scope {
    pub fn file(folder: &str, file: &str) -> Self {
        Scope::File {
            folder: folder.to_string(),
            file: file.to_string(),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Scope::Root => Level::Root,
            Scope::Folder(_) => Level::Folder,
            Scope::File { .. } => Level::File,
        }
    }

    /// `""` for root, the folder name, or the `folder/file` path.
    pub fn path(&self) -> String {
        match self {
            Scope::Root => String::new(),
            Scope::Folder(folder) => folder.clone(),
            Scope::File { folder, file } => file_path(folder, file),
        }
    }

    /// Identity of the scope across levels: a folder `a` and a root-level file `a` share
    /// a path but not a key.
    pub fn key(&self) -> String {
        match self {
            Scope::Root => "root".to_string(),
            Scope::Folder(folder) => format!("dir:{folder}"),
            Scope::File { folder, file } => format!("file:{}", file_path(folder, file)),
        }
    }

    pub fn contains(&self, folder: &str, file: &str) -> bool {
        match self {
            Scope::Root => true,
            Scope::Folder(name) => name == folder,
            Scope::File {
                folder: scope_folder,
                file: scope_file,
            } => scope_folder == folder && scope_file == file,
        }
    }

    pub fn exists_in(&self, tree: &Tree) -> bool {
        match self {
            Scope::Root => true,
            Scope::Folder(name) => tree.folder(name).is_some(),
            Scope::File { folder, file } => tree.file(folder, file).is_some(),
        }
    }

    /// Resolves user input against the tree. Folder names may themselves contain `/`,
    /// so an exact folder match wins over a folder/file split.
    pub fn resolve(tree: &Tree, raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_matches('/');
        if raw.is_empty() {
            return Some(Scope::Root);
        }
        if tree.folder(raw).is_some() {
            return Some(Scope::Folder(raw.to_string()));
        }
        let (folder, file) = match raw.rsplit_once('/') {
            Some((folder, file)) => (folder, file),
            None => (ROOT_FOLDER, raw),
        };
        tree.file(folder, file).map(|_| Scope::file(folder, file))
    }
}
