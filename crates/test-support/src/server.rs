use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, SystemTime};

use transport::{Capability, EntryKind, RemoteEntry, Session, SessionError, SessionResult};

/// Protocol operations a [`MemorySession`] records and can be told to fail.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Connect and log in.
    Connect,
    /// `CWD`.
    ChangeDirectory,
    /// `LIST`.
    List,
    /// `MKD`.
    CreateDirectory,
    /// `RMD`.
    RemoveDirectory,
    /// `DELE`.
    DeleteFile,
    /// `STOR`.
    WriteFile,
    /// `MFMT`.
    SetModifiedTime,
    /// `MLST`.
    ObjectInfo,
    /// `QUIT`.
    Close,
}

/// Failure injected into matching operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fault {
    /// Reply with this status code. A `421` also closes the session.
    Status(u32),
    /// Fail with a timed-out I/O error.
    Timeout,
    /// The server silently dropped the session: it still looks connected
    /// until the operation runs and the socket is found reset.
    Reset,
}

impl Fault {
    const fn drops_session(self) -> bool {
        matches!(self, Self::Reset | Self::Status(421))
    }
}

/// One attempted operation, in the order the server saw it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Recorded {
    /// Index of the session that issued it.
    pub session: usize,
    /// What was attempted.
    pub operation: Operation,
    /// Absolute path the operation resolved to.
    pub path: String,
    /// Whether the operation took effect.
    pub succeeded: bool,
}

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, modified: SystemTime },
    Directory(BTreeMap<String, Node>),
    Link,
}

impl Node {
    const fn kind(&self) -> EntryKind {
        match self {
            Self::File { .. } => EntryKind::File,
            Self::Directory(_) => EntryKind::Directory,
            Self::Link => EntryKind::Link,
        }
    }

    fn modified(&self) -> Option<SystemTime> {
        match self {
            Self::File { modified, .. } => Some(*modified),
            _ => None,
        }
    }
}

struct Injection {
    operation: Operation,
    path: Option<String>,
    fault: Fault,
    remaining: Option<usize>,
}

struct State {
    root: BTreeMap<String, Node>,
    injections: Vec<Injection>,
    journal: Vec<Recorded>,
    generation: u64,
    sessions: usize,
    logins: usize,
    active_uploads: usize,
    peak_uploads: usize,
    object_info: bool,
    upload_delay: Duration,
}

impl State {
    fn node(&self, path: &str) -> Option<&Node> {
        let mut segments = segments(path);
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            match node {
                Node::Directory(children) => node = children.get(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    fn is_directory(&self, path: &str) -> bool {
        path == "/" || matches!(self.node(path), Some(Node::Directory(_)))
    }

    fn children(&self, path: &str) -> Option<&BTreeMap<String, Node>> {
        if path == "/" {
            return Some(&self.root);
        }
        match self.node(path)? {
            Node::Directory(children) => Some(children),
            _ => None,
        }
    }

    fn children_mut(&mut self, path: &str) -> Option<&mut BTreeMap<String, Node>> {
        let mut current = &mut self.root;
        for segment in segments(path) {
            match current.get_mut(segment)? {
                Node::Directory(children) => current = children,
                _ => return None,
            }
        }
        Some(current)
    }

    fn parent_mut(&mut self, path: &str) -> Option<(&mut BTreeMap<String, Node>, String)> {
        let (parent, name) = split_parent(path)?;
        let children = self.children_mut(&parent)?;
        Some((children, name))
    }

    fn insert(&mut self, path: &str, node: Node) {
        let (parent, name) = split_parent(path).expect("path names an entry");
        let mut current = &mut self.root;
        for segment in segments(&parent) {
            let child = current
                .entry(segment.to_owned())
                .or_insert_with(|| Node::Directory(BTreeMap::new()));
            match child {
                Node::Directory(children) => current = children,
                _ => panic!("{parent} is not a directory"),
            }
        }
        current.insert(name, node);
    }

    fn take_fault(&mut self, operation: Operation, path: &str) -> Option<Fault> {
        let injection = self.injections.iter_mut().find(|injection| {
            injection.operation == operation
                && injection.remaining != Some(0)
                && injection.path.as_deref().is_none_or(|wanted| wanted == path)
        })?;
        if let Some(remaining) = injection.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(injection.fault)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn split_parent(path: &str) -> Option<(String, String)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = trimmed.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    let parent = if parent.is_empty() { "/" } else { parent };
    Some((parent.to_owned(), name.to_owned()))
}

fn resolve(cwd: &str, path: &str) -> String {
    let mut stack: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        segments(cwd).collect()
    };
    for segment in segments(path) {
        match segment {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn not_found() -> SessionError {
    SessionError::status(550, "No such file or directory")
}

/// Shared in-memory remote tree.
///
/// Cloning yields another handle onto the same server.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// Creates a server with an empty root that supports `MLST`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                root: BTreeMap::new(),
                injections: Vec::new(),
                journal: Vec::new(),
                generation: 0,
                sessions: 0,
                logins: 0,
                active_uploads: 0,
                peak_uploads: 0,
                object_info: true,
                upload_delay: Duration::ZERO,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory server mutex poisoned")
    }

    /// Creates a directory and any missing parents.
    pub fn add_dir(&self, path: &str) -> &Self {
        let mut state = self.lock();
        if !state.is_directory(path) {
            state.insert(path, Node::Directory(BTreeMap::new()));
        }
        drop(state);
        self
    }

    /// Creates a file, creating missing parents.
    pub fn add_file(&self, path: &str, data: &[u8], modified: SystemTime) -> &Self {
        self.lock().insert(
            path,
            Node::File {
                data: data.to_vec(),
                modified,
            },
        );
        self
    }

    /// Creates a symbolic link entry.
    pub fn add_link(&self, path: &str) -> &Self {
        self.lock().insert(path, Node::Link);
        self
    }

    /// Returns the kind of the entry at `path`.
    #[must_use]
    pub fn kind(&self, path: &str) -> Option<EntryKind> {
        let state = self.lock();
        if path == "/" {
            return Some(EntryKind::Directory);
        }
        state.node(path).map(Node::kind)
    }

    /// Returns the contents of the file at `path`.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().node(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Returns the modification time of the file at `path`.
    #[must_use]
    pub fn modified(&self, path: &str) -> Option<SystemTime> {
        self.lock().node(path).and_then(Node::modified)
    }

    /// Returns every path in the tree with its kind, depth-first and sorted.
    #[must_use]
    pub fn tree(&self) -> Vec<(String, EntryKind)> {
        fn walk(prefix: &str, children: &BTreeMap<String, Node>, out: &mut Vec<(String, EntryKind)>) {
            for (name, node) in children {
                let path = child_path(prefix, name);
                out.push((path.clone(), node.kind()));
                if let Node::Directory(grandchildren) = node {
                    walk(&path, grandchildren, out);
                }
            }
        }
        let state = self.lock();
        let mut out = Vec::new();
        walk("/", &state.root, &mut out);
        out
    }

    /// Fails the next `times` attempts of `operation` with `fault`.
    pub fn inject(&self, operation: Operation, fault: Fault, times: usize) -> &Self {
        self.push_injection(operation, None, fault, Some(times));
        self
    }

    /// Fails the next `times` attempts of `operation` on `path` with `fault`.
    pub fn inject_at(&self, operation: Operation, path: &str, fault: Fault, times: usize) -> &Self {
        self.push_injection(operation, Some(path.to_owned()), fault, Some(times));
        self
    }

    /// Fails every attempt of `operation` with `fault`.
    pub fn inject_always(&self, operation: Operation, fault: Fault) -> &Self {
        self.push_injection(operation, None, fault, None);
        self
    }

    fn push_injection(&self, operation: Operation, path: Option<String>, fault: Fault, remaining: Option<usize>) {
        self.lock().injections.push(Injection {
            operation,
            path,
            fault,
            remaining,
        });
    }

    /// Drops every connected session, as if the server had restarted.
    pub fn disconnect_all(&self) {
        self.lock().generation += 1;
    }

    /// Toggles `MLST` support.
    pub fn set_object_info(&self, supported: bool) -> &Self {
        self.lock().object_info = supported;
        self
    }

    /// Makes every upload hold its connection for `delay`.
    pub fn set_upload_delay(&self, delay: Duration) -> &Self {
        self.lock().upload_delay = delay;
        self
    }

    /// Returns every attempted operation in order.
    #[must_use]
    pub fn journal(&self) -> Vec<Recorded> {
        self.lock().journal.clone()
    }

    /// Returns the successful operations of kind `operation`.
    #[must_use]
    pub fn performed(&self, operation: Operation) -> Vec<String> {
        self.lock()
            .journal
            .iter()
            .filter(|record| record.operation == operation && record.succeeded)
            .map(|record| record.path.clone())
            .collect()
    }

    /// Returns how often `operation` was attempted, successful or not.
    #[must_use]
    pub fn attempts(&self, operation: Operation) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|record| record.operation == operation)
            .count()
    }

    /// Forgets the journal, keeping the tree.
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Returns how many sessions were created.
    #[must_use]
    pub fn sessions_created(&self) -> usize {
        self.lock().sessions
    }

    /// Returns how many successful logins happened.
    #[must_use]
    pub fn logins(&self) -> usize {
        self.lock().logins
    }

    /// Returns the most uploads that were ever in flight at once.
    #[must_use]
    pub fn peak_concurrent_uploads(&self) -> usize {
        self.lock().peak_uploads
    }

    /// Creates an unconnected session.
    #[must_use]
    pub fn session(&self) -> MemorySession {
        let id = {
            let mut state = self.lock();
            state.sessions += 1;
            state.sessions - 1
        };
        MemorySession {
            server: self.clone(),
            id,
            generation: None,
            cwd: "/".to_owned(),
        }
    }

    /// Creates a session and connects it.
    ///
    /// # Errors
    ///
    /// Returns the injected [`Operation::Connect`] failure, if any.
    pub fn connect(&self) -> SessionResult<MemorySession> {
        let mut session = self.session();
        session.connect()?;
        Ok(session)
    }

    /// Returns a pool factory producing connected sessions.
    pub fn factory(&self) -> impl Fn() -> SessionResult<MemorySession> + Send + Sync + 'static {
        let server = self.clone();
        move || server.connect()
    }
}

impl fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryServer")
            .field("entries", &state.root.len())
            .field("sessions", &state.sessions)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

/// One client session against a [`MemoryServer`].
pub struct MemorySession {
    server: MemoryServer,
    id: usize,
    generation: Option<u64>,
    cwd: String,
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl MemorySession {
    /// Returns the index the server assigned to this session.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns the session's working directory.
    #[must_use]
    pub fn working_directory(&self) -> &str {
        &self.cwd
    }

    fn perform<T>(
        &mut self,
        operation: Operation,
        path: &str,
        apply: impl FnOnce(&mut State, &str) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let absolute = resolve(&self.cwd, path);
        let mut state = self.server.lock();
        let result = if self.generation != Some(state.generation) {
            Err(SessionError::Disconnected)
        } else {
            match state.take_fault(operation, &absolute) {
                Some(fault) => {
                    if fault.drops_session() {
                        self.generation = None;
                    }
                    Err(fault_error(fault))
                }
                None => apply(&mut state, &absolute),
            }
        };
        state.journal.push(Recorded {
            session: self.id,
            operation,
            path: absolute,
            succeeded: result.is_ok(),
        });
        result
    }
}

fn fault_error(fault: Fault) -> SessionError {
    match fault {
        Fault::Status(code) => SessionError::status(code, "injected failure"),
        Fault::Timeout => SessionError::Io(io::Error::new(io::ErrorKind::TimedOut, "injected timeout")),
        Fault::Reset => SessionError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "injected reset")),
    }
}

impl Session for MemorySession {
    fn connect(&mut self) -> SessionResult<()> {
        let mut state = self.server.lock();
        let fault = state.take_fault(Operation::Connect, "/");
        let succeeded = fault.is_none();
        state.journal.push(Recorded {
            session: self.id,
            operation: Operation::Connect,
            path: "/".to_owned(),
            succeeded,
        });
        if let Some(fault) = fault {
            self.generation = None;
            return Err(fault_error(fault));
        }
        state.logins += 1;
        self.generation = Some(state.generation);
        self.cwd = "/".to_owned();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.generation.is_some() && self.generation == Some(self.server.lock().generation)
    }

    fn change_working_directory(&mut self, path: &str) -> SessionResult<()> {
        let target = self.perform(Operation::ChangeDirectory, path, |state, absolute| {
            if state.is_directory(absolute) {
                Ok(absolute.to_owned())
            } else {
                Err(not_found())
            }
        })?;
        self.cwd = target;
        Ok(())
    }

    fn list_directory(&mut self, path: Option<&str>) -> SessionResult<Vec<RemoteEntry>> {
        self.perform(Operation::List, path.unwrap_or("."), |state, absolute| {
            let children = state.children(absolute).ok_or_else(not_found)?;
            Ok(children
                .iter()
                .map(|(name, node)| {
                    RemoteEntry::new(name, node.kind(), node.modified(), child_path(absolute, name))
                })
                .collect())
        })
    }

    fn create_directory(&mut self, name: &str) -> SessionResult<()> {
        self.perform(Operation::CreateDirectory, name, |state, absolute| {
            let (children, name) = state.parent_mut(absolute).ok_or_else(not_found)?;
            if children.contains_key(&name) {
                return Err(SessionError::status(550, "File exists"));
            }
            children.insert(name, Node::Directory(BTreeMap::new()));
            Ok(())
        })
    }

    fn remove_directory(&mut self, name: &str) -> SessionResult<()> {
        self.perform(Operation::RemoveDirectory, name, |state, absolute| {
            let (children, name) = state.parent_mut(absolute).ok_or_else(not_found)?;
            match children.get(&name) {
                Some(Node::Directory(grandchildren)) if grandchildren.is_empty() => {
                    children.remove(&name);
                    Ok(())
                }
                Some(Node::Directory(_)) => Err(SessionError::status(550, "Directory not empty")),
                _ => Err(not_found()),
            }
        })
    }

    fn delete_file(&mut self, name: &str) -> SessionResult<()> {
        self.perform(Operation::DeleteFile, name, |state, absolute| {
            let (children, name) = state.parent_mut(absolute).ok_or_else(not_found)?;
            match children.get(&name) {
                Some(Node::File { .. } | Node::Link) => {
                    children.remove(&name);
                    Ok(())
                }
                _ => Err(not_found()),
            }
        })
    }

    fn write_file(&mut self, name: &str, source: &mut dyn Read) -> SessionResult<u64> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;

        let delay = self.perform(Operation::WriteFile, name, |state, absolute| {
            let (parent, _) = split_parent(absolute).ok_or_else(not_found)?;
            if !state.is_directory(&parent) || state.is_directory(absolute) {
                return Err(not_found());
            }
            state.active_uploads += 1;
            state.peak_uploads = state.peak_uploads.max(state.active_uploads);
            Ok(state.upload_delay)
        })?;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let absolute = resolve(&self.cwd, name);
        let mut state = self.server.lock();
        state.active_uploads -= 1;
        let length = data.len() as u64;
        state.insert(
            &absolute,
            Node::File {
                data,
                modified: SystemTime::now(),
            },
        );
        Ok(length)
    }

    fn set_modified_time(&mut self, name: &str, modified: SystemTime) -> SessionResult<()> {
        self.perform(Operation::SetModifiedTime, name, |state, absolute| {
            let (children, name) = state.parent_mut(absolute).ok_or_else(not_found)?;
            match children.get_mut(&name) {
                Some(Node::File { modified: stored, .. }) => {
                    *stored = modified;
                    Ok(())
                }
                _ => Err(not_found()),
            }
        })
    }

    fn has_capability(&mut self, capability: Capability) -> SessionResult<bool> {
        Ok(match capability {
            Capability::ObjectInfo => self.server.lock().object_info,
            Capability::ModifyTime => true,
        })
    }

    fn object_info(&mut self, path: &str) -> SessionResult<Option<RemoteEntry>> {
        if !self.has_capability(Capability::ObjectInfo)? {
            return Err(SessionError::MissingCapability(Capability::ObjectInfo));
        }
        self.perform(Operation::ObjectInfo, path, |state, absolute| {
            Ok(state.node(absolute).map(|node| {
                let name = absolute.rsplit('/').next().unwrap_or_default();
                RemoteEntry::new(name, node.kind(), node.modified(), absolute)
            }))
        })
    }

    fn close(&mut self) -> SessionResult<()> {
        let was_connected = self.generation.take().is_some();
        let mut state = self.server.lock();
        let fault = state.take_fault(Operation::Close, "/");
        state.journal.push(Recorded {
            session: self.id,
            operation: Operation::Close,
            path: "/".to_owned(),
            succeeded: fault.is_none(),
        });
        match fault {
            Some(fault) if was_connected => Err(fault_error(fault)),
            _ => Ok(()),
        }
    }
}
