//! Startup entries: the unit of one-shot initialisation.

use smallvec::SmallVec;

/// Outcome of an `init` or `finish` hook. The error string becomes the
/// `reason` of the reported [`StartupError`](keel_core::StartupError).
pub type HookResult = Result<(), String>;

/// A named unit of initialisation with declared dependencies.
pub trait StartupEntry: Send {
    /// Unique name of the entry.
    fn name(&self) -> &str;

    /// Tags this entry satisfies. A dependency on a tag is satisfied by
    /// every entry carrying it.
    fn tags(&self) -> &[String] {
        &[]
    }

    /// Names or tags that must finish `init` before this entry's `init`.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Bring the subsystem up.
    fn init(&mut self) -> HookResult;

    /// Tear the subsystem down.
    fn finish(&mut self) -> HookResult;
}

type Hook = Box<dyn FnMut() -> HookResult + Send>;

/// A [`StartupEntry`] assembled from closures.
///
/// ```
/// use keel_startup::FnEntry;
///
/// let entry = FnEntry::new("Console")
///     .tag("Io")
///     .depends_on("HeapManager")
///     .on_init(|| Ok(()));
/// # let _ = entry;
/// ```
pub struct FnEntry {
    name: String,
    tags: SmallVec<[String; 2]>,
    dependencies: SmallVec<[String; 4]>,
    init: Option<Hook>,
    finish: Option<Hook>,
}

impl FnEntry {
    /// An entry with no tags, no dependencies, and no-op hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: SmallVec::new(),
            dependencies: SmallVec::new(),
            init: None,
            finish: None,
        }
    }

    /// Add a tag this entry satisfies.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a dependency by entry name or tag.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Set the `init` hook.
    pub fn on_init(mut self, hook: impl FnMut() -> HookResult + Send + 'static) -> Self {
        self.init = Some(Box::new(hook));
        self
    }

    /// Set the `finish` hook.
    pub fn on_finish(mut self, hook: impl FnMut() -> HookResult + Send + 'static) -> Self {
        self.finish = Some(Box::new(hook));
        self
    }
}

impl StartupEntry for FnEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn init(&mut self) -> HookResult {
        match self.init.as_mut() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> HookResult {
        match self.finish.as_mut() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}
