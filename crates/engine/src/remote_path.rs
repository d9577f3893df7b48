/// A location on the server, tracked three ways at once.
///
/// `absolute` is what the session is told to enter, `relative` (to the
/// synchronization root) is what exclusion rules see, and `name` is the
/// final segment. Children are derived by appending to all three.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RemotePath {
    name: String,
    absolute: String,
    relative: String,
    depth: usize,
}

impl RemotePath {
    /// Creates the synchronization root from a server path.
    ///
    /// The path is made absolute and trailing separators are dropped.
    ///
    /// ```
    /// use engine::RemotePath;
    ///
    /// let root = RemotePath::root("www/site/");
    /// assert_eq!(root.absolute(), "/www/site");
    /// assert_eq!(root.name(), "site");
    /// assert_eq!(root.relative(), "");
    /// assert_eq!(root.child("a.txt").absolute(), "/www/site/a.txt");
    /// assert_eq!(RemotePath::root("/").child("a").absolute(), "/a");
    /// ```
    #[must_use]
    pub fn root(path: &str) -> Self {
        let trimmed = path.replace('\\', "/");
        let segments: Vec<_> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        Self {
            name: segments.last().map_or_else(String::new, |name| (*name).to_owned()),
            absolute: format!("/{}", segments.join("/")),
            relative: String::new(),
            depth: 0,
        }
    }

    /// Derives the path of the child `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let absolute = if self.absolute == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.absolute)
        };
        let relative = if self.relative.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{name}", self.relative)
        };
        Self {
            name: name.to_owned(),
            absolute,
            relative,
            depth: self.depth + 1,
        }
    }

    /// Returns the absolute path of the containing directory.
    #[must_use]
    pub fn parent_absolute(&self) -> &str {
        match self.absolute.rfind('/') {
            Some(0) | None => "/",
            Some(index) => &self.absolute[..index],
        }
    }

    /// Returns the final segment (empty for the server root).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the absolute server path.
    #[must_use]
    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    /// Returns the path relative to the synchronization root.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Returns the nesting depth below the synchronization root.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_extend_every_field() {
        let root = RemotePath::root("/www");
        let img = root.child("img");
        let logo = img.child("logo.png");
        assert_eq!(logo.absolute(), "/www/img/logo.png");
        assert_eq!(logo.relative(), "img/logo.png");
        assert_eq!(logo.name(), "logo.png");
        assert_eq!(logo.depth(), 2);
        assert_eq!(logo.parent_absolute(), "/www/img");
    }

    #[test]
    fn server_root_has_no_double_separators() {
        let root = RemotePath::root("");
        assert_eq!(root.absolute(), "/");
        assert_eq!(root.parent_absolute(), "/");
        assert_eq!(root.child("x").parent_absolute(), "/");
        assert_eq!(RemotePath::root("//a//b/").absolute(), "/a/b");
    }
}
