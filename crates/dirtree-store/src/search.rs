use dirtree_filter::Filter;

/// How much of the tree below the base a search visits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// Only the base entry.
    BaseObject,
    /// Only the immediate children of the base.
    SingleLevel,
    /// The base and every descendant.
    #[default]
    WholeSubtree,
}

/// Parameters of one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub filter: Filter,
    pub scope: Scope,
    /// Maximum number of entries delivered. `None` or `Some(0)` is unbounded.
    pub size_limit: Option<usize>,
    /// Attributes to return. Empty, or containing `*`, returns all.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// A whole-subtree search for `filter` returning every attribute.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            scope: Scope::default(),
            size_limit: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = Some(limit);
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// The effective limit, with `Some(0)` folded into `None`.
    pub fn limit(&self) -> Option<usize> {
        self.size_limit.filter(|&n| n > 0)
    }
}

impl Default for SearchRequest {
    /// `(objectClass=*)` over the whole subtree.
    fn default() -> Self {
        Self::new(Filter::present("objectClass"))
    }
}
