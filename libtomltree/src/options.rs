/// How a repeated ordinary table header is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TablePolicy {
    /// Reopen the existing mapping and merge into it.
    #[default]
    Merge,
    /// Reject the second declaration with `DuplicateTable`. Tables defined
    /// by dotted keys or inline tables count as declared, so `[a.b]` after
    /// `a.b.c = 1` is rejected too. Sub-tables beneath them may still be
    /// opened.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub table_policy: TablePolicy,
    /// File name used in error locations.
    pub filename: Option<String>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_policy(mut self, table_policy: TablePolicy) -> Self {
        self.table_policy = table_policy;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
