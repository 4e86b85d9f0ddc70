//! Single-row selection by primary key.

/// At most one selected row, identified by its primary-key value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    key: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn select(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    pub fn clear(&mut self) {
        self.key = None;
    }

    /// Position of the selected key within `keys`.
    pub fn index_in<S: AsRef<str>>(&self, keys: &[S]) -> Option<usize> {
        let selected = self.key.as_deref()?;
        keys.iter().position(|k| k.as_ref() == selected)
    }

    /// Keep the selection only if `keys` still contains it.
    pub fn retain_in<S: AsRef<str>>(&mut self, keys: &[S]) {
        if self.key.is_some() && self.index_in(keys).is_none() {
            self.key = None;
        }
    }

    /// Move by `delta` rows within `keys`, clamping at both ends.
    ///
    /// With nothing selected, moving down selects the first row and moving
    /// up selects the last. Returns the newly selected key if it changed.
    pub fn move_by<S: AsRef<str>>(&mut self, keys: &[S], delta: isize) -> Option<String> {
        if keys.is_empty() {
            self.key = None;
            return None;
        }
        let last = keys.len() - 1;
        let target = match self.index_in(keys) {
            Some(current) => (current as isize + delta).clamp(0, last as isize) as usize,
            None if delta >= 0 => 0,
            None => last,
        };
        let key = keys[target].as_ref();
        if self.key.as_deref() == Some(key) {
            return None;
        }
        self.key = Some(key.to_string());
        self.key.clone()
    }

    /// Select the first row of `keys`.
    pub fn first<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<String> {
        self.select_index(keys, 0)
    }

    /// Select the last row of `keys`.
    pub fn last<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<String> {
        self.select_index(keys, keys.len().saturating_sub(1))
    }

    fn select_index<S: AsRef<str>>(&mut self, keys: &[S], index: usize) -> Option<String> {
        let Some(key): Option<&str> = keys.get(index).map(|k| k.as_ref()) else {
            self.key = None;
            return None;
        };
        if self.key.as_deref() == Some(key) {
            return None;
        }
        self.key = Some(key.to_string());
        self.key.clone()
    }
}
