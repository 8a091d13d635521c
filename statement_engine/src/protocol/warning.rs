/// One diagnostic in a singly linked warning chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlWarning {
    sqlstate: [u8; 5],
    vendor_code: i32,
    message: String,
    next: Option<Box<SqlWarning>>,
}

impl SqlWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sqlstate: *b"01000",
            vendor_code: 0,
            message: message.into(),
            next: None,
        }
    }

    pub fn with_state(message: impl Into<String>, sqlstate: [u8; 5], vendor_code: i32) -> Self {
        Self {
            sqlstate,
            vendor_code,
            message: message.into(),
            next: None,
        }
    }

    pub fn sqlstate(&self) -> [u8; 5] {
        self.sqlstate
    }

    pub fn vendor_code(&self) -> i32 {
        self.vendor_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn next_warning(&self) -> Option<&SqlWarning> {
        self.next.as_deref()
    }

    /// Appends `warning` (and anything chained behind it) at the tail.
    pub fn chain(&mut self, warning: SqlWarning) {
        let mut tail = &mut self.next;
        while let Some(node) = tail {
            tail = &mut node.next;
        }
        *tail = Some(Box::new(warning));
    }

    pub fn iter(&self) -> WarningIter<'_> {
        WarningIter {
            current: Some(self),
        }
    }
}

impl Drop for SqlWarning {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut warning) = next {
            next = warning.next.take();
        }
    }
}

pub struct WarningIter<'a> {
    current: Option<&'a SqlWarning>,
}

impl<'a> Iterator for WarningIter<'a> {
    type Item = &'a SqlWarning;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.next_warning();
        Some(current)
    }
}
